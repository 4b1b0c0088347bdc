use std::env;
use std::sync::{Arc, Once};

use tracing::{debug, info};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    prelude::*,
    EnvFilter,
};

use crate::domain::{Node, NodeId};
use crate::infrastructure::InMemoryHierarchy;

static TEST_SETUP: Once = Once::new();

pub fn init_test_setup() {
    TEST_SETUP.call_once(|| {
        if env::var("RUST_LOG").is_err() {
            env::set_var("RUST_LOG", "marktree=trace");
        }
        // global logging subscriber, used by all tracing log macros
        setup_test_logging();
        info!("Test Setup complete");
    });
}

fn setup_test_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("marktree=debug"));

    let subscriber = tracing_subscriber::registry().with(
        fmt::layer()
            .with_target(true)
            .with_thread_names(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_test_writer()
            .with_filter(env_filter),
    );

    // Only set if we haven't already set a global subscriber
    if tracing::dispatcher::has_been_set() {
        debug!("Tracing subscriber already set");
    } else {
        subscriber.try_init().unwrap_or_else(|e| {
            eprintln!("Error: Failed to set up logging: {}", e);
        });
    }
}

/// Build a store from `(id, parent, title)` triples.
pub fn store_from(triples: &[(NodeId, NodeId, &str)]) -> Arc<InMemoryHierarchy> {
    let nodes = triples
        .iter()
        .map(|(id, parent, title)| Node::new(*id, *parent, *title))
        .collect();
    Arc::new(InMemoryHierarchy::from_nodes(nodes).expect("valid test hierarchy"))
}

/// Nodes `first..first + count` as children of `parent`, titled `"{prefix} {n}"`.
pub fn numbered_children(parent: NodeId, first: NodeId, count: usize, prefix: &str) -> Vec<Node> {
    (0..count as NodeId)
        .map(|n| Node::new(first + n, parent, format!("{prefix} {}", n + 1)).with_sort(n as i64))
        .collect()
}
