//! Tests for hierarchy loading and the service container wiring.

use std::fs;
use std::path::Path;

use tempfile::TempDir;

use marktree::application::ApplicationError;
use marktree::config::Settings;
use marktree::domain::{DomainError, FieldValue, Node, NodeId};
use marktree::infrastructure::di::ServiceContainer;
use marktree::infrastructure::loader::{load_hierarchy, scan_directory, DIRECTORY_KIND, FILE_KIND};
use marktree::infrastructure::traits::{
    ChildrenMethod, CountMethod, HierarchyStore, RealFileSystem,
};
use marktree::infrastructure::InfraError;

const SITE_TOML: &str = r#"
[[nodes]]
id = 1
title = "Home"

[[nodes]]
id = 2
parent = 1
title = "Logo"
kind = "Attachment"

[[nodes]]
id = 3
parent = 1
title = "News"
fields = { Status = "Published" }

[[nodes]]
id = 4
parent = 1
title = "Drafts"
fields = { Status = "Draft" }
"#;

fn write_site(dir: &TempDir) -> std::path::PathBuf {
    let path = dir.path().join("site.toml");
    fs::write(&path, SITE_TOML).expect("write site.toml");
    path
}

fn child_ids(store: &dyn HierarchyStore, node: &Node) -> Vec<NodeId> {
    store
        .children(node, ChildrenMethod::default())
        .iter()
        .map(|n| n.id)
        .collect()
}

// ============================================================
// load_hierarchy / scan_directory
// ============================================================

#[test]
fn given_toml_document_when_load_hierarchy_then_builds_store() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = write_site(&temp);

    // Act
    let store = load_hierarchy(&RealFileSystem, &path).expect("load");

    // Assert
    let home = store.get(1).expect("home");
    assert_eq!(child_ids(&store, &home), vec![2, 3, 4]);
    assert_eq!(
        store.get(3).map(|n| n.field("Status")),
        Some(FieldValue::Text("Published".into()))
    );
}

#[test]
fn given_missing_source_when_load_hierarchy_then_io_not_found() {
    let temp = TempDir::new().unwrap();
    let result = load_hierarchy(&RealFileSystem, &temp.path().join("nope.toml"));
    match result {
        Err(InfraError::Io { source, .. }) => {
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound)
        }
        other => panic!("expected Io error, got {:?}", other.map(|s| s.len())),
    }
}

#[test]
fn given_orphan_node_when_load_hierarchy_then_node_not_found() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("orphan.json");
    fs::write(&path, r#"{"nodes": [{"id": 5, "parent": 9, "title": "lost"}]}"#).unwrap();

    // Act
    let result = load_hierarchy(&RealFileSystem, &path);

    // Assert
    assert!(matches!(
        result,
        Err(InfraError::Application(ApplicationError::Domain(
            DomainError::NodeNotFound(9)
        )))
    ));
}

#[test]
fn given_cyclic_document_when_load_hierarchy_then_cycle_detected() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("cycle.toml");
    fs::write(
        &path,
        r#"
[[nodes]]
id = 1
parent = 2
title = "a"

[[nodes]]
id = 2
parent = 1
title = "b"
"#,
    )
    .unwrap();

    // Act
    let result = load_hierarchy(&RealFileSystem, &path);

    // Assert
    assert!(matches!(
        result,
        Err(InfraError::Application(ApplicationError::Domain(
            DomainError::CycleDetected(_)
        )))
    ));
}

#[test]
fn given_directory_when_scan_directory_then_entries_become_nodes() {
    // Arrange
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join("docs/guide")).unwrap();
    fs::write(temp.path().join("docs/guide/intro.md"), "hello").unwrap();
    fs::write(temp.path().join("docs/index.md"), "").unwrap();
    fs::write(temp.path().join("README.md"), "").unwrap();

    // Act
    let store = scan_directory(temp.path()).expect("scan");

    // Assert
    let top: Vec<Node> = store.children(&Node::virtual_root(), ChildrenMethod::default());
    let titles: Vec<&str> = top.iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["README.md", "docs"]);

    let docs = &top[1];
    assert_eq!(docs.kind, DIRECTORY_KIND);
    assert_eq!(store.child_count(docs, CountMethod::NumChildren), 2);

    let guide = store
        .children(docs, ChildrenMethod::default())
        .into_iter()
        .find(|n| n.title == "guide")
        .expect("guide directory");
    let intro = &store.children(&guide, ChildrenMethod::default())[0];
    assert_eq!(intro.kind, FILE_KIND);
    assert_eq!(intro.field("Path"), FieldValue::Text("docs/guide/intro.md".into()));
    assert_eq!(intro.field("Size"), FieldValue::Int(5));
    assert!(!store.supports_hierarchy(FILE_KIND));
}

// ============================================================
// ServiceContainer
// ============================================================

#[test]
fn given_hidden_kinds_when_load_store_then_hidden_nodes_are_not_children() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = write_site(&temp);
    let container = ServiceContainer::new(Settings {
        hide_from_hierarchy: vec!["Attachment".into()],
        ..Settings::default()
    });

    // Act
    let store = container.load_store(Some(&path)).expect("load");

    // Assert
    let home = store.get(1).expect("home");
    assert_eq!(child_ids(store.as_ref(), &home), vec![3, 4]);
    assert_eq!(store.child_count(&home, CountMethod::NumChildren), 2);
}

#[test]
fn given_no_source_and_no_hierarchy_file_when_load_store_then_config_error() {
    let container = ServiceContainer::new(Settings::default());
    let result = container.load_store(None);
    assert!(matches!(
        result,
        Err(InfraError::Application(ApplicationError::Config { .. }))
    ));
}

#[test]
fn given_hierarchy_file_setting_when_load_store_without_source_then_uses_it() {
    let temp = TempDir::new().unwrap();
    let path = write_site(&temp);
    let container = ServiceContainer::new(Settings {
        hierarchy_file: Some(path),
        ..Settings::default()
    });

    let store = container.load_store(None).expect("load");

    assert_eq!(store.len(), 4);
}

#[test]
fn given_method_names_in_settings_when_marking_options_then_parsed() {
    let container = ServiceContainer::new(Settings {
        children_method: "all_children".into(),
        count_method: "numHistoricalChildren".into(),
        node_threshold_total: 7,
        ..Settings::default()
    });

    let options = container.marking_options().expect("options");

    assert_eq!(options.children_method, ChildrenMethod::AllChildren);
    assert_eq!(options.count_method, CountMethod::NumHistoricalChildren);
    assert_eq!(options.node_count_threshold, 7);
    assert_eq!(options.max_child_nodes, 250);
}

#[test]
fn given_unknown_count_method_when_marking_options_then_error() {
    let container = ServiceContainer::new(Settings {
        count_method: "numGrandChildren".into(),
        ..Settings::default()
    });

    assert!(matches!(
        container.marking_options(),
        Err(ApplicationError::Domain(DomainError::UnknownCountMethod(_)))
    ));
}

#[test]
fn given_filter_setting_when_tree_builder_then_only_matching_children_are_marked() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let path = write_site(&temp);
    let container = ServiceContainer::new(Settings {
        marking_filter: Some("Status = Published".into()),
        ..Settings::default()
    });
    let store = container.load_store(Some(&path)).expect("load");
    let root = store.get(1).expect("home");
    let options = container.marking_options().expect("options");

    // Act
    let mut builder = container
        .tree_builder(store, root, options)
        .expect("builder");
    builder.mark_partial_tree();

    // Assert
    assert_eq!(builder.marked_node_ids(), vec![1, 3]);
}

#[test]
fn given_malformed_filter_setting_when_marking_filter_then_error() {
    let container = ServiceContainer::new(Settings {
        marking_filter: Some("= nothing".into()),
        ..Settings::default()
    });

    assert!(matches!(
        container.marking_filter(),
        Err(ApplicationError::Domain(DomainError::MalformedFilter(_)))
    ));
}

#[test]
fn given_relative_source_when_resolve_source_then_argument_wins() {
    let container = ServiceContainer::new(Settings {
        hierarchy_file: Some("configured.toml".into()),
        ..Settings::default()
    });

    let resolved = container
        .resolve_source(Some(Path::new("given.toml")))
        .expect("resolve");

    assert_eq!(resolved, Path::new("given.toml"));
}
