//! Hierarchy navigation service
//!
//! Parent/ancestor lookups, breadcrumbs and descendant listings over any
//! [`HierarchyStore`].

use std::sync::Arc;

use itertools::Itertools;
use tracing::{debug, instrument};

use crate::application::ApplicationResult;
use crate::domain::{check_parent_chain, DomainError, Node, NodeId};
use crate::infrastructure::traits::{ChildrenMethod, HierarchyStore};

/// Service for navigating a hierarchy.
pub struct HierarchyService {
    store: Arc<dyn HierarchyStore>,
}

impl HierarchyService {
    /// Create a new hierarchy service.
    pub fn new(store: Arc<dyn HierarchyStore>) -> Self {
        Self { store }
    }

    /// Look up a node, failing if the store does not know it.
    pub fn node(&self, id: NodeId) -> ApplicationResult<Node> {
        self.store
            .get(id)
            .ok_or_else(|| DomainError::NodeNotFound(id).into())
    }

    /// Parent of `node`, `None` at the top level.
    pub fn parent(&self, node: &Node) -> Option<Node> {
        self.store.parent(node)
    }

    /// Ancestors of `node`, closest first.
    pub fn ancestors(&self, node: &Node, include_self: bool) -> Vec<Node> {
        self.store.ancestors(node, include_self)
    }

    /// Titles from the top-level ancestor down to `node`.
    ///
    /// With `max_depth`, only the last `max_depth` entries are kept.
    pub fn breadcrumbs(&self, node: &Node, max_depth: Option<usize>, separator: &str) -> String {
        let mut trail = self.ancestors(node, true);
        if let Some(max) = max_depth {
            trail.truncate(max);
        }
        trail.iter().rev().map(|n| n.title.as_str()).join(separator)
    }

    /// Ids of every descendant of `node`, depth first in child order.
    ///
    /// Uses an explicit stack, so deep hierarchies do not grow the call stack.
    #[instrument(level = "debug", skip(self, node), fields(id = node.id))]
    pub fn descendant_ids(&self, node: &Node, method: ChildrenMethod) -> Vec<NodeId> {
        let mut ids = Vec::new();
        let mut stack: Vec<Node> = self.store.children(node, method).into_iter().rev().collect();

        while let Some(current) = stack.pop() {
            ids.push(current.id);
            let children = self.store.children(&current, method);
            stack.extend(children.into_iter().rev());
        }
        debug!("descendant_ids: {} descendants", ids.len());
        ids
    }

    /// Check that `node_id` may be moved below `new_parent`.
    pub fn validate_parent(&self, node_id: NodeId, new_parent: NodeId) -> ApplicationResult<()> {
        self.node(node_id)?;
        check_parent_chain(node_id, new_parent, |id| {
            self.store.get(id).map(|n| n.parent_id)
        })?;
        Ok(())
    }
}
