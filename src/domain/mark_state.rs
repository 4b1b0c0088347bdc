//! Per-traversal marking bookkeeping.

use std::collections::{HashMap, HashSet};

use crate::domain::{Node, NodeId};

/// Records which nodes a partial-tree pass has marked, expanded and opened.
///
/// Every `mark_*` call also marks the node, so a node can never be expanded
/// or opened without being marked. Entries are only ever removed by
/// [`MarkState::clear`].
///
/// Nodes without a persisted id share key `0`: only one such node can be
/// tracked per state.
#[derive(Debug, Clone, Default)]
pub struct MarkState {
    marked: HashMap<NodeId, Node>,
    order: Vec<NodeId>,
    expanded: HashSet<NodeId>,
    tree_opened: HashSet<NodeId>,
}

impl MarkState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.marked.clear();
        self.order.clear();
        self.expanded.clear();
        self.tree_opened.clear();
    }

    fn mark(&mut self, node: &Node) -> NodeId {
        let key = node.mark_key();
        if self.marked.insert(key, node.clone()).is_none() {
            self.order.push(key);
        }
        key
    }

    /// Mark the node and flag its children as enumerated.
    pub fn mark_expanded(&mut self, node: &Node) {
        let key = self.mark(node);
        self.expanded.insert(key);
    }

    /// Mark the node, leaving its children to a later lazy load.
    pub fn mark_unexpanded(&mut self, node: &Node) {
        let key = self.mark(node);
        self.expanded.remove(&key);
    }

    /// Mark the node and render its subtree open.
    pub fn mark_opened(&mut self, node: &Node) {
        let key = self.mark(node);
        self.tree_opened.insert(key);
    }

    /// Mark the node and render its subtree closed.
    pub fn mark_closed(&mut self, node: &Node) {
        let key = self.mark(node);
        self.tree_opened.remove(&key);
    }

    pub fn is_marked(&self, id: NodeId) -> bool {
        self.marked.contains_key(&id)
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn is_tree_opened(&self, id: NodeId) -> bool {
        self.tree_opened.contains(&id)
    }

    /// Snapshot of the node stored when it was marked.
    pub fn marked_node(&self, id: NodeId) -> Option<&Node> {
        self.marked.get(&id)
    }

    /// Marked ids in the order they were first marked.
    pub fn marked_ids(&self) -> &[NodeId] {
        &self.order
    }

    /// Marked id at `position` in marking order.
    pub fn marked_id_at(&self, position: usize) -> Option<NodeId> {
        self.order.get(position).copied()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
