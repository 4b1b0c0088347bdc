//! Arena-backed in-memory hierarchy store.

use std::collections::{HashMap, HashSet};

use generational_arena::{Arena, Index};
use tracing::{debug, instrument, trace};

use crate::domain::{check_parent_chain, DomainError, Node, NodeId, VIRTUAL_ROOT_ID};
use crate::infrastructure::traits::{ChildrenMethod, CountMethod, HierarchyStore};

/// Stored node plus the arena indices of its children.
#[derive(Debug)]
struct StoredNode {
    node: Node,
    children: Vec<Index>,
}

/// Hierarchy held entirely in memory.
///
/// Uses a generational arena for node storage with an id index on top.
/// Top-level nodes (parent `0`) are the children of the virtual root.
#[derive(Debug, Default)]
pub struct InMemoryHierarchy {
    arena: Arena<StoredNode>,
    index: HashMap<NodeId, Index>,
    top_level: Vec<Index>,
    /// Kinds excluded from every children listing and count
    hidden_kinds: HashSet<String>,
    /// Kinds that do not take part in the hierarchy
    flat_kinds: HashSet<String>,
}

impl InMemoryHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from nodes in any order.
    ///
    /// Children listed before their parent are inserted once the parent is
    /// known. Nodes whose parent never shows up fail with `NodeNotFound`.
    #[instrument(level = "debug", skip(nodes))]
    pub fn from_nodes(nodes: Vec<Node>) -> Result<Self, DomainError> {
        let mut store = Self::new();
        let mut pending = nodes;

        while !pending.is_empty() {
            let before = pending.len();
            let mut deferred = Vec::new();
            for node in pending {
                if node.parent_id == VIRTUAL_ROOT_ID || store.contains(node.parent_id) {
                    store.insert(node)?;
                } else {
                    deferred.push(node);
                }
            }
            if deferred.len() == before {
                // no progress: either a parent is missing or the rest forms a loop
                let waiting: HashSet<NodeId> = deferred.iter().map(|n| n.id).collect();
                return Err(match deferred.iter().find(|n| !waiting.contains(&n.parent_id)) {
                    Some(orphan) => DomainError::NodeNotFound(orphan.parent_id),
                    None => DomainError::CycleDetected(deferred[0].id),
                });
            }
            pending = deferred;
        }
        debug!("from_nodes: stored {} nodes", store.len());
        Ok(store)
    }

    pub fn with_hidden_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hidden_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_flat_kinds<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flat_kinds = kinds.into_iter().map(Into::into).collect();
        self
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    /// Insert a node below its (already stored) parent.
    #[instrument(level = "trace", skip(self, node), fields(id = node.id, parent = node.parent_id))]
    pub fn insert(&mut self, node: Node) -> Result<Index, DomainError> {
        if node.id == VIRTUAL_ROOT_ID {
            return Err(DomainError::ReservedId(node.id));
        }
        if self.index.contains_key(&node.id) {
            return Err(DomainError::DuplicateNode(node.id));
        }
        let parent_idx = self.parent_index(node.parent_id)?;

        let id = node.id;
        let idx = self.arena.insert(StoredNode {
            node,
            children: Vec::new(),
        });
        self.index.insert(id, idx);
        self.attach(idx, parent_idx);
        Ok(idx)
    }

    /// Move a stored node below `new_parent`, refusing moves that create a loop.
    #[instrument(level = "debug", skip(self))]
    pub fn reparent(&mut self, id: NodeId, new_parent: NodeId) -> Result<(), DomainError> {
        let idx = *self.index.get(&id).ok_or(DomainError::NodeNotFound(id))?;
        check_parent_chain(id, new_parent, |p| {
            self.index
                .get(&p)
                .and_then(|i| self.arena.get(*i))
                .map(|s| s.node.parent_id)
        })?;
        let new_parent_idx = self.parent_index(new_parent)?;

        let old_parent = self.arena[idx].node.parent_id;
        match self.parent_index(old_parent)? {
            Some(p) => self.arena[p].children.retain(|c| *c != idx),
            None => self.top_level.retain(|c| *c != idx),
        }
        self.arena[idx].node.parent_id = new_parent;
        self.attach(idx, new_parent_idx);
        trace!("reparent: {} moved from {} to {}", id, old_parent, new_parent);
        Ok(())
    }

    fn parent_index(&self, parent_id: NodeId) -> Result<Option<Index>, DomainError> {
        if parent_id == VIRTUAL_ROOT_ID {
            return Ok(None);
        }
        self.index
            .get(&parent_id)
            .copied()
            .map(Some)
            .ok_or(DomainError::NodeNotFound(parent_id))
    }

    fn attach(&mut self, idx: Index, parent_idx: Option<Index>) {
        match parent_idx {
            Some(p) => self.arena[p].children.push(idx),
            None => self.top_level.push(idx),
        }
    }

    /// Child indices of `node`, unknown nodes have none.
    fn child_indices(&self, node: &Node) -> &[Index] {
        if !node.is_persisted() {
            return &self.top_level;
        }
        self.index
            .get(&node.id)
            .and_then(|idx| self.arena.get(*idx))
            .map(|stored| stored.children.as_slice())
            .unwrap_or(&[])
    }

    fn visible_children<'a>(&'a self, node: &Node) -> impl Iterator<Item = &'a Node> + 'a {
        self.child_indices(node)
            .iter()
            .filter_map(|idx| self.arena.get(*idx))
            .map(|stored| &stored.node)
            .filter(|child| !self.hidden_kinds.contains(&child.kind))
    }
}

impl HierarchyStore for InMemoryHierarchy {
    fn get(&self, id: NodeId) -> Option<Node> {
        self.index
            .get(&id)
            .and_then(|idx| self.arena.get(*idx))
            .map(|stored| stored.node.clone())
    }

    #[instrument(level = "trace", skip(self, node), fields(id = node.id))]
    fn children(&self, node: &Node, method: ChildrenMethod) -> Vec<Node> {
        let mut children: Vec<Node> = self
            .visible_children(node)
            .filter(|child| method.includes(child))
            .cloned()
            .collect();
        children.sort_by_key(|c| (c.sort, c.id));
        children
    }

    #[instrument(level = "trace", skip(self, node), fields(id = node.id))]
    fn child_count(&self, node: &Node, method: CountMethod) -> usize {
        self.visible_children(node)
            .filter(|child| method.includes(child))
            .count()
    }

    fn supports_hierarchy(&self, kind: &str) -> bool {
        !self.flat_kinds.contains(kind)
    }
}
