//! Partial tree marking
//!
//! Decides which part of a (possibly huge) hierarchy is shown in a single
//! tree render. A bounded breadth-first pass marks nodes until a node-count
//! threshold is passed; nodes with more children than a cap are left closed
//! so the UI can load them on demand via [`PartialTreeBuilder::mark_by_id`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, instrument, trace};

use crate::application::services::subtree::SubtreeRenderer;
use crate::application::ApplicationResult;
use crate::domain::{DomainError, FieldValue, MarkState, MarkingFilter, Node, NodeId};
use crate::infrastructure::traits::{ChildrenMethod, CountMethod, HierarchyStore};

/// Default soft bound on the number of nodes marked by one pass.
pub const DEFAULT_NODE_THRESHOLD_TOTAL: usize = 50;
/// Default cap on the children enumerated for a single node.
pub const DEFAULT_NODE_THRESHOLD_LEAF: usize = 250;

/// Tunables of a marking pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkingOptions {
    pub children_method: ChildrenMethod,
    pub count_method: CountMethod,
    /// Soft bound on marked nodes, `0` disables it
    pub node_count_threshold: usize,
    /// Nodes with more children than this are not expanded
    pub max_child_nodes: usize,
    pub limiting_enabled: bool,
}

impl Default for MarkingOptions {
    fn default() -> Self {
        Self {
            children_method: ChildrenMethod::default(),
            count_method: CountMethod::default(),
            node_count_threshold: DEFAULT_NODE_THRESHOLD_TOTAL,
            max_child_nodes: DEFAULT_NODE_THRESHOLD_LEAF,
            limiting_enabled: true,
        }
    }
}

/// Builds the marked partial tree below a root node.
///
/// One builder serves one render pass. It exclusively owns its
/// [`MarkState`] and a per-pass cache of child counts.
pub struct PartialTreeBuilder {
    store: Arc<dyn HierarchyStore>,
    root: Node,
    options: MarkingOptions,
    filter: MarkingFilter,
    state: MarkState,
    child_counts: RefCell<HashMap<NodeId, usize>>,
}

impl PartialTreeBuilder {
    /// Create a builder over `root`.
    ///
    /// Fails when the store cannot treat `root` as part of a hierarchy or does
    /// not provide the configured children / count methods.
    pub fn new(
        store: Arc<dyn HierarchyStore>,
        root: Node,
        options: MarkingOptions,
    ) -> ApplicationResult<Self> {
        if !store.supports_hierarchy(&root.kind) {
            return Err(DomainError::UnsupportedHierarchy {
                kind: root.kind.clone(),
            }
            .into());
        }
        if !store.supports_children_method(options.children_method) {
            return Err(DomainError::UnsupportedMethod {
                method: options.children_method.to_string(),
                kind: root.kind.clone(),
            }
            .into());
        }
        if !store.supports_count_method(options.count_method) {
            return Err(DomainError::UnsupportedMethod {
                method: options.count_method.to_string(),
                kind: root.kind.clone(),
            }
            .into());
        }

        Ok(Self {
            store,
            root,
            options,
            filter: MarkingFilter::None,
            state: MarkState::new(),
            child_counts: RefCell::new(HashMap::new()),
        })
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn options(&self) -> &MarkingOptions {
        &self.options
    }

    pub fn state(&self) -> &MarkState {
        &self.state
    }

    pub fn store(&self) -> &Arc<dyn HierarchyStore> {
        &self.store
    }

    pub fn filter(&self) -> &MarkingFilter {
        &self.filter
    }

    /// Only mark children whose `field` equals one of `values`.
    ///
    /// Replaces any previously installed filter.
    pub fn set_marking_filter<I, V>(&mut self, field: impl Into<String>, values: I) -> &mut Self
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        self.filter = MarkingFilter::field_in(field, values);
        self
    }

    /// Only mark children for which `func` returns true.
    ///
    /// Replaces any previously installed filter.
    pub fn set_marking_filter_function(
        &mut self,
        func: impl Fn(&Node) -> bool + 'static,
    ) -> &mut Self {
        self.filter = MarkingFilter::predicate(func);
        self
    }

    pub fn set_filter(&mut self, filter: MarkingFilter) -> &mut Self {
        self.filter = filter;
        self
    }

    /// Turn the per-node child cap on or off.
    pub fn set_limiting_enabled(&mut self, enabled: bool) -> &mut Self {
        self.options.limiting_enabled = enabled;
        self
    }

    /// Mark the tree breadth-first from the root.
    ///
    /// Marked ids double as the work queue: every marked node is visited once
    /// in marking order. Once more than `node_count_threshold` nodes are
    /// marked, the children added by the node being processed are closed and
    /// the pass stops; that node itself stays expanded.
    #[instrument(level = "debug", skip(self), fields(root = self.root.id))]
    pub fn mark_partial_tree(&mut self) -> &mut Self {
        let threshold = self.options.node_count_threshold;
        self.state.clear();
        self.child_counts.borrow_mut().clear();

        let root = self.root.clone();
        self.state.mark_unexpanded(&root);

        let mut cursor = 0;
        while let Some(id) = self.state.marked_id_at(cursor) {
            cursor += 1;
            let Some(node) = self.state.marked_node(id).cloned() else {
                continue;
            };
            let children = self.mark_children(&node);
            if threshold > 0 && self.state.len() > threshold {
                debug!(
                    "mark_partial_tree: threshold {} passed at node {} with {} marked",
                    threshold,
                    node.id,
                    self.state.len()
                );
                // lazy loaded later
                for child in &children {
                    self.state.mark_closed(child);
                }
                break;
            }
        }
        debug!("mark_partial_tree: {} nodes marked", self.state.len());
        self
    }

    /// Expand `node` and mark its children that pass the filter.
    ///
    /// Returns the children just marked. A limited node is marked unexpanded
    /// and closed instead, and yields no children.
    #[instrument(level = "trace", skip(self, node), fields(id = node.id))]
    pub fn mark_children(&mut self, node: &Node) -> Vec<Node> {
        if self.is_node_limited(node, None) {
            trace!("mark_children: node {} is limited", node.id);
            self.state.mark_unexpanded(node);
            self.state.mark_closed(node);
            return Vec::new();
        }
        self.state.mark_expanded(node);

        let mut marked = Vec::new();
        for child in self.children_of(node) {
            if !self.filter.matches(&child) {
                continue;
            }
            if self.num_children(&child) > 0 && !self.state.is_expanded(child.mark_key()) {
                self.state.mark_unexpanded(&child);
            } else {
                self.state.mark_expanded(&child);
            }
            marked.push(child);
        }
        marked
    }

    /// Expand an already marked node on demand.
    ///
    /// Returns false, without touching any marks, if `id` was never marked.
    #[instrument(level = "debug", skip(self))]
    pub fn mark_by_id(&mut self, id: NodeId, open: bool) -> bool {
        let Some(node) = self.state.marked_node(id).cloned() else {
            debug!("mark_by_id: {} is not marked", id);
            return false;
        };
        self.mark_children(&node);
        if open {
            self.state.mark_opened(&node);
        }
        true
    }

    /// Expand and open every ancestor of `node`, root first, so it becomes visible.
    #[instrument(level = "debug", skip(self, node), fields(id = node.id))]
    pub fn mark_to_expose(&mut self, node: &Node) -> &mut Self {
        let mut stack = self.store.ancestors(node, true);
        stack.reverse();
        for ancestor in stack {
            self.mark_by_id(ancestor.mark_key(), true);
        }
        self
    }

    /// Ids marked so far, in marking order.
    pub fn marked_node_ids(&self) -> Vec<NodeId> {
        self.state.marked_ids().to_vec()
    }

    pub fn is_marked(&self, node: &Node) -> bool {
        self.state.is_marked(node.mark_key())
    }

    pub fn is_expanded(&self, node: &Node) -> bool {
        self.state.is_expanded(node.mark_key())
    }

    pub fn is_tree_opened(&self, node: &Node) -> bool {
        self.state.is_tree_opened(node.mark_key())
    }

    /// Whether `node` has too many children to enumerate.
    ///
    /// Nodes without a persisted id (the virtual root) are never limited.
    pub fn is_node_limited(&self, node: &Node, count: Option<usize>) -> bool {
        if !node.is_persisted() || !self.options.limiting_enabled {
            return false;
        }
        let count = count.unwrap_or_else(|| self.num_children(node));
        count > self.options.max_child_nodes
    }

    /// Child count through the configured count method, cached per pass.
    pub fn num_children(&self, node: &Node) -> usize {
        let key = node.mark_key();
        if let Some(count) = self.child_counts.borrow().get(&key) {
            return *count;
        }
        let count = self.store.child_count(node, self.options.count_method);
        self.child_counts.borrow_mut().insert(key, count);
        count
    }

    /// Children through the configured children method.
    pub fn children_of(&self, node: &Node) -> Vec<Node> {
        self.store.children(node, self.options.children_method)
    }

    /// Renderer over the current marks.
    pub fn renderer(&self) -> SubtreeRenderer<'_> {
        SubtreeRenderer::new(self)
    }
}

impl std::fmt::Debug for PartialTreeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PartialTreeBuilder")
            .field("root", &self.root)
            .field("options", &self.options)
            .field("filter", &self.filter)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
