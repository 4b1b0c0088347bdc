//! View model produced by walking a marked partial tree.

use std::fmt;

use crate::domain::Node;

/// CSS class for nodes whose children have not been loaded yet.
pub const CLASS_UNEXPANDED: &str = "unexpanded";
/// CSS classes for nodes without children.
pub const CLASS_LEAF: &str = "jstree-leaf closed";
/// CSS class for expanded nodes shown open.
pub const CLASS_OPEN: &str = "jstree-open";
/// CSS classes for nodes with children shown closed.
pub const CLASS_CLOSED: &str = "jstree-closed closed";

/// Display state of a rendered node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeState {
    ExpandedOpen,
    ExpandedClosed,
    Unexpanded,
    Leaf,
}

impl fmt::Display for TreeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TreeState::ExpandedOpen => "open",
            TreeState::ExpandedClosed => "closed",
            TreeState::Unexpanded => "unexpanded",
            TreeState::Leaf => "leaf",
        };
        write!(f, "{}", s)
    }
}

/// One node of the rendered partial tree. Built fresh per render.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeViewNode {
    pub node: Node,
    pub marked: bool,
    pub expanded: bool,
    pub opened: bool,
    /// Distance from the render root (root = 0)
    pub depth: usize,
    /// Direct child count, `0` when the node is limited
    pub count: usize,
    /// Children were not enumerated because there are too many
    pub limited: bool,
    pub children: Vec<TreeViewNode>,
}

impl Drop for TreeViewNode {
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut view) = stack.pop() {
            stack.append(&mut view.children);
        }
    }
}

impl TreeViewNode {
    /// Whether the underlying node has children in the store.
    pub fn has_children(&self) -> bool {
        self.count > 0 || self.limited
    }

    pub fn state(&self) -> TreeState {
        if !self.has_children() {
            TreeState::Leaf
        } else if !self.expanded {
            TreeState::Unexpanded
        } else if self.opened {
            TreeState::ExpandedOpen
        } else {
            TreeState::ExpandedClosed
        }
    }

    /// Space separated marking classes for the tree widget.
    pub fn marking_classes(&self) -> String {
        marking_classes(self.expanded, self.opened, self.has_children())
    }

    /// Number of nodes in this view, including self.
    pub fn size(&self) -> usize {
        let mut size = 0;
        let mut stack = vec![self];
        while let Some(view) = stack.pop() {
            size += 1;
            stack.extend(view.children.iter());
        }
        size
    }
}

/// Marking classes from the raw marking flags.
pub fn marking_classes(expanded: bool, opened: bool, has_children: bool) -> String {
    let mut classes = Vec::with_capacity(2);
    if !expanded {
        classes.push(CLASS_UNEXPANDED);
    }
    if !has_children {
        classes.push(CLASS_LEAF);
    } else if opened {
        classes.push(CLASS_OPEN);
    } else {
        classes.push(CLASS_CLOSED);
    }
    classes.join(" ")
}
