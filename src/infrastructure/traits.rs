//! I/O boundary traits for testability
//!
//! These traits abstract the hierarchical store and the filesystem, allowing
//! services to be tested with in-memory implementations.

use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::Path;
use std::str::FromStr;

use crate::domain::{DomainError, Node, NodeId, VIRTUAL_ROOT_ID};

/// Strategy used to enumerate the children of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ChildrenMethod {
    /// Every child, soft-deleted ones included
    #[default]
    AllChildrenIncludingDeleted,
    /// Every child that is not soft-deleted
    AllChildren,
    /// Children that are not soft-deleted and are shown in menus
    Children,
}

impl ChildrenMethod {
    pub fn name(&self) -> &'static str {
        match self {
            ChildrenMethod::AllChildrenIncludingDeleted => "AllChildrenIncludingDeleted",
            ChildrenMethod::AllChildren => "AllChildren",
            ChildrenMethod::Children => "Children",
        }
    }

    /// Whether `node` is visible through this strategy.
    pub fn includes(&self, node: &Node) -> bool {
        match self {
            ChildrenMethod::AllChildrenIncludingDeleted => true,
            ChildrenMethod::AllChildren => !node.deleted,
            ChildrenMethod::Children => !node.deleted && node.show_in_menus,
        }
    }
}

impl fmt::Display for ChildrenMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChildrenMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_method_name(s).as_str() {
            "allchildrenincludingdeleted" => Ok(ChildrenMethod::AllChildrenIncludingDeleted),
            "allchildren" => Ok(ChildrenMethod::AllChildren),
            "children" => Ok(ChildrenMethod::Children),
            _ => Err(DomainError::UnknownChildrenMethod(s.to_string())),
        }
    }
}

/// Strategy used to count the children of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CountMethod {
    /// Children that are not soft-deleted
    #[default]
    NumChildren,
    /// All children, soft-deleted ones included
    NumHistoricalChildren,
}

impl CountMethod {
    pub fn name(&self) -> &'static str {
        match self {
            CountMethod::NumChildren => "numChildren",
            CountMethod::NumHistoricalChildren => "numHistoricalChildren",
        }
    }

    pub fn includes(&self, node: &Node) -> bool {
        match self {
            CountMethod::NumChildren => !node.deleted,
            CountMethod::NumHistoricalChildren => true,
        }
    }
}

impl fmt::Display for CountMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CountMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalize_method_name(s).as_str() {
            "numchildren" => Ok(CountMethod::NumChildren),
            "numhistoricalchildren" => Ok(CountMethod::NumHistoricalChildren),
            _ => Err(DomainError::UnknownCountMethod(s.to_string())),
        }
    }
}

/// `AllChildren`, `all_children` and `all-children` name the same method.
fn normalize_method_name(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

/// Hierarchical object store the marking engine reads from.
///
/// Implementations own the nodes; callers receive clones. Missing data is
/// reported as empty collections or `None`, never as an error.
pub trait HierarchyStore: Send + Sync {
    /// Look up a persisted node.
    fn get(&self, id: NodeId) -> Option<Node>;

    /// Direct children of `node`, ordered. The virtual root yields the top-level nodes.
    fn children(&self, node: &Node, method: ChildrenMethod) -> Vec<Node>;

    /// Number of direct children of `node`, without fetching them.
    fn child_count(&self, node: &Node, method: CountMethod) -> usize;

    /// Whether nodes of `kind` take part in a hierarchy at all.
    fn supports_hierarchy(&self, _kind: &str) -> bool {
        true
    }

    fn supports_children_method(&self, _method: ChildrenMethod) -> bool {
        true
    }

    fn supports_count_method(&self, _method: CountMethod) -> bool {
        true
    }

    /// Parent of `node`, `None` for top-level nodes and the virtual root.
    fn parent(&self, node: &Node) -> Option<Node> {
        if node.parent_id == VIRTUAL_ROOT_ID {
            return None;
        }
        self.get(node.parent_id)
    }

    /// Ancestors of `node`, closest first.
    fn ancestors(&self, node: &Node, include_self: bool) -> Vec<Node> {
        let mut result = Vec::new();
        let mut seen = HashSet::new();
        if include_self {
            seen.insert(node.id);
            result.push(node.clone());
        }
        let mut current = self.parent(node);
        while let Some(parent) = current {
            if !seen.insert(parent.id) {
                break;
            }
            current = self.parent(&parent);
            result.push(parent);
        }
        result
    }
}

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Check if path is a directory.
    fn is_dir(&self, path: &Path) -> bool;
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}
