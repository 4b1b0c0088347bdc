//! Hierarchy node entity as seen by the marking engine.
//!
//! Nodes are owned by a [`HierarchyStore`](crate::infrastructure::traits::HierarchyStore);
//! the marking engine only ever reads clones of them.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a node. `0` marks a node without a persisted identity.
pub type NodeId = u64;

/// Id shared by every non-persisted node, most notably the virtual root.
pub const VIRTUAL_ROOT_ID: NodeId = 0;

/// Kind reported by [`Node::virtual_root`].
pub const VIRTUAL_ROOT_KIND: &str = "Root";

/// Plain value of a node field.
///
/// Serializes to a bare JSON scalar or array, so field values never reach
/// rendered output wrapped in an object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum FieldValue {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<FieldValue>),
}

impl FieldValue {
    /// Loose equality used by marking filters.
    ///
    /// Values of the same variant compare directly. Scalars of different
    /// variants compare by their string form, so `Text("3")` matches `Int(3)`.
    pub fn loosely_equals(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (FieldValue::List(a), FieldValue::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
            }
            (FieldValue::List(_), _) | (_, FieldValue::List(_)) => false,
            (a, b) if std::mem::discriminant(a) == std::mem::discriminant(b) => a == b,
            (a, b) => a.to_string() == b.to_string(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::List(items) => {
                let parts: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

/// A node of a content hierarchy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Persisted identifier, `0` if the node has none
    #[serde(default)]
    pub id: NodeId,
    /// Parent identifier, `0` for top-level nodes
    #[serde(default, rename = "parent")]
    pub parent_id: NodeId,
    #[serde(default)]
    pub title: String,
    /// Type name, used for `hide_from_hierarchy` and CSS classes
    #[serde(default = "default_kind")]
    pub kind: String,
    /// Position among siblings
    #[serde(default)]
    pub sort: i64,
    /// Soft-deleted nodes are only visible to "including deleted" strategies
    #[serde(default)]
    pub deleted: bool,
    #[serde(default = "default_true")]
    pub show_in_menus: bool,
    /// Domain fields available to marking filters and serializers
    #[serde(default)]
    pub fields: BTreeMap<String, FieldValue>,
}

fn default_kind() -> String {
    "Page".to_string()
}

fn default_true() -> bool {
    true
}

impl Node {
    pub fn new(id: NodeId, parent_id: NodeId, title: impl Into<String>) -> Self {
        Self {
            id,
            parent_id,
            title: title.into(),
            kind: default_kind(),
            sort: 0,
            deleted: false,
            show_in_menus: true,
            fields: BTreeMap::new(),
        }
    }

    /// Placeholder used to seed a traversal over all top-level nodes.
    pub fn virtual_root() -> Self {
        Self {
            kind: VIRTUAL_ROOT_KIND.to_string(),
            ..Self::new(VIRTUAL_ROOT_ID, VIRTUAL_ROOT_ID, "")
        }
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = kind.into();
        self
    }

    pub fn with_sort(mut self, sort: i64) -> Self {
        self.sort = sort;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn deleted(mut self) -> Self {
        self.deleted = true;
        self
    }

    pub fn hidden_from_menus(mut self) -> Self {
        self.show_in_menus = false;
        self
    }

    /// Whether the node carries a persisted identifier.
    pub fn is_persisted(&self) -> bool {
        self.id != VIRTUAL_ROOT_ID
    }

    /// Key used for mark bookkeeping. Non-persisted nodes all share key `0`.
    pub fn mark_key(&self) -> NodeId {
        self.id
    }

    /// Resolve a field by name.
    ///
    /// Built-in attributes take precedence over custom `fields`; unknown names
    /// resolve to [`FieldValue::Null`].
    pub fn field(&self, name: &str) -> FieldValue {
        match name {
            "ID" | "id" => FieldValue::Int(self.id as i64),
            "ParentID" | "parent" => FieldValue::Int(self.parent_id as i64),
            "Title" | "title" => FieldValue::Text(self.title.clone()),
            "ClassName" | "Kind" | "kind" => FieldValue::Text(self.kind.clone()),
            "Sort" | "sort" => FieldValue::Int(self.sort),
            "Deleted" | "deleted" => FieldValue::Bool(self.deleted),
            "ShowInMenus" | "show_in_menus" => FieldValue::Bool(self.show_in_menus),
            other => self.fields.get(other).cloned().unwrap_or_default(),
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_persisted() {
            write!(f, "{} (#{})", self.title, self.id)
        } else {
            write!(f, "{}", VIRTUAL_ROOT_KIND)
        }
    }
}
