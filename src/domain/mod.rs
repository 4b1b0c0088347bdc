//! Domain layer: entities and marking bookkeeping
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod error;
pub mod filter;
pub mod hierarchy;
pub mod mark_state;
pub mod node;
pub mod view;

pub use error::DomainError;
pub use filter::{MarkingFilter, NodePredicate};
pub use hierarchy::check_parent_chain;
pub use mark_state::MarkState;
pub use node::{FieldValue, Node, NodeId, VIRTUAL_ROOT_ID, VIRTUAL_ROOT_KIND};
pub use view::{marking_classes, TreeState, TreeViewNode};
