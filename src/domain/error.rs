//! Domain-level errors (no external dependencies)

use thiserror::Error;

use crate::domain::NodeId;

/// Domain errors represent broken configuration or hierarchy invariants.
/// Absent data (no children, no parent) is never an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid marking filter: {0}")]
    MalformedFilter(String),

    #[error("{kind} does not support hierarchical relationships")]
    UnsupportedHierarchy { kind: String },

    #[error("can't find the method '{0}' for getting tree children")]
    UnknownChildrenMethod(String),

    #[error("can't find the method '{0}' for counting tree children")]
    UnknownCountMethod(String),

    #[error("store does not provide method '{method}' for {kind}")]
    UnsupportedMethod { method: String, kind: String },

    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("node id {0} is already taken")]
    DuplicateNode(NodeId),

    #[error("node id {0} is reserved for the virtual root")]
    ReservedId(NodeId),

    #[error("infinite loop found within the hierarchy at node {0}")]
    CycleDetected(NodeId),
}
