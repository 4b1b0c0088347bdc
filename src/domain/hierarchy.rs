//! Structural rules shared by every hierarchy store.

use std::collections::HashSet;

use crate::domain::{DomainError, NodeId, VIRTUAL_ROOT_ID};

/// Check that `node_id` may be placed below `new_parent`.
///
/// Walks the parent chain upwards from `new_parent` using `parent_of`, which
/// returns the parent id of a known node or `None` for an unknown one.
/// Fails if the chain reaches `node_id` (the move would create a loop) or
/// runs into a node the store does not know.
pub fn check_parent_chain(
    node_id: NodeId,
    new_parent: NodeId,
    parent_of: impl Fn(NodeId) -> Option<NodeId>,
) -> Result<(), DomainError> {
    let mut visited = HashSet::new();
    let mut current = new_parent;

    while current != VIRTUAL_ROOT_ID {
        if current == node_id {
            return Err(DomainError::CycleDetected(node_id));
        }
        if !visited.insert(current) {
            // chain already loops without passing through node_id
            return Err(DomainError::CycleDetected(current));
        }
        current = parent_of(current).ok_or(DomainError::NodeNotFound(current))?;
    }
    Ok(())
}
