//! Error type for capacity and reservation invariants.

use crate::ids::{LinkId, NodeId};
use thiserror::Error;

/// Invariant violations and malformed inputs.
///
/// All variants except [`TopologyError::InvalidSpec`] indicate a
/// precondition breach by the caller: they are fatal to the current run and
/// are never silently corrected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// A node id does not exist in this topology.
    #[error("node {0} does not exist")]
    UnknownNode(NodeId),

    /// A link id does not exist in this topology.
    #[error("link {0} does not exist")]
    UnknownLink(LinkId),

    /// Attempted to reserve a link that is already reserved.
    #[error("link {0} is already reserved")]
    AlreadyReserved(LinkId),

    /// Attempted to release a link that is not reserved.
    #[error("link {0} is not reserved")]
    NotReserved(LinkId),

    /// Reserving would drive a node's remaining-qubit counter below zero.
    #[error("node {node} has no free qubits (capacity {capacity})")]
    CapacityExhausted { node: NodeId, capacity: usize },

    /// A link end was already consumed by a swap attempt at this node.
    #[error("link {link} already consumed in a swap at {node}")]
    AlreadySwapped { link: LinkId, node: NodeId },

    /// A swap was requested at a node that is not an endpoint of the link.
    #[error("{node} is not an endpoint of link {link}")]
    NotAnEndpoint { link: LinkId, node: NodeId },

    /// The topology description failed validation.
    #[error("invalid topology spec: {0}")]
    InvalidSpec(String),
}
