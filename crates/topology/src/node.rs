//! Per-node state: qubit counters and realized swap-connections.

use crate::ids::{LinkId, NodeId};

/// A network node holding a limited quantum-memory capacity.
///
/// The remaining-qubit counter is mutated only through the topology's
/// reserve/release operations, which keep it within `[0, capacity]`. The
/// internal-connection list records which link pairs were successfully
/// joined at this node during the current run; it is cleared at the start
/// of every run.
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    loc: [f64; 2],
    capacity: usize,
    pub(crate) remaining: usize,
    pub(crate) links: Vec<LinkId>,
    pub(crate) internal: Vec<(LinkId, LinkId)>,
}

impl Node {
    pub(crate) fn new(id: NodeId, loc: [f64; 2], capacity: usize) -> Self {
        Self {
            id,
            loc,
            capacity,
            remaining: capacity,
            links: Vec::new(),
            internal: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    /// 2-D location, in the same distance unit as link lengths.
    pub fn loc(&self) -> [f64; 2] {
        self.loc
    }

    /// Total qubit capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Qubits not currently committed to a reserved link.
    pub fn remaining(&self) -> usize {
        self.remaining
    }

    /// Incident links, in id order.
    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    /// Link pairs joined at this node by successful swaps this run.
    pub fn internal_connections(&self) -> &[(LinkId, LinkId)] {
        &self.internal
    }

    /// Euclidean distance to another location.
    pub fn distance_to(&self, other: &Node) -> f64 {
        let dx = self.loc[0] - other.loc[0];
        let dy = self.loc[1] - other.loc[1];
        (dx * dx + dy * dy).sqrt()
    }
}
