//! Index-style identifiers for graph elements.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a node: its index in the topology's node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N#{}", self.0)
    }
}

/// Identifier of a link: its index in the topology's link arena.
///
/// Bundle members connecting the same node pair have consecutive ids in
/// construction order; id order is the deterministic tie-break whenever
/// links are picked from a bundle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LinkId(pub usize);

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L#{}", self.0)
    }
}

/// An ordered sequence of at least two distinct nodes.
pub type Path = Vec<NodeId>;

/// A canonical unordered node pair, the bundle-level view of parallel links.
///
/// `Edge::new` sorts the endpoints, so two edges compare equal regardless of
/// the order the endpoints were given in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Edge {
    pub a: NodeId,
    pub b: NodeId,
}

impl Edge {
    /// Create an edge with canonical endpoint order.
    pub fn new(n1: NodeId, n2: NodeId) -> Self {
        if n1 <= n2 {
            Self { a: n1, b: n2 }
        } else {
            Self { a: n2, b: n1 }
        }
    }

    /// Whether `n` is one of the endpoints.
    pub fn contains(&self, n: NodeId) -> bool {
        self.a == n || self.b == n
    }

    /// The endpoint that is not `n`.
    ///
    /// Returns `None` when `n` is not an endpoint of this edge.
    pub fn other_than(&self, n: NodeId) -> Option<NodeId> {
        if n == self.a {
            Some(self.b)
        } else if n == self.b {
            Some(self.a)
        } else {
            None
        }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.a, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edge_is_canonical() {
        let e1 = Edge::new(NodeId(3), NodeId(1));
        let e2 = Edge::new(NodeId(1), NodeId(3));
        assert_eq!(e1, e2);
        assert_eq!(e1.a, NodeId(1));
        assert_eq!(e1.b, NodeId(3));
    }

    #[test]
    fn edge_other_than() {
        let e = Edge::new(NodeId(0), NodeId(2));
        assert_eq!(e.other_than(NodeId(0)), Some(NodeId(2)));
        assert_eq!(e.other_than(NodeId(2)), Some(NodeId(0)));
        assert_eq!(e.other_than(NodeId(1)), None);
    }
}
