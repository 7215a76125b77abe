//! Pre-parsed boundary form of a topology description.
//!
//! File parsing and generation are owned by external collaborators; the
//! engine consumes the description in this already-structured form and
//! validates it when building a [`Topology`](crate::Topology).

use serde::{Deserialize, Serialize};

/// One node of the description: capacity and 2-D location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// Qubit capacity.
    pub capacity: usize,
    /// 2-D location, in the same distance unit `alpha` decays over.
    pub loc: [f64; 2],
}

/// One edge of the description: an endpoint pair and its bundle size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinkSpec {
    /// First endpoint, as an index into the node list.
    pub a: usize,
    /// Second endpoint, as an index into the node list.
    pub b: usize,
    /// Number of parallel links between the endpoints.
    pub bundle: usize,
}

/// A complete topology description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopologySpec {
    /// Distance-decay coefficient for elementary success probability:
    /// `p = exp(-alpha * length)`.
    pub alpha: f64,
    /// Swap success probability at intermediate nodes, in `[0, 1]`.
    pub q: f64,
    /// Recovery search horizon, in hops.
    pub k: usize,
    pub nodes: Vec<NodeSpec>,
    pub links: Vec<LinkSpec>,
}
