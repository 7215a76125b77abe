//! Graph model for entanglement routing.
//!
//! This crate provides the foundational types for the routing engine:
//!
//! - [`Topology`]: nodes, parallel-link bundles, and the capacity counters
//! - [`Node`] / [`Link`]: per-element state (qubit counters, trial/swap flags)
//! - [`Edge`]: a canonical unordered node pair, the bundle-level view
//! - [`TopologySpec`]: the pre-parsed boundary form a topology is built from
//! - [`RouteCache`]: content-hash-keyed cache for structural path queries
//!
//! # Design Philosophy
//!
//! This crate is self-contained and does not depend on any other workspace
//! crates, making it the foundation layer. All graph state is arena-style:
//! nodes and links live in index-addressed vectors and are referred to by
//! [`NodeId`] / [`LinkId`] everywhere, so routes and reports are plain id
//! sequences that stay valid across clones of the topology.
//!
//! # Invariants
//!
//! Every node's remaining-qubit counter stays within `[0, capacity]` at all
//! times. Reserving a link atomically decrements both endpoint counters;
//! releasing restores them. Violations surface as [`TopologyError`] rather
//! than being silently repaired.

mod cache;
mod error;
mod graph;
mod ids;
mod link;
mod node;
mod spec;

pub use cache::RouteCache;
pub use error::TopologyError;
pub use graph::{Summary, Topology, TopologyStatistics};
pub use ids::{Edge, LinkId, NodeId, Path};
pub use link::Link;
pub use node::Node;
pub use spec::{LinkSpec, NodeSpec, TopologySpec};

/// Hop limit for exhaustive route discovery (see [`Topology::all_routes`]).
pub const ROUTE_DISCOVERY_HOP_LIMIT: usize = 15;

/// Compute the edges of a path: consecutive node pairs in canonical form.
pub fn path_edges(path: &[NodeId]) -> Vec<Edge> {
    path.windows(2).map(|w| Edge::new(w[0], w[1])).collect()
}
