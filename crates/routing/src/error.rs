//! Error types for the routing crate.

use qnet_topology::{Edge, TopologyError};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RoutingError {
    #[error(transparent)]
    Topology(#[from] TopologyError),

    /// A picked route no longer has the bundle members its candidate search
    /// saw. The allocator commits sequentially, so this indicates a logic
    /// error rather than a race.
    #[error("edge {edge} has {free} free links, route needs {width}")]
    InsufficientWidth { edge: Edge, free: usize, width: usize },
}
