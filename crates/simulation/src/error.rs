//! Error types for the simulation crate.

use qnet_routing::RoutingError;
use qnet_topology::TopologyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimulationError {
    /// The topology carried leftover state from a previous batch. Callers
    /// own cleanup; the runner refuses to repair silently.
    #[error("topology is not clean at batch start")]
    UncleanTopology,

    #[error(transparent)]
    Topology(#[from] TopologyError),

    #[error(transparent)]
    Routing(#[from] RoutingError),
}
