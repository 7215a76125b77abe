//! Batch reports: everything an external consumer needs to reconstruct a
//! run offline.

use qnet_routing::RouteOrigin;
use qnet_topology::{NodeId, Path};
use serde::{Deserialize, Serialize};

/// Usage of one provisioned recovery route across a major route's copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryUsage {
    /// Path-index span of the owning route this detour can replace.
    pub span: (usize, usize),
    pub hops: usize,
    /// Copies this route could serve when provisioned.
    pub width: usize,
    /// Entangled width along the detour after the trials, before repair:
    /// the minimum per-hop count of reserved links that survived.
    pub available: usize,
    /// Copies that actually spliced it in.
    pub taken: usize,
}

/// Outcome of one major route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteReport {
    pub pair: (NodeId, NodeId),
    pub path: Path,
    pub width: usize,
    pub origin: RouteOrigin,
    /// End-to-end chains this route's copies established.
    pub established: usize,
    pub recovery: Vec<RecoveryUsage>,
}

/// Outcome of one requested pair: every complete chain, as node sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairOutcome {
    pub pair: (NodeId, NodeId),
    pub chains: Vec<Path>,
}

/// Batch-wide counters, for quick aggregation across many runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStats {
    pub routes_picked: usize,
    pub links_reserved: usize,
    pub trials_succeeded: usize,
    pub recovery_planned: usize,
    pub recovery_taken: usize,
    pub chains_established: usize,
}

/// Full record of one batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub strategy: String,
    pub seed: u64,
    pub pairs: Vec<PairOutcome>,
    pub routes: Vec<RouteReport>,
    pub stats: BatchStats,
}

impl BatchReport {
    /// Total chains established across all requested pairs.
    pub fn total_chains(&self) -> usize {
        self.pairs.iter().map(|p| p.chains.len()).sum()
    }

    /// Requested pairs that got at least one chain.
    pub fn served_pairs(&self) -> usize {
        self.pairs.iter().filter(|p| !p.chains.is_empty()).count()
    }
}
