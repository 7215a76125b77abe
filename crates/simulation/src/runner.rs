//! The batch runner: one object owning topology, strategy, configuration,
//! and entropy, executing request batches end to end.

use crate::entangle::{run_link_trials, swap_along};
use crate::entropy::{EntropySource, SeededEntropy};
use crate::error::SimulationError;
use crate::repair::repair_and_swap;
use crate::report::{BatchReport, BatchStats, PairOutcome, RecoveryUsage, RouteReport};
use qnet_routing::{
    allocate, plan_recovery, EngineConfig, RecoveryRoute, RouteOrigin, RoutingStrategy,
    SwapPolicy,
};
use qnet_topology::{NodeId, Topology};
use rayon::prelude::*;
use std::collections::HashSet;
use tracing::info;

/// Executes request batches over an exclusively owned topology.
///
/// A batch is fully determined by (topology, requests, strategy, config,
/// seed): allocation is deterministic and every probabilistic trial draws
/// from the runner's entropy source in a fixed order.
pub struct BatchRunner<'a> {
    topo: Topology,
    strategy: &'a dyn RoutingStrategy,
    config: EngineConfig,
    entropy: Box<dyn EntropySource>,
    seed: u64,
}

impl<'a> BatchRunner<'a> {
    pub fn new(
        topo: Topology,
        strategy: &'a dyn RoutingStrategy,
        config: EngineConfig,
        seed: u64,
    ) -> Self {
        Self {
            topo,
            strategy,
            config,
            entropy: Box::new(SeededEntropy::new(seed)),
            seed,
        }
    }

    /// A runner with an injected entropy source, for forced-outcome tests.
    /// The report's seed field is 0.
    pub fn with_entropy(
        topo: Topology,
        strategy: &'a dyn RoutingStrategy,
        config: EngineConfig,
        entropy: Box<dyn EntropySource>,
    ) -> Self {
        Self { topo, strategy, config, entropy, seed: 0 }
    }

    pub fn topology(&self) -> &Topology {
        &self.topo
    }

    /// Run one batch of requested pairs.
    ///
    /// The topology must be clean; the runner errors rather than repairs.
    /// On success all reservations and run state are cleared again, so
    /// batches can be chained on one runner.
    pub fn run_batch(
        &mut self,
        pairs: &[(NodeId, NodeId)],
    ) -> Result<BatchReport, SimulationError> {
        if !self.topo.is_clean() {
            return Err(SimulationError::UncleanTopology);
        }
        for &(src, dst) in pairs {
            self.topo.get_node(src)?;
            self.topo.get_node(dst)?;
        }

        let allocation = allocate(&mut self.topo, pairs, self.strategy, &self.config)?;
        let repairing =
            self.strategy.swap_policy() == SwapPolicy::Repair && self.config.allow_recovery;
        let recovery = if repairing {
            plan_recovery(&mut self.topo, &allocation.major, self.strategy, &self.config)?
        } else {
            Vec::new()
        };

        let trials_succeeded = run_link_trials(&mut self.topo, self.entropy.as_mut())?;

        let mut stats = BatchStats {
            routes_picked: allocation.major.len(),
            links_reserved: self.topo.links().iter().filter(|l| l.reserved()).count(),
            trials_succeeded,
            recovery_planned: recovery.len(),
            ..BatchStats::default()
        };

        let mut routes = Vec::with_capacity(allocation.major.len());
        for (idx, route) in allocation.major.iter().enumerate() {
            let (established, usage) = if repairing && route.origin == RouteOrigin::Primary {
                let owned: Vec<&RecoveryRoute> =
                    recovery.iter().filter(|r| r.owner == idx).collect();
                let available: Vec<usize> = owned
                    .iter()
                    .map(|r| entangled_width(&self.topo, &r.path))
                    .collect();
                let outcome =
                    repair_and_swap(&mut self.topo, route, &owned, self.entropy.as_mut())?;
                stats.recovery_taken += outcome.taken.iter().sum::<usize>();
                let usage = owned
                    .iter()
                    .zip(outcome.taken.iter().zip(&available))
                    .map(|(r, (&taken, &available))| RecoveryUsage {
                        span: r.span,
                        hops: r.path.len() - 1,
                        width: r.width,
                        available,
                        taken,
                    })
                    .collect();
                (outcome.established, usage)
            } else {
                let (src, dst) = route.pair;
                let before = self.topo.established_chains(src, dst).len();
                swap_along(&mut self.topo, &route.path, route.width, self.entropy.as_mut())?;
                let after = self.topo.established_chains(src, dst).len();
                (after.saturating_sub(before), Vec::new())
            };
            routes.push(RouteReport {
                pair: route.pair,
                path: route.path.clone(),
                width: route.width,
                origin: route.origin,
                established,
                recovery: usage,
            });
        }

        let mut seen = HashSet::new();
        let mut outcomes = Vec::new();
        for &pair in pairs {
            if !seen.insert(pair) {
                continue;
            }
            let chains = self.topo.established_chains(pair.0, pair.1);
            outcomes.push(PairOutcome { pair, chains });
        }
        stats.chains_established = outcomes.iter().map(|p| p.chains.len()).sum();

        info!(
            strategy = self.strategy.name(),
            pairs = pairs.len(),
            routes = stats.routes_picked,
            links = stats.links_reserved,
            recovery_planned = stats.recovery_planned,
            recovery_taken = stats.recovery_taken,
            chains = stats.chains_established,
            "batch complete"
        );

        self.topo.clear_run_state();
        Ok(BatchReport {
            strategy: self.strategy.name().to_string(),
            seed: self.seed,
            pairs: outcomes,
            routes,
            stats,
        })
    }
}

/// Width a detour can still deliver after the trials: the minimum per-hop
/// count of reserved links that came up entangled.
fn entangled_width(topo: &Topology, path: &[NodeId]) -> usize {
    path.windows(2)
        .map(|hop| {
            topo.links_between(hop[0], hop[1])
                .filter(|l| l.reserved() && l.entangled())
                .count()
        })
        .min()
        .unwrap_or(0)
}

/// Run `batches` independent batches in parallel, one deep-cloned topology
/// per batch, seeded `seed, seed+1, …` so the set is reproducible yet the
/// batches differ.
pub fn run_batches(
    topo: &Topology,
    strategy: &dyn RoutingStrategy,
    config: EngineConfig,
    pairs: &[(NodeId, NodeId)],
    seed: u64,
    batches: usize,
) -> Result<Vec<BatchReport>, SimulationError> {
    (0..batches)
        .into_par_iter()
        .map(|i| {
            let mut runner =
                BatchRunner::new(topo.clone(), strategy, config, seed.wrapping_add(i as u64));
            runner.run_batch(pairs)
        })
        .collect()
}
