//! Entanglement simulation: trials, swapping, repair, and the batch runner.
//!
//! The crate executes what `qnet-routing` allocated:
//!
//! - `entropy`: the injectable randomness boundary behind [`EntropySource`]
//! - `entangle`: elementary-link trials and swap execution
//! - `repair`: splicing provisioned recovery routes over broken segments
//! - `runner`: the [`BatchRunner`] tying allocation, trials, and swapping
//!   together, plus the parallel multi-batch driver
//! - `report`: serializable batch reports and counters
//!
//! # Design Philosophy
//!
//! Determinism first: trials run in link-id order, swaps pair links in id
//! order, and all randomness flows through one seeded source per batch, so
//! a report is reproducible from (topology, requests, strategy, config,
//! seed). Across batches, each batch owns a deep clone of the topology and
//! runs fully independently.

mod entangle;
mod entropy;
mod error;
mod repair;
mod report;
mod runner;

pub use entangle::{run_link_trials, swap_along};
pub use entropy::{EntropySource, ScriptedEntropy, SeededEntropy};
pub use error::SimulationError;
pub use repair::{repair_and_swap, RepairOutcome};
pub use report::{BatchReport, BatchStats, PairOutcome, RecoveryUsage, RouteReport};
pub use runner::{run_batches, BatchRunner};
