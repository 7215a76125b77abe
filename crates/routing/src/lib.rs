//! Route valuation, search, strategies, and the greedy allocator.
//!
//! This crate turns a batch of requested node pairs into reserved routes
//! over a [`qnet_topology::Topology`]:
//!
//! - `metric`: the distribution-propagating expected-chains valuation
//! - `search`: generalized (distribution-labelled) and scalar route search
//! - `strategy`: the closed set of routing strategies behind one trait
//! - `allocator`: greedy global allocation plus the fallback pass
//! - `recovery`: pre-provisioned detours for primary routes
//!
//! # Design Philosophy
//!
//! Candidate discovery is pure with respect to the topology: strategies read
//! reservation state but never mutate it, so the allocator can fan scoring
//! out over rayon and keep every commit single-threaded. All ranking uses
//! `f64::total_cmp` with id tie-breaks, so identical inputs always allocate
//! identically.

mod allocator;
mod config;
mod error;
mod metric;
mod recovery;
mod search;
mod strategy;

pub use allocator::{allocate, reserve_route, Allocation, MajorRoute, RouteOrigin};
pub use config::{EngineConfig, WidthOrder};
pub use error::RoutingError;
pub use metric::{expected_chains_on_path, SuccessDistribution};
pub use recovery::{plan_recovery, RecoveryRoute};
pub use search::{best_expected_route, cheapest_route, shortest_path_over};
pub use strategy::{
    BotCap, CreationRate, GreedyHop, MaxExpectedChains, MultiMetric, PickedRoute,
    RoutingStrategy, SumDist, SwapPolicy,
};
