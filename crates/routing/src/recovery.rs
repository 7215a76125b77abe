//! Recovery-path planner: provision detours for primary major routes before
//! any trial runs.
//!
//! For every segment of a primary route up to the recovery horizon `k`, the
//! planner asks the strategy for a candidate between the segment endpoints
//! over whatever capacity the major allocation left behind, and reserves it
//! on the spot. Each recovery route remembers the index span of the major
//! path it can replace; the repair engine matches broken segments against
//! those spans after the trials.

use crate::allocator::{reserve_route, MajorRoute, RouteOrigin};
use crate::config::EngineConfig;
use crate::error::RoutingError;
use crate::strategy::RoutingStrategy;
use qnet_topology::{Path, Topology};
use tracing::{debug, trace};

/// A reserved detour for one primary major route.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryRoute {
    /// Index of the owning route in the allocation's major list.
    pub owner: usize,
    pub path: Path,
    pub width: usize,
    /// Path-index span `(start, end)` of the owner this route can replace.
    pub span: (usize, usize),
}

impl RecoveryRoute {
    /// Whether this route can replace the broken segment `(i, i + 1)`.
    pub fn covers(&self, segment: usize) -> bool {
        self.span.0 <= segment && segment + 1 <= self.span.1
    }
}

/// Plan and reserve recovery routes for every primary major route.
///
/// Fallback routes get none; they were already scraped from leftover
/// capacity. Returns the empty plan when recovery is disabled.
pub fn plan_recovery(
    topo: &mut Topology,
    major: &[MajorRoute],
    strategy: &dyn RoutingStrategy,
    config: &EngineConfig,
) -> Result<Vec<RecoveryRoute>, RoutingError> {
    if !config.allow_recovery {
        return Ok(Vec::new());
    }
    let horizon = topo.k();
    let mut planned = Vec::new();

    for (owner, route) in major.iter().enumerate() {
        if route.origin != RouteOrigin::Primary {
            continue;
        }
        let len = route.path.len();
        for span_len in 1..=horizon {
            if span_len >= len {
                break;
            }
            for start in 0..=(len - 1 - span_len) {
                let end = start + span_len;
                let (src, dst) = (route.path[start], route.path[end]);
                let Some(candidate) = strategy.candidate(topo, src, dst, config.width_order)
                else {
                    continue;
                };
                reserve_route(topo, &candidate.path, candidate.width)?;
                trace!(
                    owner,
                    start,
                    end,
                    width = candidate.width,
                    hops = candidate.path.len() - 1,
                    "provisioned recovery route"
                );
                planned.push(RecoveryRoute {
                    owner,
                    path: candidate.path,
                    width: candidate.width,
                    span: (start, end),
                });
            }
        }
    }

    debug!(
        routes = major.len(),
        recovery = planned.len(),
        "recovery planning complete"
    );
    Ok(planned)
}
