//! Routing strategies: how a candidate route is found for a pair and how
//! competing candidates are ranked.
//!
//! [`MaxExpectedChains`] is the reference strategy: it carries the full
//! success distribution through the search and supports recovery-path
//! repair. The scalar strategies trade valuation fidelity for speed; all of
//! them swap directly along their major routes without repair.

use crate::config::WidthOrder;
use crate::metric::expected_chains_on_path;
use crate::search::{best_expected_route, cheapest_route};
use qnet_topology::{Edge, NodeId, Path, Topology, ROUTE_DISCOVERY_HOP_LIMIT};
use std::cmp::Ordering;
use std::collections::HashSet;

/// How entanglement swapping is executed along a strategy's major routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapPolicy {
    /// Repair broken segments from provisioned recovery routes, then swap
    /// along the spliced path.
    Repair,
    /// Swap along the major route as allocated; failures are final.
    Direct,
}

/// A candidate route for one requested pair under the current reservations.
#[derive(Debug, Clone, PartialEq)]
pub struct PickedRoute {
    pub path: Path,
    pub width: usize,
    pub score: f64,
}

/// A routing strategy: candidate discovery plus candidate ranking.
///
/// Implementations must be pure with respect to the topology: `candidate`
/// reads reservation state but never mutates it, which is what lets the
/// allocator fan candidate scoring out over rayon.
pub trait RoutingStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// The best candidate this strategy can offer for `(src, dst)` given
    /// current reservations, or `None` when nothing eligible remains.
    fn candidate(
        &self,
        topo: &Topology,
        src: NodeId,
        dst: NodeId,
        order: WidthOrder,
    ) -> Option<PickedRoute>;

    /// Ranking between two candidates; `Greater` means `a` is preferred.
    fn preference(&self, a: &PickedRoute, b: &PickedRoute) -> Ordering {
        a.score.total_cmp(&b.score)
    }

    fn swap_policy(&self) -> SwapPolicy {
        SwapPolicy::Direct
    }
}

fn max_width(topo: &Topology, src: NodeId, dst: NodeId) -> usize {
    topo.node(src).remaining().min(topo.node(dst).remaining())
}

/// Maximize the expected number of end-to-end chains, full-distribution
/// valuation, repair-capable.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaxExpectedChains;

impl RoutingStrategy for MaxExpectedChains {
    fn name(&self) -> &'static str {
        "max-expected-chains"
    }

    fn candidate(
        &self,
        topo: &Topology,
        src: NodeId,
        dst: NodeId,
        order: WidthOrder,
    ) -> Option<PickedRoute> {
        let top = max_width(topo, src, dst);
        if top == 0 {
            return None;
        }
        let widths: Vec<usize> = match order {
            WidthOrder::Descending => (1..=top).rev().collect(),
            WidthOrder::Fixed => vec![top],
        };
        let mut best: Option<PickedRoute> = None;
        for w in widths {
            if let Some((path, score)) = best_expected_route(topo, src, dst, w) {
                if score <= 0.0 {
                    continue;
                }
                let replace = match &best {
                    Some(b) => score > b.score,
                    None => true,
                };
                if replace {
                    best = Some(PickedRoute { path, width: w, score });
                }
            }
        }
        best
    }

    fn swap_policy(&self) -> SwapPolicy {
        SwapPolicy::Repair
    }
}

/// Shared shape of the scalar strategies: find the cheapest path under a
/// per-edge cost with minimal eligibility, then take every width the path
/// supports right now.
fn scalar_candidate(
    topo: &Topology,
    src: NodeId,
    dst: NodeId,
    cost: impl Fn(&Topology, Edge) -> f64,
) -> Option<PickedRoute> {
    let (path, cost) = cheapest_route(topo, src, dst, 1, cost)?;
    let width = topo.width_between(&path);
    if width == 0 {
        return None;
    }
    Some(PickedRoute { path, width, score: -cost })
}

/// Minimize summed physical length, charging each interior node the
/// pseudo-length whose elementary success equals the swap success rate.
#[derive(Debug, Default, Clone, Copy)]
pub struct SumDist;

pub(crate) fn sum_dist_cost(topo: &Topology, e: Edge) -> f64 {
    topo.distance(e.a, e.b) + topo.internal_length()
}

impl RoutingStrategy for SumDist {
    fn name(&self) -> &'static str {
        "sum-dist"
    }

    fn candidate(
        &self,
        topo: &Topology,
        src: NodeId,
        dst: NodeId,
        _order: WidthOrder,
    ) -> Option<PickedRoute> {
        scalar_candidate(topo, src, dst, sum_dist_cost)
    }
}

/// Minimize the summed inverse creation rate, `exp(alpha · d)` per edge.
#[derive(Debug, Default, Clone, Copy)]
pub struct CreationRate;

impl RoutingStrategy for CreationRate {
    fn name(&self) -> &'static str {
        "creation-rate"
    }

    fn candidate(
        &self,
        topo: &Topology,
        src: NodeId,
        dst: NodeId,
        _order: WidthOrder,
    ) -> Option<PickedRoute> {
        scalar_candidate(topo, src, dst, |t, e| (t.alpha() * t.distance(e.a, e.b)).exp())
    }
}

/// SumDist candidates ranked by `log2(cost) - width`, with a heavy penalty
/// for width-1 routes. Smaller is better.
#[derive(Debug, Default, Clone, Copy)]
pub struct MultiMetric;

impl MultiMetric {
    fn figure(route: &PickedRoute) -> f64 {
        let cost = -route.score;
        let mut v = cost.log2() - route.width as f64;
        if route.width == 1 {
            v += 10_000.0;
        }
        v
    }
}

impl RoutingStrategy for MultiMetric {
    fn name(&self) -> &'static str {
        "multi-metric"
    }

    fn candidate(
        &self,
        topo: &Topology,
        src: NodeId,
        dst: NodeId,
        _order: WidthOrder,
    ) -> Option<PickedRoute> {
        scalar_candidate(topo, src, dst, sum_dist_cost)
    }

    fn preference(&self, a: &PickedRoute, b: &PickedRoute) -> Ordering {
        Self::figure(b).total_cmp(&Self::figure(a))
    }
}

/// SumDist candidates ranked widest-first, cheapest within a width.
#[derive(Debug, Default, Clone, Copy)]
pub struct BotCap;

impl RoutingStrategy for BotCap {
    fn name(&self) -> &'static str {
        "bot-cap"
    }

    fn candidate(
        &self,
        topo: &Topology,
        src: NodeId,
        dst: NodeId,
        _order: WidthOrder,
    ) -> Option<PickedRoute> {
        scalar_candidate(topo, src, dst, sum_dist_cost)
    }

    fn preference(&self, a: &PickedRoute, b: &PickedRoute) -> Ordering {
        a.width
            .cmp(&b.width)
            .then_with(|| a.score.total_cmp(&b.score))
    }
}

/// Greedy neighbor walk by cached hop distance. No global search at all;
/// each step moves to the free neighbor closest to the destination.
#[derive(Debug, Default, Clone, Copy)]
pub struct GreedyHop;

impl RoutingStrategy for GreedyHop {
    fn name(&self) -> &'static str {
        "greedy-hop"
    }

    fn candidate(
        &self,
        topo: &Topology,
        src: NodeId,
        dst: NodeId,
        _order: WidthOrder,
    ) -> Option<PickedRoute> {
        if src == dst {
            return None;
        }
        let mut path = vec![src];
        let mut seen: HashSet<NodeId> = HashSet::from([src]);
        let mut current = src;
        while current != dst {
            if path.len() > ROUTE_DISCOVERY_HOP_LIMIT {
                return None;
            }
            let step = topo
                .neighbors(current)
                .iter()
                .copied()
                .filter(|n| !seen.contains(n))
                .filter(|&n| topo.links_between(current, n).any(|l| !l.reserved()))
                .filter_map(|n| topo.hops_away(n, dst).map(|h| (h, n)))
                .min_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)))?;
            current = step.1;
            seen.insert(current);
            path.push(current);
        }
        let width = topo.width_between(&path);
        if width == 0 {
            return None;
        }
        let score = expected_chains_on_path(topo, &path, width);
        if score <= 0.0 {
            return None;
        }
        Some(PickedRoute { path, width, score })
    }
}
