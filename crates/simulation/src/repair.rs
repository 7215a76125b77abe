//! Repair engine: splice provisioned recovery routes over broken segments,
//! then swap along the repaired path.
//!
//! A major route of width `w` is treated as `w` virtual copies, repaired
//! and swapped one at a time. Each copy re-reads the link flags, because
//! earlier copies consumed link ends and recovery width.

use crate::entangle::swap_along;
use crate::entropy::EntropySource;
use crate::error::SimulationError;
use qnet_routing::{shortest_path_over, MajorRoute, RecoveryRoute};
use qnet_topology::{path_edges, Edge, NodeId, Path, Topology};
use tracing::trace;

/// Outcome of repairing and swapping one major route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepairOutcome {
    /// End-to-end chains newly established by this route's copies.
    pub established: usize,
    /// Per recovery route (caller's order), how many copies spliced it in.
    pub taken: Vec<usize>,
}

/// Path segments `(i, i+1)` that still carry a reserved, unconsumed link
/// whose elementary trial failed.
fn broken_segments(topo: &Topology, path: &[NodeId]) -> Vec<usize> {
    (0..path.len() - 1)
        .filter(|&i| {
            topo.links_between(path[i], path[i + 1])
                .any(|l| l.reserved() && !l.swapped() && !l.entangled())
        })
        .collect()
}

/// Repair and swap every virtual copy of `route`.
///
/// `recovery` holds the routes provisioned for this major route. Cover
/// selection is greedy in path order over candidates sorted by span start
/// then span end; a candidate starting before the last repaired span's
/// end is skipped, and a candidate whose span would re-cover a segment
/// already assigned to a different pick is abandoned. When a broken segment
/// ends up uncoverable the copy stops collecting, but whatever was picked
/// is still spliced and swapped.
pub fn repair_and_swap(
    topo: &mut Topology,
    route: &MajorRoute,
    recovery: &[&RecoveryRoute],
    entropy: &mut dyn EntropySource,
) -> Result<RepairOutcome, SimulationError> {
    let mut order: Vec<usize> = (0..recovery.len()).collect();
    order.sort_by_key(|&i| recovery[i].span);

    let mut available: Vec<usize> = recovery.iter().map(|r| r.width).collect();
    let mut outcome = RepairOutcome {
        established: 0,
        taken: vec![0; recovery.len()],
    };
    let (src, dst) = route.pair;

    for copy in 0..route.width {
        let broken = broken_segments(topo, &route.path);
        let picked = pick_cover(&broken, recovery, &order, &mut available);
        for &i in &picked {
            outcome.taken[i] += 1;
        }

        let spliced = splice(&route.path, recovery, &picked, src, dst);
        let before = topo.established_chains(src, dst).len();
        swap_along(topo, &spliced, 1, entropy)?;
        let after = topo.established_chains(src, dst).len();
        outcome.established += after.saturating_sub(before);
        trace!(
            copy,
            broken = broken.len(),
            repairs = picked.len(),
            established = after.saturating_sub(before),
            "repaired copy"
        );
    }
    Ok(outcome)
}

/// Greedy cover of `broken` segments by recovery routes, in path order.
fn pick_cover(
    broken: &[usize],
    recovery: &[&RecoveryRoute],
    order: &[usize],
    available: &mut [usize],
) -> Vec<usize> {
    let mut picked: Vec<usize> = Vec::new();
    let mut last_end = 0usize;

    'segments: for &seg in broken {
        if picked.iter().any(|&i| recovery[i].covers(seg)) {
            continue;
        }
        for &i in order {
            let r = recovery[i];
            if available[i] == 0 || !r.covers(seg) || r.span.0 < last_end {
                continue;
            }
            // Taking this candidate must not re-cover a segment another
            // pick already owns.
            let conflict = broken.iter().any(|&other| {
                r.covers(other)
                    && picked
                        .iter()
                        .any(|&p| p != i && recovery[p].covers(other))
            });
            if conflict {
                continue;
            }
            available[i] -= 1;
            last_end = r.span.1;
            picked.push(i);
            continue 'segments;
        }
        // Unrepairable segment: keep what was picked, stop collecting.
        break;
    }
    picked
}

/// Splice the picked recovery routes into the major path by edge-set
/// algebra: drop the covered span's edges, add the recovery edges, and
/// re-derive the concrete path with a unit-cost search.
fn splice(
    path: &[NodeId],
    recovery: &[&RecoveryRoute],
    picked: &[usize],
    src: NodeId,
    dst: NodeId,
) -> Path {
    let mut current: Path = path.to_vec();
    for &i in picked {
        let r = recovery[i];
        let Some(first) = r.path.first().copied() else {
            continue;
        };
        let Some(last) = r.path.last().copied() else {
            continue;
        };
        let Some(start) = current.iter().position(|&n| n == first) else {
            continue;
        };
        let Some(end) = current.iter().rposition(|&n| n == last) else {
            continue;
        };
        if start >= end {
            continue;
        }
        let covered: Vec<Edge> = path_edges(&current[start..=end]);
        let mut edges: Vec<Edge> = path_edges(&current)
            .into_iter()
            .filter(|e| !covered.contains(e))
            .collect();
        edges.extend(path_edges(&r.path));
        if let Some(next) = shortest_path_over(&edges, src, dst) {
            current = next;
        }
    }
    current
}
