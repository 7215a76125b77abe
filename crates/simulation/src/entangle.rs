//! Elementary-link trials and entanglement swapping.

use crate::entropy::EntropySource;
use crate::error::SimulationError;
use qnet_topology::{LinkId, NodeId, Topology};
use tracing::{debug, trace};

/// Run one Bernoulli(p) trial per reserved link, in link-id order so a
/// seeded entropy source replays identically. Returns the success count.
pub fn run_link_trials(
    topo: &mut Topology,
    entropy: &mut dyn EntropySource,
) -> Result<usize, SimulationError> {
    let reserved: Vec<(LinkId, f64)> = topo
        .links()
        .iter()
        .filter(|l| l.reserved())
        .map(|l| (l.id(), l.p()))
        .collect();
    let mut successes = 0;
    for (id, p) in reserved {
        let entangled = entropy.bernoulli(p);
        topo.record_trial(id, entangled)?;
        if entangled {
            successes += 1;
        }
    }
    debug!(successes, "link trials complete");
    Ok(successes)
}

/// Attempt entanglement swapping along `path` at the given width.
///
/// At each interior node, up to `width` entangled unconsumed links toward
/// the previous node are paired with as many toward the next, in id order.
/// Each pair runs one Bernoulli(q) trial; success registers an internal
/// connection at the node. Returns the number of successful swaps.
pub fn swap_along(
    topo: &mut Topology,
    path: &[NodeId],
    width: usize,
    entropy: &mut dyn EntropySource,
) -> Result<usize, SimulationError> {
    let q = topo.q();
    let mut successes = 0;
    for hop in path.windows(3).map(|w| (w[0], w[1], w[2])) {
        let (prev, node, next) = hop;
        let toward = |topo: &Topology, other: NodeId| -> Vec<LinkId> {
            topo.links_between(node, other)
                .filter(|l| l.reserved() && l.entangled() && !l.swapped_at(node))
                .map(|l| l.id())
                .take(width)
                .collect()
        };
        let left = toward(topo, prev);
        let right = toward(topo, next);
        for (l, r) in left.into_iter().zip(right) {
            topo.consume_for_swap(l, node)?;
            topo.consume_for_swap(r, node)?;
            if entropy.bernoulli(q) {
                topo.register_internal_connection(node, l, r)?;
                successes += 1;
                trace!(%node, left = %l, right = %r, "swap succeeded");
            } else {
                trace!(%node, left = %l, right = %r, "swap failed");
            }
        }
    }
    Ok(successes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::ScriptedEntropy;
    use qnet_topology::{LinkSpec, NodeSpec, TopologySpec};

    fn line(n: usize, capacity: usize, bundle: usize) -> Topology {
        let spec = TopologySpec {
            alpha: 0.01,
            q: 1.0,
            k: 3,
            nodes: (0..n)
                .map(|i| NodeSpec { capacity, loc: [i as f64 * 10.0, 0.0] })
                .collect(),
            links: (0..n - 1)
                .map(|i| LinkSpec { a: i, b: i + 1, bundle })
                .collect(),
        };
        Topology::build(&spec).expect("valid spec")
    }

    #[test]
    fn trials_touch_only_reserved_links() {
        let mut topo = line(3, 2, 1);
        topo.reserve(LinkId(0)).expect("reserve");
        let mut entropy = ScriptedEntropy::new([0.0, 0.0]);
        let successes = run_link_trials(&mut topo, &mut entropy).expect("trials");
        assert_eq!(successes, 1);
        assert!(topo.link(LinkId(0)).entangled());
        // The unreserved link drew nothing and stays untouched.
        assert!(!topo.link(LinkId(1)).entangled());
    }

    #[test]
    fn swap_joins_adjacent_entangled_links() {
        let mut topo = line(3, 2, 1);
        topo.reserve(LinkId(0)).expect("reserve");
        topo.reserve(LinkId(1)).expect("reserve");
        let mut entropy = ScriptedEntropy::new([0.0, 0.0, 0.0]);
        run_link_trials(&mut topo, &mut entropy).expect("trials");

        let path = vec![NodeId(0), NodeId(1), NodeId(2)];
        let swaps = swap_along(&mut topo, &path, 1, &mut entropy).expect("swap");
        assert_eq!(swaps, 1);
        assert_eq!(
            topo.established_chains(NodeId(0), NodeId(2)),
            vec![vec![NodeId(0), NodeId(1), NodeId(2)]]
        );
    }

    #[test]
    fn failed_elementary_trial_blocks_the_swap() {
        let mut topo = line(3, 2, 1);
        topo.reserve(LinkId(0)).expect("reserve");
        topo.reserve(LinkId(1)).expect("reserve");
        // First link succeeds, second fails.
        let mut entropy = ScriptedEntropy::new([0.0, 1.0]);
        run_link_trials(&mut topo, &mut entropy).expect("trials");

        let path = vec![NodeId(0), NodeId(1), NodeId(2)];
        let swaps = swap_along(&mut topo, &path, 1, &mut entropy).expect("swap");
        assert_eq!(swaps, 0);
        assert!(topo.established_chains(NodeId(0), NodeId(2)).is_empty());
        // No link end was consumed, since no pair formed.
        assert!(!topo.link(LinkId(0)).swapped());
    }

    #[test]
    fn width_two_swaps_pair_in_id_order() {
        let mut topo = line(3, 4, 2);
        for id in 0..4 {
            topo.reserve(LinkId(id)).expect("reserve");
        }
        let mut entropy = ScriptedEntropy::new(vec![0.0; 6]);
        run_link_trials(&mut topo, &mut entropy).expect("trials");

        let path = vec![NodeId(0), NodeId(1), NodeId(2)];
        let swaps = swap_along(&mut topo, &path, 2, &mut entropy).expect("swap");
        assert_eq!(swaps, 2);
        assert_eq!(topo.established_chains(NodeId(0), NodeId(2)).len(), 2);
    }
}
