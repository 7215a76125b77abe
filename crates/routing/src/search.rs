//! Route search over the current reservation state.
//!
//! Two search modes share one eligibility rule:
//!
//! - the generalized search ([`best_expected_route`]) carries a full
//!   [`SuccessDistribution`] per frontier label and maximizes the implied
//!   expected-chains scalar; greedy finalization is sound because folding a
//!   hop never increases the expectation,
//! - the scalar search ([`cheapest_route`]) is ordinary Dijkstra over a
//!   caller-supplied per-edge cost, minimizing and exiting early at the
//!   destination.
//!
//! Eligibility at width `w`: an edge needs at least `w` unreserved bundle
//! members, interior nodes at least `2w` free qubits, and the endpoints at
//! least `w` each.

use crate::metric::SuccessDistribution;
use qnet_topology::{Edge, NodeId, Path, Topology};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

/// Max-heap entry ordered by score, ties broken toward the smaller node id
/// so the search is deterministic.
struct Frontier {
    score: f64,
    node: NodeId,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| other.node.cmp(&self.node))
    }
}

/// Eligible neighbor lists for a search at width `w`: for every usable edge,
/// both directions annotated with the bundle's per-attempt success
/// probability.
fn eligible_adjacency(
    topo: &Topology,
    src: NodeId,
    dst: NodeId,
    width: usize,
) -> Vec<Vec<(NodeId, f64)>> {
    let mut adjacency = vec![Vec::new(); topo.node_count()];
    for e in topo.edges() {
        let free = topo
            .links_between(e.a, e.b)
            .filter(|l| !l.reserved())
            .count();
        if free < width {
            continue;
        }
        // Interior nodes spend two qubits per chain passing through.
        let blocked = |n: NodeId| n != src && n != dst && topo.node(n).remaining() < 2 * width;
        if blocked(e.a) || blocked(e.b) {
            continue;
        }
        let Some(link) = topo.links_between(e.a, e.b).next() else {
            continue;
        };
        let p = link.p();
        adjacency[e.a.0].push((e.b, p));
        adjacency[e.b.0].push((e.a, p));
    }
    adjacency
}

fn endpoints_feasible(topo: &Topology, src: NodeId, dst: NodeId, width: usize) -> bool {
    src != dst
        && width > 0
        && topo.node(src).remaining() >= width
        && topo.node(dst).remaining() >= width
}

fn reconstruct(prev: &[Option<NodeId>], src: NodeId, dst: NodeId) -> Option<Path> {
    let mut path = vec![dst];
    let mut current = dst;
    while current != src {
        current = prev[current.0]?;
        path.push(current);
    }
    path.reverse();
    Some(path)
}

/// Best route from `src` to `dst` at width `width` under the expected-chains
/// metric, over unreserved capacity only. Returns the path and its score, or
/// `None` when no eligible route exists.
pub fn best_expected_route(
    topo: &Topology,
    src: NodeId,
    dst: NodeId,
    width: usize,
) -> Option<(Path, f64)> {
    if !endpoints_feasible(topo, src, dst, width) {
        return None;
    }
    let adjacency = eligible_adjacency(topo, src, dst, width);
    let q = topo.q();
    let n = topo.node_count();

    // Per-node best label: the folded distribution, hop count, and score.
    let mut label: Vec<Option<(SuccessDistribution, usize, f64)>> = vec![None; n];
    let mut prev: Vec<Option<NodeId>> = vec![None; n];
    let mut finalized = vec![false; n];
    let mut heap = BinaryHeap::new();
    heap.push(Frontier { score: f64::INFINITY, node: src });

    while let Some(Frontier { node, .. }) = heap.pop() {
        if finalized[node.0] {
            continue;
        }
        finalized[node.0] = true;
        if node == dst {
            let (_, _, score) = label[node.0].as_ref()?;
            let score = *score;
            return reconstruct(&prev, src, dst).map(|p| (p, score));
        }
        for &(next, p) in &adjacency[node.0] {
            if finalized[next.0] {
                continue;
            }
            let (dist, hops) = if node == src {
                (SuccessDistribution::single_hop(width, p), 1)
            } else {
                match label[node.0].as_ref() {
                    Some((d, h, _)) => (d.fold_hop(p), h + 1),
                    None => continue,
                }
            };
            let score = dist.expected_chains(q, hops);
            let improves = match label[next.0].as_ref() {
                Some((_, _, best)) => score > *best,
                None => true,
            };
            if improves {
                label[next.0] = Some((dist, hops, score));
                prev[next.0] = Some(node);
                heap.push(Frontier { score, node: next });
            }
        }
    }
    None
}

/// Cheapest route from `src` to `dst` at width `width` under a per-edge
/// cost, over unreserved capacity only. Returns the path and its total cost.
pub fn cheapest_route(
    topo: &Topology,
    src: NodeId,
    dst: NodeId,
    width: usize,
    cost: impl Fn(&Topology, Edge) -> f64,
) -> Option<(Path, f64)> {
    if !endpoints_feasible(topo, src, dst, width) {
        return None;
    }
    let adjacency = eligible_adjacency(topo, src, dst, width);
    let n = topo.node_count();

    let mut dist: Vec<f64> = vec![f64::INFINITY; n];
    let mut prev: Vec<Option<NodeId>> = vec![None; n];
    let mut finalized = vec![false; n];
    let mut heap = BinaryHeap::new();
    dist[src.0] = 0.0;
    // Negated cost turns the max-heap into a min-heap.
    heap.push(Frontier { score: 0.0, node: src });

    while let Some(Frontier { node, .. }) = heap.pop() {
        if finalized[node.0] {
            continue;
        }
        finalized[node.0] = true;
        if node == dst {
            return reconstruct(&prev, src, dst).map(|p| (p, dist[dst.0]));
        }
        for &(next, _) in &adjacency[node.0] {
            if finalized[next.0] {
                continue;
            }
            let candidate = dist[node.0] + cost(topo, Edge::new(node, next));
            if candidate < dist[next.0] {
                dist[next.0] = candidate;
                prev[next.0] = Some(node);
                heap.push(Frontier { score: -candidate, node: next });
            }
        }
    }
    None
}

/// Unit-cost shortest path over an explicit edge multiset, independent of
/// the topology's reservation state. Used for splicing repaired routes.
pub fn shortest_path_over(edges: &[Edge], src: NodeId, dst: NodeId) -> Option<Path> {
    if src == dst {
        return Some(vec![src]);
    }
    let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    let mut distinct: HashSet<Edge> = HashSet::new();
    for &e in edges {
        if distinct.insert(e) {
            adjacency.entry(e.a).or_default().push(e.b);
            adjacency.entry(e.b).or_default().push(e.a);
        }
    }
    for list in adjacency.values_mut() {
        list.sort();
    }

    let mut prev: HashMap<NodeId, NodeId> = HashMap::new();
    let mut queue = VecDeque::from([src]);
    while let Some(u) = queue.pop_front() {
        if u == dst {
            let mut path = vec![dst];
            let mut current = dst;
            while current != src {
                current = *prev.get(&current)?;
                path.push(current);
            }
            path.reverse();
            return Some(path);
        }
        let Some(neighbors) = adjacency.get(&u) else {
            continue;
        };
        for &v in neighbors {
            if v != src && !prev.contains_key(&v) {
                prev.insert(v, u);
                queue.push_back(v);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use qnet_topology::{LinkId, LinkSpec, NodeSpec, TopologySpec};

    // A square with one long detour: 0-1-3 short, 0-2-3 long.
    fn square() -> Topology {
        let spec = TopologySpec {
            alpha: 0.05,
            q: 0.9,
            k: 3,
            nodes: vec![
                NodeSpec { capacity: 4, loc: [0.0, 0.0] },
                NodeSpec { capacity: 4, loc: [10.0, 0.0] },
                NodeSpec { capacity: 4, loc: [0.0, 40.0] },
                NodeSpec { capacity: 4, loc: [10.0, 10.0] },
            ],
            links: vec![
                LinkSpec { a: 0, b: 1, bundle: 2 },
                LinkSpec { a: 1, b: 3, bundle: 2 },
                LinkSpec { a: 0, b: 2, bundle: 2 },
                LinkSpec { a: 2, b: 3, bundle: 2 },
            ],
        };
        Topology::build(&spec).expect("valid spec")
    }

    #[test]
    fn expected_route_prefers_short_links() {
        let topo = square();
        let (path, score) = best_expected_route(&topo, NodeId(0), NodeId(3), 2)
            .expect("route exists");
        assert_eq!(path, vec![NodeId(0), NodeId(1), NodeId(3)]);
        assert!(score > 0.0);
    }

    #[test]
    fn expected_route_respects_reservations() {
        let mut topo = square();
        // Exhaust the 0-1 bundle: the detour is all that is left.
        topo.reserve(LinkId(0)).expect("reserve");
        topo.reserve(LinkId(1)).expect("reserve");
        let (path, _) = best_expected_route(&topo, NodeId(0), NodeId(3), 1)
            .expect("detour exists");
        assert_eq!(path, vec![NodeId(0), NodeId(2), NodeId(3)]);
        // One more reservation on the detour leaves nothing at width 2.
        topo.reserve(LinkId(4)).expect("reserve");
        assert!(best_expected_route(&topo, NodeId(0), NodeId(3), 2).is_none());
    }

    #[test]
    fn interior_capacity_blocks_wide_routes() {
        let spec = TopologySpec {
            alpha: 0.05,
            q: 0.9,
            k: 3,
            nodes: vec![
                NodeSpec { capacity: 4, loc: [0.0, 0.0] },
                // Interior node with 3 qubits: supports width 1, not 2.
                NodeSpec { capacity: 3, loc: [10.0, 0.0] },
                NodeSpec { capacity: 4, loc: [20.0, 0.0] },
            ],
            links: vec![
                LinkSpec { a: 0, b: 1, bundle: 2 },
                LinkSpec { a: 1, b: 2, bundle: 2 },
            ],
        };
        let topo = Topology::build(&spec).expect("valid spec");
        assert!(best_expected_route(&topo, NodeId(0), NodeId(2), 1).is_some());
        assert!(best_expected_route(&topo, NodeId(0), NodeId(2), 2).is_none());
    }

    #[test]
    fn cheapest_route_minimizes_length() {
        let topo = square();
        let (path, cost) = cheapest_route(&topo, NodeId(0), NodeId(3), 1, |t, e| {
            t.distance(e.a, e.b)
        })
        .expect("route exists");
        assert_eq!(path, vec![NodeId(0), NodeId(1), NodeId(3)]);
        let direct = topo.distance(NodeId(0), NodeId(1)) + topo.distance(NodeId(1), NodeId(3));
        assert!((cost - direct).abs() < 1e-9);
    }

    #[test]
    fn shortest_path_over_explicit_edges() {
        let edges = vec![
            Edge::new(NodeId(0), NodeId(1)),
            Edge::new(NodeId(1), NodeId(2)),
            Edge::new(NodeId(0), NodeId(3)),
            Edge::new(NodeId(3), NodeId(2)),
            Edge::new(NodeId(0), NodeId(2)),
        ];
        let path = shortest_path_over(&edges, NodeId(0), NodeId(2)).expect("connected");
        assert_eq!(path, vec![NodeId(0), NodeId(2)]);
        assert!(shortest_path_over(&edges, NodeId(0), NodeId(9)).is_none());
    }
}
