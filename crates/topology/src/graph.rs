//! The topology: owns nodes and links, enforces capacity invariants, and
//! answers structural queries.

use crate::cache::RouteCache;
use crate::error::TopologyError;
use crate::ids::{Edge, LinkId, NodeId, Path};
use crate::link::Link;
use crate::node::Node;
use crate::spec::TopologySpec;
use crate::ROUTE_DISCOVERY_HOP_LIMIT;
use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, trace};

/// Graph of nodes and parallel-link bundles with capacity counters.
///
/// A topology is structurally immutable after [`Topology::build`]: the node
/// and link sets never change, only the per-run flags and counters do. One
/// topology instance is exclusively owned by the batch operating on it;
/// concurrent batches must each clone their own copy.
#[derive(Debug)]
pub struct Topology {
    alpha: f64,
    q: f64,
    k: usize,
    nodes: Vec<Node>,
    links: Vec<Link>,
    /// Distinct node pairs, canonical order, sorted.
    edges: Vec<Edge>,
    /// Per-node neighbor lists, sorted.
    adjacency: Vec<Vec<NodeId>>,
    edge_hash: [u8; 32],
    cache: Mutex<RouteCache>,
}

impl Clone for Topology {
    fn clone(&self) -> Self {
        Self {
            alpha: self.alpha,
            q: self.q,
            k: self.k,
            nodes: self.nodes.clone(),
            links: self.links.clone(),
            edges: self.edges.clone(),
            adjacency: self.adjacency.clone(),
            edge_hash: self.edge_hash,
            cache: Mutex::new(RouteCache::new(self.edge_hash)),
        }
    }
}

/// Min/avg/max summary over one structural quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub avg: f64,
    pub max: f64,
}

fn summarize(values: impl Iterator<Item = f64>) -> Summary {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;
    let mut n = 0usize;
    for v in values {
        min = min.min(v);
        max = max.max(v);
        sum += v;
        n += 1;
    }
    if n == 0 {
        Summary { min: 0.0, avg: 0.0, max: 0.0 }
    } else {
        Summary { min, avg: sum / n as f64, max }
    }
}

/// Structural summary for external reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct TopologyStatistics {
    pub nodes: usize,
    pub links: usize,
    pub alpha: f64,
    pub q: f64,
    pub links_per_node: Summary,
    pub qubits_per_node: Summary,
    pub neighbors_per_node: Summary,
    pub link_length: Summary,
    pub link_success: Summary,
}

impl Topology {
    /// Build a topology from its pre-parsed description.
    ///
    /// Validates the description: endpoints must exist, self-loops and empty
    /// bundles are rejected, and `q` must be a probability.
    pub fn build(spec: &TopologySpec) -> Result<Self, TopologyError> {
        if !(0.0..=1.0).contains(&spec.q) {
            return Err(TopologyError::InvalidSpec(format!(
                "swap success rate q = {} is not a probability",
                spec.q
            )));
        }
        if spec.alpha < 0.0 {
            return Err(TopologyError::InvalidSpec(format!(
                "distance-decay alpha = {} is negative",
                spec.alpha
            )));
        }

        let mut nodes: Vec<Node> = spec
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| Node::new(NodeId(i), n.loc, n.capacity))
            .collect();

        let mut links = Vec::new();
        for ls in &spec.links {
            if ls.a == ls.b {
                return Err(TopologyError::InvalidSpec(format!(
                    "self-loop on node index {}",
                    ls.a
                )));
            }
            if ls.a >= nodes.len() || ls.b >= nodes.len() {
                return Err(TopologyError::InvalidSpec(format!(
                    "link endpoint {}-{} out of range ({} nodes)",
                    ls.a,
                    ls.b,
                    nodes.len()
                )));
            }
            if ls.bundle == 0 {
                return Err(TopologyError::InvalidSpec(format!(
                    "empty bundle between node indices {} and {}",
                    ls.a, ls.b
                )));
            }
            let (a, b) = if ls.a < ls.b { (ls.a, ls.b) } else { (ls.b, ls.a) };
            let length = nodes[a].distance_to(&nodes[b]);
            for _ in 0..ls.bundle {
                let id = LinkId(links.len());
                links.push(Link::new(id, NodeId(a), NodeId(b), length, spec.alpha));
                nodes[a].links.push(id);
                nodes[b].links.push(id);
            }
        }

        let mut edges: Vec<Edge> = links.iter().map(Link::edge).collect();
        edges.sort();
        edges.dedup();

        let mut adjacency = vec![Vec::new(); nodes.len()];
        for e in &edges {
            adjacency[e.a.0].push(e.b);
            adjacency[e.b.0].push(e.a);
        }
        for list in &mut adjacency {
            list.sort();
        }

        let edge_hash = hash_edges(&edges);

        debug!(
            nodes = nodes.len(),
            links = links.len(),
            alpha = spec.alpha,
            q = spec.q,
            k = spec.k,
            "built topology"
        );

        Ok(Self {
            alpha: spec.alpha,
            q: spec.q,
            k: spec.k,
            nodes,
            links,
            edges,
            adjacency,
            edge_hash,
            cache: Mutex::new(RouteCache::new(edge_hash)),
        })
    }

    /// The same structure under different physical parameters, with every
    /// link's elementary success probability re-derived. Used by parameter
    /// sweeps over one topology.
    pub fn with_parameters(mut self, alpha: f64, q: f64, k: usize) -> Self {
        self.alpha = alpha;
        self.q = q;
        self.k = k;
        for link in &mut self.links {
            link.p = (-alpha * link.length()).exp();
        }
        self
    }

    /// A copy with every bundle collapsed to its single lowest-id member.
    pub fn deduplicated(&self) -> Result<Self, TopologyError> {
        let spec = TopologySpec {
            alpha: self.alpha,
            q: self.q,
            k: self.k,
            nodes: self
                .nodes
                .iter()
                .map(|n| crate::spec::NodeSpec { capacity: n.capacity(), loc: n.loc() })
                .collect(),
            links: self
                .edges
                .iter()
                .map(|e| crate::spec::LinkSpec { a: e.a.0, b: e.b.0, bundle: 1 })
                .collect(),
        };
        Self::build(&spec)
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Swap success probability at intermediate nodes.
    pub fn q(&self) -> f64 {
        self.q
    }

    /// Recovery search horizon, in hops.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Pseudo-length charged per intermediate node by distance-based costs:
    /// `ln(1/q) / alpha`, the length whose elementary success probability
    /// equals the swap success rate.
    pub fn internal_length(&self) -> f64 {
        (1.0 / self.q).ln() / self.alpha
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    /// Distinct bundle-level edges, sorted.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn link(&self, id: LinkId) -> &Link {
        &self.links[id.0]
    }

    /// Checked node lookup for ids arriving from the boundary.
    pub fn get_node(&self, id: NodeId) -> Result<&Node, TopologyError> {
        self.nodes.get(id.0).ok_or(TopologyError::UnknownNode(id))
    }

    /// Neighbor nodes of `n`, sorted by id.
    pub fn neighbors(&self, n: NodeId) -> &[NodeId] {
        &self.adjacency[n.0]
    }

    /// The bundle members between two nodes, in id order.
    pub fn links_between(&self, a: NodeId, b: NodeId) -> impl Iterator<Item = &Link> + '_ {
        self.nodes[a.0]
            .links()
            .iter()
            .map(move |id| &self.links[id.0])
            .filter(move |l| l.touches(b))
    }

    /// Euclidean distance between two node locations.
    pub fn distance(&self, a: NodeId, b: NodeId) -> f64 {
        self.nodes[a.0].distance_to(&self.nodes[b.0])
    }

    // ─── Reservation ───────────────────────────────────────────────────────

    /// Commit one qubit at each endpoint of `link` to a route.
    ///
    /// Fails loudly if the link is already reserved or either endpoint has
    /// no free qubits; on failure nothing is mutated.
    pub fn reserve(&mut self, link: LinkId) -> Result<(), TopologyError> {
        let l = self.links.get(link.0).ok_or(TopologyError::UnknownLink(link))?;
        if l.reserved {
            return Err(TopologyError::AlreadyReserved(link));
        }
        let (a, b) = (l.edge().a, l.edge().b);
        for n in [a, b] {
            if self.nodes[n.0].remaining == 0 {
                return Err(TopologyError::CapacityExhausted {
                    node: n,
                    capacity: self.nodes[n.0].capacity(),
                });
            }
        }
        self.nodes[a.0].remaining -= 1;
        self.nodes[b.0].remaining -= 1;
        self.links[link.0].reserved = true;
        trace!(%link, %a, %b, "reserved link");
        Ok(())
    }

    /// Release a reserved link, restoring both endpoint counters.
    pub fn release(&mut self, link: LinkId) -> Result<(), TopologyError> {
        let l = self.links.get(link.0).ok_or(TopologyError::UnknownLink(link))?;
        if !l.reserved {
            return Err(TopologyError::NotReserved(link));
        }
        let (a, b) = (l.edge().a, l.edge().b);
        debug_assert!(self.nodes[a.0].remaining < self.nodes[a.0].capacity());
        debug_assert!(self.nodes[b.0].remaining < self.nodes[b.0].capacity());
        self.nodes[a.0].remaining += 1;
        self.nodes[b.0].remaining += 1;
        self.links[link.0].reserved = false;
        trace!(%link, %a, %b, "released link");
        Ok(())
    }

    /// Whether no link is reserved/entangled/swapped, no internal
    /// connections exist, and every counter is back at capacity.
    ///
    /// Callers must guarantee this before starting a batch; it is checked,
    /// not silently repaired.
    pub fn is_clean(&self) -> bool {
        self.links
            .iter()
            .all(|l| !l.reserved && !l.entangled && !l.swapped())
            && self
                .nodes
                .iter()
                .all(|n| n.internal.is_empty() && n.remaining == n.capacity())
    }

    /// Release every reservation and clear all trial/swap state, restoring
    /// the clean invariant after a batch.
    pub fn clear_run_state(&mut self) {
        for i in 0..self.links.len() {
            if self.links[i].reserved {
                let e = self.links[i].edge();
                self.nodes[e.a.0].remaining += 1;
                self.nodes[e.b.0].remaining += 1;
            }
            let l = &mut self.links[i];
            l.reserved = false;
            l.entangled = false;
            l.swapped_a = false;
            l.swapped_b = false;
        }
        for n in &mut self.nodes {
            n.internal.clear();
        }
        debug_assert!(self.is_clean());
    }

    // ─── Simulator hooks ───────────────────────────────────────────────────

    /// Record the outcome of one elementary trial on a link.
    pub fn record_trial(&mut self, link: LinkId, entangled: bool) -> Result<(), TopologyError> {
        let l = self.links.get_mut(link.0).ok_or(TopologyError::UnknownLink(link))?;
        l.entangled = entangled;
        Ok(())
    }

    /// Consume one link end for a swap attempt at `at`.
    ///
    /// Each link end may be consumed at most once per run; a second attempt
    /// is an invariant violation.
    pub fn consume_for_swap(&mut self, link: LinkId, at: NodeId) -> Result<(), TopologyError> {
        let l = self.links.get_mut(link.0).ok_or(TopologyError::UnknownLink(link))?;
        let e = l.edge();
        if at == e.a {
            if l.swapped_a {
                return Err(TopologyError::AlreadySwapped { link, node: at });
            }
            l.swapped_a = true;
        } else if at == e.b {
            if l.swapped_b {
                return Err(TopologyError::AlreadySwapped { link, node: at });
            }
            l.swapped_b = true;
        } else {
            return Err(TopologyError::NotAnEndpoint { link, node: at });
        }
        Ok(())
    }

    /// Register a successful swap at `at`, joining two links into one
    /// continuous segment for chain extraction.
    pub fn register_internal_connection(
        &mut self,
        at: NodeId,
        l1: LinkId,
        l2: LinkId,
    ) -> Result<(), TopologyError> {
        if !self.links.get(l1.0).is_some_and(|l| l.touches(at)) {
            return Err(TopologyError::NotAnEndpoint { link: l1, node: at });
        }
        if !self.links.get(l2.0).is_some_and(|l| l.touches(at)) {
            return Err(TopologyError::NotAnEndpoint { link: l2, node: at });
        }
        self.nodes[at.0].internal.push((l1, l2));
        Ok(())
    }

    // ─── Structural queries ────────────────────────────────────────────────

    /// Width available to a route over `path`: the minimum of the endpoint
    /// free qubits, half the interior free qubits (interior nodes pass
    /// through, consuming two qubits per chain), and the free bundle
    /// members on every edge.
    pub fn width_between(&self, path: &[NodeId]) -> usize {
        if path.len() < 2 {
            return 0;
        }
        let src = self.nodes[path[0].0].remaining();
        let dst = self.nodes[path[path.len() - 1].0].remaining();
        let interior = path[1..path.len() - 1]
            .iter()
            .map(|n| self.nodes[n.0].remaining() / 2)
            .min()
            .unwrap_or(usize::MAX);
        let bundle = path
            .windows(2)
            .map(|w| self.links_between(w[0], w[1]).filter(|l| !l.reserved()).count())
            .min()
            .unwrap_or(0);
        src.min(dst).min(interior).min(bundle)
    }

    /// The set of nodes reachable from `root` without the exploration stack
    /// growing deeper than `k + 1` nodes. Includes `root`.
    ///
    /// When `k` exceeds the configured horizon the whole connected graph is
    /// assumed in range and every node is returned.
    pub fn k_hop_neighborhood(&self, root: NodeId, k: usize) -> HashSet<NodeId> {
        if k > self.k {
            return self.nodes.iter().map(Node::id).collect();
        }
        let mut registered = vec![false; self.nodes.len()];
        registered[root.0] = true;
        self.explore_nodes(root, 1, k, &mut registered);
        registered
            .iter()
            .enumerate()
            .filter(|(_, r)| **r)
            .map(|(i, _)| NodeId(i))
            .collect()
    }

    fn explore_nodes(&self, current: NodeId, depth: usize, k: usize, registered: &mut [bool]) {
        if depth > k + 1 {
            return;
        }
        let unregistered: Vec<NodeId> = self.adjacency[current.0]
            .iter()
            .copied()
            .filter(|n| !registered[n.0])
            .collect();
        for n in unregistered {
            registered[n.0] = true;
            self.explore_nodes(n, depth + 1, k, registered);
        }
    }

    /// The links incident to the `k`-hop neighborhood of `root`.
    pub fn k_hop_links(&self, root: NodeId, k: usize) -> HashSet<LinkId> {
        let mut registered = vec![false; self.nodes.len()];
        registered[root.0] = true;
        let mut out = HashSet::new();
        self.explore_links(root, 1, k, &mut registered, &mut out);
        out
    }

    fn explore_links(
        &self,
        current: NodeId,
        depth: usize,
        k: usize,
        registered: &mut [bool],
        out: &mut HashSet<LinkId>,
    ) {
        out.extend(self.nodes[current.0].links().iter().copied());
        if depth > k + 1 {
            return;
        }
        let unregistered: Vec<NodeId> = self.adjacency[current.0]
            .iter()
            .copied()
            .filter(|n| !registered[n.0])
            .collect();
        for n in unregistered {
            registered[n.0] = true;
            self.explore_links(n, depth + 1, k, registered, out);
        }
    }

    // ─── Chain extraction ──────────────────────────────────────────────────

    /// Every complete end-to-end chain established between `src` and `dst`.
    ///
    /// Starting from each entangled link at `src` whose end there is still
    /// unconsumed, the walk follows registered internal connections hop by
    /// hop. A link end participates in at most one internal connection, so
    /// each start link yields at most one chain. Walks that revisit a node
    /// are discarded rather than reported.
    ///
    /// This is the authoritative measure of established entanglement; it
    /// reads flags only and mutates nothing.
    pub fn established_chains(&self, src: NodeId, dst: NodeId) -> Vec<Path> {
        let mut out = Vec::new();
        if src == dst {
            return out;
        }
        for &start in self.nodes[src.0].links() {
            let l = &self.links[start.0];
            if !l.entangled || l.swapped_at(src) {
                continue;
            }
            if let Some(path) = self.walk_chain(src, dst, start) {
                out.push(path);
            }
        }
        out
    }

    /// Follow one chain from `src` along `start`. Returns the node path when
    /// it terminates at `dst` with no revisited node.
    fn walk_chain(&self, src: NodeId, dst: NodeId, start: LinkId) -> Option<Path> {
        let mut path = vec![src];
        let mut seen: HashSet<NodeId> = HashSet::from([src]);
        let mut current = src;
        let mut incoming = start;

        loop {
            let next = self.links[incoming.0].other_end(current)?;
            if !seen.insert(next) {
                return None;
            }
            path.push(next);
            if next == dst {
                return Some(path);
            }
            // The continuation is the partner of `incoming` in the internal
            // connection registered at `next`, if any.
            let partner = self.nodes[next.0]
                .internal_connections()
                .iter()
                .find_map(|&(x, y)| {
                    if x == incoming {
                        Some(y)
                    } else if y == incoming {
                        Some(x)
                    } else {
                        None
                    }
                })?;
            current = next;
            incoming = partner;
        }
    }

    // ─── Cached structural queries ─────────────────────────────────────────

    fn cache_lock(&self) -> MutexGuard<'_, RouteCache> {
        let mut guard = match self.cache.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.validate(self.edge_hash);
        guard
    }

    /// Content hash of the distinct edge set, the route-cache key.
    pub fn edge_set_hash(&self) -> [u8; 32] {
        self.edge_hash
    }

    /// Drop all cached structural query results.
    pub fn invalidate_route_cache(&self) {
        let mut guard = match self.cache.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = RouteCache::new(self.edge_hash);
    }

    /// Hop distance between two nodes over the bundle-level edge set, or
    /// `None` when they are disconnected. Memoized per edge set.
    pub fn hops_away(&self, a: NodeId, b: NodeId) -> Option<usize> {
        let key = Edge::new(a, b);
        if let Some(hops) = self.cache_lock().hops.get(&key) {
            return *hops;
        }
        let hops = self.bfs_hops(key.a, key.b);
        self.cache_lock().hops.insert(key, hops);
        hops
    }

    fn bfs_hops(&self, a: NodeId, b: NodeId) -> Option<usize> {
        if a == b {
            return Some(0);
        }
        let mut dist = vec![usize::MAX; self.nodes.len()];
        dist[a.0] = 0;
        let mut queue = VecDeque::from([a]);
        while let Some(u) = queue.pop_front() {
            for &v in &self.adjacency[u.0] {
                if dist[v.0] == usize::MAX {
                    dist[v.0] = dist[u.0] + 1;
                    if v == b {
                        return Some(dist[v.0]);
                    }
                    queue.push_back(v);
                }
            }
        }
        None
    }

    /// Every simple route between two nodes within the discovery hop limit,
    /// restricted to the union of the endpoints' half-horizon neighborhoods.
    /// Memoized per edge set; results are ordered shortest-first, then by
    /// node ids, so the listing is deterministic.
    pub fn all_routes(&self, a: NodeId, b: NodeId) -> Vec<Path> {
        let key = Edge::new(a, b);
        if let Some(routes) = self.cache_lock().routes.get(&key) {
            let routes = routes.clone();
            return orient_routes(routes, a);
        }

        let (src, dst) = (key.a, key.b);
        let half = (ROUTE_DISCOVERY_HOP_LIMIT + 1) / 2;
        let mut range = self.k_hop_neighborhood(src, half);
        range.extend(self.k_hop_neighborhood(dst, half));

        let mut found = Vec::new();
        let mut remaining: HashSet<NodeId> =
            self.adjacency[dst.0].iter().copied().filter(|n| *n != src).collect();
        let mut current = vec![src];
        self.discover_routes(dst, &range, &mut current, &mut remaining, &mut found);

        found.sort_by(|x, y| x.len().cmp(&y.len()).then_with(|| x.cmp(y)));
        self.cache_lock().routes.insert(key, found.clone());
        orient_routes(found, a)
    }

    fn discover_routes(
        &self,
        dst: NodeId,
        range: &HashSet<NodeId>,
        current: &mut Path,
        remaining: &mut HashSet<NodeId>,
        found: &mut Vec<Path>,
    ) {
        let last = current[current.len() - 1];
        if last == dst {
            found.push(current.clone());
            return;
        }
        if current.len() > ROUTE_DISCOVERY_HOP_LIMIT {
            return;
        }
        for &next in &self.adjacency[last.0] {
            if !range.contains(&next) || current.contains(&next) || remaining.is_empty() {
                continue;
            }
            let removed = remaining.remove(&next);
            current.push(next);
            self.discover_routes(dst, range, current, remaining, found);
            current.pop();
            if removed {
                remaining.insert(next);
            }
        }
    }

    /// Structural summary for external reporting.
    pub fn statistics(&self) -> TopologyStatistics {
        TopologyStatistics {
            nodes: self.nodes.len(),
            links: self.links.len(),
            alpha: self.alpha,
            q: self.q,
            links_per_node: summarize(self.nodes.iter().map(|n| n.links().len() as f64)),
            qubits_per_node: summarize(self.nodes.iter().map(|n| n.capacity() as f64)),
            neighbors_per_node: summarize(
                self.adjacency.iter().map(|neighbors| neighbors.len() as f64),
            ),
            link_length: summarize(self.links.iter().map(Link::length)),
            link_success: summarize(self.links.iter().map(Link::p)),
        }
    }
}

/// Cached routes are stored oriented `key.a → key.b`; reverse when the
/// caller asked for the opposite direction.
fn orient_routes(routes: Vec<Path>, requested_src: NodeId) -> Vec<Path> {
    routes
        .into_iter()
        .map(|mut p| {
            if p.first() != Some(&requested_src) {
                p.reverse();
            }
            p
        })
        .collect()
}

fn hash_edges(edges: &[Edge]) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    for e in edges {
        hasher.update(&(e.a.0 as u64).to_le_bytes());
        hasher.update(&(e.b.0 as u64).to_le_bytes());
    }
    *hasher.finalize().as_bytes()
}
