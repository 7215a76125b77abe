//! End-to-end batch scenarios with forced trial outcomes.

use qnet_routing::{EngineConfig, MaxExpectedChains, RouteOrigin, SumDist};
use qnet_simulation::{BatchRunner, ScriptedEntropy};
use qnet_topology::{LinkSpec, NodeId, NodeSpec, Topology, TopologySpec};

fn build(spec: TopologySpec) -> Topology {
    Topology::build(&spec).expect("valid spec")
}

/// Two nodes joined by a width-3 bundle but only two qubits per node: node
/// capacity, not bundle size, caps the route at width 2, and both reserved
/// links count as chains without any swap.
#[test]
fn trivial_two_node_bundle_yields_two_chains() {
    let topo = build(TopologySpec {
        alpha: 0.01,
        q: 1.0,
        k: 2,
        nodes: vec![
            NodeSpec { capacity: 2, loc: [0.0, 0.0] },
            NodeSpec { capacity: 2, loc: [10.0, 0.0] },
        ],
        links: vec![LinkSpec { a: 0, b: 1, bundle: 3 }],
    });
    let entropy = ScriptedEntropy::new([0.0, 0.0]);
    let mut runner = BatchRunner::with_entropy(
        topo,
        &MaxExpectedChains,
        EngineConfig::default(),
        Box::new(entropy),
    );
    let report = runner
        .run_batch(&[(NodeId(0), NodeId(1))])
        .expect("batch runs");

    assert_eq!(report.total_chains(), 2);
    assert_eq!(report.pairs.len(), 1);
    assert_eq!(
        report.pairs[0].chains,
        vec![vec![NodeId(0), NodeId(1)], vec![NodeId(0), NodeId(1)]]
    );
    assert_eq!(report.stats.chains_established, 2);
    // The third bundle member stays untouched: capacity was the limit.
    assert_eq!(report.stats.links_reserved, 2);
    assert!(runner.topology().is_clean());
}

/// A pair in a different connected component gets no route; nothing is
/// reserved and the topology stays clean.
#[test]
fn unreachable_pair_leaves_topology_clean() {
    let topo = build(TopologySpec {
        alpha: 0.01,
        q: 0.9,
        k: 2,
        nodes: vec![
            NodeSpec { capacity: 2, loc: [0.0, 0.0] },
            NodeSpec { capacity: 2, loc: [10.0, 0.0] },
            NodeSpec { capacity: 2, loc: [80.0, 0.0] },
            NodeSpec { capacity: 2, loc: [90.0, 0.0] },
        ],
        links: vec![
            LinkSpec { a: 0, b: 1, bundle: 1 },
            LinkSpec { a: 2, b: 3, bundle: 1 },
        ],
    });
    let mut runner = BatchRunner::new(topo, &MaxExpectedChains, EngineConfig::default(), 11);
    let report = runner
        .run_batch(&[(NodeId(0), NodeId(3))])
        .expect("batch runs");

    assert_eq!(report.total_chains(), 0);
    assert!(report.routes.is_empty());
    assert_eq!(report.stats.links_reserved, 0);
    assert!(runner.topology().is_clean());
}

/// The middle hop of a three-hop route fails its trial; the provisioned
/// detour over node 4 repairs the break and one chain still comes through.
#[test]
fn broken_middle_hop_is_repaired_via_recovery_route() {
    let topo = build(TopologySpec {
        alpha: 0.01,
        q: 1.0,
        k: 2,
        nodes: vec![
            NodeSpec { capacity: 4, loc: [0.0, 0.0] },
            NodeSpec { capacity: 4, loc: [10.0, 0.0] },
            NodeSpec { capacity: 4, loc: [20.0, 0.0] },
            NodeSpec { capacity: 4, loc: [30.0, 0.0] },
            NodeSpec { capacity: 4, loc: [15.0, 10.0] },
        ],
        links: vec![
            LinkSpec { a: 0, b: 1, bundle: 1 },
            LinkSpec { a: 1, b: 2, bundle: 1 },
            LinkSpec { a: 2, b: 3, bundle: 1 },
            LinkSpec { a: 1, b: 4, bundle: 1 },
            LinkSpec { a: 4, b: 2, bundle: 1 },
        ],
    });
    // Trials run in link-id order over links 0..=4 (the major route plus
    // the provisioned detour): only link 1, the middle hop, fails. Swaps
    // succeed regardless of the draw because q = 1.
    let entropy = ScriptedEntropy::new([0.0, 1.0, 0.0, 0.0, 0.0]);
    let mut runner = BatchRunner::with_entropy(
        topo,
        &MaxExpectedChains,
        EngineConfig::default(),
        Box::new(entropy),
    );
    let report = runner
        .run_batch(&[(NodeId(0), NodeId(3))])
        .expect("batch runs");

    assert_eq!(report.routes.len(), 1);
    let route = &report.routes[0];
    assert_eq!(route.origin, RouteOrigin::Primary);
    assert_eq!(
        route.path,
        vec![NodeId(0), NodeId(1), NodeId(2), NodeId(3)]
    );
    assert_eq!(route.established, 1);
    assert_eq!(route.recovery.len(), 1);
    assert_eq!(route.recovery[0].span, (1, 2));
    // Both detour links came up entangled, so the full provisioned width
    // survived the trials.
    assert_eq!(route.recovery[0].available, 1);
    assert_eq!(route.recovery[0].taken, 1);

    assert_eq!(
        report.pairs[0].chains,
        vec![vec![NodeId(0), NodeId(1), NodeId(4), NodeId(2), NodeId(3)]]
    );
    assert_eq!(report.stats.recovery_planned, 1);
    assert_eq!(report.stats.recovery_taken, 1);
    assert!(runner.topology().is_clean());
}

/// The same break without recovery planning yields nothing: the direct
/// swap stops at the dead middle hop.
#[test]
fn broken_middle_hop_without_recovery_yields_nothing() {
    let topo = build(TopologySpec {
        alpha: 0.01,
        q: 1.0,
        k: 2,
        nodes: vec![
            NodeSpec { capacity: 4, loc: [0.0, 0.0] },
            NodeSpec { capacity: 4, loc: [10.0, 0.0] },
            NodeSpec { capacity: 4, loc: [20.0, 0.0] },
            NodeSpec { capacity: 4, loc: [30.0, 0.0] },
        ],
        links: vec![
            LinkSpec { a: 0, b: 1, bundle: 1 },
            LinkSpec { a: 1, b: 2, bundle: 1 },
            LinkSpec { a: 2, b: 3, bundle: 1 },
        ],
    });
    let entropy = ScriptedEntropy::new([0.0, 1.0, 0.0]);
    let config = EngineConfig { allow_recovery: false, ..EngineConfig::default() };
    let mut runner =
        BatchRunner::with_entropy(topo, &MaxExpectedChains, config, Box::new(entropy));
    let report = runner
        .run_batch(&[(NodeId(0), NodeId(3))])
        .expect("batch runs");

    assert_eq!(report.total_chains(), 0);
    assert_eq!(report.stats.recovery_planned, 0);
    assert!(runner.topology().is_clean());
}

/// A scalar strategy swaps directly along its major route.
#[test]
fn sum_dist_swaps_directly() {
    let topo = build(TopologySpec {
        alpha: 0.01,
        q: 1.0,
        k: 2,
        nodes: vec![
            NodeSpec { capacity: 2, loc: [0.0, 0.0] },
            NodeSpec { capacity: 2, loc: [10.0, 0.0] },
            NodeSpec { capacity: 2, loc: [20.0, 0.0] },
        ],
        links: vec![
            LinkSpec { a: 0, b: 1, bundle: 1 },
            LinkSpec { a: 1, b: 2, bundle: 1 },
        ],
    });
    let entropy = ScriptedEntropy::new([0.0, 0.0, 0.0]);
    let mut runner = BatchRunner::with_entropy(
        topo,
        &SumDist,
        EngineConfig::default(),
        Box::new(entropy),
    );
    let report = runner
        .run_batch(&[(NodeId(0), NodeId(2))])
        .expect("batch runs");

    assert_eq!(report.strategy, "sum-dist");
    assert_eq!(report.total_chains(), 1);
    assert!(report.routes.iter().all(|r| r.recovery.is_empty()));
    assert!(runner.topology().is_clean());
}
