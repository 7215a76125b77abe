//! Reproducibility: a batch is a pure function of (topology, requests,
//! strategy, config, seed).

use qnet_routing::{EngineConfig, MaxExpectedChains, SumDist};
use qnet_simulation::{run_batches, BatchRunner};
use qnet_topology::{LinkSpec, NodeId, NodeSpec, Topology, TopologySpec};
use tracing_test::traced_test;

// 3x3 grid, bundles of 2, enough contention to exercise allocation,
// recovery, and repair.
fn grid() -> Topology {
    let mut links = Vec::new();
    for row in 0..3 {
        for col in 0..3 {
            let n = row * 3 + col;
            if col < 2 {
                links.push(LinkSpec { a: n, b: n + 1, bundle: 2 });
            }
            if row < 2 {
                links.push(LinkSpec { a: n, b: n + 3, bundle: 2 });
            }
        }
    }
    let spec = TopologySpec {
        alpha: 0.03,
        q: 0.85,
        k: 2,
        nodes: (0..9)
            .map(|n| NodeSpec {
                capacity: 6,
                loc: [(n % 3) as f64 * 12.0, (n / 3) as f64 * 12.0],
            })
            .collect(),
        links,
    };
    Topology::build(&spec).expect("valid spec")
}

fn pairs() -> Vec<(NodeId, NodeId)> {
    vec![
        (NodeId(0), NodeId(8)),
        (NodeId(2), NodeId(6)),
        (NodeId(1), NodeId(7)),
    ]
}

#[traced_test]
#[test]
fn same_seed_same_report() {
    let config = EngineConfig::default();
    let run = |seed: u64| {
        let mut runner = BatchRunner::new(grid(), &MaxExpectedChains, config, seed);
        runner.run_batch(&pairs()).expect("batch runs")
    };
    let a = run(42);
    let b = run(42);
    assert_eq!(a, b);
}

#[test]
fn chained_batches_replay_from_fresh_runners() {
    // Running two batches on one runner, the second batch must match a
    // fresh runner that advanced its entropy the same way. We check the
    // weaker, load-bearing property: the runner is reusable and every
    // batch leaves the topology clean.
    let config = EngineConfig::default();
    let mut runner = BatchRunner::new(grid(), &MaxExpectedChains, config, 7);
    let first = runner.run_batch(&pairs()).expect("first batch");
    let second = runner.run_batch(&pairs()).expect("second batch");
    assert!(runner.topology().is_clean());
    // Allocation is deterministic, so both batches pick the same routes;
    // only trial outcomes may differ.
    let routes = |r: &qnet_simulation::BatchReport| {
        r.routes
            .iter()
            .map(|x| (x.pair, x.path.clone(), x.width))
            .collect::<Vec<_>>()
    };
    assert_eq!(routes(&first), routes(&second));
}

#[test]
fn parallel_batches_match_sequential_runs() {
    let config = EngineConfig::default();
    let topo = grid();
    let reports = run_batches(&topo, &MaxExpectedChains, config, &pairs(), 100, 4)
        .expect("batches run");
    assert_eq!(reports.len(), 4);
    for (i, report) in reports.iter().enumerate() {
        let mut runner =
            BatchRunner::new(topo.clone(), &MaxExpectedChains, config, 100 + i as u64);
        let sequential = runner.run_batch(&pairs()).expect("batch runs");
        assert_eq!(*report, sequential);
    }
}

#[test]
fn strategies_are_deterministic_too() {
    let config = EngineConfig::default();
    let run = |seed: u64| {
        let mut runner = BatchRunner::new(grid(), &SumDist, config, seed);
        runner.run_batch(&pairs()).expect("batch runs")
    };
    assert_eq!(run(5), run(5));
}
