//! End-to-end protocol runs over the channel fabric.

use std::collections::BTreeSet;

use pddfs_core::Rank;
use pddfs_group::{ErdosRenyi, GroupError, NodeReport, Topology, run_group};
use tokio_util::sync::CancellationToken;

/// Initialize tracing for tests. Call at the start of each test.
/// Uses RUST_LOG env var for filtering (defaults to "debug" for this crate).
fn init_tracing() -> impl Sized {
    use tracing::Dispatch;
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::{EnvFilter, fmt};

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pddfs_group=debug")),
        )
        .with_span_events(FmtSpan::CLOSE)
        .with_test_writer()
        .finish();

    let dispatch = Dispatch::new(subscriber);
    tracing::dispatcher::set_default(&dispatch)
}

async fn solve(nodes: usize, pairs: &[(u32, u32)]) -> Vec<NodeReport> {
    let topology = Topology::from_pairs(nodes, pairs).expect("valid test graph");
    run_group(&topology, CancellationToken::new())
        .await
        .expect("group converges")
}

fn children(report: &NodeReport) -> Vec<u32> {
    report.children.iter().map(|rank| rank.0).collect()
}

/// Children sets of the unique DFS tree that always descends into the
/// smallest unvisited neighbor first — the fixed point the protocol must
/// reach regardless of scheduling.
fn reference_children(topology: &Topology) -> Vec<BTreeSet<Rank>> {
    fn visit(
        topology: &Topology,
        at: Rank,
        visited: &mut [bool],
        children: &mut [BTreeSet<Rank>],
    ) {
        visited[at.index()] = true;
        for &next in topology.neighbors(at) {
            if !visited[next.index()] {
                children[at.index()].insert(next);
                visit(topology, next, visited, children);
            }
        }
    }
    let mut visited = vec![false; topology.nodes()];
    let mut children = vec![BTreeSet::new(); topology.nodes()];
    visit(topology, Rank::ROOT, &mut visited, &mut children);
    children
}

#[tokio::test]
async fn two_nodes_one_edge() {
    let _guard = init_tracing();
    let reports = solve(2, &[(0, 1)]).await;
    assert_eq!(children(&reports[0]), vec![1]);
    assert_eq!(children(&reports[1]), Vec::<u32>::new());
    assert_eq!(reports[0].parent, None);
    assert_eq!(reports[1].parent, Some(Rank(0)));
    // one DISCOVER down, one TERMINATE back
    assert_eq!(reports[0].messages, 1);
    assert_eq!(reports[1].messages, 1);
}

#[tokio::test]
async fn triangle_drops_the_chord() {
    let _guard = init_tracing();
    let reports = solve(3, &[(0, 1), (1, 2), (0, 2)]).await;
    assert_eq!(children(&reports[0]), vec![1]);
    assert_eq!(children(&reports[1]), vec![2]);
    assert_eq!(children(&reports[2]), Vec::<u32>::new());
    assert_eq!(reports[2].parent, Some(Rank(1)));
}

#[tokio::test]
async fn four_node_path_is_a_chain() {
    let _guard = init_tracing();
    let reports = solve(4, &[(0, 1), (1, 2), (2, 3)]).await;
    assert_eq!(children(&reports[0]), vec![1]);
    assert_eq!(children(&reports[1]), vec![2]);
    assert_eq!(children(&reports[2]), vec![3]);
    assert_eq!(children(&reports[3]), Vec::<u32>::new());
}

#[tokio::test]
async fn star_keeps_every_spoke() {
    let _guard = init_tracing();
    let reports = solve(4, &[(0, 1), (0, 2), (0, 3)]).await;
    assert_eq!(children(&reports[0]), vec![1, 2, 3]);
    for leaf in &reports[1..] {
        assert!(leaf.children.is_empty());
        assert_eq!(leaf.parent, Some(Rank(0)));
    }
}

#[tokio::test]
async fn four_cycle_breaks_at_the_closing_edge() {
    let _guard = init_tracing();
    let reports = solve(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]).await;
    assert_eq!(children(&reports[0]), vec![1]);
    assert_eq!(children(&reports[1]), vec![2]);
    assert_eq!(children(&reports[2]), vec![3]);
    assert_eq!(children(&reports[3]), Vec::<u32>::new());
    assert_eq!(reports[3].parent, Some(Rank(2)));
}

#[tokio::test]
async fn complete_k4_collapses_to_a_chain() {
    let _guard = init_tracing();
    let reports = solve(4, &[(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]).await;
    assert_eq!(children(&reports[0]), vec![1]);
    assert_eq!(children(&reports[1]), vec![2]);
    assert_eq!(children(&reports[2]), vec![3]);
    assert_eq!(children(&reports[3]), Vec::<u32>::new());
}

#[tokio::test]
async fn single_node_finishes_alone() {
    let _guard = init_tracing();
    let reports = solve(1, &[]).await;
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].parent, None);
    assert!(reports[0].children.is_empty());
    assert_eq!(reports[0].messages, 0);
}

#[tokio::test]
async fn random_graphs_match_the_sequential_reference() {
    let _guard = init_tracing();
    for (nodes, p, seed) in [
        (6_u32, 0.4, 1),
        (9, 0.3, 2),
        (12, 0.25, 3),
        (12, 0.6, 4),
        (16, 0.2, 5),
    ] {
        let pairs = ErdosRenyi::new(nodes, p, seed)
            .sample()
            .expect("connected sample");
        let topology = Topology::from_pairs(nodes as usize, &pairs).expect("valid sampled graph");
        let expected = reference_children(&topology);
        let reports = run_group(&topology, CancellationToken::new())
            .await
            .expect("group converges");
        for report in &reports {
            assert_eq!(
                report.children,
                expected[report.rank.index()],
                "seed {seed}, rank {}",
                report.rank
            );
        }
    }
}

#[tokio::test]
async fn every_non_root_is_claimed_exactly_once() {
    let _guard = init_tracing();
    for seed in 0..4 {
        let pairs = ErdosRenyi::new(10, 0.35, seed)
            .sample()
            .expect("connected sample");
        let topology = Topology::from_pairs(10, &pairs).expect("valid sampled graph");
        let reports = run_group(&topology, CancellationToken::new())
            .await
            .expect("group converges");

        let mut claimed = vec![0_usize; topology.nodes()];
        for report in &reports {
            for child in &report.children {
                claimed[child.index()] += 1;
                assert_eq!(reports[child.index()].parent, Some(report.rank));
            }
            match report.parent {
                Some(parent) => assert!(reports[parent.index()].children.contains(&report.rank)),
                None => assert!(report.rank.is_root()),
            }
        }
        assert_eq!(claimed[0], 0, "the root is nobody's child");
        assert!(claimed[1..].iter().all(|&count| count == 1));
    }
}

#[tokio::test]
async fn repeated_runs_agree_on_the_tree() {
    let _guard = init_tracing();
    let pairs = ErdosRenyi::new(11, 0.3, 9).sample().expect("connected sample");
    let topology = Topology::from_pairs(11, &pairs).expect("valid sampled graph");

    let mut trees = Vec::new();
    for _ in 0..3 {
        let reports = run_group(&topology, CancellationToken::new())
            .await
            .expect("group converges");
        trees.push(
            reports
                .into_iter()
                .map(|report| (report.rank, report.parent, report.children))
                .collect::<Vec<_>>(),
        );
    }
    assert_eq!(trees[0], trees[1]);
    assert_eq!(trees[1], trees[2]);
}

#[tokio::test]
async fn cancelled_group_aborts() {
    let _guard = init_tracing();
    let topology = Topology::from_pairs(3, &[(0, 1), (1, 2)]).expect("valid test graph");
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = run_group(&topology, cancel).await.unwrap_err();
    assert!(matches!(err.current_context(), GroupError::NodeFailed));
}
