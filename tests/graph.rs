use std::sync::Arc;

use graph_communities::{CommunityGraph, GraphAttributes, Mode, Modularity, Partition};
use petgraph::graph::UnGraph;

#[test]
fn defaults_give_unit_sizes_and_loop_self_weights() {
    let g = UnGraph::<(), f64>::from_edges([(0, 1, 1.5), (1, 1, 2.5)]);
    let graph = CommunityGraph::new(&g).unwrap();

    assert_eq!(graph.vcount(), 2);
    assert_eq!(graph.ecount(), 2);
    assert_eq!(graph.node_sizes(), &[1, 1]);
    assert_eq!(graph.node_self_weight(0), 0.0);
    assert_eq!(graph.node_self_weight(1), 2.5);
    assert_eq!(graph.total_size(), 2);
    assert_eq!(graph.total_weight(), 4.0);
}

#[test]
fn density_of_a_path() {
    let g = UnGraph::<(), f64>::from_edges([(0, 1, 1.0), (1, 2, 1.0)]);
    let graph = CommunityGraph::new(&g).unwrap();
    // Undirected: 2m / (n(n-1)).
    assert!((graph.density() - 2.0 * 2.0 / 6.0).abs() < 1e-12);
}

#[test]
fn density_of_single_vertex_is_zero() {
    let mut g = UnGraph::<(), f64>::new_undirected();
    g.add_node(());
    let graph = CommunityGraph::new(&g).unwrap();
    assert_eq!(graph.density(), 0.0);
}

#[test]
fn explicit_attributes_override_defaults() {
    let g = UnGraph::<(), f64>::from_edges([(0, 1, 1.0), (1, 2, 1.0)]);
    let graph = CommunityGraph::with_attributes(
        &g,
        GraphAttributes {
            edge_weights: Some(vec![3.0, 4.0]),
            node_sizes: Some(vec![2, 1, 1]),
            ..GraphAttributes::default()
        },
    )
    .unwrap();

    assert_eq!(graph.edge_weight(0), 3.0);
    assert_eq!(graph.total_weight(), 7.0);
    assert_eq!(graph.total_size(), 4);
    assert_eq!(graph.node_size(0), 2);
    assert_eq!(graph.strength(0, Mode::All), 3.0);
}

#[test]
fn collapse_sums_parallel_super_edges() {
    // Two dense pairs joined by two bridge edges; collapsing the pair
    // partition must merge the bridges into one super-edge of weight 2.
    let g = UnGraph::<(), f64>::from_edges([
        (0, 1, 1.0),
        (2, 3, 1.0),
        (1, 2, 1.0),
        (0, 3, 1.0),
    ]);
    let graph = Arc::new(CommunityGraph::new(&g).unwrap());
    let partition =
        Partition::with_membership(Arc::clone(&graph), vec![0, 0, 1, 1], Modularity).unwrap();

    let collapsed = partition.aggregate_partition();
    let cg = collapsed.graph();

    assert_eq!(cg.vcount(), 2);
    assert_eq!(cg.total_weight(), graph.total_weight());
    assert_eq!(cg.node_size(0), 2);
    assert_eq!(cg.node_size(1), 2);
    assert_eq!(cg.node_self_weight(0), 1.0);
    assert_eq!(cg.node_self_weight(1), 1.0);

    let bridges: Vec<(usize, usize, f64)> =
        cg.edges().filter(|&(a, b, _)| a != b).collect();
    assert_eq!(bridges, vec![(0, 1, 2.0)]);
}

#[test]
fn collapse_preserves_self_loop_weight() {
    // All vertices in one community: the super-node's self-weight is the
    // whole internal weight, 2 + 1 + 1 = 4.
    let g = UnGraph::<(), f64>::from_edges([(0, 1, 1.0), (1, 2, 1.0), (0, 0, 2.0)]);
    let graph = Arc::new(CommunityGraph::new(&g).unwrap());
    let partition =
        Partition::with_membership(Arc::clone(&graph), vec![0, 0, 0], Modularity).unwrap();
    assert_eq!(partition.total_weight_in_comm(0), 4.0);

    let collapsed = partition.aggregate_partition();
    let cg = collapsed.graph();
    assert_eq!(cg.vcount(), 1);
    assert_eq!(cg.ecount(), 1);
    assert_eq!(cg.node_self_weight(0), 4.0);
    assert_eq!(cg.node_size(0), 3);
    assert!(cg.correct_self_loops());
}

#[test]
fn collapse_inherits_direction_and_convention() {
    use petgraph::graph::DiGraph;

    let g = DiGraph::<(), f64>::from_edges([(0, 1, 1.0), (1, 2, 2.0), (2, 0, 3.0)]);
    let graph = Arc::new(CommunityGraph::new(&g).unwrap());
    let partition =
        Partition::with_membership(Arc::clone(&graph), vec![0, 0, 1], Modularity).unwrap();

    let collapsed = partition.aggregate_partition();
    let cg = collapsed.graph();
    assert!(cg.is_directed());
    assert!(!cg.correct_self_loops());
    // Directed super-edges keep their orientation: 1->2 and 2->0 stay
    // distinct.
    let mut edges: Vec<(usize, usize, f64)> = cg.edges().collect();
    edges.sort_by(|a, b| a.partial_cmp(b).unwrap());
    assert_eq!(edges, vec![(0, 0, 1.0), (0, 1, 2.0), (1, 0, 3.0)]);
}

#[test]
fn random_neighbour_fails_on_isolated_vertex() {
    let mut g = UnGraph::<(), f64>::new_undirected();
    g.add_node(());
    g.add_node(());
    let graph = CommunityGraph::new(&g).unwrap();
    let mut rng = graph_communities::seeded_rng(1);
    assert!(graph.random_neighbour(0, Mode::All, &mut rng).is_err());
}

#[test]
fn random_neighbour_is_a_neighbour() {
    let g = UnGraph::<(), f64>::from_edges([(0, 1, 1.0), (0, 2, 1.0)]);
    let graph = CommunityGraph::new(&g).unwrap();
    let mut rng = graph_communities::seeded_rng(3);
    for _ in 0..20 {
        let u = graph.random_neighbour(0, Mode::All, &mut rng).unwrap();
        assert!(u == 1 || u == 2);
    }
}
