//! End-to-end optimisation scenarios.

use std::sync::Arc;

use graph_communities::{
    seeded_rng, CommunityError, CommunityGraph, ConsiderComms, Cpm, Modularity, Optimiser,
    Partition, RBConfiguration,
};
use petgraph::graph::UnGraph;
use rand::Rng;

fn two_triangles() -> Arc<CommunityGraph> {
    // 0-1-2 and 3-4-5 triangles, bridged by 2-3.
    let g = UnGraph::<(), f64>::from_edges([
        (0, 1, 1.0),
        (1, 2, 1.0),
        (0, 2, 1.0),
        (3, 4, 1.0),
        (4, 5, 1.0),
        (3, 5, 1.0),
        (2, 3, 1.0),
    ]);
    Arc::new(CommunityGraph::new(&g).unwrap())
}

#[test]
fn two_triangles_split_at_the_bridge() {
    let graph = two_triangles();
    let mut partition =
        Partition::singleton(Arc::clone(&graph), RBConfiguration::new(1.0)).unwrap();
    let optimiser = Optimiser::new();
    let quality = optimiser.optimise_partition(&mut partition, &mut seeded_rng(0));

    assert!(quality > 0.0);
    assert_eq!(partition.nb_communities(), 2);
    let membership = partition.membership();
    assert_eq!(membership[0], membership[1]);
    assert_eq!(membership[1], membership[2]);
    assert_eq!(membership[3], membership[4]);
    assert_eq!(membership[4], membership[5]);
    assert_ne!(membership[0], membership[3]);
}

#[test]
fn complete_graph_collapses_to_one_community() {
    let mut g = UnGraph::<(), f64>::new_undirected();
    let nodes: Vec<_> = (0..5).map(|_| g.add_node(())).collect();
    for i in 0..5 {
        for j in (i + 1)..5 {
            g.add_edge(nodes[i], nodes[j], 1.0);
        }
    }
    let graph = Arc::new(CommunityGraph::new(&g).unwrap());
    let mut partition = Partition::singleton(Arc::clone(&graph), Modularity).unwrap();
    let quality = Optimiser::new().optimise_partition(&mut partition, &mut seeded_rng(1));

    assert_eq!(partition.nb_communities(), 1);
    assert!(quality.abs() < 1e-9);
}

#[test]
fn cpm_low_resolution_on_a_path() {
    // At γ = 1/4 the path 0-1-2-3 has two tied optima (everything together,
    // or the two end pairs), both of quality 3; greedy lands on one of them
    // depending on the sweep order.
    let g = UnGraph::<(), f64>::from_edges([(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)]);
    let graph = Arc::new(CommunityGraph::new(&g).unwrap());
    let mut partition = Partition::singleton(Arc::clone(&graph), Cpm::new(0.25)).unwrap();
    let quality = Optimiser::new().optimise_partition(&mut partition, &mut seeded_rng(2));

    assert!((quality - 3.0).abs() < 1e-9);
    assert!(partition.nb_communities() <= 2);
    if partition.nb_communities() == 2 {
        let membership = partition.membership();
        assert_eq!(membership[0], membership[1]);
        assert_eq!(membership[2], membership[3]);
        assert_ne!(membership[0], membership[2]);
    }
}

#[test]
fn cpm_high_resolution_keeps_singletons() {
    let g = UnGraph::<(), f64>::from_edges([(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)]);
    let graph = Arc::new(CommunityGraph::new(&g).unwrap());
    let mut partition = Partition::singleton(Arc::clone(&graph), Cpm::new(2.0)).unwrap();
    let quality = Optimiser::new().optimise_partition(&mut partition, &mut seeded_rng(3));

    assert_eq!(partition.nb_communities(), 4);
    assert_eq!(partition.membership(), &[0, 1, 2, 3]);
    assert!(quality.abs() < 1e-12);
}

#[test]
fn isolated_graph_is_left_alone() {
    let mut g = UnGraph::<(), f64>::new_undirected();
    for _ in 0..5 {
        g.add_node(());
    }
    let graph = Arc::new(CommunityGraph::new(&g).unwrap());
    let mut partition = Partition::singleton(Arc::clone(&graph), Modularity).unwrap();
    let quality = Optimiser::new().optimise_partition(&mut partition, &mut seeded_rng(4));

    assert_eq!(quality, 0.0);
    assert_eq!(partition.nb_communities(), 5);
    assert_eq!(partition.membership(), &[0, 1, 2, 3, 4]);
}

#[test]
fn move_nodes_improvement_is_monotone_and_idempotent() {
    let graph = two_triangles();
    let mut partition = Partition::singleton(Arc::clone(&graph), Modularity).unwrap();
    let optimiser = Optimiser::new();
    let mut rng = seeded_rng(5);

    let improvement = optimiser.move_nodes(&mut partition, &mut rng);
    assert!(improvement >= 0.0);

    // Drive to a local optimum, then verify staying there.
    let mut last = improvement;
    for _ in 0..10 {
        if last == 0.0 {
            break;
        }
        last = optimiser.move_nodes(&mut partition, &mut rng);
    }
    assert_eq!(last, 0.0);
    assert_eq!(optimiser.move_nodes(&mut partition, &mut rng), 0.0);
}

#[test]
fn find_partition_returns_the_optimised_partition() {
    let graph = two_triangles();
    let partition = Optimiser::new()
        .find_partition(Arc::clone(&graph), Modularity, &mut seeded_rng(6))
        .unwrap();
    assert_eq!(partition.nb_communities(), 2);
}

#[test]
fn all_comms_policy_finds_the_same_split() {
    let graph = two_triangles();
    let optimiser = Optimiser {
        consider_comms: ConsiderComms::AllComms,
        ..Optimiser::default()
    };
    let mut partition =
        Partition::singleton(Arc::clone(&graph), RBConfiguration::new(1.0)).unwrap();
    optimiser.optimise_partition(&mut partition, &mut seeded_rng(7));
    assert_eq!(partition.nb_communities(), 2);
}

#[test]
fn random_policies_terminate_with_valid_state() {
    for consider_comms in [ConsiderComms::RandComm, ConsiderComms::RandNeighComm] {
        let graph = two_triangles();
        let optimiser = Optimiser {
            consider_comms,
            ..Optimiser::default()
        };
        let mut partition = Partition::singleton(Arc::clone(&graph), Modularity).unwrap();
        let quality = optimiser.optimise_partition(&mut partition, &mut seeded_rng(8));

        assert!(quality.is_finite());
        let nb = partition.nb_communities();
        assert!(partition.membership().iter().all(|&c| c < nb));
        for c in 0..nb {
            assert!(partition.csize(c) > 0);
        }
    }
}

#[test]
fn deterministic_for_a_fixed_seed() {
    let g = {
        let mut rng = seeded_rng(900);
        let mut g = UnGraph::<(), f64>::new_undirected();
        let nodes: Vec<_> = (0..40).map(|_| g.add_node(())).collect();
        for i in 0..40 {
            for j in (i + 1)..40 {
                if rng.gen::<f64>() < 0.15 {
                    g.add_edge(nodes[i], nodes[j], rng.gen_range(0.5..2.0));
                }
            }
        }
        g
    };
    let graph = Arc::new(CommunityGraph::new(&g).unwrap());

    let run = || {
        let mut partition = Partition::singleton(Arc::clone(&graph), Modularity).unwrap();
        let quality = Optimiser::new().optimise_partition(&mut partition, &mut seeded_rng(42));
        (quality, partition.membership().to_vec())
    };
    assert_eq!(run(), run());
}

#[test]
fn multiplex_two_layers_agree_on_one_membership() {
    // Layer A pairs (0,1) and (2,3); layer B pairs (0,2) and (1,3). With
    // equal weights the optimum is two paired communities of size two and
    // total quality 0; which pairing wins depends on the sweep order.
    let a = UnGraph::<(), f64>::from_edges([(0, 1, 1.0), (2, 3, 1.0)]);
    let b = UnGraph::<(), f64>::from_edges([(0, 2, 1.0), (1, 3, 1.0)]);
    let graph_a = Arc::new(CommunityGraph::new(&a).unwrap());
    let graph_b = Arc::new(CommunityGraph::new(&b).unwrap());

    let mut partitions = vec![
        Partition::singleton(Arc::clone(&graph_a), Modularity).unwrap(),
        Partition::singleton(Arc::clone(&graph_b), Modularity).unwrap(),
    ];
    let quality = Optimiser::new()
        .optimise_partition_multiplex(&mut partitions, &[0.5, 0.5], &mut seeded_rng(9))
        .unwrap();

    assert_eq!(partitions[0].membership(), partitions[1].membership());
    assert_eq!(partitions[0].nb_communities(), 2);
    assert_eq!(partitions[0].csizes(), &[2, 2]);
    assert!(quality.abs() < 1e-9);
}

#[test]
fn multiplex_weighting_steers_the_outcome() {
    // Same layers, but layer A dominates: its pairing must win.
    let a = UnGraph::<(), f64>::from_edges([(0, 1, 1.0), (2, 3, 1.0)]);
    let b = UnGraph::<(), f64>::from_edges([(0, 2, 1.0), (1, 3, 1.0)]);
    let graph_a = Arc::new(CommunityGraph::new(&a).unwrap());
    let graph_b = Arc::new(CommunityGraph::new(&b).unwrap());

    let mut partitions = vec![
        Partition::singleton(Arc::clone(&graph_a), Modularity).unwrap(),
        Partition::singleton(Arc::clone(&graph_b), Modularity).unwrap(),
    ];
    let quality = Optimiser::new()
        .optimise_partition_multiplex(&mut partitions, &[1.0, 0.1], &mut seeded_rng(10))
        .unwrap();

    let membership = partitions[0].membership();
    assert_eq!(membership[0], membership[1]);
    assert_eq!(membership[2], membership[3]);
    assert_ne!(membership[0], membership[2]);
    assert!(quality > 0.0);
}

#[test]
fn multiplex_input_checks() {
    let g = UnGraph::<(), f64>::from_edges([(0, 1, 1.0)]);
    let graph = Arc::new(CommunityGraph::new(&g).unwrap());
    let optimiser = Optimiser::new();
    let mut rng = seeded_rng(11);

    let mut empty: Vec<Partition<Modularity>> = Vec::new();
    assert_eq!(
        optimiser.optimise_partition_multiplex(&mut empty, &[], &mut rng),
        Err(CommunityError::EmptyLayers)
    );

    let mut layers = vec![Partition::singleton(Arc::clone(&graph), Modularity).unwrap()];
    assert!(matches!(
        optimiser.optimise_partition_multiplex(&mut layers, &[1.0, 1.0], &mut rng),
        Err(CommunityError::InputShape(_))
    ));

    let smaller = UnGraph::<(), f64>::from_edges([(0, 1, 1.0), (1, 2, 1.0)]);
    let graph_small = Arc::new(CommunityGraph::new(&smaller).unwrap());
    let mut mismatched = vec![
        Partition::singleton(Arc::clone(&graph), Modularity).unwrap(),
        Partition::singleton(Arc::clone(&graph_small), Modularity).unwrap(),
    ];
    assert!(matches!(
        optimiser.optimise_partition_multiplex(&mut mismatched, &[1.0, 1.0], &mut rng),
        Err(CommunityError::LayerMismatch { .. })
    ));

    let mut disagreeing = vec![
        Partition::singleton(Arc::clone(&graph), Modularity).unwrap(),
        Partition::with_membership(Arc::clone(&graph), vec![0, 0], Modularity).unwrap(),
    ];
    assert!(matches!(
        optimiser.optimise_partition_multiplex(&mut disagreeing, &[1.0, 1.0], &mut rng),
        Err(CommunityError::InputShape(_))
    ));
}

#[test]
fn optimise_improves_or_keeps_the_quality() {
    let mut rng = seeded_rng(950);
    let mut g = UnGraph::<(), f64>::new_undirected();
    let nodes: Vec<_> = (0..60).map(|_| g.add_node(())).collect();
    for i in 0..60 {
        for j in (i + 1)..60 {
            if rng.gen::<f64>() < 0.08 {
                g.add_edge(nodes[i], nodes[j], 1.0);
            }
        }
    }
    let graph = Arc::new(CommunityGraph::new(&g).unwrap());

    for seed in [12, 13, 14] {
        let mut partition = Partition::singleton(Arc::clone(&graph), Modularity).unwrap();
        let initial = partition.quality();
        let quality = Optimiser::new().optimise_partition(&mut partition, &mut seeded_rng(seed));
        assert!(quality >= initial - 1e-12);
    }
}
