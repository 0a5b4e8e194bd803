//! **graph-communities** detects communities in graphs by greedily
//! optimising a quality function over a vertex partition, using the
//! multi-level (Louvain-style) scheme: move vertices while it pays,
//! collapse each community into a super-node, recurse on the aggregated
//! graph.
//!
//! Several quality functions are available ([`Modularity`],
//! [`RBConfiguration`], [`RBErdosRenyi`], [`Cpm`], [`Significance`],
//! [`Surprise`] and [`GeneralizedModularity`]), and several graphs over one
//! vertex set can be optimised jointly
//! ([`Optimiser::optimise_partition_multiplex`]).
//!
//! Any petgraph-style graph can serve as input; its adjacency is copied
//! into a [`CommunityGraph`] once and queried allocation-free afterwards.
//!
//! ```
//! use std::sync::Arc;
//!
//! use graph_communities::{seeded_rng, CommunityGraph, Modularity, Optimiser, Partition};
//! use petgraph::graph::UnGraph;
//!
//! // Two triangles joined by one bridge edge.
//! let g = UnGraph::<(), f64>::from_edges([
//!     (0, 1, 1.0), (1, 2, 1.0), (0, 2, 1.0),
//!     (3, 4, 1.0), (4, 5, 1.0), (3, 5, 1.0),
//!     (2, 3, 1.0),
//! ]);
//! let graph = Arc::new(CommunityGraph::new(&g)?);
//! let mut partition = Partition::singleton(graph, Modularity)?;
//!
//! let quality = Optimiser::new().optimise_partition(&mut partition, &mut seeded_rng(42));
//!
//! assert_eq!(partition.nb_communities(), 2);
//! assert!(quality > 0.0);
//! # Ok::<(), graph_communities::CommunityError>(())
//! ```
//!
//! All randomness flows through a caller-supplied [`rand::Rng`];
//! [`seeded_rng`] builds a deterministic one for reproducible runs.

pub mod error;
pub mod graph;
pub mod optimiser;
pub mod partition;

pub use error::CommunityError;
pub use graph::{CommunityGraph, GraphAdapter, GraphAttributes, Mode};
pub use optimiser::{ConsiderComms, Optimiser};
pub use partition::{
    Cpm, GeneralizedModularity, LinearResolution, Modularity, Partition, QualityFunction,
    RBConfiguration, RBErdosRenyi, Significance, Surprise,
};

use rand::SeedableRng;

/// A deterministic generator seeded from a single integer, for callers who
/// want the ambient-seed style instead of threading their own RNG.
pub fn seeded_rng(seed: u64) -> rand_pcg::Pcg64 {
    rand_pcg::Pcg64::seed_from_u64(seed)
}
