//! An immutable, weight- and size-annotated view over a host graph.
//!
//! [`CommunityGraph`] copies the adjacency of any petgraph-style graph into
//! compact CSR arrays once, at construction. All later queries (degrees,
//! strengths, neighbour lists, incident edges) are allocation-free slice
//! lookups, which is what keeps a single vertex move O(deg(v)) inside the
//! partition bookkeeping.

use indexmap::IndexMap;
use petgraph::visit::{
    Data, EdgeCount, EdgeRef, GraphProp, IntoEdgeReferences, NodeCount, NodeIndexable,
};
use rand::Rng;

use crate::error::CommunityError;

/// Which incident edges of a vertex to consider.
///
/// On undirected graphs all three modes are equivalent.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Outgoing edges (edges whose tail is the vertex).
    Out,
    /// Incoming edges (edges whose head is the vertex).
    In,
    /// Both incoming and outgoing edges. A self-loop appears twice.
    All,
}

/// Host graphs that can back a [`CommunityGraph`].
///
/// Any petgraph-style graph exposing edge references, a node count and a
/// compact node indexing qualifies.
pub trait GraphAdapter:
    Data<EdgeWeight: Into<f64> + Copy>
    + GraphProp
    + IntoEdgeReferences
    + NodeCount
    + EdgeCount
    + NodeIndexable
{
}

impl<G> GraphAdapter for G where
    G: Data<EdgeWeight: Into<f64> + Copy>
        + GraphProp
        + IntoEdgeReferences
        + NodeCount
        + EdgeCount
        + NodeIndexable
{
}

/// Optional per-graph annotations supplied at construction.
///
/// Unset fields fall back to their defaults: the host graph's own edge
/// weights, node size 1, node self-weight equal to the summed weight of the
/// self-loops on the node, and `correct_self_loops` derived from whether the
/// graph has any self-loop.
#[derive(Debug, Clone, Default)]
pub struct GraphAttributes {
    /// Edge weights overriding the host graph's, indexed in
    /// `edge_references` order. Length must equal the edge count.
    pub edge_weights: Option<Vec<f64>>,
    /// Node sizes. Length must equal the vertex count.
    pub node_sizes: Option<Vec<usize>>,
    /// Node self-weights. Length must equal the vertex count.
    pub node_self_weights: Option<Vec<f64>>,
    /// Whether quality functions should count self-pairs as possible edges.
    pub correct_self_loops: Option<bool>,
    /// Accept negative edge weights. Off by default; the CPM quality
    /// function is the one caller that meaningfully sets this.
    pub allow_negative_weights: bool,
}

/// One adjacency direction in CSR form: `start[v]..start[v + 1]` indexes the
/// neighbour and incident-edge arrays.
#[derive(Debug, Clone, Default)]
struct Csr {
    start: Vec<usize>,
    neighbours: Vec<usize>,
    edges: Vec<usize>,
}

impl Csr {
    fn build(n: usize, entries: &[(usize, usize, usize)]) -> Csr {
        let mut start = vec![0usize; n + 1];
        for &(v, _, _) in entries {
            start[v + 1] += 1;
        }
        for v in 0..n {
            start[v + 1] += start[v];
        }
        let mut neighbours = vec![0usize; entries.len()];
        let mut edges = vec![0usize; entries.len()];
        let mut cursor = start.clone();
        for &(v, u, e) in entries {
            neighbours[cursor[v]] = u;
            edges[cursor[v]] = e;
            cursor[v] += 1;
        }
        Csr {
            start,
            neighbours,
            edges,
        }
    }

    fn range(&self, v: usize) -> core::ops::Range<usize> {
        self.start[v]..self.start[v + 1]
    }
}

/// An immutable graph with edge weights, node sizes and node self-weights,
/// ready for community detection.
///
/// A `CommunityGraph` is either *primary* (built from a host graph via
/// [`CommunityGraph::new`] or [`CommunityGraph::with_attributes`]) or
/// *aggregated* (produced by collapsing a partition, with one vertex per
/// community). Both kinds own all their data and never change after
/// construction.
#[derive(Debug, Clone)]
pub struct CommunityGraph {
    directed: bool,
    correct_self_loops: bool,
    edge_from: Vec<usize>,
    edge_to: Vec<usize>,
    edge_weights: Vec<f64>,
    node_sizes: Vec<usize>,
    node_self_weights: Vec<f64>,
    // Undirected graphs use `adj_out` for every mode; `adj_in`/`adj_all`
    // stay empty then.
    adj_out: Csr,
    adj_in: Csr,
    adj_all: Csr,
    strength_in: Vec<f64>,
    strength_out: Vec<f64>,
    total_weight: f64,
    total_size: usize,
    density: f64,
}

impl CommunityGraph {
    /// Builds a view over `graph` with default attributes.
    ///
    /// Edge weights are taken from the host graph. Weights must be finite
    /// and non-negative; see [`CommunityGraph::with_attributes`] to override
    /// them or to allow negative weights.
    pub fn new<G: GraphAdapter>(graph: G) -> Result<CommunityGraph, CommunityError> {
        CommunityGraph::with_attributes(graph, GraphAttributes::default())
    }

    /// Builds a view over `graph` with explicit attributes.
    ///
    /// Fails with [`CommunityError::InputShape`] when an attribute vector
    /// has the wrong length or an edge weight is NaN, infinite, or negative
    /// while negative weights are not allowed.
    pub fn with_attributes<G: GraphAdapter>(
        graph: G,
        attributes: GraphAttributes,
    ) -> Result<CommunityGraph, CommunityError> {
        let n = graph.node_count();
        let m = graph.edge_count();

        let mut edge_from = Vec::with_capacity(m);
        let mut edge_to = Vec::with_capacity(m);
        let mut host_weights = Vec::with_capacity(m);
        for edge in graph.edge_references() {
            edge_from.push(graph.to_index(edge.source()));
            edge_to.push(graph.to_index(edge.target()));
            host_weights.push((*edge.weight()).into());
        }

        let edge_weights = match attributes.edge_weights {
            Some(weights) => {
                if weights.len() != m {
                    return Err(CommunityError::InputShape(
                        "edge weight vector length does not match the edge count of the graph",
                    ));
                }
                weights
            }
            None => host_weights,
        };
        for &w in &edge_weights {
            if !w.is_finite() {
                return Err(CommunityError::InputShape(
                    "edge weights must be finite and not NaN",
                ));
            }
            if w < 0.0 && !attributes.allow_negative_weights {
                return Err(CommunityError::InputShape(
                    "negative edge weights are not allowed for this graph",
                ));
            }
        }

        let node_sizes = match attributes.node_sizes {
            Some(sizes) => {
                if sizes.len() != n {
                    return Err(CommunityError::InputShape(
                        "node size vector length does not match the vertex count of the graph",
                    ));
                }
                sizes
            }
            None => vec![1; n],
        };
        if let Some(self_weights) = &attributes.node_self_weights {
            if self_weights.len() != n {
                return Err(CommunityError::InputShape(
                    "node self-weight vector length does not match the vertex count of the graph",
                ));
            }
        }

        Ok(CommunityGraph::from_parts(
            n,
            graph.is_directed(),
            edge_from,
            edge_to,
            edge_weights,
            node_sizes,
            attributes.node_self_weights,
            attributes.correct_self_loops,
        ))
    }

    /// Assembles a graph from raw edge arrays. Lengths are assumed
    /// consistent; the public constructors validate before calling this.
    pub(crate) fn from_parts(
        n: usize,
        directed: bool,
        edge_from: Vec<usize>,
        edge_to: Vec<usize>,
        edge_weights: Vec<f64>,
        node_sizes: Vec<usize>,
        node_self_weights: Option<Vec<f64>>,
        correct_self_loops: Option<bool>,
    ) -> CommunityGraph {
        debug_assert_eq!(edge_from.len(), edge_to.len());
        debug_assert_eq!(edge_from.len(), edge_weights.len());
        debug_assert_eq!(node_sizes.len(), n);

        let m = edge_from.len();
        let has_self_loops = (0..m).any(|e| edge_from[e] == edge_to[e]);
        let correct_self_loops = correct_self_loops.unwrap_or(has_self_loops);

        let node_self_weights = node_self_weights.unwrap_or_else(|| {
            let mut self_weights = vec![0.0; n];
            for e in 0..m {
                if edge_from[e] == edge_to[e] {
                    self_weights[edge_from[e]] += edge_weights[e];
                }
            }
            self_weights
        });

        // Incidence entries (vertex, neighbour, edge id). Undirected graphs
        // get a single list shared by all modes, with a self-loop listed
        // twice; directed graphs get out, in and their concatenation, with
        // a self-loop listed once per direction.
        let (adj_out, adj_in, adj_all) = if directed {
            let mut out_entries = Vec::with_capacity(m);
            let mut in_entries = Vec::with_capacity(m);
            let mut all_entries = Vec::with_capacity(2 * m);
            for e in 0..m {
                out_entries.push((edge_from[e], edge_to[e], e));
                in_entries.push((edge_to[e], edge_from[e], e));
                all_entries.push((edge_from[e], edge_to[e], e));
                all_entries.push((edge_to[e], edge_from[e], e));
            }
            (
                Csr::build(n, &out_entries),
                Csr::build(n, &in_entries),
                Csr::build(n, &all_entries),
            )
        } else {
            let mut entries = Vec::with_capacity(2 * m);
            for e in 0..m {
                entries.push((edge_from[e], edge_to[e], e));
                entries.push((edge_to[e], edge_from[e], e));
            }
            (Csr::build(n, &entries), Csr::default(), Csr::default())
        };

        let mut strength_out = vec![0.0; n];
        let mut strength_in = vec![0.0; n];
        if directed {
            for e in 0..m {
                strength_out[edge_from[e]] += edge_weights[e];
                strength_in[edge_to[e]] += edge_weights[e];
            }
        } else {
            // Incident weights from both endpoints; a self-loop counts twice.
            for e in 0..m {
                strength_out[edge_from[e]] += edge_weights[e];
                strength_out[edge_to[e]] += edge_weights[e];
            }
            strength_in.clone_from(&strength_out);
        }

        let total_weight: f64 = edge_weights.iter().sum();
        let total_size: usize = node_sizes.iter().sum();

        let ts = total_size as f64;
        let normalise = if correct_self_loops {
            ts * ts
        } else {
            ts * (ts - 1.0)
        };
        let density = if normalise > 0.0 {
            if directed {
                total_weight / normalise
            } else {
                2.0 * total_weight / normalise
            }
        } else {
            0.0
        };

        CommunityGraph {
            directed,
            correct_self_loops,
            edge_from,
            edge_to,
            edge_weights,
            node_sizes,
            node_self_weights,
            adj_out,
            adj_in,
            adj_all,
            strength_in,
            strength_out,
            total_weight,
            total_size,
            density,
        }
    }

    fn csr(&self, mode: Mode) -> &Csr {
        if !self.directed {
            return &self.adj_out;
        }
        match mode {
            Mode::Out => &self.adj_out,
            Mode::In => &self.adj_in,
            Mode::All => &self.adj_all,
        }
    }

    /// Number of vertices.
    pub fn vcount(&self) -> usize {
        self.node_sizes.len()
    }

    /// Number of edges.
    pub fn ecount(&self) -> usize {
        self.edge_weights.len()
    }

    /// Whether the graph is directed.
    pub fn is_directed(&self) -> bool {
        self.directed
    }

    /// Whether self-pairs count as possible edges in density and
    /// possible-edge computations.
    pub fn correct_self_loops(&self) -> bool {
        self.correct_self_loops
    }

    /// Sum of all edge weights.
    pub fn total_weight(&self) -> f64 {
        self.total_weight
    }

    /// Sum of all node sizes.
    pub fn total_size(&self) -> usize {
        self.total_size
    }

    /// Graph density: total weight over possible weight, doubled for
    /// undirected graphs, 0.0 for graphs too small to normalise.
    pub fn density(&self) -> f64 {
        self.density
    }

    /// Endpoints `(from, to)` of edge `e`.
    ///
    /// **Panics** if `e` is out of bounds.
    pub fn edge(&self, e: usize) -> (usize, usize) {
        (self.edge_from[e], self.edge_to[e])
    }

    /// Weight of edge `e`.
    ///
    /// **Panics** if `e` is out of bounds.
    pub fn edge_weight(&self, e: usize) -> f64 {
        self.edge_weights[e]
    }

    /// Iterates `(from, to, weight)` over all edges, in edge-id order.
    pub fn edges(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        (0..self.ecount()).map(move |e| (self.edge_from[e], self.edge_to[e], self.edge_weights[e]))
    }

    /// Size of vertex `v` (1 on primary views unless overridden; the size
    /// of the collapsed community on aggregated views).
    ///
    /// **Panics** if `v` is out of bounds.
    pub fn node_size(&self, v: usize) -> usize {
        self.node_sizes[v]
    }

    /// All node sizes, indexed by vertex.
    pub fn node_sizes(&self) -> &[usize] {
        &self.node_sizes
    }

    /// Self-loop weight of vertex `v`, 0.0 if it has none.
    ///
    /// **Panics** if `v` is out of bounds.
    pub fn node_self_weight(&self, v: usize) -> f64 {
        self.node_self_weights[v]
    }

    /// Number of incident edges of `v` in the given mode. Self-loops count
    /// once for `Out`/`In` on directed graphs and twice otherwise.
    ///
    /// **Panics** if `v` is out of bounds.
    pub fn degree(&self, v: usize, mode: Mode) -> usize {
        self.csr(mode).range(v).len()
    }

    /// Summed incident edge weight of `v`. For `Mode::All` on a directed
    /// graph this is the sum of in- and out-strength.
    ///
    /// **Panics** if `v` is out of bounds.
    pub fn strength(&self, v: usize, mode: Mode) -> f64 {
        if !self.directed {
            return self.strength_out[v];
        }
        match mode {
            Mode::Out => self.strength_out[v],
            Mode::In => self.strength_in[v],
            Mode::All => self.strength_in[v] + self.strength_out[v],
        }
    }

    /// Neighbours of `v` in the given mode, parallel to
    /// [`CommunityGraph::neighbour_edges`].
    ///
    /// **Panics** if `v` is out of bounds.
    pub fn neighbours(&self, v: usize, mode: Mode) -> &[usize] {
        let csr = self.csr(mode);
        &csr.neighbours[csr.range(v)]
    }

    /// Ids of the edges incident to `v` in the given mode, parallel to
    /// [`CommunityGraph::neighbours`].
    ///
    /// **Panics** if `v` is out of bounds.
    pub fn neighbour_edges(&self, v: usize, mode: Mode) -> &[usize] {
        let csr = self.csr(mode);
        &csr.edges[csr.range(v)]
    }

    /// Number of possible edges among `n` vertices under this graph's
    /// directedness and self-loop convention (integer division).
    pub fn possible_edges(&self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        let pairs = if self.correct_self_loops {
            n * n
        } else {
            n * (n - 1)
        };
        pairs / (2 - self.directed as usize)
    }

    /// A uniformly random vertex.
    ///
    /// **Panics** if the graph has no vertices.
    pub fn random_node<R: Rng + ?Sized>(&self, rng: &mut R) -> usize {
        rng.gen_range(0..self.vcount())
    }

    /// A uniformly random neighbour of `v` in the given mode, or
    /// [`CommunityError::IsolatedNode`] if `v` has none.
    ///
    /// **Panics** if `v` is out of bounds.
    pub fn random_neighbour<R: Rng + ?Sized>(
        &self,
        v: usize,
        mode: Mode,
        rng: &mut R,
    ) -> Result<usize, CommunityError> {
        let neighbours = self.neighbours(v, mode);
        if neighbours.is_empty() {
            return Err(CommunityError::IsolatedNode(v));
        }
        Ok(neighbours[rng.gen_range(0..neighbours.len())])
    }

    /// Aggregates the graph by the communities of `partition`: one
    /// super-node per community, super-edge weights summed over the original
    /// edges between the two communities, super-node size equal to the
    /// community size, intra-community weight becoming the super-node's
    /// self-loop.
    ///
    /// [`Partition::aggregate_partition`](crate::partition::Partition::aggregate_partition)
    /// wraps this and also carries the quality function across.
    pub fn collapse<Q: crate::partition::QualityFunction>(
        &self,
        partition: &crate::partition::Partition<Q>,
    ) -> CommunityGraph {
        self.collapse_by(
            partition.membership(),
            partition.nb_communities(),
            partition.csizes(),
        )
    }

    /// Aggregates the graph by community: one super-node per community of
    /// `membership`, super-edge weights summed over the original edges
    /// between the two communities (parallel super-edges merged), super-node
    /// size taken from `csize`, intra-community weight becoming the
    /// super-node's self-loop. Directedness and the self-loop convention are
    /// inherited.
    pub(crate) fn collapse_by(
        &self,
        membership: &[usize],
        nb_communities: usize,
        csize: &[usize],
    ) -> CommunityGraph {
        let mut super_edges: Vec<IndexMap<usize, f64>> = vec![IndexMap::new(); nb_communities];
        for e in 0..self.ecount() {
            let mut a = membership[self.edge_from[e]];
            let mut b = membership[self.edge_to[e]];
            if !self.directed && a > b {
                core::mem::swap(&mut a, &mut b);
            }
            *super_edges[a].entry(b).or_insert(0.0) += self.edge_weights[e];
        }

        let m_collapsed: usize = super_edges.iter().map(IndexMap::len).sum();
        let mut edge_from = Vec::with_capacity(m_collapsed);
        let mut edge_to = Vec::with_capacity(m_collapsed);
        let mut edge_weights = Vec::with_capacity(m_collapsed);
        for (a, row) in super_edges.iter().enumerate() {
            for (&b, &w) in row {
                edge_from.push(a);
                edge_to.push(b);
                edge_weights.push(w);
            }
        }

        CommunityGraph::from_parts(
            nb_communities,
            self.directed,
            edge_from,
            edge_to,
            edge_weights,
            csize.to_vec(),
            None,
            Some(self.correct_self_loops),
        )
    }
}
