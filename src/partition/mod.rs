//! Vertex partitions with incrementally maintained community aggregates.
//!
//! [`Partition`] keeps, for every community, its member set, its size, its
//! internal weight and its directional (from/to) weights, plus the two
//! partition-wide totals needed by the global quality functions. All of it
//! is updated in O(deg(v)) by [`Partition::move_node`] and can be rebuilt
//! from scratch from the membership vector alone.
//!
//! The quality function is a value attached to the partition and consulted
//! through the [`QualityFunction`] capability trait; the concrete variants
//! live in the sibling modules.

use std::sync::Arc;

use fixedbitset::FixedBitSet;
use hashbrown::HashSet;

use crate::error::CommunityError;
use crate::graph::{CommunityGraph, Mode};

mod cpm;
mod generalized_modularity;
mod modularity;
mod rb_configuration;
mod rb_er;
mod significance;
mod surprise;

pub use cpm::Cpm;
pub use generalized_modularity::GeneralizedModularity;
pub use modularity::Modularity;
pub use rb_configuration::RBConfiguration;
pub use rb_er::RBErdosRenyi;
pub use significance::Significance;
pub use surprise::Surprise;

/// The undirected-correction factor: edge weights are counted from both
/// endpoints on undirected graphs.
pub(crate) fn correction(directed: bool) -> f64 {
    if directed {
        1.0
    } else {
        2.0
    }
}

/// The binary Kullback-Leibler divergence, with the 0·log 0 = 0 convention.
pub(crate) fn kl(q: f64, p: f64) -> f64 {
    let mut divergence = 0.0;
    if q > 0.0 && p > 0.0 {
        divergence += q * (q / p).ln();
    }
    if q < 1.0 && p < 1.0 {
        divergence += (1.0 - q) * ((1.0 - q) / (1.0 - p)).ln();
    }
    divergence
}

/// A quality function over partitions.
///
/// A value of an implementing type is attached to each [`Partition`]; the
/// partition supplies the aggregates, the quality function the objective.
/// The one contract that everything else rests on: for every vertex `v` and
/// community `c`, `diff_move(v, c)` must equal the change of `quality` that
/// actually moving `v` to `c` would produce, up to floating-point noise.
pub trait QualityFunction: Clone + Sized {
    /// Predicted change in quality for moving `v` into `new_comm`, without
    /// moving it. Zero when `new_comm` is the current community.
    fn diff_move(&self, partition: &Partition<Self>, v: usize, new_comm: usize) -> f64;

    /// The quality of the partition.
    fn quality(&self, partition: &Partition<Self>) -> f64;

    /// Checks quality-function state against the graph it is about to be
    /// attached to. The default accepts everything.
    fn validate(&self, _graph: &CommunityGraph) -> Result<(), CommunityError> {
        Ok(())
    }

    /// The quality function to attach to the aggregated partition when
    /// `partition` is collapsed. The default carries the value over
    /// unchanged.
    fn on_aggregate(&self, _partition: &Partition<Self>) -> Self {
        self.clone()
    }

    /// Whether the quality value is preserved when the partition is
    /// collapsed onto its community graph. Only Significance opts out.
    fn quality_preserved_on_aggregate(&self) -> bool {
        true
    }
}

/// Quality functions carrying a linear resolution parameter γ.
pub trait LinearResolution: QualityFunction {
    /// The current resolution parameter.
    fn resolution(&self) -> f64;

    /// Replaces the resolution parameter.
    fn set_resolution(&mut self, resolution: f64);

    /// The quality of `partition` evaluated at `resolution` instead of the
    /// stored parameter. Diagnostic; the optimiser never calls this.
    fn quality_at(&self, partition: &Partition<Self>, resolution: f64) -> f64;
}

/// A disjoint assignment of every vertex to a community, with incremental
/// aggregates.
///
/// Mutation goes through [`Partition::move_node`] (or the rebuild-style
/// operations, which recompute every aggregate from the membership vector).
#[derive(Debug, Clone)]
pub struct Partition<Q: QualityFunction> {
    graph: Arc<CommunityGraph>,
    quality_fn: Q,
    membership: Vec<usize>,
    community: Vec<HashSet<usize>>,
    csize: Vec<usize>,
    weight_in: Vec<f64>,
    weight_from: Vec<f64>,
    weight_to: Vec<f64>,
    total_weight_in_all: f64,
    total_possible_edges_in_all: f64,
}

impl<Q: QualityFunction> Partition<Q> {
    /// Creates the singleton partition: every vertex in its own community.
    pub fn singleton(
        graph: Arc<CommunityGraph>,
        quality_fn: Q,
    ) -> Result<Partition<Q>, CommunityError> {
        quality_fn.validate(&graph)?;
        let membership = (0..graph.vcount()).collect();
        Ok(Partition::build(graph, membership, quality_fn))
    }

    /// Creates a partition from an explicit membership vector.
    ///
    /// The vector must have one entry per vertex, each in `0..n`. The
    /// numbering does not have to be consecutive;
    /// [`Partition::renumber_communities`] enforces that later.
    pub fn with_membership(
        graph: Arc<CommunityGraph>,
        membership: Vec<usize>,
        quality_fn: Q,
    ) -> Result<Partition<Q>, CommunityError> {
        let n = graph.vcount();
        if membership.len() != n {
            return Err(CommunityError::InputShape(
                "membership vector has incorrect size",
            ));
        }
        if membership.iter().any(|&c| c >= n) {
            return Err(CommunityError::InputShape(
                "membership entries must lie in 0..n",
            ));
        }
        quality_fn.validate(&graph)?;
        Ok(Partition::build(graph, membership, quality_fn))
    }

    fn build(graph: Arc<CommunityGraph>, membership: Vec<usize>, quality_fn: Q) -> Partition<Q> {
        let mut partition = Partition {
            graph,
            quality_fn,
            membership,
            community: Vec::new(),
            csize: Vec::new(),
            weight_in: Vec::new(),
            weight_from: Vec::new(),
            weight_to: Vec::new(),
            total_weight_in_all: 0.0,
            total_possible_edges_in_all: 0.0,
        };
        partition.init_admin();
        partition
    }

    /// Rebuilds every aggregate from the membership vector.
    fn init_admin(&mut self) {
        let graph = Arc::clone(&self.graph);
        let n = graph.vcount();
        let nb_comms = self.membership.iter().max().map_or(0, |&c| c + 1);

        self.community = vec![HashSet::new(); nb_comms];
        self.csize = vec![0; nb_comms];
        self.weight_in = vec![0.0; nb_comms];
        self.weight_from = vec![0.0; nb_comms];
        self.weight_to = vec![0.0; nb_comms];
        self.total_weight_in_all = 0.0;

        for v in 0..n {
            let v_comm = self.membership[v];
            self.community[v_comm].insert(v);
            self.csize[v_comm] += graph.node_size(v);

            let neighbours = graph.neighbours(v, Mode::Out);
            let edges = graph.neighbour_edges(v, Mode::Out);
            for (&u, &e) in neighbours.iter().zip(edges) {
                let u_comm = self.membership[u];
                let mut w = graph.edge_weight(e);
                self.weight_from[v_comm] += w;
                self.weight_to[u_comm] += w;
                if v_comm == u_comm {
                    if !graph.is_directed() {
                        w /= 2.0;
                    }
                    self.weight_in[v_comm] += w;
                    self.total_weight_in_all += w;
                }
            }
        }

        self.total_possible_edges_in_all = (0..nb_comms)
            .map(|c| self.community_pairs(self.csize[c]))
            .sum();
    }

    /// Possible intra-community edges for a community of the given size,
    /// under the graph's directedness and self-loop conventions. Real
    /// division, so the incremental update in `move_node` matches this sum
    /// exactly.
    pub(crate) fn community_pairs(&self, size: usize) -> f64 {
        let n = size as f64;
        let pairs = if self.graph.correct_self_loops() {
            n * n
        } else {
            n * (n - 1.0)
        };
        pairs / correction(self.graph.is_directed())
    }

    /// Moves vertex `v` into community `new_comm`, updating all aggregates
    /// in O(deg(v)). Moving a vertex to its current community is a no-op.
    pub fn move_node(&mut self, v: usize, new_comm: usize) -> Result<(), CommunityError> {
        let n = self.graph.vcount();
        if v >= n {
            return Err(CommunityError::IndexOutOfRange { index: v, bound: n });
        }
        let nb = self.nb_communities();
        if new_comm >= nb {
            return Err(CommunityError::IndexOutOfRange {
                index: new_comm,
                bound: nb,
            });
        }
        self.move_node_internal(v, new_comm);
        Ok(())
    }

    pub(crate) fn move_node_internal(&mut self, v: usize, new_comm: usize) {
        let old_comm = self.membership[v];
        if old_comm == new_comm {
            return;
        }
        let graph = Arc::clone(&self.graph);
        let node_size = graph.node_size(v);
        let u_corr = correction(graph.is_directed());

        // The possible-edge total must be updated from the sizes as they are
        // before the move; the expression is the same for both self-loop
        // conventions.
        self.total_possible_edges_in_all += 2.0
            * node_size as f64
            * (self.csize[new_comm] as f64 - self.csize[old_comm] as f64 + node_size as f64)
            / u_corr;

        self.community[old_comm].remove(&v);
        self.csize[old_comm] -= node_size;
        self.community[new_comm].insert(v);
        self.csize[new_comm] += node_size;

        for mode in [Mode::Out, Mode::In] {
            let neighbours = graph.neighbours(v, mode);
            let edges = graph.neighbour_edges(v, mode);
            for (&u, &e) in neighbours.iter().zip(edges) {
                // Pre-move communities; v itself is handled by the u == v
                // clauses below.
                let u_comm = self.membership[u];
                let w = graph.edge_weight(e);
                match mode {
                    Mode::Out => {
                        self.weight_from[old_comm] -= w;
                        self.weight_from[new_comm] += w;
                    }
                    _ => {
                        self.weight_to[old_comm] -= w;
                        self.weight_to[new_comm] += w;
                    }
                }
                // Over the visits of one edge (twice per mode for an
                // undirected self-loop, once otherwise) these fractions add
                // up to exactly the edge's internal contribution.
                let int_weight = w
                    / (if graph.is_directed() { 1.0 } else { 2.0 })
                    / (if u == v { 2.0 } else { 1.0 });
                if u_comm == old_comm {
                    self.weight_in[old_comm] -= int_weight;
                    self.total_weight_in_all -= int_weight;
                }
                if u_comm == new_comm || u == v {
                    self.weight_in[new_comm] += int_weight;
                    self.total_weight_in_all += int_weight;
                }
            }
        }

        self.membership[v] = new_comm;
    }

    /// Renumbers communities `0..k` by decreasing size (ties by old id,
    /// ascending) and drops empty communities, then rebuilds the
    /// aggregates.
    pub fn renumber_communities(&mut self) {
        let nb = self.nb_communities();
        let mut order: Vec<usize> = (0..nb).collect();
        order.sort_by_key(|&c| (core::cmp::Reverse(self.csize[c]), c));

        let mut new_id = vec![0usize; nb];
        for (new, &old) in order.iter().enumerate() {
            new_id[old] = new;
        }
        for comm in &mut self.membership {
            *comm = new_id[*comm];
        }
        self.init_admin();
    }

    /// Applies an externally supplied relabelling and rebuilds. No property
    /// of the new numbering is enforced beyond being in `0..n`.
    pub fn renumber_communities_with(
        &mut self,
        new_membership: &[usize],
    ) -> Result<(), CommunityError> {
        let n = self.graph.vcount();
        if new_membership.len() != n {
            return Err(CommunityError::InputShape(
                "membership vector has incorrect size",
            ));
        }
        if new_membership.iter().any(|&c| c >= n) {
            return Err(CommunityError::InputShape(
                "membership entries must lie in 0..n",
            ));
        }
        self.membership.copy_from_slice(new_membership);
        self.init_admin();
        Ok(())
    }

    /// Replaces the membership vector wholesale and rebuilds.
    pub fn set_membership(&mut self, membership: Vec<usize>) -> Result<(), CommunityError> {
        let n = self.graph.vcount();
        if membership.len() != n {
            return Err(CommunityError::InputShape(
                "membership vector has incorrect size",
            ));
        }
        if membership.iter().any(|&c| c >= n) {
            return Err(CommunityError::InputShape(
                "membership entries must lie in 0..n",
            ));
        }
        self.membership = membership;
        self.init_admin();
        Ok(())
    }

    /// Lifts the communities of a partition of the aggregated graph back
    /// onto this partition: vertex `v` joins the community that its current
    /// community (a vertex of the coarser graph) belongs to in `coarser`.
    ///
    /// **Panics** if a community id of this partition is not a vertex of
    /// the coarser partition's graph.
    pub fn from_coarser_partition(&mut self, coarser: &Partition<Q>) {
        for v in 0..self.membership.len() {
            self.membership[v] = coarser.membership[self.membership[v]];
        }
        self.init_admin();
    }

    /// Lifts an explicit coarse membership vector onto this partition.
    ///
    /// `coarse_node`, when given, maps each vertex to its node in the
    /// coarser graph; otherwise the vertex's current community id is used.
    pub fn from_coarse_membership(
        &mut self,
        coarse_membership: &[usize],
        coarse_node: Option<&[usize]>,
    ) -> Result<(), CommunityError> {
        let n = self.graph.vcount();
        if let Some(coarse_node) = coarse_node {
            if coarse_node.len() != n {
                return Err(CommunityError::InputShape(
                    "coarse node vector has incorrect size",
                ));
            }
        }
        let mut new_membership = Vec::with_capacity(n);
        for v in 0..n {
            let coarse = coarse_node.map_or(self.membership[v], |nodes| nodes[v]);
            if coarse >= coarse_membership.len() {
                return Err(CommunityError::IndexOutOfRange {
                    index: coarse,
                    bound: coarse_membership.len(),
                });
            }
            new_membership.push(coarse_membership[coarse]);
        }
        self.membership = new_membership;
        self.init_admin();
        Ok(())
    }

    /// Copies the membership of `other` (a partition over a graph with the
    /// same vertex count) and rebuilds.
    pub fn from_partition(&mut self, other: &Partition<Q>) -> Result<(), CommunityError> {
        if other.membership.len() != self.membership.len() {
            return Err(CommunityError::InputShape(
                "partitions cover a different number of vertices",
            ));
        }
        self.membership.copy_from_slice(&other.membership);
        self.init_admin();
        Ok(())
    }

    /// Collapses the partition onto its community graph and returns the
    /// singleton partition over it, with the quality function carried
    /// across via [`QualityFunction::on_aggregate`].
    pub fn aggregate_partition(&self) -> Partition<Q> {
        let collapsed = Arc::new(self.graph.collapse_by(
            &self.membership,
            self.nb_communities(),
            &self.csize,
        ));
        let quality_fn = self.quality_fn.on_aggregate(self);
        let membership = (0..collapsed.vcount()).collect();
        Partition::build(collapsed, membership, quality_fn)
    }

    /// Predicted change in quality for moving `v` into `new_comm`.
    ///
    /// **Panics** if `v` or `new_comm` is out of bounds.
    pub fn diff_move(&self, v: usize, new_comm: usize) -> f64 {
        self.quality_fn.diff_move(self, v, new_comm)
    }

    /// The quality of the partition under its quality function.
    pub fn quality(&self) -> f64 {
        self.quality_fn.quality(self)
    }

    /// The underlying graph view.
    pub fn graph(&self) -> &CommunityGraph {
        &self.graph
    }

    /// Shared handle to the underlying graph view.
    pub fn graph_arc(&self) -> &Arc<CommunityGraph> {
        &self.graph
    }

    /// The attached quality function.
    pub fn quality_fn(&self) -> &Q {
        &self.quality_fn
    }

    /// The membership vector.
    pub fn membership(&self) -> &[usize] {
        &self.membership
    }

    /// Community of vertex `v`.
    ///
    /// **Panics** if `v` is out of bounds.
    pub fn membership_of(&self, v: usize) -> usize {
        self.membership[v]
    }

    /// Number of communities (including empty ones until the next
    /// renumbering).
    pub fn nb_communities(&self) -> usize {
        self.community.len()
    }

    /// Members of community `comm`.
    ///
    /// **Panics** if `comm` is out of bounds.
    pub fn community(&self, comm: usize) -> &HashSet<usize> {
        &self.community[comm]
    }

    /// Total node size of community `comm`.
    ///
    /// **Panics** if `comm` is out of bounds.
    pub fn csize(&self, comm: usize) -> usize {
        self.csize[comm]
    }

    /// Community sizes, indexed by community id.
    pub fn csizes(&self) -> &[usize] {
        &self.csize
    }

    /// Total weight of the edges internal to `comm` (undirected internal
    /// edges counted once, self-loops once).
    ///
    /// **Panics** if `comm` is out of bounds.
    pub fn total_weight_in_comm(&self, comm: usize) -> f64 {
        self.weight_in[comm]
    }

    /// Total weight of the edges leaving `comm` members (incident weight on
    /// undirected graphs).
    ///
    /// **Panics** if `comm` is out of bounds.
    pub fn total_weight_from_comm(&self, comm: usize) -> f64 {
        self.weight_from[comm]
    }

    /// Total weight of the edges entering `comm` members (incident weight
    /// on undirected graphs).
    ///
    /// **Panics** if `comm` is out of bounds.
    pub fn total_weight_to_comm(&self, comm: usize) -> f64 {
        self.weight_to[comm]
    }

    /// Sum of the internal weights of all communities.
    pub fn total_weight_in_all_comms(&self) -> f64 {
        self.total_weight_in_all
    }

    /// Sum over communities of the possible intra-community edge count.
    pub fn total_possible_edges_in_all_comms(&self) -> f64 {
        self.total_possible_edges_in_all
    }

    /// Summed weight of v's outgoing edges whose other endpoint lies in
    /// `comm`. A self-loop contributes to v's own community, once.
    ///
    /// **Panics** if `v` is out of bounds.
    pub fn weight_to_comm(&self, v: usize, comm: usize) -> f64 {
        self.weight_tofrom_comm(v, comm, Mode::Out)
    }

    /// Summed weight of v's incoming edges whose other endpoint lies in
    /// `comm`. A self-loop contributes to v's own community, once.
    ///
    /// **Panics** if `v` is out of bounds.
    pub fn weight_from_comm(&self, v: usize, comm: usize) -> f64 {
        self.weight_tofrom_comm(v, comm, Mode::In)
    }

    fn weight_tofrom_comm(&self, v: usize, comm: usize, mode: Mode) -> f64 {
        let neighbours = self.graph.neighbours(v, mode);
        let edges = self.graph.neighbour_edges(v, mode);
        let mut total = 0.0;
        for (&u, &e) in neighbours.iter().zip(edges) {
            if self.membership[u] == comm {
                let mut w = self.graph.edge_weight(e);
                // An undirected self-loop is listed twice.
                if u == v && !self.graph.is_directed() {
                    w /= 2.0;
                }
                total += w;
            }
        }
        total
    }

    /// The set of communities among v's neighbours in the given mode, in
    /// first-encountered adjacency order (stable for a fixed partition).
    ///
    /// **Panics** if `v` is out of bounds.
    pub fn neigh_comms(&self, v: usize, mode: Mode) -> Vec<usize> {
        let mut seen = FixedBitSet::with_capacity(self.nb_communities());
        let mut comms = Vec::new();
        for &u in self.graph.neighbours(v, mode) {
            let comm = self.membership[u];
            if !seen.put(comm) {
                comms.push(comm);
            }
        }
        comms
    }
}

impl<Q: LinearResolution> Partition<Q> {
    /// The resolution parameter γ of the attached quality function.
    pub fn resolution(&self) -> f64 {
        self.quality_fn.resolution()
    }

    /// Replaces the resolution parameter. Fails on NaN.
    pub fn set_resolution(&mut self, resolution: f64) -> Result<(), CommunityError> {
        if resolution.is_nan() {
            return Err(CommunityError::InputShape("resolution must not be NaN"));
        }
        self.quality_fn.set_resolution(resolution);
        Ok(())
    }

    /// The quality evaluated at an overriding resolution, leaving the
    /// stored parameter untouched.
    pub fn quality_at(&self, resolution: f64) -> f64 {
        self.quality_fn.quality_at(self, resolution)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{Modularity, Partition};
    use crate::graph::{CommunityGraph, Mode};
    use petgraph::graph::UnGraph;

    fn path_graph() -> Arc<CommunityGraph> {
        let g = UnGraph::<(), f64>::from_edges([(0, 1, 1.0), (1, 2, 1.0), (2, 3, 1.0)]);
        Arc::new(CommunityGraph::new(&g).unwrap())
    }

    #[test]
    fn singleton_aggregates() {
        let partition = Partition::singleton(path_graph(), Modularity).unwrap();
        assert_eq!(partition.nb_communities(), 4);
        assert_eq!(partition.total_weight_in_all_comms(), 0.0);
        for c in 0..4 {
            assert_eq!(partition.csize(c), 1);
            assert_eq!(partition.total_weight_in_comm(c), 0.0);
        }
        // Undirected: incident weight from both endpoints.
        assert_eq!(partition.total_weight_from_comm(1), 2.0);
        assert_eq!(partition.total_weight_to_comm(1), 2.0);
    }

    #[test]
    fn move_updates_membership_and_sizes() {
        let mut partition = Partition::singleton(path_graph(), Modularity).unwrap();
        partition.move_node(0, 1).unwrap();
        assert_eq!(partition.membership_of(0), 1);
        assert_eq!(partition.csize(0), 0);
        assert_eq!(partition.csize(1), 2);
        assert_eq!(partition.total_weight_in_comm(1), 1.0);
        assert_eq!(partition.total_weight_in_all_comms(), 1.0);
    }

    #[test]
    fn renumber_drops_empty_communities() {
        let mut partition = Partition::singleton(path_graph(), Modularity).unwrap();
        partition.move_node(0, 1).unwrap();
        partition.move_node(3, 2).unwrap();
        partition.renumber_communities();
        assert_eq!(partition.nb_communities(), 2);
        assert_eq!(partition.membership(), &[0, 0, 1, 1]);
    }

    #[test]
    fn neigh_comms_follow_adjacency() {
        let partition = Partition::singleton(path_graph(), Modularity).unwrap();
        let comms = partition.neigh_comms(1, Mode::All);
        assert_eq!(comms.len(), 2);
        assert!(comms.contains(&0) && comms.contains(&2));
    }
}
