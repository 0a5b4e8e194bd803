//! The greedy multi-level optimiser.
//!
//! Quality is improved by sweeping vertices and applying the best
//! single-vertex move until the sweep stops paying, then collapsing each
//! community into a super-node and repeating on the aggregated graph. The
//! quality functions guarantee that a gain found on the coarser graph is
//! the same gain on the finer one, so the recursion only ever improves the
//! objective.

use std::sync::Arc;

use indexmap::IndexMap;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::CommunityError;
use crate::graph::{CommunityGraph, Mode};
use crate::partition::{Partition, QualityFunction};

/// How candidate communities are collected for each vertex during a sweep.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConsiderComms {
    /// Try every community.
    AllComms = 1,
    /// Try the communities of the vertex's neighbours (the default).
    AllNeighComms = 2,
    /// Try the community of one uniformly random vertex.
    RandComm = 3,
    /// Try the community of one uniformly random neighbour.
    RandNeighComm = 4,
}

/// Greedy Louvain-style optimiser over a partition's quality function.
///
/// All fields are plain state; tweak them directly or start from
/// [`Optimiser::default`].
#[derive(Debug, Clone)]
pub struct Optimiser {
    /// Stop iterating when the improvement of a sweep falls below this.
    pub eps: f64,
    /// Stop iterating when fewer than `delta · n` vertices moved.
    pub delta: f64,
    /// Hard cap on sweeps within one `move_nodes` call.
    pub max_itr: usize,
    /// Shuffle the vertex order once per sweep.
    pub random_order: bool,
    /// Candidate-community policy.
    pub consider_comms: ConsiderComms,
}

impl Default for Optimiser {
    fn default() -> Optimiser {
        Optimiser {
            eps: 1e-5,
            delta: 1e-2,
            max_itr: 10_000,
            random_order: true,
            consider_comms: ConsiderComms::AllNeighComms,
        }
    }
}

impl Optimiser {
    /// An optimiser with the default thresholds.
    pub fn new() -> Optimiser {
        Optimiser::default()
    }

    /// Optimises the partition in place: local moves, then repeated
    /// collapse-and-move rounds while they keep improving, then a final
    /// renumbering. Returns the final quality.
    pub fn optimise_partition<Q, R>(&self, partition: &mut Partition<Q>, rng: &mut R) -> f64
    where
        Q: QualityFunction,
        R: Rng + ?Sized,
    {
        let mut improv = self.move_nodes_with(partition, self.consider_comms, rng);
        while improv > self.eps {
            let mut collapsed = partition.aggregate_partition();
            #[cfg(debug_assertions)]
            if partition.quality_fn().quality_preserved_on_aggregate() {
                let quality = partition.quality();
                let collapsed_quality = collapsed.quality();
                debug_assert!(
                    (quality - collapsed_quality).abs() <= 1e-6 * quality.abs().max(1.0),
                    "aggregation changed the quality: {quality} vs {collapsed_quality}"
                );
            }
            improv = self.move_nodes_with(&mut collapsed, self.consider_comms, rng);
            partition.from_coarser_partition(&collapsed);
        }
        partition.renumber_communities();
        partition.quality()
    }

    /// Builds the singleton partition over `graph`, optimises it and
    /// returns it.
    pub fn find_partition<Q, R>(
        &self,
        graph: Arc<CommunityGraph>,
        quality_fn: Q,
        rng: &mut R,
    ) -> Result<Partition<Q>, CommunityError>
    where
        Q: QualityFunction,
        R: Rng + ?Sized,
    {
        let mut partition = Partition::singleton(graph, quality_fn)?;
        self.optimise_partition(&mut partition, rng);
        Ok(partition)
    }

    /// One round of local moves with the configured candidate policy.
    pub fn move_nodes<Q, R>(&self, partition: &mut Partition<Q>, rng: &mut R) -> f64
    where
        Q: QualityFunction,
        R: Rng + ?Sized,
    {
        self.move_nodes_with(partition, self.consider_comms, rng)
    }

    /// Sweeps all vertices, repeatedly, greedily applying the best positive
    /// move per vertex, until a sweep's improvement drops to `eps`, fewer
    /// than `delta · n` vertices move, or `max_itr` sweeps have run.
    /// Renumbers the communities at the end and returns the cumulative
    /// improvement.
    ///
    /// Vertices without any incident edge are never moved.
    pub fn move_nodes_with<Q, R>(
        &self,
        partition: &mut Partition<Q>,
        consider_comms: ConsiderComms,
        rng: &mut R,
    ) -> f64
    where
        Q: QualityFunction,
        R: Rng + ?Sized,
    {
        let n = partition.graph().vcount();
        let mut itr = 0usize;
        let mut total_improv = 0.0;
        let mut improv = 2.0 * self.eps;
        let mut nb_moves = 2 * n;

        while improv > self.eps
            && nb_moves as f64 > n as f64 * self.delta
            && itr < self.max_itr
        {
            itr += 1;
            nb_moves = 0;
            improv = 0.0;

            let mut vertex_order: Vec<usize> = (0..n).collect();
            if self.random_order {
                vertex_order.shuffle(rng);
            }

            for &v in &vertex_order {
                if partition.graph().degree(v, Mode::All) == 0 {
                    continue;
                }
                let v_comm = partition.membership_of(v);
                let mut max_improv = 0.0;
                let mut max_comm = v_comm;

                match consider_comms {
                    ConsiderComms::AllComms => {
                        for comm in 0..partition.nb_communities() {
                            let gain = partition.diff_move(v, comm);
                            if gain > max_improv {
                                max_improv = gain;
                                max_comm = comm;
                            }
                        }
                    }
                    ConsiderComms::AllNeighComms => {
                        for comm in partition.neigh_comms(v, Mode::All) {
                            let gain = partition.diff_move(v, comm);
                            if gain > max_improv {
                                max_improv = gain;
                                max_comm = comm;
                            }
                        }
                    }
                    ConsiderComms::RandComm => {
                        let node = partition.graph().random_node(rng);
                        let comm = partition.membership_of(node);
                        let gain = partition.diff_move(v, comm);
                        if gain > 0.0 {
                            max_improv = gain;
                            max_comm = comm;
                        }
                    }
                    ConsiderComms::RandNeighComm => {
                        // Degree was checked above, so a neighbour exists.
                        if let Ok(u) = partition.graph().random_neighbour(v, Mode::All, rng) {
                            let comm = partition.membership_of(u);
                            let gain = partition.diff_move(v, comm);
                            if gain > 0.0 {
                                max_improv = gain;
                                max_comm = comm;
                            }
                        }
                    }
                }

                if max_comm != v_comm {
                    #[cfg(debug_assertions)]
                    let quality_before = partition.quality();

                    improv += max_improv;
                    partition.move_node_internal(v, max_comm);
                    nb_moves += 1;

                    #[cfg(debug_assertions)]
                    {
                        let realised = partition.quality() - quality_before;
                        debug_assert!(
                            (realised - max_improv).abs()
                                <= 1e-6 * quality_before.abs().max(1.0),
                            "diff_move disagrees with the quality change for node {v}: \
                             predicted {max_improv}, realised {realised}"
                        );
                    }
                }
            }
            total_improv += improv;
        }

        partition.renumber_communities();
        total_improv
    }

    /// Optimises several layers over one shared vertex set simultaneously.
    ///
    /// Every move is applied to all layers at once; the gain of a candidate
    /// community is the layer-weighted sum of the per-layer gains. All
    /// layers must have the same vertex count and start from identical
    /// memberships. Returns the layer-weighted sum of the final qualities.
    pub fn optimise_partition_multiplex<Q, R>(
        &self,
        partitions: &mut [Partition<Q>],
        layer_weights: &[f64],
        rng: &mut R,
    ) -> Result<f64, CommunityError>
    where
        Q: QualityFunction,
        R: Rng + ?Sized,
    {
        check_layers(partitions, layer_weights)?;
        let mut improv =
            self.move_nodes_multiplex_with(partitions, layer_weights, self.consider_comms, rng)?;
        while improv > self.eps {
            let mut collapsed: Vec<Partition<Q>> = partitions
                .iter()
                .map(Partition::aggregate_partition)
                .collect();
            improv = self.move_nodes_multiplex_with(
                &mut collapsed,
                layer_weights,
                self.consider_comms,
                rng,
            )?;
            for (partition, coarser) in partitions.iter_mut().zip(&collapsed) {
                partition.from_coarser_partition(coarser);
            }
        }

        partitions[0].renumber_communities();
        let membership = partitions[0].membership().to_vec();
        let mut quality = layer_weights[0] * partitions[0].quality();
        for layer in 1..partitions.len() {
            partitions[layer].renumber_communities_with(&membership)?;
            quality += layer_weights[layer] * partitions[layer].quality();
        }
        Ok(quality)
    }

    /// One multiplex round of local moves with the configured policy.
    pub fn move_nodes_multiplex<Q, R>(
        &self,
        partitions: &mut [Partition<Q>],
        layer_weights: &[f64],
        rng: &mut R,
    ) -> Result<f64, CommunityError>
    where
        Q: QualityFunction,
        R: Rng + ?Sized,
    {
        self.move_nodes_multiplex_with(partitions, layer_weights, self.consider_comms, rng)
    }

    /// The multiplex sweep: candidate gains are accumulated over the layers
    /// per community, then the best strictly positive candidate is applied
    /// to every layer. Vertices isolated in every layer are skipped; the
    /// random layer for [`ConsiderComms::RandNeighComm`] is drawn among the
    /// layers where the vertex has neighbours.
    pub fn move_nodes_multiplex_with<Q, R>(
        &self,
        partitions: &mut [Partition<Q>],
        layer_weights: &[f64],
        consider_comms: ConsiderComms,
        rng: &mut R,
    ) -> Result<f64, CommunityError>
    where
        Q: QualityFunction,
        R: Rng + ?Sized,
    {
        check_layers(partitions, layer_weights)?;
        let nb_layers = partitions.len();
        let n = partitions[0].graph().vcount();

        let mut itr = 0usize;
        let mut total_improv = 0.0;
        let mut improv = 2.0 * self.eps * nb_layers as f64;
        let mut nb_moves = 2 * n * nb_layers;

        while improv > self.eps * nb_layers as f64
            && nb_moves as f64 > n as f64 * self.delta * nb_layers as f64
            && itr < self.max_itr
        {
            itr += 1;
            nb_moves = 0;
            improv = 0.0;

            let mut vertex_order: Vec<usize> = (0..n).collect();
            if self.random_order {
                vertex_order.shuffle(rng);
            }

            for &v in &vertex_order {
                if partitions
                    .iter()
                    .all(|p| p.graph().degree(v, Mode::All) == 0)
                {
                    continue;
                }
                let v_comm = partitions[0].membership_of(v);
                let mut comm_improvs: IndexMap<usize, f64> = IndexMap::new();

                match consider_comms {
                    ConsiderComms::AllComms => {
                        for (layer, partition) in partitions.iter().enumerate() {
                            if partition.graph().degree(v, Mode::All) == 0 {
                                continue;
                            }
                            for comm in 0..partition.nb_communities() {
                                *comm_improvs.entry(comm).or_insert(0.0) +=
                                    layer_weights[layer] * partition.diff_move(v, comm);
                            }
                        }
                    }
                    ConsiderComms::AllNeighComms => {
                        for (layer, partition) in partitions.iter().enumerate() {
                            for comm in partition.neigh_comms(v, Mode::All) {
                                *comm_improvs.entry(comm).or_insert(0.0) +=
                                    layer_weights[layer] * partition.diff_move(v, comm);
                            }
                        }
                    }
                    ConsiderComms::RandComm => {
                        let node = partitions[0].graph().random_node(rng);
                        let comm = partitions[0].membership_of(node);
                        for (layer, partition) in partitions.iter().enumerate() {
                            *comm_improvs.entry(comm).or_insert(0.0) +=
                                layer_weights[layer] * partition.diff_move(v, comm);
                        }
                    }
                    ConsiderComms::RandNeighComm => {
                        let layers_with_neighbours: Vec<usize> = (0..nb_layers)
                            .filter(|&layer| {
                                partitions[layer].graph().degree(v, Mode::All) > 0
                            })
                            .collect();
                        let layer = layers_with_neighbours
                            [rng.gen_range(0..layers_with_neighbours.len())];
                        if let Ok(u) =
                            partitions[layer].graph().random_neighbour(v, Mode::All, rng)
                        {
                            let comm = partitions[0].membership_of(u);
                            for (layer, partition) in partitions.iter().enumerate() {
                                *comm_improvs.entry(comm).or_insert(0.0) +=
                                    layer_weights[layer] * partition.diff_move(v, comm);
                            }
                        }
                    }
                }

                let mut max_comm = v_comm;
                let mut max_improv = 0.0;
                for (&comm, &gain) in &comm_improvs {
                    if gain > max_improv {
                        max_improv = gain;
                        max_comm = comm;
                    }
                }

                if max_comm != v_comm {
                    for partition in partitions.iter_mut() {
                        partition.move_node_internal(v, max_comm);
                        improv += max_improv;
                        nb_moves += 1;
                    }
                }
            }
            total_improv += improv;
        }

        partitions[0].renumber_communities();
        let membership = partitions[0].membership().to_vec();
        for layer in 1..nb_layers {
            partitions[layer].renumber_communities_with(&membership)?;
        }
        Ok(total_improv)
    }
}

fn check_layers<Q: QualityFunction>(
    partitions: &[Partition<Q>],
    layer_weights: &[f64],
) -> Result<(), CommunityError> {
    if partitions.is_empty() {
        return Err(CommunityError::EmptyLayers);
    }
    if layer_weights.len() != partitions.len() {
        return Err(CommunityError::InputShape(
            "layer weight vector length does not match the number of layers",
        ));
    }
    let n = partitions[0].graph().vcount();
    for partition in &partitions[1..] {
        if partition.graph().vcount() != n {
            return Err(CommunityError::LayerMismatch {
                expected: n,
                actual: partition.graph().vcount(),
            });
        }
    }
    let membership = partitions[0].membership();
    for partition in &partitions[1..] {
        if partition.membership() != membership {
            return Err(CommunityError::InputShape(
                "multiplex layers must start from identical memberships",
            ));
        }
    }
    Ok(())
}
