//! The Reichardt–Bornholdt quality function with the configuration null
//! model: communities are judged against the expectation from vertex
//! strengths, scaled by a resolution parameter.

use crate::error::CommunityError;
use crate::graph::{CommunityGraph, Mode};

use super::{correction, LinearResolution, Partition, QualityFunction};

/// RB-Configuration: `Σ_c [w_in(c) − γ·w_from(c)·w_to(c)/m]` up to the
/// directedness normalisation. With γ = 1 this is unnormalised modularity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RBConfiguration {
    /// The resolution parameter γ. Larger values favour smaller communities.
    pub resolution: f64,
}

impl RBConfiguration {
    /// A configuration-null-model quality function at resolution γ.
    pub fn new(resolution: f64) -> RBConfiguration {
        RBConfiguration { resolution }
    }
}

impl Default for RBConfiguration {
    fn default() -> RBConfiguration {
        RBConfiguration { resolution: 1.0 }
    }
}

/// Move gain under the configuration null model at the given resolution.
/// Shared with [`Modularity`](super::Modularity), which is this at γ = 1,
/// normalised by the total weight.
pub(crate) fn configuration_diff_move<Q: QualityFunction>(
    partition: &Partition<Q>,
    v: usize,
    new_comm: usize,
    resolution: f64,
) -> f64 {
    let old_comm = partition.membership_of(v);
    if new_comm == old_comm {
        return 0.0;
    }
    let graph = partition.graph();
    let total_weight = graph.total_weight() * correction(graph.is_directed());
    if total_weight == 0.0 {
        return 0.0;
    }

    let w_to_old = partition.weight_to_comm(v, old_comm);
    let w_from_old = partition.weight_from_comm(v, old_comm);
    let w_to_new = partition.weight_to_comm(v, new_comm);
    let w_from_new = partition.weight_from_comm(v, new_comm);
    let k_out = graph.strength(v, Mode::Out);
    let k_in = graph.strength(v, Mode::In);
    let self_weight = graph.node_self_weight(v);
    let k_out_old = partition.total_weight_from_comm(old_comm);
    let k_in_old = partition.total_weight_to_comm(old_comm);
    let k_out_new = partition.total_weight_from_comm(new_comm) + k_out;
    let k_in_new = partition.total_weight_to_comm(new_comm) + k_in;

    let diff_old = (w_to_old - resolution * k_out * k_in_old / total_weight)
        + (w_from_old - resolution * k_in * k_out_old / total_weight);
    let diff_new = (w_to_new + self_weight - resolution * k_out * k_in_new / total_weight)
        + (w_from_new + self_weight - resolution * k_in * k_out_new / total_weight);
    diff_new - diff_old
}

/// Quality under the configuration null model at the given resolution.
pub(crate) fn configuration_quality<Q: QualityFunction>(
    partition: &Partition<Q>,
    resolution: f64,
) -> f64 {
    let graph = partition.graph();
    let m = graph.total_weight();
    if m == 0.0 {
        return 0.0;
    }
    let norm = if graph.is_directed() { m } else { 4.0 * m };

    let mut total = 0.0;
    for c in 0..partition.nb_communities() {
        total += partition.total_weight_in_comm(c)
            - resolution * partition.total_weight_from_comm(c) * partition.total_weight_to_comm(c)
                / norm;
    }
    correction(graph.is_directed()) * total
}

impl QualityFunction for RBConfiguration {
    fn diff_move(&self, partition: &Partition<Self>, v: usize, new_comm: usize) -> f64 {
        configuration_diff_move(partition, v, new_comm, self.resolution)
    }

    fn quality(&self, partition: &Partition<Self>) -> f64 {
        configuration_quality(partition, self.resolution)
    }

    fn validate(&self, _graph: &CommunityGraph) -> Result<(), CommunityError> {
        if self.resolution.is_nan() {
            return Err(CommunityError::InputShape("resolution must not be NaN"));
        }
        Ok(())
    }
}

impl LinearResolution for RBConfiguration {
    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn set_resolution(&mut self, resolution: f64) {
        self.resolution = resolution;
    }

    fn quality_at(&self, partition: &Partition<Self>, resolution: f64) -> f64 {
        configuration_quality(partition, resolution)
    }
}
