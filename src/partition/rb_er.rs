//! The Reichardt–Bornholdt quality function with the Erdős–Rényi null
//! model: every pair of vertices is equally likely to be connected, with
//! probability equal to the graph density.

use crate::error::CommunityError;
use crate::graph::CommunityGraph;

use super::{LinearResolution, Partition, QualityFunction};

/// RB-ER: `Σ_c [w_in(c) − γ·p·pairs(csize(c))]` with `p` the graph density,
/// up to the directedness normalisation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RBErdosRenyi {
    /// The resolution parameter γ. Larger values favour smaller communities.
    pub resolution: f64,
}

impl RBErdosRenyi {
    /// An Erdős–Rényi-null-model quality function at resolution γ.
    pub fn new(resolution: f64) -> RBErdosRenyi {
        RBErdosRenyi { resolution }
    }
}

impl Default for RBErdosRenyi {
    fn default() -> RBErdosRenyi {
        RBErdosRenyi { resolution: 1.0 }
    }
}

fn er_quality<Q: QualityFunction>(partition: &Partition<Q>, resolution: f64) -> f64 {
    let graph = partition.graph();
    let density = graph.density();
    let mut total = 0.0;
    for c in 0..partition.nb_communities() {
        total += partition.total_weight_in_comm(c)
            - resolution * density * partition.community_pairs(partition.csize(c));
    }
    super::correction(graph.is_directed()) * total
}

impl QualityFunction for RBErdosRenyi {
    fn diff_move(&self, partition: &Partition<Self>, v: usize, new_comm: usize) -> f64 {
        let old_comm = partition.membership_of(v);
        if new_comm == old_comm {
            return 0.0;
        }
        let graph = partition.graph();
        let w_to_old = partition.weight_to_comm(v, old_comm);
        let w_from_old = partition.weight_from_comm(v, old_comm);
        let w_to_new = partition.weight_to_comm(v, new_comm);
        let w_from_new = partition.weight_from_comm(v, new_comm);
        let self_weight = graph.node_self_weight(v);
        let size = graph.node_size(v) as f64;
        let csize_old = partition.csize(old_comm) as f64;
        let csize_new = partition.csize(new_comm) as f64;

        (w_to_new + w_from_new) - (w_to_old + w_from_old) + 2.0 * self_weight
            - self.resolution
                * graph.density()
                * 2.0
                * size
                * (csize_new - csize_old + size)
    }

    fn quality(&self, partition: &Partition<Self>) -> f64 {
        er_quality(partition, self.resolution)
    }

    fn validate(&self, _graph: &CommunityGraph) -> Result<(), CommunityError> {
        if self.resolution.is_nan() {
            return Err(CommunityError::InputShape("resolution must not be NaN"));
        }
        Ok(())
    }
}

impl LinearResolution for RBErdosRenyi {
    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn set_resolution(&mut self, resolution: f64) {
        self.resolution = resolution;
    }

    fn quality_at(&self, partition: &Partition<Self>, resolution: f64) -> f64 {
        er_quality(partition, resolution)
    }
}
