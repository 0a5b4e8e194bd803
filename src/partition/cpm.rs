//! The constant Potts model.

use crate::error::CommunityError;
use crate::graph::CommunityGraph;

use super::{LinearResolution, Partition, QualityFunction};

/// CPM: `Σ_c [w_in(c) − γ·pairs(csize(c))]` up to the directedness
/// normalisation. The null term depends only on community sizes, which
/// makes the quality resolution-limit-free and tolerant of negative edge
/// weights (enable them on the graph via
/// [`GraphAttributes::allow_negative_weights`](crate::GraphAttributes)).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cpm {
    /// The resolution parameter γ: the internal density a community must
    /// beat to be worth keeping together.
    pub resolution: f64,
}

impl Cpm {
    /// A constant Potts model quality function at resolution γ.
    pub fn new(resolution: f64) -> Cpm {
        Cpm { resolution }
    }
}

impl Default for Cpm {
    fn default() -> Cpm {
        Cpm { resolution: 1.0 }
    }
}

fn cpm_quality<Q: QualityFunction>(partition: &Partition<Q>, resolution: f64) -> f64 {
    let graph = partition.graph();
    let mut total = 0.0;
    for c in 0..partition.nb_communities() {
        total += partition.total_weight_in_comm(c)
            - resolution * partition.community_pairs(partition.csize(c));
    }
    super::correction(graph.is_directed()) * total
}

impl QualityFunction for Cpm {
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
            - self.resolution * 2.0 * size * (csize_new - csize_old + size)
    }

    fn quality(&self, partition: &Partition<Self>) -> f64 {
        cpm_quality(partition, self.resolution)
    }

    fn validate(&self, _graph: &CommunityGraph) -> Result<(), CommunityError> {
        if self.resolution.is_nan() {
            return Err(CommunityError::InputShape("resolution must not be NaN"));
        }
        Ok(())
    }
}

impl LinearResolution for Cpm {
    fn resolution(&self) -> f64 {
        self.resolution
    }

    fn set_resolution(&mut self, resolution: f64) {
        self.resolution = resolution;
    }

    fn quality_at(&self, partition: &Partition<Self>, resolution: f64) -> f64 {
        cpm_quality(partition, resolution)
    }
}
