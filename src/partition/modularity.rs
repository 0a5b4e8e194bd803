//! Classical Newman–Girvan modularity.

use super::rb_configuration::{configuration_diff_move, configuration_quality};
use super::{correction, Partition, QualityFunction};

/// Modularity: the configuration null model at resolution 1, normalised by
/// the total edge weight so values fall in [-1/2, 1].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modularity;

impl QualityFunction for Modularity {
    fn diff_move(&self, partition: &Partition<Self>, v: usize, new_comm: usize) -> f64 {
        let graph = partition.graph();
        let m = graph.total_weight() * correction(graph.is_directed());
        if m == 0.0 {
            return 0.0;
        }
        configuration_diff_move(partition, v, new_comm, 1.0) / m
    }

    fn quality(&self, partition: &Partition<Self>) -> f64 {
        let graph = partition.graph();
        let m = graph.total_weight() * correction(graph.is_directed());
        if m == 0.0 {
            return 0.0;
        }
        configuration_quality(partition, 1.0) / m
    }
}
