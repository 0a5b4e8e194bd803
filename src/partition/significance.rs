//! Significance: how unlikely the observed internal densities are in an
//! equally dense random graph.

use super::{correction, kl, Partition, QualityFunction};

/// Significance: `Σ_c n_c(n_c−1)·KL(q_c, p)` where `q_c` is the internal
/// density of community `c` and `p` the graph density.
///
/// Unlike the other quality functions, significance is not guaranteed to be
/// preserved when the partition is collapsed onto its community graph; the
/// optimiser therefore skips its debug-build collapse check for this
/// variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Significance;

impl QualityFunction for Significance {
    fn diff_move(&self, partition: &Partition<Self>, v: usize, new_comm: usize) -> f64 {
        let old_comm = partition.membership_of(v);
        if new_comm == old_comm {
            return 0.0;
        }
        let graph = partition.graph();
        let normalise = correction(graph.is_directed());
        let density = graph.density();
        let size = graph.node_size(v) as f64;
        let self_weight = graph.node_self_weight(v);

        let n_old = partition.csize(old_comm) as f64;
        let m_old = partition.total_weight_in_comm(old_comm);
        let q_old = if n_old > 1.0 {
            m_old / (n_old * (n_old - 1.0) / normalise)
        } else {
            0.0
        };

        // Old community after the move. The self-weight is excluded from the
        // to/from weights because weight_to_comm already includes it.
        let n_oldx = n_old - size;
        let wtc = partition.weight_to_comm(v, old_comm) - self_weight;
        let wfc = partition.weight_from_comm(v, old_comm) - self_weight;
        let m_oldx = m_old - wtc / normalise - wfc / normalise - self_weight;
        let q_oldx = if n_oldx > 1.0 {
            m_oldx / (n_oldx * (n_oldx - 1.0) / normalise)
        } else {
            0.0
        };

        let n_new = partition.csize(new_comm) as f64;
        let m_new = partition.total_weight_in_comm(new_comm);
        let q_new = if n_new > 1.0 {
            m_new / (n_new * (n_new - 1.0) / normalise)
        } else {
            0.0
        };

        // New community after the move.
        let n_newx = n_new + size;
        let wtc = partition.weight_to_comm(v, new_comm);
        let wfc = partition.weight_from_comm(v, new_comm);
        let m_newx = m_new + wtc / normalise + wfc / normalise + self_weight;
        let q_newx = if n_newx > 1.0 {
            m_newx / (n_newx * (n_newx - 1.0) / normalise)
        } else {
            0.0
        };

        -n_old * (n_old - 1.0) * kl(q_old, density)
            + n_oldx * (n_oldx - 1.0) * kl(q_oldx, density)
            - n_new * (n_new - 1.0) * kl(q_new, density)
            + n_newx * (n_newx - 1.0) * kl(q_newx, density)
    }

    fn quality(&self, partition: &Partition<Self>) -> f64 {
        let graph = partition.graph();
        let normalise = correction(graph.is_directed());
        let density = graph.density();

        let mut significance = 0.0;
        for c in 0..partition.nb_communities() {
            let n_c = partition.csize(c) as f64;
            if n_c > 1.0 {
                let m_c = partition.total_weight_in_comm(c);
                let q_c = m_c / (n_c * (n_c - 1.0) / normalise);
                significance += kl(q_c, density) * n_c * (n_c - 1.0);
            }
        }
        significance
    }

    fn quality_preserved_on_aggregate(&self) -> bool {
        false
    }
}
