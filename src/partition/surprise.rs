//! Surprise: how unlikely it is that a graph this dense ends up with this
//! much weight inside the communities.

use super::{correction, kl, Partition, QualityFunction};

/// Surprise: `m·KL(q, s)` where `q` is the fraction of the total weight
/// that is internal and `s` the fraction of all vertex pairs that are
/// intra-community.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Surprise;

/// Total vertex pairs of the graph under its self-loop convention.
fn total_pairs<Q: QualityFunction>(partition: &Partition<Q>) -> f64 {
    let graph = partition.graph();
    let n = graph.total_size() as f64;
    let pairs = if graph.correct_self_loops() {
        n * n
    } else {
        n * (n - 1.0)
    };
    pairs / correction(graph.is_directed())
}

impl QualityFunction for Surprise {
    fn diff_move(&self, partition: &Partition<Self>, v: usize, new_comm: usize) -> f64 {
        let old_comm = partition.membership_of(v);
        if new_comm == old_comm {
            return 0.0;
        }
        let graph = partition.graph();
        let normalise = correction(graph.is_directed());
        let m = graph.total_weight();
        let n2 = total_pairs(partition);
        if m == 0.0 || n2 <= 0.0 {
            return 0.0;
        }
        let size = graph.node_size(v) as f64;
        let self_weight = graph.node_self_weight(v);

        let mc = partition.total_weight_in_all_comms();
        let nc2 = partition.total_possible_edges_in_all_comms();

        // Internal weight the move takes out of the old community; the
        // self-weight is excluded from the to/from weights because
        // weight_to_comm already includes it.
        let n_old = partition.csize(old_comm) as f64;
        let wtc = partition.weight_to_comm(v, old_comm) - self_weight;
        let wfc = partition.weight_from_comm(v, old_comm) - self_weight;
        let m_old = wtc / normalise + wfc / normalise + self_weight;

        // Internal weight it brings into the new one.
        let n_new = partition.csize(new_comm) as f64;
        let wtc = partition.weight_to_comm(v, new_comm);
        let wfc = partition.weight_from_comm(v, new_comm);
        let m_new = wtc / normalise + wfc / normalise + self_weight;

        let q = mc / m;
        let s = nc2 / n2;
        let q_new = (mc - m_old + m_new) / m;
        let s_new = (nc2 + 2.0 * size * (n_new - n_old + size) / normalise) / n2;

        m * (kl(q_new, s_new) - kl(q, s))
    }

    fn quality(&self, partition: &Partition<Self>) -> f64 {
        let graph = partition.graph();
        let m = graph.total_weight();
        let n2 = total_pairs(partition);
        if m == 0.0 || n2 <= 0.0 {
            return 0.0;
        }
        let q = partition.total_weight_in_all_comms() / m;
        let s = partition.total_possible_edges_in_all_comms() / n2;
        m * kl(q, s)
    }
}
