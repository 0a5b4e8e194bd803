//! Generalised modularity: modularity against an explicit, factorised null
//! model instead of the configuration expectation.

use crate::error::CommunityError;
use crate::graph::CommunityGraph;

use super::{correction, Partition, QualityFunction};

/// Generalised modularity: `Σ_c [w_in(c) − Σ_k (Σ_{i∈c} f_k(i))·(Σ_{j∈c}
/// g_k(j))]` where the null model is a list of factor-vector pairs
/// `[f_0, g_0, f_1, g_1, …]`, each vector holding one entry per vertex.
///
/// When the partition is aggregated, the factor vectors are collapsed
/// alongside the graph by summing their entries over each community, which
/// preserves the quality value exactly.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralizedModularity {
    null_model: Vec<Vec<f64>>,
}

impl GeneralizedModularity {
    /// A generalised-modularity quality function over the given factor
    /// vectors. The vector count must be even (pairs) and each vector must
    /// have one entry per vertex of the graph the partition is built over;
    /// this is checked when the partition is constructed.
    pub fn new(null_model: Vec<Vec<f64>>) -> GeneralizedModularity {
        GeneralizedModularity { null_model }
    }

    /// The factor vectors of the null model.
    pub fn null_model(&self) -> &[Vec<f64>] {
        &self.null_model
    }
}

impl QualityFunction for GeneralizedModularity {
    fn diff_move(&self, partition: &Partition<Self>, v: usize, new_comm: usize) -> f64 {
        let old_comm = partition.membership_of(v);
        if new_comm == old_comm {
            return 0.0;
        }
        let graph = partition.graph();
        let normalise = correction(graph.is_directed());
        let self_weight = graph.node_self_weight(v);

        let w_to_old = partition.weight_to_comm(v, old_comm);
        let w_from_old = partition.weight_from_comm(v, old_comm);
        let w_to_new = partition.weight_to_comm(v, new_comm);
        let w_from_new = partition.weight_from_comm(v, new_comm);

        // Internal weight lost by the old community and gained by the new.
        let mut loss = (w_to_old + w_from_old - 2.0 * self_weight) / normalise + self_weight;
        let mut gain = (w_to_new + w_from_new) / normalise + self_weight;

        // Null-model pairs involving v. The old community still contains v,
        // so its v–v term is counted twice in the loss; the gain adds the
        // v–v term twice as well, and the two cancel in gain − loss.
        for pair in self.null_model.chunks_exact(2) {
            let (f, g) = (&pair[0], &pair[1]);
            for &u in partition.community(old_comm) {
                loss -= f[u] * g[v] + f[v] * g[u];
            }
            for &u in partition.community(new_comm) {
                gain -= f[u] * g[v] + f[v] * g[u];
            }
            gain -= 2.0 * f[v] * g[v];
        }

        gain - loss
    }

    fn quality(&self, partition: &Partition<Self>) -> f64 {
        let mut total = 0.0;
        for c in 0..partition.nb_communities() {
            total += partition.total_weight_in_comm(c);
        }
        for pair in self.null_model.chunks_exact(2) {
            let (f, g) = (&pair[0], &pair[1]);
            for c in 0..partition.nb_communities() {
                let f_sum: f64 = partition.community(c).iter().map(|&u| f[u]).sum();
                let g_sum: f64 = partition.community(c).iter().map(|&u| g[u]).sum();
                total -= f_sum * g_sum;
            }
        }
        total
    }

    fn validate(&self, graph: &CommunityGraph) -> Result<(), CommunityError> {
        if self.null_model.len() % 2 != 0 {
            return Err(CommunityError::InputShape(
                "null model must contain an even number of factor vectors",
            ));
        }
        if self
            .null_model
            .iter()
            .any(|factor| factor.len() != graph.vcount())
        {
            return Err(CommunityError::InputShape(
                "null model vectors must have one entry per vertex",
            ));
        }
        Ok(())
    }

    fn on_aggregate(&self, partition: &Partition<Self>) -> GeneralizedModularity {
        let nb_communities = partition.nb_communities();
        let mut collapsed = Vec::with_capacity(self.null_model.len());
        for factor in &self.null_model {
            let mut sums = vec![0.0; nb_communities];
            for (v, &comm) in partition.membership().iter().enumerate() {
                sums[comm] += factor[v];
            }
            collapsed.push(sums);
        }
        GeneralizedModularity {
            null_model: collapsed,
        }
    }
}
