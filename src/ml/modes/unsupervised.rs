// ============================================================
// Unsupervised clustering
// ============================================================
// The output classes are clusters. Training minimises the
// information-maximisation loss; labels, when a dataset carries
// them, are only used for evaluation through cluster purity:
//
//   purity = Σ_clusters max_label |cluster ∩ label| / N
//
// Cluster ids are arbitrary, so plain accuracy would be meaningless.

use std::collections::HashMap;

use burn::tensor::backend::AutodiffBackend;

use super::{optimise, scalar, BatchEvaluation, LearningMode, NetworkOptimizer};
use crate::data::batcher::Batch;
use crate::domain::{error::FrameworkResult, modes::ModeKind};
use crate::ml::{criterion::clustering_loss, inference::argmax_rows, model::ReasoningNetwork};

#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupervisedMode;

/// Examples that share their cluster's majority label.
pub fn purity_count(clusters: &[usize], labels: &[usize]) -> usize {
    let mut counts: HashMap<usize, HashMap<usize, usize>> = HashMap::new();
    for (&cluster, &label) in clusters.iter().zip(labels) {
        *counts.entry(cluster).or_default().entry(label).or_default() += 1;
    }
    counts
        .values()
        .map(|by_label| by_label.values().copied().max().unwrap_or(0))
        .sum()
}

impl<B: AutodiffBackend> LearningMode<B> for UnsupervisedMode {
    fn kind(&self) -> ModeKind {
        ModeKind::Unsupervised
    }

    fn train_batch(
        &mut self,
        model:     ReasoningNetwork<B>,
        optimizer: &mut NetworkOptimizer<B>,
        lr:        f64,
        batch:     Batch<B>,
    ) -> FrameworkResult<(ReasoningNetwork<B>, f64)> {
        let loss = clustering_loss(model.forward(&batch.inputs));
        optimise(model, optimizer, lr, loss)
    }

    fn evaluate_batch(
        &self,
        model: &ReasoningNetwork<B::InnerBackend>,
        batch: Batch<B::InnerBackend>,
    ) -> FrameworkResult<BatchEvaluation> {
        let logits = model.forward(&batch.inputs);
        let loss = scalar(clustering_loss(logits.clone()))?;

        let (correct, total) = match batch.labels {
            Some(labels) => {
                let labels: Vec<usize> = labels
                    .into_data()
                    .iter::<i64>()
                    .map(|v| v as usize)
                    .collect();
                let clusters = argmax_rows(logits);
                (purity_count(&clusters, &labels), labels.len())
            }
            None => (0, 0),
        };
        Ok(BatchEvaluation { loss, correct, total })
    }
}
