// Supervised classification: cross-entropy against labels.

use burn::tensor::backend::AutodiffBackend;

use super::{optimise, require, scalar, BatchEvaluation, LearningMode, NetworkOptimizer};
use crate::data::batcher::Batch;
use crate::domain::{error::FrameworkResult, modes::ModeKind};
use crate::ml::{
    criterion::{count_correct, cross_entropy},
    model::ReasoningNetwork,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct SupervisedMode;

impl<B: AutodiffBackend> LearningMode<B> for SupervisedMode {
    fn kind(&self) -> ModeKind {
        ModeKind::Supervised
    }

    fn train_batch(
        &mut self,
        model:     ReasoningNetwork<B>,
        optimizer: &mut NetworkOptimizer<B>,
        lr:        f64,
        batch:     Batch<B>,
    ) -> FrameworkResult<(ReasoningNetwork<B>, f64)> {
        let labels = require(batch.labels, "labels")?;
        let logits = model.forward(&batch.inputs);
        let loss = cross_entropy(logits, labels);
        optimise(model, optimizer, lr, loss)
    }

    fn evaluate_batch(
        &self,
        model: &ReasoningNetwork<B::InnerBackend>,
        batch: Batch<B::InnerBackend>,
    ) -> FrameworkResult<BatchEvaluation> {
        let labels = require(batch.labels, "labels")?;
        let total = labels.dims()[0];
        let logits = model.forward(&batch.inputs);
        let correct = count_correct(logits.clone(), labels.clone());
        let loss = scalar(cross_entropy(logits, labels))?;
        Ok(BatchEvaluation { loss, correct, total })
    }
}
