// Multi-task classification: the output layer is partitioned into one
// head per task (`multi_task.task_classes`), each trained with its own
// cross-entropy and averaged. Accuracy counts every (example, task) pair.

use burn::tensor::backend::AutodiffBackend;

use super::{optimise, require, scalar, BatchEvaluation, LearningMode, NetworkOptimizer, Prediction};
use crate::data::batcher::{Batch, ModelInput};
use crate::domain::{error::FrameworkResult, modes::ModeKind};
use crate::ml::{
    criterion::{multi_task_loss, task_predictions},
    inference::InferencePolicy,
    model::ReasoningNetwork,
};

#[derive(Debug, Clone)]
pub struct MultiTaskMode {
    heads: Vec<usize>,
}

impl MultiTaskMode {
    pub fn new(heads: Vec<usize>) -> Self {
        Self { heads }
    }

    pub fn heads(&self) -> &[usize] {
        &self.heads
    }
}

impl<B: AutodiffBackend> LearningMode<B> for MultiTaskMode {
    fn kind(&self) -> ModeKind {
        ModeKind::MultiTask
    }

    fn train_batch(
        &mut self,
        model:     ReasoningNetwork<B>,
        optimizer: &mut NetworkOptimizer<B>,
        lr:        f64,
        batch:     Batch<B>,
    ) -> FrameworkResult<(ReasoningNetwork<B>, f64)> {
        let labels = require(batch.task_labels, "task_labels")?;
        let logits = model.forward(&batch.inputs);
        let loss = multi_task_loss(logits, labels, &self.heads);
        optimise(model, optimizer, lr, loss)
    }

    fn evaluate_batch(
        &self,
        model: &ReasoningNetwork<B::InnerBackend>,
        batch: Batch<B::InnerBackend>,
    ) -> FrameworkResult<BatchEvaluation> {
        let labels = require(batch.task_labels, "task_labels")?;
        let logits = model.forward(&batch.inputs);

        let truth: Vec<usize> = labels
            .clone()
            .into_data()
            .iter::<i64>()
            .map(|v| v as usize)
            .collect();
        let predicted: Vec<usize> = task_predictions(logits.clone(), &self.heads)
            .into_iter()
            .flatten()
            .collect();
        let correct = predicted.iter().zip(&truth).filter(|(p, t)| p == t).count();

        let loss = scalar(multi_task_loss(logits, labels, &self.heads))?;
        Ok(BatchEvaluation { loss, correct, total: truth.len() })
    }

    fn predict_batch(
        &self,
        policy: &InferencePolicy,
        model:  &ReasoningNetwork<B::InnerBackend>,
        inputs: ModelInput<B::InnerBackend>,
    ) -> FrameworkResult<Prediction> {
        let output = policy.run(model, &inputs);
        let per_task = task_predictions(output.logits.clone(), &self.heads);
        Ok(Prediction::from_output(&output, Vec::new(), per_task))
    }
}
