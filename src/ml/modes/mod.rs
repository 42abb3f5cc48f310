// ============================================================
// Layer 5 — Learning Modes
// ============================================================
// Every paradigm implements the same three operations so the mode
// manager can drive any of them without knowing which it has:
//
//   train_batch     forward + loss + backward + optimiser step
//   evaluate_batch  loss and accuracy, no gradients
//   predict_batch   adaptive-depth prediction
//
// Training runs on the autodiff backend B; evaluation and
// prediction run on B::InnerBackend via model.valid().
//
// Reference: Rust Book §17 (Trait Objects)

pub mod gan;
pub mod multi_task;
pub mod reinforcement;
pub mod supervised;
pub mod unsupervised;

use burn::{optim::GradientsParams, prelude::*, tensor::backend::AutodiffBackend};
use serde::Serialize;

use crate::data::batcher::{Batch, ModelInput};
use crate::domain::{
    config::ExperimentConfig,
    error::{DataError, FrameworkError, FrameworkResult},
    modes::ModeKind,
};
use crate::ml::{
    inference::{AdaptiveOutput, InferencePolicy},
    model::ReasoningNetwork,
    optim::ModelOptimizer,
};

pub type NetworkOptimizer<B> = dyn ModelOptimizer<ReasoningNetwork<B>, B>;

/// Loss and accuracy counts for one evaluation batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchEvaluation {
    pub loss:    f64,
    pub correct: usize,
    /// Targets scored; 0 when the batch had none
    pub total:   usize,
}

/// Predictions for every example, in input order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Prediction {
    /// One class per example (empty for multi-task)
    pub classes:         Vec<usize>,
    /// One class per task per example (multi-task only)
    pub task_classes:    Vec<Vec<usize>>,
    /// Reasoning steps used for each example's batch
    pub reasoning_steps: Vec<usize>,
    /// Batch confidence for each example
    pub confidence:      Vec<f64>,
    /// Total forward passes over all batches
    pub forward_passes:  usize,
}

impl Prediction {
    pub fn from_output<B: Backend>(
        output:       &AdaptiveOutput<B>,
        classes:      Vec<usize>,
        task_classes: Vec<Vec<usize>>,
    ) -> Self {
        let n = classes.len().max(task_classes.len());
        Self {
            classes,
            task_classes,
            reasoning_steps: vec![output.steps; n],
            confidence:      vec![output.confidence; n],
            forward_passes:  output.passes,
        }
    }

    pub fn merge(&mut self, other: Prediction) {
        self.classes.extend(other.classes);
        self.task_classes.extend(other.task_classes);
        self.reasoning_steps.extend(other.reasoning_steps);
        self.confidence.extend(other.confidence);
        self.forward_passes += other.forward_passes;
    }

    pub fn len(&self) -> usize {
        self.reasoning_steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── LearningMode ─────────────────────────────────────────────────────────────
pub trait LearningMode<B: AutodiffBackend> {
    fn kind(&self) -> ModeKind;

    /// One optimisation step. Returns the updated model and the loss.
    fn train_batch(
        &mut self,
        model:     ReasoningNetwork<B>,
        optimizer: &mut NetworkOptimizer<B>,
        lr:        f64,
        batch:     Batch<B>,
    ) -> FrameworkResult<(ReasoningNetwork<B>, f64)>;

    fn evaluate_batch(
        &self,
        model: &ReasoningNetwork<B::InnerBackend>,
        batch: Batch<B::InnerBackend>,
    ) -> FrameworkResult<BatchEvaluation>;

    fn predict_batch(
        &self,
        policy: &InferencePolicy,
        model:  &ReasoningNetwork<B::InnerBackend>,
        inputs: ModelInput<B::InnerBackend>,
    ) -> FrameworkResult<Prediction> {
        let output = policy.run(model, &inputs);
        let classes = output.classes();
        Ok(Prediction::from_output(&output, classes, Vec::new()))
    }
}

/// Build the learning mode named by the configuration.
pub fn create_mode<B: AutodiffBackend>(
    config: &ExperimentConfig,
    device: &B::Device,
) -> FrameworkResult<Box<dyn LearningMode<B>>> {
    let mode: Box<dyn LearningMode<B>> = match config.mode() {
        ModeKind::Supervised    => Box::new(supervised::SupervisedMode),
        ModeKind::Unsupervised  => Box::new(unsupervised::UnsupervisedMode),
        ModeKind::Reinforcement => Box::new(reinforcement::ReinforcementMode),
        ModeKind::Gan           => Box::new(gan::GanMode::<B>::new(config, device)),
        ModeKind::MultiTask     => {
            Box::new(multi_task::MultiTaskMode::new(config.multi_task.task_classes.clone()))
        }
    };
    Ok(mode)
}

// ─── Shared helpers ───────────────────────────────────────────────────────────
/// Backward pass and optimiser step on `loss`.
pub(crate) fn optimise<B: AutodiffBackend>(
    model:     ReasoningNetwork<B>,
    optimizer: &mut NetworkOptimizer<B>,
    lr:        f64,
    loss:      Tensor<B, 1>,
) -> FrameworkResult<(ReasoningNetwork<B>, f64)> {
    let value = finite(loss.clone().into_scalar().elem::<f64>())?;
    let grads = GradientsParams::from_grads(loss.backward(), &model);
    Ok((optimizer.step(lr, model, grads), value))
}

pub(crate) fn finite(loss: f64) -> FrameworkResult<f64> {
    if loss.is_finite() {
        Ok(loss)
    } else {
        Err(FrameworkError::Compute(format!("loss is not finite ({loss})")))
    }
}

pub(crate) fn scalar<B: Backend>(t: Tensor<B, 1>) -> FrameworkResult<f64> {
    finite(t.into_scalar().elem::<f64>())
}

pub(crate) fn require<T>(value: Option<T>, field: &'static str) -> FrameworkResult<T> {
    value.ok_or(FrameworkError::Data(DataError::MissingField(field)))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prediction_merge_keeps_order() {
        let mut a = Prediction {
            classes: vec![1, 0],
            reasoning_steps: vec![2, 2],
            confidence: vec![0.9, 0.9],
            forward_passes: 1,
            ..Default::default()
        };
        a.merge(Prediction {
            classes: vec![2],
            reasoning_steps: vec![4],
            confidence: vec![0.6],
            forward_passes: 3,
            ..Default::default()
        });
        assert_eq!(a.classes, vec![1, 0, 2]);
        assert_eq!(a.reasoning_steps, vec![2, 2, 4]);
        assert_eq!(a.forward_passes, 4);
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn test_non_finite_loss_is_compute_error() {
        assert!(finite(0.5).is_ok());
        assert!(matches!(finite(f64::NAN), Err(FrameworkError::Compute(_))));
    }
}
