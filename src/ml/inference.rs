// ============================================================
// Layer 5 — Adaptive Inference Policy
// ============================================================
// Prediction runs the reasoning network with a variable number of
// reasoning steps, driven by how confident the output is:
//
//   1. steps = min_reasoning_steps
//   2. forward pass, confidence = max softmax(logits / temperature)
//      over the whole batch (one shared step count per batch)
//   3. while confidence < threshold and steps < max:
//        steps += 1, re-run the full forward pass from scratch
//   4. argmax per example of the last pass
//
// Steps never decrease within one call and the loop makes at most
// max − min + 1 forward passes.
//
// Reference: Graves (2016) Adaptive Computation Time

use burn::{prelude::*, tensor::activation};

use crate::data::batcher::ModelInput;
use crate::domain::{config::InferenceSection, error::ConfigError};
use crate::ml::model::ReasoningNetwork;

/// Anything that can classify a batch with a chosen step count.
pub trait StepwiseClassifier<B: Backend> {
    fn logits_with_steps(&self, input: &ModelInput<B>, steps: usize) -> Tensor<B, 2>;
}

impl<B: Backend> StepwiseClassifier<B> for ReasoningNetwork<B> {
    fn logits_with_steps(&self, input: &ModelInput<B>, steps: usize) -> Tensor<B, 2> {
        self.forward_with_steps(input, steps)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InferencePolicy {
    pub min_steps:   usize,
    pub max_steps:   usize,
    pub threshold:   f64,
    pub temperature: f64,
}

/// Result of one adaptive prediction.
#[derive(Debug, Clone)]
pub struct AdaptiveOutput<B: Backend> {
    /// Logits of the final pass: [batch, classes]
    pub logits:     Tensor<B, 2>,
    /// Reasoning steps used by the final pass
    pub steps:      usize,
    /// Forward passes executed
    pub passes:     usize,
    /// Batch confidence of the final pass
    pub confidence: f64,
}

impl<B: Backend> AdaptiveOutput<B> {
    /// argmax per example.
    pub fn classes(&self) -> Vec<usize> {
        argmax_rows(self.logits.clone())
    }
}

pub fn argmax_rows<B: Backend>(logits: Tensor<B, 2>) -> Vec<usize> {
    logits
        .argmax(1)
        .flatten::<1>(0, 1)
        .into_data()
        .iter::<i64>()
        .map(|v| v as usize)
        .collect()
}

impl InferencePolicy {
    pub fn new(
        min_steps:   usize,
        max_steps:   usize,
        threshold:   f64,
        temperature: f64,
    ) -> Result<Self, ConfigError> {
        if min_steps == 0 || min_steps > max_steps {
            return Err(ConfigError::InvalidStepBounds { min: min_steps, max: max_steps });
        }
        if !(temperature > 0.0) {
            return Err(ConfigError::Invalid("inference.temperature must be positive".into()));
        }
        Ok(Self { min_steps, max_steps, threshold, temperature })
    }

    pub fn from_config(section: &InferenceSection) -> Result<Self, ConfigError> {
        Self::new(
            section.min_reasoning_steps,
            section.max_reasoning_steps,
            section.reasoning_threshold,
            section.temperature,
        )
    }

    /// Upper bound on forward passes per call.
    pub fn max_passes(&self) -> usize {
        self.max_steps - self.min_steps + 1
    }

    /// Largest tempered class probability anywhere in the batch.
    pub fn confidence<B: Backend>(&self, logits: &Tensor<B, 2>) -> f64 {
        activation::softmax(logits.clone().div_scalar(self.temperature), 1)
            .max()
            .into_scalar()
            .elem::<f64>()
    }

    pub fn run<B, C>(&self, model: &C, input: &ModelInput<B>) -> AdaptiveOutput<B>
    where
        B: Backend,
        C: StepwiseClassifier<B> + ?Sized,
    {
        let mut steps = self.min_steps;
        let mut logits = model.logits_with_steps(input, steps);
        let mut confidence = self.confidence(&logits);
        let mut passes = 1;

        while confidence < self.threshold && steps < self.max_steps {
            steps += 1;
            logits = model.logits_with_steps(input, steps);
            confidence = self.confidence(&logits);
            passes += 1;
        }

        tracing::debug!(steps, passes, confidence, "adaptive inference finished");
        AdaptiveOutput { logits, steps, passes, confidence }
    }
}
