// ============================================================
// Layer 2 — PredictUseCase
// ============================================================
// Loads a trained checkpoint and predicts every example in an
// input file with adaptive reasoning depth. Class indices are
// mapped back to label names when training used string labels.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::Serialize;

use crate::application::backend::{dispatch, BackendTask};
use crate::data::adapter::DataInput;
use crate::domain::{config::ExperimentConfig, traits::NullSink};
use crate::ml::manager::ModeManager;

/// One example's prediction, ready to print.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictedExample {
    pub index:           usize,
    /// One entry, or one per task for multi-task models
    pub classes:         Vec<String>,
    pub reasoning_steps: usize,
    pub confidence:      f64,
}

pub struct PredictUseCase {
    config:     ExperimentConfig,
    checkpoint: PathBuf,
    input:      PathBuf,
}

impl PredictUseCase {
    pub fn new(config: ExperimentConfig, checkpoint: Option<PathBuf>, input: PathBuf) -> Self {
        let checkpoint = checkpoint.unwrap_or_else(|| config.checkpoint.dir.clone());
        Self { config, checkpoint, input }
    }

    pub fn execute(self) -> Result<Vec<PredictedExample>> {
        dispatch(self.config.system.device, self)
    }
}

impl BackendTask for PredictUseCase {
    type Output = Vec<PredictedExample>;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<Vec<PredictedExample>> {
        let mut manager = ModeManager::<B>::new(self.config, device, Box::new(NullSink))?;
        manager
            .load_checkpoint(&self.checkpoint)
            .with_context(|| format!("Cannot load checkpoint '{}'", self.checkpoint.display()))?;

        let prediction = manager
            .predict(DataInput::from(self.input.clone()))
            .with_context(|| format!("Prediction failed for '{}'", self.input.display()))?;

        let examples = (0..prediction.len())
            .map(|i| {
                let classes = match prediction.classes.get(i) {
                    Some(&class) => vec![manager.class_name(class)],
                    None => prediction
                        .task_classes
                        .get(i)
                        .map(|tasks| tasks.iter().map(|c| c.to_string()).collect())
                        .unwrap_or_default(),
                };
                PredictedExample {
                    index: i,
                    classes,
                    reasoning_steps: prediction.reasoning_steps[i],
                    confidence: prediction.confidence[i],
                }
            })
            .collect();
        Ok(examples)
    }
}
