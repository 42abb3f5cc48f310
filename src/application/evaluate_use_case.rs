// ============================================================
// Layer 2 — EvaluateUseCase
// ============================================================
// Loads a trained checkpoint and reports loss and accuracy on
// either an explicit dataset or the configured validation data.

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;

use crate::application::backend::{dispatch, BackendTask};
use crate::data::adapter::DataInput;
use crate::domain::{config::ExperimentConfig, traits::NullSink};
use crate::ml::manager::{EvalReport, ModeManager};

pub struct EvaluateUseCase {
    config:     ExperimentConfig,
    checkpoint: PathBuf,
    data:       Option<PathBuf>,
}

impl EvaluateUseCase {
    /// `checkpoint` defaults to the configured checkpoint directory.
    pub fn new(config: ExperimentConfig, checkpoint: Option<PathBuf>, data: Option<PathBuf>) -> Self {
        let checkpoint = checkpoint.unwrap_or_else(|| config.checkpoint.dir.clone());
        Self { config, checkpoint, data }
    }

    pub fn execute(self) -> Result<EvalReport> {
        dispatch(self.config.system.device, self)
    }
}

impl BackendTask for EvaluateUseCase {
    type Output = EvalReport;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<EvalReport> {
        let mut manager = ModeManager::<B>::new(self.config, device, Box::new(NullSink))?;
        manager
            .load_checkpoint(&self.checkpoint)
            .with_context(|| format!("Cannot load checkpoint '{}'", self.checkpoint.display()))?;

        let report = manager
            .evaluate(self.data.map(DataInput::from))
            .context("Evaluation failed")?;
        Ok(report)
    }
}
