// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates one training run:
//
//   Step 1: Resolve config/<mode>/<name>.yaml + overrides  (catalog)
//   Step 2: Pick the backend from system.device           (backend)
//   Step 3: Open the experiment tracker                   (Layer 6)
//   Step 4: Build the ModeManager                         (Layer 5)
//           validation + registry lookup happen here,
//           before any data is read
//   Step 5: Optionally resume from a checkpoint
//   Step 6: Train; data comes from data.train_path/val_path
//
// Reference: Burn Book §5 (Training)

use std::path::PathBuf;

use anyhow::{Context, Result};
use burn::tensor::backend::AutodiffBackend;

use crate::application::{
    backend::{dispatch, BackendTask},
    catalog::ConfigCatalog,
};
use crate::domain::{
    config::{ConfigOverrides, ExperimentConfig},
    metrics::RunSummary,
    modes::ModeKind,
};
use crate::infra::metrics::CsvExperimentTracker;
use crate::ml::manager::ModeManager;

/// Which configuration to run and how to adjust it.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub mode:        ModeKind,
    pub config_name: String,
    pub config_dir:  PathBuf,
    pub overrides:   ConfigOverrides,
}

impl RunRequest {
    pub fn load_config(&self) -> Result<ExperimentConfig> {
        ConfigCatalog::new(&self.config_dir).load(self.mode, &self.config_name, &self.overrides)
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: ExperimentConfig,
    resume: Option<PathBuf>,
}

impl TrainUseCase {
    pub fn new(config: ExperimentConfig) -> Self {
        Self { config, resume: None }
    }

    pub fn from_request(request: &RunRequest) -> Result<Self> {
        Ok(Self::new(request.load_config()?))
    }

    /// Continue from a checkpoint directory or checkpoint root.
    pub fn resume_from(mut self, checkpoint: Option<PathBuf>) -> Self {
        self.resume = checkpoint;
        self
    }

    pub fn execute(self) -> Result<RunSummary> {
        dispatch(self.config.system.device, self)
    }
}

impl BackendTask for TrainUseCase {
    type Output = RunSummary;

    fn run<B: AutodiffBackend>(self, device: B::Device) -> Result<RunSummary> {
        let run_name = CsvExperimentTracker::run_name(self.config.mode(), self.config.data_kind());
        let tracker = CsvExperimentTracker::new(&self.config.tracking.dir, &run_name)?;

        let mut manager = ModeManager::<B>::new(self.config, device, Box::new(tracker))
            .context("Cannot set up training")?;

        if let Some(checkpoint) = &self.resume {
            let (epoch, _) = manager
                .load_checkpoint(checkpoint)
                .with_context(|| format!("Cannot resume from '{}'", checkpoint.display()))?;
            tracing::info!("Resuming after epoch {}", epoch);
        }

        let summary = manager.train(None).context("Training failed")?;
        Ok(summary)
    }
}
