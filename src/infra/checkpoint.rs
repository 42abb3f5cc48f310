// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores everything needed to resume a run.
//
// What gets saved per checkpoint:
//   1. model.mpk.gz      — all learned parameters
//   2. optimizer.mpk.gz  — optimiser moments and step counters
//   3. state.json        — epoch, metrics, learning rate,
//                          scheduler + early-stopping state and
//                          the full experiment config
//
// Records use NamedMpkGzFileRecorder with full precision so a
// save/load round trip restores bit-identical parameters.
//
// File layout:
//   checkpoints/
//     epoch_0001/{model.mpk.gz, optimizer.mpk.gz, state.json}
//     epoch_0002/...
//     best/        ← copy of the best epoch so far
//
// `best/` is replaced atomically: the files are copied into
// best.tmp/ and renamed over best/, so a crash mid-copy never
// leaves a half-written best checkpoint.
//
// Retention keeps the newest `keep_last_n` epoch directories
// (0 keeps all). `best/` is never removed by retention.
//
// Reference: Burn Book §5 (Records and Checkpointing)

use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use burn::{prelude::*, record::Recorder, tensor::backend::AutodiffBackend};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{
    config::{CheckpointSection, ExperimentConfig},
    error::{FrameworkError, FrameworkResult},
};
use crate::ml::{
    early_stopping::EarlyStopping,
    model::ReasoningNetwork,
    optim::{ModelOptimizer, StateRecorder},
    scheduler::PlateauScheduler,
};

const MODEL_FILE:     &str = "model";
const OPTIMIZER_FILE: &str = "optimizer";
const STATE_FILE:     &str = "state.json";
const BEST_DIR:       &str = "best";
const BEST_TMP_DIR:   &str = "best.tmp";
const EPOCH_PREFIX:   &str = "epoch_";

/// Everything except tensors, stored as state.json.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointState {
    pub epoch:          usize,
    pub metrics:        BTreeMap<String, f64>,
    pub learning_rate:  f64,
    pub scheduler:      Option<PlateauScheduler>,
    pub early_stopping: EarlyStopping,
    pub config:         ExperimentConfig,
    pub saved_at:       DateTime<Utc>,
}

pub struct CheckpointManager {
    dir:         PathBuf,
    keep_last_n: usize,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>, keep_last_n: usize) -> Self {
        Self { dir: dir.into(), keep_last_n }
    }

    pub fn from_config(section: &CheckpointSection) -> Self {
        Self::new(section.dir.clone(), section.keep_last_n)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn epoch_dir(&self, epoch: usize) -> PathBuf {
        self.dir.join(format!("{EPOCH_PREFIX}{epoch:04}"))
    }

    pub fn best_dir(&self) -> PathBuf {
        self.dir.join(BEST_DIR)
    }

    /// Recorder path without extension.
    pub fn optimizer_path(checkpoint: &Path) -> PathBuf {
        checkpoint.join(OPTIMIZER_FILE)
    }

    /// Write one epoch checkpoint and return its directory.
    pub fn save<B: AutodiffBackend>(
        &self,
        model:     &ReasoningNetwork<B>,
        optimizer: &dyn ModelOptimizer<ReasoningNetwork<B>, B>,
        state:     &CheckpointState,
    ) -> FrameworkResult<PathBuf> {
        let dir = self.epoch_dir(state.epoch);
        fs::create_dir_all(&dir).map_err(|e| FrameworkError::checkpoint(&dir, e))?;

        Recorder::<B>::record(&StateRecorder::new(), model.clone().into_record(), dir.join(MODEL_FILE))
            .map_err(|e| FrameworkError::checkpoint(&dir, e))?;
        optimizer
            .save_state(Self::optimizer_path(&dir))
            .map_err(|e| FrameworkError::checkpoint(&dir, e))?;

        let json = serde_json::to_string_pretty(state)?;
        fs::write(dir.join(STATE_FILE), json).map_err(|e| FrameworkError::checkpoint(&dir, e))?;

        tracing::debug!("Saved checkpoint: epoch {} → {}", state.epoch, dir.display());
        Ok(dir)
    }

    /// Replace `best/` with a copy of the given epoch's checkpoint.
    pub fn promote_best(&self, epoch: usize) -> FrameworkResult<PathBuf> {
        let source = self.epoch_dir(epoch);
        let tmp    = self.dir.join(BEST_TMP_DIR);
        let best   = self.best_dir();
        let fail   = |e: std::io::Error| FrameworkError::checkpoint(&best, e);

        if tmp.exists() {
            fs::remove_dir_all(&tmp).map_err(fail)?;
        }
        fs::create_dir_all(&tmp).map_err(fail)?;
        for entry in fs::read_dir(&source).map_err(fail)? {
            let entry = entry.map_err(fail)?;
            fs::copy(entry.path(), tmp.join(entry.file_name())).map_err(fail)?;
        }

        if best.exists() {
            fs::remove_dir_all(&best).map_err(fail)?;
        }
        fs::rename(&tmp, &best).map_err(fail)?;

        tracing::info!("Best checkpoint is now epoch {}", epoch);
        Ok(best)
    }

    /// Epoch checkpoints on disk, oldest first.
    pub fn epochs(&self) -> Vec<(usize, PathBuf)> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };
        let mut found: Vec<(usize, PathBuf)> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| {
                let name = e.file_name().to_string_lossy().into_owned();
                let epoch = name.strip_prefix(EPOCH_PREFIX)?.parse().ok()?;
                Some((epoch, e.path()))
            })
            .collect();
        found.sort_by_key(|(epoch, _)| *epoch);
        found
    }

    pub fn latest(&self) -> Option<PathBuf> {
        self.epochs().pop().map(|(_, path)| path)
    }

    /// Delete all but the newest `keep_last_n` epoch directories.
    pub fn cleanup(&self) -> FrameworkResult<usize> {
        if self.keep_last_n == 0 {
            return Ok(0);
        }
        let epochs = self.epochs();
        let excess = epochs.len().saturating_sub(self.keep_last_n);
        for (epoch, path) in epochs.into_iter().take(excess) {
            fs::remove_dir_all(&path).map_err(|e| FrameworkError::checkpoint(&path, e))?;
            tracing::debug!("Removed checkpoint for epoch {}", epoch);
        }
        Ok(excess)
    }

    /// A checkpoint directory, or a checkpoint root (best/ is preferred,
    /// then the newest epoch).
    pub fn resolve(path: &Path) -> FrameworkResult<PathBuf> {
        if path.join(STATE_FILE).is_file() {
            return Ok(path.to_path_buf());
        }
        let root = Self::new(path, 0);
        let best = root.best_dir();
        if best.join(STATE_FILE).is_file() {
            return Ok(best);
        }
        root.latest()
            .ok_or_else(|| FrameworkError::checkpoint(path, "no checkpoint found"))
    }

    pub fn read_state(checkpoint: &Path) -> FrameworkResult<CheckpointState> {
        let path = checkpoint.join(STATE_FILE);
        let json = fs::read_to_string(&path).map_err(|e| FrameworkError::checkpoint(&path, e))?;
        serde_json::from_str(&json).map_err(|e| FrameworkError::checkpoint(&path, e))
    }

    /// Load weights into a model of matching architecture.
    pub fn load_model<B: Backend>(
        checkpoint: &Path,
        model:      ReasoningNetwork<B>,
        device:     &B::Device,
    ) -> FrameworkResult<ReasoningNetwork<B>> {
        let record = Recorder::<B>::load(&StateRecorder::new(), checkpoint.join(MODEL_FILE), device)
            .map_err(|e| FrameworkError::checkpoint(checkpoint, e))?;
        Ok(model.load_record(record))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::ModelInput;
    use crate::domain::config::ExperimentConfig;
    use crate::ml::{model::ReasoningNetworkConfig, optim::build_optimizer};
    use burn::backend::{Autodiff, NdArray};
    use burn::module::AutodiffModule;
    use tempfile::tempdir;

    type TrainBackend = Autodiff<NdArray>;

    const CONFIG: &str = "
learning_mode: { type: supervised }
model: { input_size: 4, hidden_size: 4, output_size: 2, reasoning_steps: 2 }
training: { batch_size: 2, learning_rate: 0.001, epochs: 1 }
system: { device: cpu }
inference: { min_reasoning_steps: 1, max_reasoning_steps: 2, reasoning_threshold: 0.9, temperature: 1.0 }
data: { train_path: data.json }
";

    fn config() -> ExperimentConfig {
        ExperimentConfig::from_yaml_str(CONFIG).unwrap()
    }

    fn state(epoch: usize, val_loss: f64) -> CheckpointState {
        let mut metrics = BTreeMap::new();
        metrics.insert("val_loss".to_string(), val_loss);
        CheckpointState {
            epoch,
            metrics,
            learning_rate: 0.001,
            scheduler: None,
            early_stopping: EarlyStopping::new(3),
            config: config(),
            saved_at: Utc::now(),
        }
    }

    fn network(device: &<TrainBackend as Backend>::Device) -> ReasoningNetwork<TrainBackend> {
        ReasoningNetworkConfig::from(&config().model).init(device).unwrap()
    }

    #[test]
    fn test_round_trip_restores_parameters_and_state() {
        let dir = tempdir().unwrap();
        let device = Default::default();
        let manager = CheckpointManager::new(dir.path(), 5);

        let model = network(&device);
        let optimizer = build_optimizer::<ReasoningNetwork<TrainBackend>, TrainBackend>(&config().training);
        let saved = manager.save(&model, optimizer.as_ref(), &state(5, 0.3)).unwrap();

        // A freshly initialised model has different weights until loaded
        let restored = CheckpointManager::load_model(&saved, network(&device), &device).unwrap();

        let input = ModelInput::<NdArray>::Features(Tensor::ones([2, 4], &device));
        let before: Vec<f32> = model.valid().forward(&input).into_data().iter::<f32>().collect();
        let after:  Vec<f32> = restored.valid().forward(&input).into_data().iter::<f32>().collect();
        assert_eq!(before, after);

        let loaded = CheckpointManager::read_state(&saved).unwrap();
        assert_eq!(loaded.epoch, 5);
        assert_eq!(loaded.metrics["val_loss"], 0.3);
        assert!(CheckpointManager::optimizer_path(&saved).with_extension("mpk.gz").is_file());
    }

    #[test]
    fn test_retention_keeps_newest_and_best() {
        let dir = tempdir().unwrap();
        let device = Default::default();
        let manager = CheckpointManager::new(dir.path(), 5);
        let model = network(&device);
        let optimizer = build_optimizer::<ReasoningNetwork<TrainBackend>, TrainBackend>(&config().training);

        for epoch in 1..=10 {
            manager.save(&model, optimizer.as_ref(), &state(epoch, 1.0)).unwrap();
            if epoch == 2 {
                manager.promote_best(epoch).unwrap();
            }
            manager.cleanup().unwrap();
        }

        let kept: Vec<usize> = manager.epochs().into_iter().map(|(e, _)| e).collect();
        assert_eq!(kept, vec![6, 7, 8, 9, 10]);
        assert_eq!(CheckpointManager::read_state(&manager.best_dir()).unwrap().epoch, 2);
        assert!(!dir.path().join(BEST_TMP_DIR).exists());
    }

    #[test]
    fn test_resolve_prefers_best_then_latest() {
        let dir = tempdir().unwrap();
        let device = Default::default();
        let manager = CheckpointManager::new(dir.path(), 0);
        let model = network(&device);
        let optimizer = build_optimizer::<ReasoningNetwork<TrainBackend>, TrainBackend>(&config().training);

        assert!(CheckpointManager::resolve(dir.path()).is_err());

        manager.save(&model, optimizer.as_ref(), &state(1, 1.0)).unwrap();
        manager.save(&model, optimizer.as_ref(), &state(2, 1.0)).unwrap();
        assert_eq!(CheckpointManager::resolve(dir.path()).unwrap(), manager.epoch_dir(2));

        manager.promote_best(1).unwrap();
        assert_eq!(CheckpointManager::resolve(dir.path()).unwrap(), manager.best_dir());
        assert_eq!(
            CheckpointManager::resolve(&manager.epoch_dir(2)).unwrap(),
            manager.epoch_dir(2)
        );
    }
}
