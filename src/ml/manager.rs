// ============================================================
// Layer 5 — Mode Manager
// ============================================================
// Owns one run: adapter, learning mode, reasoning network,
// optimiser, scheduler, checkpoints and the experiment sink.
//
// State machine:
//
//   ModelBuilt → Training(e) → Evaluating(e)
//                    ↑              ↓
//                    └──── Checkpointed(e)
//                                   ↓
//             Completed | EarlyStopped(e) | Failed
//
// Per epoch:
//   1. train every batch (mode-specific loss, backward, step)
//   2. evaluate on validation batches with model.valid()
//   3. scheduler.step(val_loss), early-stopping bookkeeping
//   4. metrics → sink, checkpoint, promote best, retention
//
// The checkpoint is written only once the epoch's metrics are
// complete, so best/ never holds a half-evaluated model. Sink
// and checkpoint-write failures are logged and training goes on.
//
// Reference: Burn Book §5 (Training), Rust Book §17 (State Pattern)

use std::{collections::BTreeMap, path::Path};

use burn::{module::AutodiffModule, prelude::*, tensor::backend::AutodiffBackend};
use chrono::Utc;
use serde::Serialize;

use crate::data::{
    adapter::{AdaptedData, BatchSource, DataAdapter, DataInput},
    batcher::Batch,
    registry,
};
use crate::domain::{
    config::ExperimentConfig,
    error::{DataError, FrameworkError, FrameworkResult},
    metrics::{EpochMetrics, RunSummary, StopReason},
    traits::{ExperimentSink, MemoryHook, RunInfo, TracingMemoryHook},
};
use crate::infra::checkpoint::{CheckpointManager, CheckpointState};
use crate::ml::{
    early_stopping::EarlyStopping,
    inference::InferencePolicy,
    model::{ReasoningNetwork, ReasoningNetworkConfig},
    modes::{create_mode, LearningMode, Prediction},
    optim::{build_optimizer, ModelOptimizer},
    scheduler::PlateauScheduler,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManagerState {
    ModelBuilt,
    Training { epoch: usize },
    Evaluating { epoch: usize },
    Checkpointed { epoch: usize },
    Completed,
    EarlyStopped { epoch: usize },
    Failed,
}

/// Aggregate of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EvalReport {
    /// Mean of per-batch losses
    pub loss:     f64,
    /// correct / scored targets; 0 when nothing was scored
    pub accuracy: f64,
    pub samples:  usize,
    pub batches:  usize,
}

pub struct ModeManager<B: AutodiffBackend> {
    config:         ExperimentConfig,
    device:         B::Device,
    adapter:        Box<dyn DataAdapter>,
    mode:           Box<dyn LearningMode<B>>,
    model:          ReasoningNetwork<B>,
    optimizer:      Box<dyn ModelOptimizer<ReasoningNetwork<B>, B>>,
    scheduler:      Option<PlateauScheduler>,
    learning_rate:  f64,
    policy:         InferencePolicy,
    checkpoints:    CheckpointManager,
    tracker:        Box<dyn ExperimentSink>,
    memory_hook:    Box<dyn MemoryHook>,
    early_stopping: EarlyStopping,
    state:          ManagerState,
    epoch:          usize,
    best:           Option<EpochMetrics>,
}

/// Log a failed sink call and carry on.
fn best_effort(what: &str, result: anyhow::Result<()>) {
    if let Err(e) = result {
        tracing::warn!("Experiment tracker failed to record {what}: {e:#}");
    }
}

impl<B: AutodiffBackend> ModeManager<B> {
    /// Validate the configuration, resolve the registry entry and build
    /// the model stack. Fails before any data I/O on a bad configuration.
    pub fn new(
        config:  ExperimentConfig,
        device:  B::Device,
        tracker: Box<dyn ExperimentSink>,
    ) -> FrameworkResult<Self> {
        config.validate()?;
        let adapter = registry::adapter_for(&config)?;
        let policy = InferencePolicy::from_config(&config.inference)?;

        B::seed(config.system.seed);
        let model = ReasoningNetworkConfig::from(&config.model).init::<B>(&device)?;
        let optimizer = build_optimizer::<ReasoningNetwork<B>, B>(&config.training);
        let learning_rate = config.training.learning_rate;
        let scheduler = config
            .training
            .use_scheduler
            .then(|| PlateauScheduler::new(learning_rate, &config.training.scheduler));
        let mode = create_mode::<B>(&config, &device)?;

        tracing::info!(
            "Model ready: mode={}, data={}, {} parameters, {} reasoning steps",
            config.mode(),
            config.data_kind(),
            model.num_params(),
            config.model.reasoning_steps,
        );
        if config.mixed_precision.enabled {
            tracing::info!(
                "Mixed precision requested; computing in backend precision {}",
                std::any::type_name::<B::FloatElem>()
            );
        }

        Ok(Self {
            checkpoints:    CheckpointManager::from_config(&config.checkpoint),
            early_stopping: EarlyStopping::new(config.training.patience),
            config,
            device,
            adapter,
            mode,
            model,
            optimizer,
            scheduler,
            learning_rate,
            policy,
            tracker,
            memory_hook:    Box::new(TracingMemoryHook),
            state:          ManagerState::ModelBuilt,
            epoch:          0,
            best:           None,
        })
    }

    pub fn with_memory_hook(mut self, hook: Box<dyn MemoryHook>) -> Self {
        self.memory_hook = hook;
        self
    }

    pub fn state(&self) -> &ManagerState {
        &self.state
    }

    pub fn config(&self) -> &ExperimentConfig {
        &self.config
    }

    pub fn model(&self) -> &ReasoningNetwork<B> {
        &self.model
    }

    pub fn policy(&self) -> &InferencePolicy {
        &self.policy
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    /// Last completed (or restored) epoch.
    pub fn epoch(&self) -> usize {
        self.epoch
    }

    /// Display name of a predicted class, when labels were strings.
    pub fn class_name(&self, class: usize) -> String {
        self.adapter.label_name(class).unwrap_or_else(|| class.to_string())
    }

    // ─── Training ─────────────────────────────────────────────────────────────
    /// Train from `data`, or from the configured paths when `None`.
    /// Explicit data is split into training and validation sets.
    pub fn train(&mut self, data: Option<DataInput>) -> FrameworkResult<RunSummary> {
        match self.run_training(data) {
            Ok(summary) => Ok(summary),
            Err(e) => {
                self.state = ManagerState::Failed;
                tracing::error!(
                    "Training failed at epoch {} (mode {}): {e}",
                    self.epoch + 1,
                    self.mode.kind()
                );
                let summary = RunSummary {
                    epochs_run:  self.epoch,
                    best:        self.best.clone(),
                    stop_reason: StopReason::Failed(e.to_string()),
                };
                best_effort("run end", self.tracker.finish(&summary));
                Err(e)
            }
        }
    }

    fn training_data(&self, data: Option<DataInput>) -> FrameworkResult<(AdaptedData, AdaptedData)> {
        match data {
            None => Ok(self.adapter.load_from_config()?),
            Some(input) => {
                let core = self.adapter.core();
                Ok(self.adapter.adapt(input)?.split(
                    self.config.data.train_split,
                    self.config.system.seed,
                    core.train_options(),
                    core.eval_options(),
                ))
            }
        }
    }

    fn run_training(&mut self, data: Option<DataInput>) -> FrameworkResult<RunSummary> {
        let (train, val) = self.training_data(data)?;
        let train = train.into_source::<B>(&self.device);
        let val = val.into_source::<B::InnerBackend>(&self.device);

        let info = RunInfo {
            run_name:        format!("{}_{}", self.config.mode(), self.config.data_kind()),
            mode:            self.config.mode(),
            data_kind:       self.config.data_kind(),
            architecture:    self.config.model.architecture_type.clone(),
            parameter_count: self.model.num_params(),
            hyperparameters: self.config.clone(),
        };
        best_effort("run start", self.tracker.log_start(&info));

        let mut stop_reason = StopReason::Completed;
        let first = self.epoch + 1;
        for epoch in first..=self.config.training.epochs {
            self.state = ManagerState::Training { epoch };
            let train_loss = self.train_epoch(&train)?;

            self.state = ManagerState::Evaluating { epoch };
            let model = self.model.valid();
            let report = self.evaluate_source(&model, &val)?;

            if let Some(scheduler) = self.scheduler.as_mut() {
                self.learning_rate = scheduler.step(report.loss);
            }
            let metrics = EpochMetrics::new(
                epoch,
                train_loss,
                report.loss,
                report.accuracy,
                self.learning_rate,
            );
            let decision = self.early_stopping.record(report.loss);
            self.epoch = epoch;

            tracing::info!(
                "Epoch {:>3}/{} | train_loss={:.4} | val_loss={:.4} | val_acc={:.4} | lr={:.2e}",
                epoch,
                self.config.training.epochs,
                train_loss,
                report.loss,
                report.accuracy,
                self.learning_rate,
            );
            best_effort("epoch metrics", self.tracker.log_epoch(&metrics));
            self.checkpoint(&metrics, decision.improved);
            if decision.improved {
                self.best = Some(metrics);
            }

            if decision.should_stop {
                tracing::info!("Early stopping after epoch {}", epoch);
                self.state = ManagerState::EarlyStopped { epoch };
                stop_reason = StopReason::EarlyStopped;
                break;
            }
        }

        if stop_reason == StopReason::Completed {
            self.state = ManagerState::Completed;
        }
        let summary = RunSummary {
            epochs_run: self.epoch,
            best:       self.best.clone(),
            stop_reason,
        };
        best_effort("run end", self.tracker.finish(&summary));
        tracing::info!("Training complete!");
        Ok(summary)
    }

    fn train_epoch(&mut self, source: &BatchSource<B>) -> FrameworkResult<f64> {
        let mut total = 0.0;
        let mut batches = 0usize;

        for batch in source.iter() {
            let (model, loss) = self.mode.train_batch(
                self.model.clone(),
                self.optimizer.as_mut(),
                self.learning_rate,
                batch,
            )?;
            self.model = model;
            total += loss;
            batches += 1;
            tracing::debug!("batch {} loss={:.6}", batches, loss);
        }

        if batches == 0 {
            return Err(DataError::Empty("training set produced no batches").into());
        }
        Ok(total / batches as f64)
    }

    /// Write this epoch's checkpoint; on success promote it to best when
    /// it improved, then apply retention. Failures skip the checkpoint.
    fn checkpoint(&mut self, metrics: &EpochMetrics, improved: bool) {
        let epoch = metrics.epoch;
        let state = CheckpointState {
            epoch,
            metrics:        metrics.to_map(),
            learning_rate:  self.learning_rate,
            scheduler:      self.scheduler.clone(),
            early_stopping: self.early_stopping.clone(),
            config:         self.config.clone(),
            saved_at:       Utc::now(),
        };

        if let Err(e) = self.checkpoints.save(&self.model, self.optimizer.as_ref(), &state) {
            tracing::warn!("Skipping checkpoint for epoch {}: {}", epoch, e);
            return;
        }
        self.state = ManagerState::Checkpointed { epoch };

        if improved {
            match self.checkpoints.promote_best(epoch) {
                Ok(best) => best_effort("best model", self.tracker.log_artifact("best_model", &best)),
                Err(e)   => tracing::warn!("Could not promote epoch {} to best: {}", epoch, e),
            }
        }
        if let Err(e) = self.checkpoints.cleanup() {
            tracing::warn!("Checkpoint retention failed: {}", e);
        }
    }

    // ─── Evaluation ───────────────────────────────────────────────────────────
    /// Evaluate on `data`, or on the configured validation data.
    pub fn evaluate(&mut self, data: Option<DataInput>) -> FrameworkResult<EvalReport> {
        let data = match data {
            Some(input) => self.adapter.adapt(input)?,
            None        => self.adapter.load_from_config()?.1,
        };
        let source = data.into_source::<B::InnerBackend>(&self.device);

        let previous = std::mem::replace(&mut self.state, ManagerState::Evaluating { epoch: self.epoch });
        let model = self.model.valid();
        let report = self.evaluate_source(&model, &source);
        self.state = previous;

        let report = report?;
        tracing::info!(
            "Evaluation: loss={:.4}, accuracy={:.4} over {} samples",
            report.loss,
            report.accuracy,
            report.samples
        );
        Ok(report)
    }

    fn evaluate_source(
        &mut self,
        model:  &ReasoningNetwork<B::InnerBackend>,
        source: &BatchSource<B::InnerBackend>,
    ) -> FrameworkResult<EvalReport> {
        let cadence = self.config.memory.empty_cache_freq;
        let mut loss = 0.0;
        let mut correct = 0usize;
        let mut scored = 0usize;
        let mut samples = 0usize;
        let mut batches = 0usize;

        for batch in source.iter() {
            samples += batch.len();
            let result = self.mode.evaluate_batch(model, batch)?;
            loss += result.loss;
            correct += result.correct;
            scored += result.total;
            batches += 1;

            if cadence > 0 && batches % cadence == 0 {
                self.memory_hook.release();
            }
        }

        if batches == 0 {
            return Err(DataError::Empty("evaluation set produced no batches").into());
        }
        Ok(EvalReport {
            loss:     loss / batches as f64,
            accuracy: if scored > 0 { correct as f64 / scored as f64 } else { 0.0 },
            samples,
            batches,
        })
    }

    // ─── Prediction ───────────────────────────────────────────────────────────
    /// Adaptive-depth prediction for every example in `data`.
    pub fn predict(&mut self, data: DataInput) -> FrameworkResult<Prediction> {
        let source = self.adapter.adapt(data)?.into_source::<B::InnerBackend>(&self.device);
        let model = self.model.valid();

        let mut prediction = Prediction::default();
        for Batch { inputs, .. } in source.iter() {
            prediction.merge(self.mode.predict_batch(&self.policy, &model, inputs)?);
        }
        if prediction.is_empty() {
            return Err(DataError::Empty("nothing to predict").into());
        }
        Ok(prediction)
    }

    // ─── Checkpoint restore ───────────────────────────────────────────────────
    /// Restore model, optimiser, scheduler and early-stopping state from a
    /// checkpoint directory (or a checkpoint root, preferring best/).
    /// Returns the stored epoch and metrics. On error the manager is
    /// left exactly as it was.
    pub fn load_checkpoint(&mut self, path: &Path) -> FrameworkResult<(usize, BTreeMap<String, f64>)> {
        let dir = CheckpointManager::resolve(path)?;
        let stored = CheckpointManager::read_state(&dir)?;
        if stored.config.model != self.config.model {
            tracing::warn!(
                "Checkpoint '{}' was saved with a different model configuration",
                dir.display()
            );
        }

        // Nothing is committed until every file has been read
        let model = CheckpointManager::load_model(&dir, self.model.clone(), &self.device)?;
        let optimizer = build_optimizer::<ReasoningNetwork<B>, B>(&self.config.training)
            .load_state(CheckpointManager::optimizer_path(&dir), &self.device)
            .map_err(|e| FrameworkError::checkpoint(&dir, e))?;

        self.model = model;
        self.optimizer = optimizer;
        if let (Some(_), Some(restored)) = (&self.scheduler, stored.scheduler) {
            self.scheduler = Some(restored);
        }
        self.learning_rate = stored.learning_rate;
        self.early_stopping = stored.early_stopping;
        self.epoch = stored.epoch;
        self.state = ManagerState::Checkpointed { epoch: stored.epoch };

        tracing::info!("Loaded checkpoint '{}' (epoch {})", dir.display(), stored.epoch);
        Ok((stored.epoch, stored.metrics))
    }
}
