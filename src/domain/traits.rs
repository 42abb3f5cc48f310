// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The mode manager talks to its collaborators through traits so
// that tests can swap in recording or failing implementations.
//
//   ExperimentSink → write-only experiment tracker, injected at
//                    construction, finished at run end or failure
//   MemoryHook     → releases cached accelerator memory on the
//                    configured batch cadence
//
// Reference: Rust Book §10 (Traits), §17 (Trait Objects)

use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::domain::{
    config::ExperimentConfig,
    metrics::{EpochMetrics, RunSummary},
    modes::{DataKind, ModeKind},
};

/// Everything a tracker needs to describe a run when it starts.
#[derive(Debug, Clone, Serialize)]
pub struct RunInfo {
    pub run_name:        String,
    pub mode:            ModeKind,
    pub data_kind:       DataKind,
    pub architecture:    String,
    pub parameter_count: usize,
    pub hyperparameters: ExperimentConfig,
}

// ─── ExperimentSink ───────────────────────────────────────────────────────────
/// A write-only tracker for one run. The manager treats every
/// call as best-effort: errors are logged, never propagated.
pub trait ExperimentSink {
    fn log_start(&mut self, run: &RunInfo) -> Result<()>;

    fn log_epoch(&mut self, metrics: &EpochMetrics) -> Result<()>;

    /// Record a named artifact, e.g. the best checkpoint directory.
    fn log_artifact(&mut self, name: &str, path: &Path) -> Result<()>;

    /// Flush and close. Called once, on success or failure.
    fn finish(&mut self, summary: &RunSummary) -> Result<()>;
}

/// Discards everything. Used by evaluate/predict sessions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ExperimentSink for NullSink {
    fn log_start(&mut self, _run: &RunInfo) -> Result<()> { Ok(()) }
    fn log_epoch(&mut self, _metrics: &EpochMetrics) -> Result<()> { Ok(()) }
    fn log_artifact(&mut self, _name: &str, _path: &Path) -> Result<()> { Ok(()) }
    fn finish(&mut self, _summary: &RunSummary) -> Result<()> { Ok(()) }
}

// ─── MemoryHook ───────────────────────────────────────────────────────────────
pub trait MemoryHook {
    fn release(&mut self);
}

/// Burn's allocators manage their own pools, so the default hook
/// only records that a release point was reached.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMemoryHook;

impl MemoryHook for TracingMemoryHook {
    fn release(&mut self) {
        tracing::debug!("cache release point reached");
    }
}
