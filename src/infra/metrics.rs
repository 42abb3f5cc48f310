// ============================================================
// Layer 6 — Experiment Tracker
// ============================================================
// File-backed ExperimentSink. Each run gets its own directory:
//
//   experiments/<run_name>/
//     experiment.json  — mode, data kind, architecture, parameter
//                        count and the full hyperparameter config
//     metrics.csv      — one row per epoch
//     artifacts.json   — named paths (best checkpoint, tokenizer)
//     summary.json     — RunSummary written by finish()
//     report.txt       — human-readable end-of-run report
//
// Example CSV output:
//   epoch,train_loss,val_loss,val_accuracy,learning_rate
//   1,1.098600,1.054300,0.412000,0.001000
//   2,0.987100,0.962500,0.538000,0.001000
//
// How to read the metrics:
//   - val_loss rising while train_loss falls → overfitting
//   - learning_rate drops mark scheduler reductions
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use chrono::{Local, Utc};
use serde::Serialize;

use crate::domain::{
    metrics::{EpochMetrics, RunSummary, StopReason},
    modes::{DataKind, ModeKind},
    traits::{ExperimentSink, RunInfo},
};

const CSV_HEADER: &str = "epoch,train_loss,val_loss,val_accuracy,learning_rate";

#[derive(Debug, Clone, Serialize)]
struct Artifact {
    name: String,
    path: PathBuf,
}

/// Writes one run's metrics and metadata under `<root>/<run_name>/`.
pub struct CsvExperimentTracker {
    run_dir:   PathBuf,
    artifacts: Vec<Artifact>,
    history:   Vec<EpochMetrics>,
}

impl CsvExperimentTracker {
    pub fn new(root: impl AsRef<Path>, run_name: &str) -> Result<Self> {
        let run_dir = root.as_ref().join(run_name);
        fs::create_dir_all(&run_dir)
            .with_context(|| format!("Cannot create experiment dir '{}'", run_dir.display()))?;
        Ok(Self { run_dir, artifacts: Vec::new(), history: Vec::new() })
    }

    /// `<mode>_<data>_<YYYYmmdd_HHMMSS>`
    pub fn run_name(mode: ModeKind, data_kind: DataKind) -> String {
        format!("{mode}_{data_kind}_{}", Local::now().format("%Y%m%d_%H%M%S"))
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn csv_path(&self) -> PathBuf {
        self.run_dir.join("metrics.csv")
    }

    fn write_json<T: Serialize>(&self, file: &str, value: &T) -> Result<()> {
        let path = self.run_dir.join(file);
        fs::write(&path, serde_json::to_string_pretty(value)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }

    fn report(&self, summary: &RunSummary) -> String {
        let mut out = String::new();
        out.push_str(&format!("Run:        {}\n", self.run_dir.display()));
        out.push_str(&format!("Epochs run: {}\n", summary.epochs_run));
        let reason = match &summary.stop_reason {
            StopReason::Completed     => "completed".to_string(),
            StopReason::EarlyStopped  => "early stopped".to_string(),
            StopReason::Failed(msg)   => format!("failed: {msg}"),
        };
        out.push_str(&format!("Outcome:    {reason}\n"));
        if let Some(best) = &summary.best {
            out.push_str(&format!(
                "Best epoch: {} (val_loss {:.6}, val_accuracy {:.4})\n",
                best.epoch, best.val_loss, best.val_accuracy
            ));
        }
        if !self.history.is_empty() {
            out.push_str("\nepoch  train_loss  val_loss  val_acc   lr\n");
            for m in &self.history {
                out.push_str(&format!(
                    "{:>5}  {:>10.6}  {:>8.6}  {:>7.4}  {:.2e}\n",
                    m.epoch, m.train_loss, m.val_loss, m.val_accuracy, m.learning_rate
                ));
            }
        }
        out
    }
}

#[derive(Serialize)]
struct ExperimentRecord<'a> {
    #[serde(flatten)]
    run:        &'a RunInfo,
    started_at: chrono::DateTime<Utc>,
}

impl ExperimentSink for CsvExperimentTracker {
    fn log_start(&mut self, run: &RunInfo) -> Result<()> {
        self.write_json("experiment.json", &ExperimentRecord { run, started_at: Utc::now() })?;

        let mut f = fs::File::create(self.csv_path())?;
        writeln!(f, "{CSV_HEADER}")?;

        tracing::info!("Tracking run '{}' in {}", run.run_name, self.run_dir.display());
        Ok(())
    }

    fn log_epoch(&mut self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.csv_path())?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6}",
            m.epoch, m.train_loss, m.val_loss, m.val_accuracy, m.learning_rate,
        )?;

        self.history.push(m.clone());
        Ok(())
    }

    fn log_artifact(&mut self, name: &str, path: &Path) -> Result<()> {
        self.artifacts.retain(|a| a.name != name);
        self.artifacts.push(Artifact { name: name.to_string(), path: path.to_path_buf() });
        self.write_json("artifacts.json", &self.artifacts)
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<()> {
        self.write_json("summary.json", summary)?;
        let path = self.run_dir.join("report.txt");
        fs::write(&path, self.report(summary))
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Wrote experiment report to '{}'", path.display());
        Ok(())
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::ExperimentConfig;
    use tempfile::tempdir;

    fn run_info() -> RunInfo {
        RunInfo {
            run_name:        "demo".into(),
            mode:            ModeKind::Supervised,
            data_kind:       DataKind::Text,
            architecture:    "reasoning".into(),
            parameter_count: 1234,
            hyperparameters: ExperimentConfig::from_yaml_str(
                crate::domain::config::tests::MINIMAL,
            )
            .unwrap(),
        }
    }

    #[test]
    fn test_writes_all_run_files() {
        let root = tempdir().unwrap();
        let mut tracker = CsvExperimentTracker::new(root.path(), "demo").unwrap();

        tracker.log_start(&run_info()).unwrap();
        tracker.log_epoch(&EpochMetrics::new(1, 1.2, 1.1, 0.4, 1e-3)).unwrap();
        tracker.log_epoch(&EpochMetrics::new(2, 0.9, 0.8, 0.6, 1e-3)).unwrap();
        tracker.log_artifact("best_checkpoint", Path::new("checkpoints/best")).unwrap();
        tracker
            .finish(&RunSummary {
                epochs_run:  2,
                best:        Some(EpochMetrics::new(2, 0.9, 0.8, 0.6, 1e-3)),
                stop_reason: StopReason::Completed,
            })
            .unwrap();

        let csv = fs::read_to_string(tracker.csv_path()).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines.len(), 3);
        assert!(lines[2].starts_with("2,0.900000,0.800000"));

        let experiment = fs::read_to_string(tracker.run_dir().join("experiment.json")).unwrap();
        assert!(experiment.contains("\"parameter_count\": 1234"));

        let report = fs::read_to_string(tracker.run_dir().join("report.txt")).unwrap();
        assert!(report.contains("Best epoch: 2"));
        assert!(tracker.run_dir().join("artifacts.json").is_file());
    }

    #[test]
    fn test_run_name_starts_with_mode_and_data() {
        let name = CsvExperimentTracker::run_name(ModeKind::MultiTask, DataKind::Tabular);
        assert!(name.starts_with("multi_task_tabular_"));
    }
}
