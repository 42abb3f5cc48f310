// ============================================================
// Layer 3 — Epoch Metrics and Run Summary
// ============================================================
// One EpochMetrics row is produced per epoch and handed to the
// experiment sink and the checkpoint. RunSummary is produced when
// the run ends, whatever the reason.
//
// How to read the metrics:
//   - val_loss should fall with train_loss; divergence means
//     the network is overfitting
//   - learning_rate drops when the plateau scheduler fires

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One row of metrics for a single epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch:         usize,

    /// Mean training loss over the epoch's batches
    pub train_loss:    f64,

    /// Mean loss over the validation batches
    pub val_loss:      f64,

    /// Fraction of validation targets predicted correctly,
    /// in [0.0, 1.0]; 0.0 when the mode has no targets
    pub val_accuracy:  f64,

    /// Learning rate in effect after the scheduler step
    pub learning_rate: f64,
}

impl EpochMetrics {
    pub fn new(
        epoch:         usize,
        train_loss:    f64,
        val_loss:      f64,
        val_accuracy:  f64,
        learning_rate: f64,
    ) -> Self {
        Self { epoch, train_loss, val_loss, val_accuracy, learning_rate }
    }

    /// Returns true if this epoch improved on the best val_loss so far
    pub fn is_improvement(&self, best_val_loss: f64) -> bool {
        self.val_loss < best_val_loss
    }

    /// Flat name → value view stored in checkpoints.
    pub fn to_map(&self) -> BTreeMap<String, f64> {
        BTreeMap::from([
            ("train_loss".to_string(),    self.train_loss),
            ("val_loss".to_string(),      self.val_loss),
            ("val_accuracy".to_string(),  self.val_accuracy),
            ("learning_rate".to_string(), self.learning_rate),
        ])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StopReason {
    Completed,
    EarlyStopped,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub epochs_run:  usize,
    pub best:        Option<EpochMetrics>,
    pub stop_reason: StopReason,
}
