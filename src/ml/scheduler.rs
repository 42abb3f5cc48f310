// ============================================================
// Layer 5 — Reduce-on-Plateau Scheduler
// ============================================================
// Lowers the learning rate when validation loss stops improving:
//
//   improved  ⇔  loss < best · (1 − threshold)      (relative, min mode)
//   after `patience` epochs without improvement:
//       lr = max(lr · factor, min_lr), counter resets
//
// The scheduler is serialisable so it can be stored in checkpoints
// and resumed exactly.

use serde::{Deserialize, Serialize};

use crate::domain::config::SchedulerSection;

const RELATIVE_THRESHOLD: f64 = 1e-4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlateauScheduler {
    factor:     f64,
    patience:   usize,
    min_lr:     f64,
    lr:         f64,
    best:       Option<f64>,
    bad_epochs: usize,
}

impl PlateauScheduler {
    pub fn new(initial_lr: f64, section: &SchedulerSection) -> Self {
        Self {
            factor:     section.factor,
            patience:   section.patience,
            min_lr:     section.min_lr,
            lr:         initial_lr,
            best:       None,
            bad_epochs: 0,
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.lr
    }

    /// Record one validation loss and return the learning rate to use next.
    pub fn step(&mut self, val_loss: f64) -> f64 {
        let improved = match self.best {
            None       => true,
            Some(best) => val_loss < best * (1.0 - RELATIVE_THRESHOLD),
        };

        if improved {
            self.best = Some(val_loss);
            self.bad_epochs = 0;
        } else {
            self.bad_epochs += 1;
            if self.bad_epochs > self.patience {
                let reduced = (self.lr * self.factor).max(self.min_lr);
                if reduced < self.lr {
                    tracing::info!("Reducing learning rate {:.2e} → {:.2e}", self.lr, reduced);
                }
                self.lr = reduced;
                self.bad_epochs = 0;
            }
        }
        self.lr
    }
}
