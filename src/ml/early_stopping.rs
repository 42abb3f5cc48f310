// ============================================================
// Layer 5 — Early Stopping
// ============================================================
// Counts consecutive epochs whose validation loss does not beat
// the best seen so far; training stops once the count reaches
// `patience`. A patience of 0 disables early stopping.
//
// Example, patience = 2:
//   val_loss  1.0   0.9   0.95  0.96
//   counter   0     0     1     2  → stop after epoch 4

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStopping {
    patience:  usize,
    best_loss: Option<f64>,
    counter:   usize,
}

/// What one epoch's validation loss means for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopDecision {
    pub improved:    bool,
    pub should_stop: bool,
}

impl EarlyStopping {
    pub fn new(patience: usize) -> Self {
        Self { patience, best_loss: None, counter: 0 }
    }

    pub fn best_loss(&self) -> Option<f64> {
        self.best_loss
    }

    pub fn record(&mut self, val_loss: f64) -> StopDecision {
        let improved = self.best_loss.map_or(true, |best| val_loss < best);
        if improved {
            self.best_loss = Some(val_loss);
            self.counter = 0;
        } else {
            self.counter += 1;
        }
        StopDecision {
            improved,
            should_stop: self.patience > 0 && self.counter >= self.patience,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn first_stop(patience: usize, losses: &[f64]) -> Option<usize> {
        let mut es = EarlyStopping::new(patience);
        losses
            .iter()
            .position(|&l| es.record(l).should_stop)
            .map(|i| i + 1)
    }

    #[test]
    fn test_stops_after_patience_non_improving_epochs() {
        assert_eq!(first_stop(2, &[1.0, 0.9, 0.95, 0.96, 0.97]), Some(4));
    }

    #[test]
    fn test_improvement_resets_counter() {
        assert_eq!(first_stop(2, &[1.0, 1.1, 0.8, 0.9, 0.7, 0.75]), None);
    }

    #[test]
    fn test_zero_patience_never_stops() {
        assert_eq!(first_stop(0, &[1.0, 2.0, 3.0, 4.0]), None);
    }

    #[test]
    fn test_first_epoch_is_improvement() {
        let mut es = EarlyStopping::new(1);
        let decision = es.record(5.0);
        assert!(decision.improved);
        assert!(!decision.should_stop);
        assert_eq!(es.best_loss(), Some(5.0));
    }
}
