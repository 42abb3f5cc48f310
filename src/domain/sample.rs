// ============================================================
// Layer 3 — Host-side Samples
// ============================================================
// A Sample is one example after parsing and feature encoding but
// before batching. It holds plain vectors so datasets can live on
// any thread; the batcher turns a Vec<Sample> into tensors on the
// target device.
//
//   Tokens   → padded token ids plus a 1/0 validity mask
//   Features → a dense feature vector of width `input_size`

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SampleInput {
    Tokens { ids: Vec<u32>, mask: Vec<u32> },
    Features(Vec<f32>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub input:       SampleInput,
    /// Class index (supervised, unsupervised evaluation) or logged
    /// action (reinforcement)
    pub label:       Option<usize>,
    /// One class index per task head (multi-task)
    pub task_labels: Vec<usize>,
    pub reward:      Option<f32>,
}

impl Sample {
    pub fn tokens(ids: Vec<u32>, mask: Vec<u32>) -> Self {
        Self::from_input(SampleInput::Tokens { ids, mask })
    }

    pub fn features(values: Vec<f32>) -> Self {
        Self::from_input(SampleInput::Features(values))
    }

    fn from_input(input: SampleInput) -> Self {
        Self { input, label: None, task_labels: Vec::new(), reward: None }
    }

    pub fn with_label(mut self, label: usize) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_task_labels(mut self, labels: Vec<usize>) -> Self {
        self.task_labels = labels;
        self
    }

    pub fn with_reward(mut self, reward: f32) -> Self {
        self.reward = Some(reward);
        self
    }

    /// Sequence length for tokens, feature width for features.
    pub fn width(&self) -> usize {
        match &self.input {
            SampleInput::Tokens { ids, .. } => ids.len(),
            SampleInput::Features(values)   => values.len(),
        }
    }

    pub fn is_tokens(&self) -> bool {
        matches!(self.input, SampleInput::Tokens { .. })
    }
}
