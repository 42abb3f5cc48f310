// ============================================================
// Layer 4 — Batcher
// ============================================================
// Converts a Vec<Sample> into a Batch of tensors on the device.
//
// Burn's Batcher trait has one method:
//   batch(items: Vec<Sample>) → Batch<B>
//
// Tensor shapes produced (n = number of samples):
//   Tokens   → ids [n, seq_len] Int, mask [n, seq_len] Int
//   Features → [n, width] Float
//   labels        [n]      Int    only if every sample has one
//   task_labels   [n, T]   Int    only if every sample has T of them
//   rewards       [n]      Float  only if every sample has one
//
// The first sample fixes the input form and width; later samples
// are padded or truncated to match.
//
// Reference: Burn Book §4 (Batcher)

use burn::{data::dataloader::batcher::Batcher, prelude::*};

use crate::domain::sample::{Sample, SampleInput};

// ─── ModelInput ───────────────────────────────────────────────────────────────
/// What the reasoning network consumes.
#[derive(Debug, Clone)]
pub enum ModelInput<B: Backend> {
    /// Token ids with an optional 1/0 validity mask, both [batch, seq_len]
    Tokens {
        ids:  Tensor<B, 2, Int>,
        mask: Option<Tensor<B, 2, Int>>,
    },
    /// Dense features [batch, input_size]
    Features(Tensor<B, 2>),
}

impl<B: Backend> ModelInput<B> {
    pub fn batch_size(&self) -> usize {
        match self {
            ModelInput::Tokens { ids, .. } => ids.dims()[0],
            ModelInput::Features(x)        => x.dims()[0],
        }
    }

    pub fn device(&self) -> B::Device {
        match self {
            ModelInput::Tokens { ids, .. } => ids.device(),
            ModelInput::Features(x)        => x.device(),
        }
    }
}

// ─── Batch ────────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub struct Batch<B: Backend> {
    pub inputs:      ModelInput<B>,
    pub labels:      Option<Tensor<B, 1, Int>>,
    pub task_labels: Option<Tensor<B, 2, Int>>,
    pub rewards:     Option<Tensor<B, 1>>,
}

impl<B: Backend> Batch<B> {
    pub fn len(&self) -> usize {
        self.inputs.batch_size()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── SampleBatcher ────────────────────────────────────────────────────────────
#[derive(Clone, Debug)]
pub struct SampleBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> SampleBatcher<B> {
    pub fn new(device: B::Device) -> Self { Self { device } }
}

impl<B: Backend> Batcher<Sample, Batch<B>> for SampleBatcher<B> {
    fn batch(&self, items: Vec<Sample>) -> Batch<B> {
        batch_samples(&items, &self.device)
    }
}

/// Stack samples into one batch. `items` must be non-empty.
pub fn batch_samples<B: Backend>(items: &[Sample], device: &B::Device) -> Batch<B> {
    let n = items.len();
    let width = items.first().map(Sample::width).unwrap_or(0);
    let tokens = items.first().map(Sample::is_tokens).unwrap_or(false);

    // ── Inputs ────────────────────────────────────────────────────────────────
    let inputs = if tokens {
        let mut ids  = Vec::with_capacity(n * width);
        let mut mask = Vec::with_capacity(n * width);
        for item in items {
            let (item_ids, item_mask) = match &item.input {
                SampleInput::Tokens { ids, mask } => (ids.clone(), mask.clone()),
                SampleInput::Features(values) => {
                    (values.iter().map(|&v| v as u32).collect(), vec![1; values.len()])
                }
            };
            ids.extend(fitted(item_ids, width).into_iter().map(|v| v as i64));
            mask.extend(fitted(item_mask, width).into_iter().map(|v| v as i64));
        }
        ModelInput::Tokens {
            ids:  int_matrix(ids, n, width, device),
            mask: Some(int_matrix(mask, n, width, device)),
        }
    } else {
        let mut values = Vec::with_capacity(n * width);
        for item in items {
            let row = match &item.input {
                SampleInput::Features(values) => values.clone(),
                SampleInput::Tokens { ids, .. } => ids.iter().map(|&v| v as f32).collect(),
            };
            values.extend(fitted(row, width));
        }
        ModelInput::Features(
            Tensor::<B, 2>::from_data(TensorData::new(values, [n, width]), device),
        )
    };

    // ── Targets ───────────────────────────────────────────────────────────────
    let labels = items
        .iter()
        .map(|s| s.label.map(|l| l as i64))
        .collect::<Option<Vec<_>>>()
        .filter(|_| n > 0)
        .map(|labels| Tensor::<B, 1, Int>::from_data(TensorData::new(labels, [n]), device));

    let task_count = items.first().map(|s| s.task_labels.len()).unwrap_or(0);
    let task_labels = (task_count > 0 && items.iter().all(|s| s.task_labels.len() == task_count))
        .then(|| {
            let flat: Vec<i64> = items
                .iter()
                .flat_map(|s| s.task_labels.iter().map(|&l| l as i64))
                .collect();
            int_matrix(flat, n, task_count, device)
        });

    let rewards = items
        .iter()
        .map(|s| s.reward)
        .collect::<Option<Vec<f32>>>()
        .filter(|_| n > 0)
        .map(|rewards| Tensor::<B, 1>::from_data(TensorData::new(rewards, [n]), device));

    Batch { inputs, labels, task_labels, rewards }
}

fn fitted<T: Default + Clone>(mut row: Vec<T>, width: usize) -> Vec<T> {
    row.resize(width, T::default());
    row
}

fn int_matrix<B: Backend>(
    values: Vec<i64>,
    rows:   usize,
    cols:   usize,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    Tensor::<B, 2, Int>::from_data(TensorData::new(values, [rows, cols]), device)
}
