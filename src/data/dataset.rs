// ============================================================
// Layer 4 — Sample Dataset
// ============================================================
// Converts parsed Records into Samples for one DatasetKind and
// wraps them in a Burn Dataset.
//
// Burn's Dataset trait requires two methods:
//   - get(index) → Option<Sample>
//   - len()      → usize
//
// Per dataset kind:
//   TextClassification / TextClustering → token ids + mask
//   ImageClassification / ImageClustering / ImageGeneration
//                                       → pixels (or inline features)
//   Tabular                             → features
//   RlEnvironment / ReplayBuffer        → state, action, reward
//   TextGeneration                      → hashed bag-of-words
//   MultiTask                           → features fused with
//                                         hashed text, task labels
//
// Targets are optional on every kind; the learning mode decides
// whether it needs them.
//
// Reference: Burn Book §4 (Datasets)

use std::{collections::BTreeMap, path::Path};

use burn::data::dataset::Dataset;
use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::data::{
    features::{fit_width, hashed_bag_of_words, image_pixels},
    records::{LabelValue, Record},
};
use crate::domain::{
    error::DataError,
    modes::DatasetKind,
    sample::Sample,
};

// ─── SampleDataset ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Default)]
pub struct SampleDataset {
    samples: Vec<Sample>,
}

impl SampleDataset {
    pub fn new(samples: Vec<Sample>) -> Self { Self { samples } }

    pub fn samples(&self) -> &[Sample] { &self.samples }

    pub fn into_samples(self) -> Vec<Sample> { self.samples }
}

impl Dataset<Sample> for SampleDataset {
    fn get(&self, index: usize) -> Option<Sample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

// ─── LabelVocab ───────────────────────────────────────────────────────────────
/// Maps string labels to class indices. Names are sorted so the
/// mapping does not depend on record order. Integer labels pass
/// through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelVocab {
    names: BTreeMap<String, usize>,
}

impl LabelVocab {
    pub fn from_records(records: &[Record]) -> Self {
        let mut names: Vec<String> = records
            .iter()
            .filter_map(|r| match r.class_label() {
                Some(LabelValue::Name(name)) => Some(name.clone()),
                _ => None,
            })
            .collect();
        names.sort();
        names.dedup();

        Self { names: names.into_iter().enumerate().map(|(i, n)| (n, i)).collect() }
    }

    pub fn len(&self) -> usize { self.names.len() }

    pub fn is_empty(&self) -> bool { self.names.is_empty() }

    pub fn resolve(&self, label: &LabelValue) -> Result<usize, DataError> {
        match label {
            LabelValue::Index(i)  => Ok(*i),
            LabelValue::Name(name) => self.names.get(name).copied().ok_or_else(|| {
                DataError::ShapeMismatch(format!("label '{name}' was not seen in the training data"))
            }),
        }
    }

    pub fn load(path: &Path) -> Result<Self, DataError> {
        let corrupt = |e: &dyn std::fmt::Display| DataError::Corrupt {
            path:    path.to_path_buf(),
            message: e.to_string(),
        };
        let json = std::fs::read_to_string(path).map_err(|e| corrupt(&e))?;
        serde_json::from_str(&json).map_err(|e| corrupt(&e))
    }

    pub fn save(&self, path: &Path) -> Result<(), DataError> {
        let corrupt = |e: &dyn std::fmt::Display| DataError::Corrupt {
            path:    path.to_path_buf(),
            message: e.to_string(),
        };
        let json = serde_json::to_string_pretty(self).map_err(|e| corrupt(&e))?;
        std::fs::write(path, json).map_err(|e| corrupt(&e))
    }

    /// Reverse lookup for display.
    pub fn name_of(&self, index: usize) -> Option<&str> {
        self.names
            .iter()
            .find(|(_, &i)| i == index)
            .map(|(name, _)| name.as_str())
    }
}

// ─── Encoding ─────────────────────────────────────────────────────────────────
/// Everything needed to turn records into samples.
pub struct EncodingContext<'a> {
    pub tokenizer:       Option<&'a Tokenizer>,
    pub labels:          &'a LabelVocab,
    pub input_size:      usize,
    pub vocab_size:      usize,
    pub max_length:      usize,
    pub image_size:      usize,
    pub buffer_capacity: usize,
    /// Directory relative image paths are resolved against
    pub base_dir:        &'a Path,
}

pub fn build_samples(
    records: &[Record],
    kind:    DatasetKind,
    ctx:     &EncodingContext<'_>,
) -> Result<Vec<Sample>, DataError> {
    let mut samples = records
        .iter()
        .map(|record| build_sample(record, kind, ctx))
        .collect::<Result<Vec<_>, _>>()?;

    // The replay buffer keeps only the newest transitions
    if kind == DatasetKind::ReplayBuffer && samples.len() > ctx.buffer_capacity {
        let excess = samples.len() - ctx.buffer_capacity;
        samples.drain(..excess);
    }
    Ok(samples)
}

fn build_sample(
    record: &Record,
    kind:   DatasetKind,
    ctx:    &EncodingContext<'_>,
) -> Result<Sample, DataError> {
    let mut sample = match kind {
        DatasetKind::TextClassification | DatasetKind::TextClustering => {
            let text = record.text_content().ok_or(DataError::MissingField("text"))?;
            let tokenizer = ctx.tokenizer.ok_or(DataError::MissingField("tokenizer"))?;
            let (ids, mask) = encode_text(tokenizer, &text, ctx.max_length, ctx.vocab_size)?;
            Sample::tokens(ids, mask)
        }

        DatasetKind::ImageClassification
        | DatasetKind::ImageClustering
        | DatasetKind::ImageGeneration => Sample::features(image_features(record, ctx)?),

        DatasetKind::Tabular => {
            let values = record.features.clone().ok_or(DataError::MissingField("features"))?;
            Sample::features(fit_width(values, ctx.input_size))
        }

        DatasetKind::RlEnvironment | DatasetKind::ReplayBuffer => {
            let state = record.numeric_input().ok_or(DataError::MissingField("state"))?;
            let mut sample = Sample::features(fit_width(state.to_vec(), ctx.input_size));
            if let Some(action) = record.action {
                sample = sample.with_label(action);
            }
            if let Some(reward) = record.reward {
                sample = sample.with_reward(reward);
            }
            return Ok(sample);
        }

        DatasetKind::TextGeneration => {
            let text = record.text_content().ok_or(DataError::MissingField("text"))?;
            Sample::features(hashed_bag_of_words(&text, ctx.input_size))
        }

        DatasetKind::MultiTask => {
            let mut values = record
                .numeric_input()
                .map(|v| fit_width(v.to_vec(), ctx.input_size))
                .unwrap_or_else(|| vec![0.0; ctx.input_size]);
            match record.text_content() {
                Some(text) => {
                    for (v, h) in values.iter_mut().zip(hashed_bag_of_words(&text, ctx.input_size)) {
                        *v += h;
                    }
                }
                None if record.numeric_input().is_none() => {
                    return Err(DataError::MissingField("features"));
                }
                None => {}
            }
            let sample = Sample::features(values);
            return Ok(match &record.labels {
                Some(labels) => sample.with_task_labels(labels.clone()),
                None => sample,
            });
        }
    };

    if let Some(label) = record.class_label() {
        sample = sample.with_label(ctx.labels.resolve(label)?);
    }
    Ok(sample)
}

fn image_features(record: &Record, ctx: &EncodingContext<'_>) -> Result<Vec<f32>, DataError> {
    if let Some(values) = &record.features {
        return Ok(fit_width(values.clone(), ctx.input_size));
    }
    let image = record.image.as_ref().ok_or(DataError::MissingField("image"))?;
    let path = if image.is_absolute() { image.clone() } else { ctx.base_dir.join(image) };
    image_pixels(&path, ctx.image_size).map(|pixels| fit_width(pixels, ctx.input_size))
}

/// Tokenise, truncate and pad to `max_length`. An empty encoding
/// becomes a single [UNK] so every sequence has a valid position.
pub fn encode_text(
    tokenizer:  &Tokenizer,
    text:       &str,
    max_length: usize,
    vocab_size: usize,
) -> Result<(Vec<u32>, Vec<u32>), DataError> {
    let encoding = tokenizer
        .encode(text, false)
        .map_err(|e| DataError::ShapeMismatch(format!("tokenisation failed: {e}")))?;

    let mut ids: Vec<u32> = encoding.get_ids().iter().copied().take(max_length).collect();
    if ids.is_empty() {
        ids.push(crate::infra::tokenizer_store::UNK_ID);
    }
    if let Some(&id) = ids.iter().find(|&&id| id as usize >= vocab_size) {
        return Err(DataError::TokenOutOfRange { id, vocab_size });
    }

    let mut mask = vec![1u32; ids.len()];
    ids.resize(max_length, crate::infra::tokenizer_store::PAD_ID);
    mask.resize(max_length, 0);
    Ok((ids, mask))
}
