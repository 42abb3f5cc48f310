// ============================================================
// Layer 4 — Data Adapters
// ============================================================
// A DataAdapter turns whatever the caller hands over into batches
// shaped for one learning mode. `adapt` accepts three input forms:
//
//   DataInput::Path    → load with the registered dataset kind
//   DataInput::Json    → an object is a pre-structured batch
//                        (validated, passed through as one batch);
//                        a string is a path; an array of numbers
//                        is a raw tensor
//   DataInput::Tensor  → a raw tensor, wrapped as a single batch
//
// Any other shape fails with DataError::UnsupportedInput naming
// the kind that was received.
//
// Adapters produce host-side AdaptedData. The caller turns it into
// a BatchSource on whichever backend it needs, so the same data
// can feed the autodiff training backend and the plain inference
// backend.
//
// Shuffling: training loaders shuffle with `system.seed`;
// validation and prediction loaders never shuffle.
//
// Reference: Burn Book §4 (DataLoader)

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};

use burn::{
    data::dataloader::{DataLoader, DataLoaderBuilder},
    prelude::*,
    tensor::DType,
};
use serde::de::DeserializeOwned;
use tokenizers::Tokenizer;

use crate::data::{
    batcher::{batch_samples, Batch, SampleBatcher},
    dataset::{build_samples, EncodingContext, LabelVocab, SampleDataset},
    records::{read_records, Record},
    registry::RegistryEntry,
    splitter::split_train_val,
};
use crate::domain::{
    config::ExperimentConfig,
    error::DataError,
    modes::InputForm,
    sample::Sample,
};
use crate::infra::tokenizer_store::{TokenizerStore, PAD_ID};

// ─── Inputs ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone)]
pub enum DataInput {
    Path(PathBuf),
    Json(serde_json::Value),
    Tensor(TensorData),
}

impl From<PathBuf> for DataInput {
    fn from(path: PathBuf) -> Self { DataInput::Path(path) }
}

impl From<&Path> for DataInput {
    fn from(path: &Path) -> Self { DataInput::Path(path.to_path_buf()) }
}

impl From<serde_json::Value> for DataInput {
    fn from(value: serde_json::Value) -> Self { DataInput::Json(value) }
}

impl From<TensorData> for DataInput {
    fn from(data: TensorData) -> Self { DataInput::Tensor(data) }
}

// ─── Loader options ───────────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderOptions {
    pub batch_size:   usize,
    /// `Some(seed)` shuffles every epoch
    pub shuffle_seed: Option<u64>,
    pub num_workers:  usize,
    /// Accepted for configuration parity; Burn manages transfers
    pub pin_memory:   bool,
}

// ─── AdaptedData ──────────────────────────────────────────────────────────────
/// Host-side samples plus how to batch them.
#[derive(Debug, Clone)]
pub struct AdaptedData {
    dataset:    SampleDataset,
    options:    LoaderOptions,
    /// Already one batch: skip the data loader entirely
    prebatched: bool,
}

impl AdaptedData {
    pub fn loader(dataset: SampleDataset, options: LoaderOptions) -> Self {
        Self { dataset, options, prebatched: false }
    }

    pub fn single_batch(samples: Vec<Sample>, options: LoaderOptions) -> Self {
        Self { dataset: SampleDataset::new(samples), options, prebatched: true }
    }

    pub fn len(&self) -> usize { self.dataset.samples().len() }

    pub fn is_empty(&self) -> bool { self.len() == 0 }

    pub fn samples(&self) -> &[Sample] { self.dataset.samples() }

    pub fn options(&self) -> &LoaderOptions { &self.options }

    pub fn with_options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self.prebatched = false;
        self
    }

    /// Seeded split into training and validation data.
    pub fn split(
        self,
        train_fraction: f64,
        seed:           u64,
        train_options:  LoaderOptions,
        val_options:    LoaderOptions,
    ) -> (AdaptedData, AdaptedData) {
        let (train, val) = split_train_val(self.dataset.into_samples(), train_fraction, seed);
        (
            AdaptedData::loader(SampleDataset::new(train), train_options),
            AdaptedData::loader(SampleDataset::new(val), val_options),
        )
    }

    /// Materialise batches on backend `B`.
    pub fn into_source<B: Backend>(self, device: &B::Device) -> BatchSource<B> {
        if self.is_empty() {
            return BatchSource::Batches(Vec::new());
        }
        if self.prebatched {
            return BatchSource::Batches(vec![batch_samples(self.dataset.samples(), device)]);
        }

        let mut builder = DataLoaderBuilder::new(SampleBatcher::<B>::new(device.clone()))
            .batch_size(self.options.batch_size.max(1));
        // Zero workers loads on the calling thread
        if self.options.num_workers > 0 {
            builder = builder.num_workers(self.options.num_workers);
        }
        if let Some(seed) = self.options.shuffle_seed {
            builder = builder.shuffle(seed);
        }
        BatchSource::Loader(builder.build(self.dataset))
    }
}

// ─── BatchSource ──────────────────────────────────────────────────────────────
/// Something that yields batches on backend `B`, possibly many times.
pub enum BatchSource<B: Backend> {
    Loader(Arc<dyn DataLoader<Batch<B>>>),
    Batches(Vec<Batch<B>>),
}

impl<B: Backend> BatchSource<B> {
    pub fn iter(&self) -> Box<dyn Iterator<Item = Batch<B>> + '_> {
        match self {
            BatchSource::Loader(loader)   => Box::new(loader.iter()),
            BatchSource::Batches(batches) => Box::new(batches.iter().cloned()),
        }
    }
}

// ─── DataAdapter ──────────────────────────────────────────────────────────────
pub trait DataAdapter {
    /// Shared loading machinery.
    fn core(&self) -> &AdapterCore;

    /// Keys this adapter accepts in a pre-structured batch.
    fn structured_fields(&self) -> &'static [&'static str];

    fn entry(&self) -> RegistryEntry {
        self.core().entry
    }

    fn adapt(&self, data: DataInput) -> Result<AdaptedData, DataError> {
        self.core().adapt(data, self.structured_fields())
    }

    /// Training data (shuffled) and validation data (not shuffled)
    /// from the configured paths.
    fn load_from_config(&self) -> Result<(AdaptedData, AdaptedData), DataError> {
        self.core().load_from_config()
    }

    /// Display name of a class index, when labels were strings.
    fn label_name(&self, class: usize) -> Option<String> {
        self.core().labels.get().and_then(|v| v.name_of(class)).map(str::to_string)
    }
}

// ─── AdapterCore ──────────────────────────────────────────────────────────────
pub struct AdapterCore {
    config:    ExperimentConfig,
    entry:     RegistryEntry,
    labels:    OnceLock<LabelVocab>,
    tokenizer: OnceLock<Tokenizer>,
}

impl AdapterCore {
    pub fn new(config: ExperimentConfig, entry: RegistryEntry) -> Self {
        Self { config, entry, labels: OnceLock::new(), tokenizer: OnceLock::new() }
    }

    pub fn config(&self) -> &ExperimentConfig { &self.config }

    pub fn train_options(&self) -> LoaderOptions {
        LoaderOptions {
            batch_size:   self.config.training.batch_size,
            shuffle_seed: Some(self.config.system.seed),
            num_workers:  self.config.system.num_workers,
            pin_memory:   self.config.system.pin_memory,
        }
    }

    pub fn eval_options(&self) -> LoaderOptions {
        LoaderOptions { shuffle_seed: None, ..self.train_options() }
    }

    fn input_form(&self) -> InputForm {
        self.entry.dataset.input_form()
    }

    pub fn load_from_config(&self) -> Result<(AdaptedData, AdaptedData), DataError> {
        let data = &self.config.data;
        let train = self.load_path(&data.train_path)?;

        let (train, val) = match &data.val_path {
            Some(val_path) => (
                AdaptedData::loader(train, self.train_options()),
                AdaptedData::loader(self.load_path(val_path)?, self.eval_options()),
            ),
            None => AdaptedData::loader(train, self.eval_options()).split(
                data.train_split,
                self.config.system.seed,
                self.train_options(),
                self.eval_options(),
            ),
        };

        tracing::info!(
            "Loaded {} training / {} validation samples ({:?})",
            train.len(),
            val.len(),
            self.entry.dataset
        );
        if self.config.system.pin_memory {
            tracing::debug!("pin_memory requested; device transfers are managed by the backend");
        }
        Ok((train, val))
    }

    pub fn adapt(&self, data: DataInput, fields: &[&str]) -> Result<AdaptedData, DataError> {
        match data {
            DataInput::Path(path) => {
                Ok(AdaptedData::loader(self.load_path(&path)?, self.eval_options()))
            }
            DataInput::Json(serde_json::Value::String(path)) => {
                Ok(AdaptedData::loader(self.load_path(Path::new(&path))?, self.eval_options()))
            }
            DataInput::Json(serde_json::Value::Object(map)) => self.adapt_structured(&map, fields),
            DataInput::Json(serde_json::Value::Array(rows)) => {
                self.adapt_tensor(json_to_tensor(&rows)?)
            }
            DataInput::Json(other) => Err(DataError::UnsupportedInput {
                kind: json_kind(&other).to_string(),
            }),
            DataInput::Tensor(data) => self.adapt_tensor(data),
        }
    }

    // ── Path input ────────────────────────────────────────────────────────────
    fn load_path(&self, path: &Path) -> Result<SampleDataset, DataError> {
        let records = read_records(path)?;
        if records.is_empty() {
            return Err(DataError::Empty("dataset has no records"));
        }

        let labels = self.label_vocab(&records)?;
        let classes = self.config.model.output_size;
        if self.entry.dataset.labels_are_classes() && labels.len() > classes {
            return Err(DataError::ShapeMismatch(format!(
                "label vocabulary has {} names but the model has {classes} output classes",
                labels.len()
            )));
        }
        let tokenizer = match self.input_form() {
            InputForm::Tokens   => Some(self.tokenizer(&records)?),
            InputForm::Features => None,
        };

        let model = &self.config.model;
        let ctx = EncodingContext {
            tokenizer,
            labels,
            input_size:      model.input_size,
            vocab_size:      model.vocab_size,
            max_length:      self.config.text.max_length,
            image_size:      self.config.data.image_size,
            buffer_capacity: self.config.reinforcement.buffer_capacity,
            base_dir:        path.parent().unwrap_or_else(|| Path::new(".")),
        };
        let samples = build_samples(&records, self.entry.dataset, &ctx)?;
        self.check_targets(&samples)?;
        Ok(SampleDataset::new(samples))
    }

    /// Class targets must index the output layer: labels and actions
    /// against `output_size`, task labels against their own head.
    fn check_targets(&self, samples: &[Sample]) -> Result<(), DataError> {
        let classes = self.config.model.output_size;
        let heads = &self.config.multi_task.task_classes;
        let labels_are_classes = self.entry.dataset.labels_are_classes();

        for sample in samples {
            if let Some(label) = sample.label.filter(|&l| labels_are_classes && l >= classes) {
                return Err(DataError::LabelOutOfRange { target: "label".into(), label, classes });
            }
            if sample.task_labels.is_empty() {
                continue;
            }
            if sample.task_labels.len() != heads.len() {
                return Err(DataError::ShapeMismatch(format!(
                    "{} task labels for {} task heads",
                    sample.task_labels.len(),
                    heads.len()
                )));
            }
            for (task, (&label, &classes)) in sample.task_labels.iter().zip(heads).enumerate() {
                if label >= classes {
                    return Err(DataError::LabelOutOfRange {
                        target: format!("task {task} label"),
                        label,
                        classes,
                    });
                }
            }
        }
        Ok(())
    }

    /// The label vocabulary is fixed by the first dataset loaded and
    /// persisted beside the checkpoints.
    fn label_vocab(&self, records: &[Record]) -> Result<&LabelVocab, DataError> {
        if let Some(vocab) = self.labels.get() {
            return Ok(vocab);
        }
        let path = self.config.checkpoint.dir.join("labels.json");
        let vocab = if path.exists() {
            LabelVocab::load(&path)?
        } else {
            let vocab = LabelVocab::from_records(records);
            if !vocab.is_empty() {
                fs::create_dir_all(&self.config.checkpoint.dir).map_err(|e| DataError::Corrupt {
                    path:    path.clone(),
                    message: e.to_string(),
                })?;
                vocab.save(&path)?;
            }
            vocab
        };
        Ok(self.labels.get_or_init(|| vocab))
    }

    fn tokenizer(&self, records: &[Record]) -> Result<&Tokenizer, DataError> {
        if let Some(tokenizer) = self.tokenizer.get() {
            return Ok(tokenizer);
        }
        let texts: Vec<String> = records.iter().filter_map(Record::text_content).collect();
        let tokenizer = TokenizerStore::new(&self.config.checkpoint.dir)
            .load_or_build(&texts, self.config.model.vocab_size)?;
        Ok(self.tokenizer.get_or_init(|| tokenizer))
    }

    // ── Structured input ──────────────────────────────────────────────────────
    fn adapt_structured(
        &self,
        map:    &serde_json::Map<String, serde_json::Value>,
        fields: &[&str],
    ) -> Result<AdaptedData, DataError> {
        if let Some(key) = map.keys().find(|k| !fields.contains(&k.as_str())) {
            return Err(DataError::UnsupportedInput { kind: format!("structured field '{key}'") });
        }

        let input_ids:   Option<Vec<Vec<u32>>>   = field(map, "input_ids")?;
        let mask:        Option<Vec<Vec<u32>>>   = field(map, "attention_mask")?;
        let features:    Option<Vec<Vec<f32>>>   = field(map, "features")?;
        let states:      Option<Vec<Vec<f32>>>   = field(map, "states")?;
        let labels:      Option<Vec<usize>>      = field(map, "labels")?;
        let actions:     Option<Vec<usize>>      = field(map, "actions")?;
        let task_labels: Option<Vec<Vec<usize>>> = field(map, "task_labels")?;
        let rewards:     Option<Vec<f32>>        = field(map, "rewards")?;

        let mut samples = match (self.input_form(), input_ids, features.or(states)) {
            (InputForm::Tokens, Some(ids), _) => self.token_samples(ids, mask)?,
            (InputForm::Features, _, Some(rows)) => self.feature_samples(rows)?,
            (InputForm::Tokens, None, _) => return Err(DataError::MissingField("input_ids")),
            (InputForm::Features, _, None) => return Err(DataError::MissingField("features")),
        };

        let n = samples.len();
        if let Some(labels) = labels.or(actions) {
            check_rows("labels", labels.len(), n)?;
            for (s, l) in samples.iter_mut().zip(labels) { s.label = Some(l); }
        }
        if let Some(task_labels) = task_labels {
            check_rows("task_labels", task_labels.len(), n)?;
            for (s, t) in samples.iter_mut().zip(task_labels) { s.task_labels = t; }
        }
        if let Some(rewards) = rewards {
            check_rows("rewards", rewards.len(), n)?;
            for (s, r) in samples.iter_mut().zip(rewards) { s.reward = Some(r); }
        }
        self.check_targets(&samples)?;

        Ok(AdaptedData::single_batch(samples, self.eval_options()))
    }

    fn token_samples(
        &self,
        ids:  Vec<Vec<u32>>,
        mask: Option<Vec<Vec<u32>>>,
    ) -> Result<Vec<Sample>, DataError> {
        let vocab_size = self.config.model.vocab_size;
        let width = ids.first().map(Vec::len).unwrap_or(0);
        if width == 0 {
            return Err(DataError::Empty("input_ids has no tokens"));
        }
        if let Some(mask) = &mask {
            check_rows("attention_mask", mask.len(), ids.len())?;
        }

        ids.into_iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() != width {
                    return Err(DataError::ShapeMismatch(format!(
                        "input_ids row {i} has {} tokens, expected {width}",
                        row.len()
                    )));
                }
                if let Some(&id) = row.iter().find(|&&id| id as usize >= vocab_size) {
                    return Err(DataError::TokenOutOfRange { id, vocab_size });
                }
                let row_mask = match &mask {
                    Some(mask) if mask[i].len() == width => mask[i].clone(),
                    Some(_) => {
                        return Err(DataError::ShapeMismatch(format!(
                            "attention_mask row {i} does not match input_ids"
                        )))
                    }
                    None => row.iter().map(|&id| u32::from(id != PAD_ID)).collect(),
                };
                Ok(Sample::tokens(row, row_mask))
            })
            .collect()
    }

    fn feature_samples(&self, rows: Vec<Vec<f32>>) -> Result<Vec<Sample>, DataError> {
        let width = self.config.model.input_size;
        if rows.is_empty() {
            return Err(DataError::Empty("no feature rows"));
        }
        rows.into_iter()
            .enumerate()
            .map(|(i, row)| {
                if row.len() != width {
                    return Err(DataError::ShapeMismatch(format!(
                        "feature row {i} has width {}, model expects {width}",
                        row.len()
                    )));
                }
                Ok(Sample::features(row))
            })
            .collect()
    }

    // ── Raw tensor input ──────────────────────────────────────────────────────
    fn adapt_tensor(&self, data: TensorData) -> Result<AdaptedData, DataError> {
        let (rows, cols) = match data.shape.as_slice() {
            [cols]       => (1, *cols),
            [rows, cols] => (*rows, *cols),
            other => {
                return Err(DataError::UnsupportedInput {
                    kind: format!("rank-{} tensor", other.len()),
                })
            }
        };
        if rows == 0 || cols == 0 {
            return Err(DataError::Empty("tensor has no elements"));
        }

        let is_float = matches!(data.dtype, DType::F64 | DType::F32 | DType::F16 | DType::BF16);
        if matches!(data.dtype, DType::Bool) {
            return Err(DataError::UnsupportedInput { kind: "bool tensor".to_string() });
        }

        let samples = match self.input_form() {
            InputForm::Tokens if is_float => {
                return Err(DataError::ShapeMismatch(
                    "token model expects an integer tensor of ids".to_string(),
                ))
            }
            InputForm::Tokens => {
                let flat: Vec<i64> = data.iter::<i64>().collect();
                if flat.iter().any(|&v| v < 0) {
                    return Err(DataError::ShapeMismatch("negative token id".to_string()));
                }
                let ids = flat.chunks(cols).map(|c| c.iter().map(|&v| v as u32).collect()).collect();
                self.token_samples(ids, None)?
            }
            InputForm::Features => {
                let flat: Vec<f32> = data.iter::<f32>().collect();
                self.feature_samples(flat.chunks(cols).map(<[f32]>::to_vec).collect())?
            }
        };
        Ok(AdaptedData::single_batch(samples, self.eval_options()))
    }
}

fn field<T: DeserializeOwned>(
    map: &serde_json::Map<String, serde_json::Value>,
    key: &'static str,
) -> Result<Option<T>, DataError> {
    map.get(key)
        .map(|v| {
            serde_json::from_value(v.clone())
                .map_err(|e| DataError::ShapeMismatch(format!("field '{key}': {e}")))
        })
        .transpose()
}

fn check_rows(name: &str, got: usize, expected: usize) -> Result<(), DataError> {
    if got == expected {
        Ok(())
    } else {
        Err(DataError::ShapeMismatch(format!("{name} has {got} rows, inputs have {expected}")))
    }
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null      => "null",
        serde_json::Value::Bool(_)   => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_)  => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// A JSON array of numbers (rank 1) or of equal-length number
/// arrays (rank 2). All-integer content becomes an integer tensor.
fn json_to_tensor(rows: &[serde_json::Value]) -> Result<TensorData, DataError> {
    let unsupported = |kind: &str| DataError::UnsupportedInput { kind: kind.to_string() };

    let (shape, numbers): (Vec<usize>, Vec<&serde_json::Value>) = match rows.first() {
        Some(serde_json::Value::Array(first)) => {
            let width = first.len();
            let mut numbers = Vec::with_capacity(rows.len() * width);
            for row in rows {
                let serde_json::Value::Array(row) = row else { return Err(unsupported("ragged array")) };
                if row.len() != width {
                    return Err(DataError::ShapeMismatch("rows of a raw tensor differ in width".into()));
                }
                numbers.extend(row.iter());
            }
            (vec![rows.len(), width], numbers)
        }
        Some(_) => (vec![rows.len()], rows.iter().collect()),
        None    => return Err(DataError::Empty("empty array")),
    };

    if let Some(bad) = numbers.iter().find(|v| !v.is_number()) {
        return Err(unsupported(&format!("array of {}", json_kind(bad))));
    }

    if numbers.iter().all(|v| v.is_i64()) {
        let values: Vec<i64> = numbers.iter().filter_map(|v| v.as_i64()).collect();
        Ok(TensorData::new(values, shape))
    } else {
        let values: Vec<f32> = numbers.iter().filter_map(|v| v.as_f64()).map(|v| v as f32).collect();
        Ok(TensorData::new(values, shape))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::registry::adapter_for;
    use crate::domain::{config::ExperimentConfig, modes::{DataKind, ModeKind}};
    use burn::backend::NdArray;
    use serde_json::json;

    fn config(mode: ModeKind, kind: DataKind, dir: &Path) -> ExperimentConfig {
        let yaml = format!(
            r#"
learning_mode: {{ type: {mode} }}
model: {{ input_size: 3, hidden_size: 4, output_size: 2, reasoning_steps: 2, vocab_size: 50, num_heads: 2 }}
training: {{ batch_size: 2, learning_rate: 0.01, epochs: 1 }}
data: {{ train_path: {train}, data_type: {kind} }}
checkpoint: {{ dir: {ckpt} }}
text: {{ max_length: 6 }}
system: {{ num_workers: 0 }}
"#,
            train = dir.join("train.json").display(),
            ckpt = dir.join("ckpt").display(),
        );
        ExperimentConfig::from_yaml_str(&yaml).unwrap()
    }

    #[test]
    fn test_structured_batch_passes_through() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = adapter_for(&config(ModeKind::Supervised, DataKind::Tabular, dir.path())).unwrap();
        let data = adapter
            .adapt(DataInput::Json(json!({
                "features": [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
                "labels": [0, 1]
            })))
            .unwrap();
        assert_eq!(data.len(), 2);

        let source = data.into_source::<NdArray>(&Default::default());
        let batches: Vec<_> = source.iter().collect();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].labels.as_ref().unwrap().dims(), [2]);
    }

    #[test]
    fn test_structured_row_mismatch_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = adapter_for(&config(ModeKind::Supervised, DataKind::Tabular, dir.path())).unwrap();
        let err = adapter
            .adapt(DataInput::Json(json!({ "features": [[1.0, 2.0, 3.0]], "labels": [0, 1] })))
            .unwrap_err();
        assert!(matches!(err, DataError::ShapeMismatch(_)));
    }

    #[test]
    fn test_unknown_structured_field_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = adapter_for(&config(ModeKind::Gan, DataKind::Image, dir.path()));
        // image kinds need input_size == image_size², but adapter lookup does not validate
        let adapter = adapter.unwrap();
        let err = adapter
            .adapt(DataInput::Json(json!({ "features": [[0.0, 0.0, 0.0]], "rewards": [1.0] })))
            .unwrap_err();
        match err {
            DataError::UnsupportedInput { kind } => assert!(kind.contains("rewards")),
            other => panic!("expected UnsupportedInput, got {other:?}"),
        }
    }

    #[test]
    fn test_unsupported_json_kind_is_named() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = adapter_for(&config(ModeKind::Supervised, DataKind::Tabular, dir.path())).unwrap();
        for (value, kind) in [(json!(null), "null"), (json!(true), "bool"), (json!(3), "number")] {
            match adapter.adapt(DataInput::Json(value)) {
                Err(DataError::UnsupportedInput { kind: got }) => assert_eq!(got, kind),
                other => panic!("expected UnsupportedInput, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_raw_tensor_wrapped_as_single_batch() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = adapter_for(&config(ModeKind::Supervised, DataKind::Tabular, dir.path())).unwrap();
        let data = adapter
            .adapt(DataInput::Tensor(TensorData::new(vec![0.5f32; 6], [2, 3])))
            .unwrap();
        assert_eq!(data.len(), 2);

        let rank3 = TensorData::new(vec![0.5f32; 6], [1, 2, 3]);
        assert!(matches!(
            adapter.adapt(DataInput::Tensor(rank3)),
            Err(DataError::UnsupportedInput { .. })
        ));
    }

    #[test]
    fn test_json_array_of_ids_for_text_model() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = adapter_for(&config(ModeKind::Supervised, DataKind::Text, dir.path())).unwrap();
        let data = adapter.adapt(DataInput::Json(json!([[5, 6, 0], [7, 0, 0]]))).unwrap();
        let crate::domain::sample::SampleInput::Tokens { mask, .. } = &data.samples()[1].input else {
            panic!("expected tokens")
        };
        assert_eq!(mask, &vec![1, 0, 0]);

        let err = adapter.adapt(DataInput::Json(json!([[99]]))).unwrap_err();
        assert!(matches!(err, DataError::TokenOutOfRange { id: 99, vocab_size: 50 }));
    }

    #[test]
    fn test_load_from_config_splits_without_val_path() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<_> = (0..10)
            .map(|i| json!({ "features": [i as f32, 1.0, 0.0], "label": i % 2 }))
            .collect();
        fs::write(dir.path().join("train.json"), serde_json::to_string(&records).unwrap()).unwrap();

        let adapter = adapter_for(&config(ModeKind::Supervised, DataKind::Tabular, dir.path())).unwrap();
        let (train, val) = adapter.load_from_config().unwrap();
        assert_eq!(train.len(), 8);
        assert_eq!(val.len(), 2);
        assert!(train.options().shuffle_seed.is_some());
        assert!(val.options().shuffle_seed.is_none());
    }

    #[test]
    fn test_label_beyond_output_classes_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let records: Vec<_> = (0..8)
            .map(|i| json!({ "features": [i as f32, 1.0, 0.0], "label": 5 }))
            .collect();
        fs::write(dir.path().join("train.json"), serde_json::to_string(&records).unwrap()).unwrap();

        let adapter = adapter_for(&config(ModeKind::Supervised, DataKind::Tabular, dir.path())).unwrap();
        match adapter.load_from_config() {
            Err(DataError::LabelOutOfRange { label, classes, .. }) => {
                assert_eq!(label, 5);
                assert_eq!(classes, 2);
            }
            other => panic!("expected LabelOutOfRange, got {other:?}"),
        }

        let err = adapter
            .adapt(DataInput::Json(json!({ "features": [[1.0, 2.0, 3.0]], "labels": [2] })))
            .unwrap_err();
        assert!(matches!(err, DataError::LabelOutOfRange { label: 2, classes: 2, .. }));
    }

    #[test]
    fn test_clustering_labels_are_not_class_indices() {
        let dir = tempfile::tempdir().unwrap();
        let adapter = adapter_for(&config(ModeKind::Unsupervised, DataKind::Text, dir.path())).unwrap();
        let data = adapter
            .adapt(DataInput::Json(json!({ "input_ids": [[4, 5], [6, 0]], "labels": [7, 9] })))
            .unwrap();
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_label_vocab_larger_than_output_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let records = json!([
            { "text": "good movie", "label": "pos" },
            { "text": "bad movie", "label": "neg" },
            { "text": "odd movie", "label": "mixed" }
        ]);
        fs::write(dir.path().join("train.json"), records.to_string()).unwrap();

        let adapter = adapter_for(&config(ModeKind::Supervised, DataKind::Text, dir.path())).unwrap();
        let err = adapter.adapt(DataInput::Path(dir.path().join("train.json"))).unwrap_err();
        match err {
            DataError::ShapeMismatch(message) => assert!(message.contains("3 names")),
            other => panic!("expected ShapeMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_task_labels_checked_per_head() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(ModeKind::MultiTask, DataKind::MultiModal, dir.path());
        cfg.model.output_size = 5;
        cfg.multi_task.task_classes = vec![2, 3];
        let adapter = adapter_for(&cfg).unwrap();

        let ok = adapter.adapt(DataInput::Json(json!({
            "features": [[1.0, 0.0, 0.0]], "task_labels": [[1, 2]]
        })));
        assert!(ok.is_ok());

        let err = adapter
            .adapt(DataInput::Json(json!({ "features": [[1.0, 0.0, 0.0]], "task_labels": [[0, 3]] })))
            .unwrap_err();
        assert!(matches!(err, DataError::LabelOutOfRange { label: 3, classes: 3, .. }));

        let err = adapter
            .adapt(DataInput::Json(json!({ "features": [[1.0, 0.0, 0.0]], "task_labels": [[0]] })))
            .unwrap_err();
        assert!(matches!(err, DataError::ShapeMismatch(_)));
    }

    #[test]
    fn test_string_labels_resolved_through_vocab() {
        let dir = tempfile::tempdir().unwrap();
        let records = json!([
            { "text": "good movie", "label": "pos" },
            { "text": "bad movie", "label": "neg" },
            { "text": "great film", "label": "pos" }
        ]);
        fs::write(dir.path().join("train.json"), records.to_string()).unwrap();

        let adapter = adapter_for(&config(ModeKind::Supervised, DataKind::Text, dir.path())).unwrap();
        let data = adapter.adapt(DataInput::Path(dir.path().join("train.json"))).unwrap();
        let labels: Vec<_> = data.samples().iter().map(|s| s.label).collect();
        assert_eq!(labels, vec![Some(1), Some(0), Some(1)]);
        assert_eq!(adapter.label_name(1).as_deref(), Some("pos"));
        assert!(dir.path().join("ckpt").join("labels.json").exists());
    }
}
