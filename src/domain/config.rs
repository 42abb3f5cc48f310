// ============================================================
// Layer 3 — Experiment Configuration
// ============================================================
// The whole run is described by one YAML document, loaded once
// and treated as read-only afterwards. Command-line overrides are
// applied after the file is parsed and before validation, so an
// override can never smuggle an invalid value past `validate()`.
//
// Sections:
//   learning_mode   → which paradigm to run
//   model           → architecture parameters
//   training        → optimiser, scheduler, epochs, patience
//   system          → compute target, workers, seed
//   inference       → adaptive reasoning-step policy
//   data            → dataset paths and kind
//   text / checkpoint / memory / mixed_precision / multi_task /
//   gan / reinforcement / tracking → optional, serde defaults
//
// Example (config/supervised/basic.yaml):
//   learning_mode: { type: supervised }
//   model: { input_size: 32, hidden_size: 16, output_size: 3,
//            dropout_rate: 0.1, reasoning_steps: 3, vocab_size: 256 }
//   training: { batch_size: 4, learning_rate: 0.001, epochs: 5 }
//   data: { train_path: data/sample/text_train.json }
//
// Reference: serde_yaml documentation, Rust Book §9

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use serde::{Deserialize, Serialize};

use crate::domain::{
    error::ConfigError,
    modes::{DataKind, ModeKind},
};

// ─── Top-level document ───────────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    pub learning_mode:   LearningModeSection,
    pub model:           ModelSection,
    pub training:        TrainingSection,
    #[serde(default)]
    pub system:          SystemSection,
    #[serde(default)]
    pub inference:       InferenceSection,
    pub data:            DataSection,
    #[serde(default)]
    pub text:            TextSection,
    #[serde(default)]
    pub checkpoint:      CheckpointSection,
    #[serde(default)]
    pub memory:          MemorySection,
    #[serde(default)]
    pub mixed_precision: MixedPrecisionSection,
    #[serde(default)]
    pub multi_task:      MultiTaskSection,
    #[serde(default)]
    pub gan:             GanSection,
    #[serde(default)]
    pub reinforcement:   ReinforcementSection,
    #[serde(default)]
    pub tracking:        TrackingSection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningModeSection {
    #[serde(rename = "type")]
    pub kind: ModeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSection {
    pub input_size:        usize,
    pub hidden_size:       usize,
    pub output_size:       usize,
    #[serde(default = "default_dropout")]
    pub dropout_rate:      f64,
    pub reasoning_steps:   usize,
    #[serde(default = "default_vocab_size")]
    pub vocab_size:        usize,
    #[serde(default = "default_architecture")]
    pub architecture_type: String,
    #[serde(default = "default_num_heads")]
    pub num_heads:         usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[default]
    Adam,
    AdamW,
    Sgd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSection {
    pub batch_size:     usize,
    pub learning_rate:  f64,
    pub epochs:         usize,
    #[serde(default)]
    pub optimizer:      OptimizerKind,
    #[serde(default = "default_true")]
    pub use_scheduler:  bool,
    #[serde(default = "default_patience")]
    pub patience:       usize,
    #[serde(default)]
    pub grad_clip_norm: Option<f64>,
    #[serde(default)]
    pub weight_decay:   f64,
    #[serde(default)]
    pub scheduler:      SchedulerSection,
}

/// Reduce-on-plateau parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerSection {
    pub factor:   f64,
    pub patience: usize,
    pub min_lr:   f64,
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self { factor: 0.1, patience: 5, min_lr: 1e-6 }
    }
}

// ─── Compute target ───────────────────────────────────────────────────────────
/// Explicit compute target. `cuda` and `gpu` are accepted as
/// aliases for the WGPU backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeTarget {
    #[default]
    Cpu,
    #[serde(alias = "cuda", alias = "gpu")]
    Wgpu,
    Auto,
}

impl fmt::Display for ComputeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComputeTarget::Cpu  => "cpu",
            ComputeTarget::Wgpu => "wgpu",
            ComputeTarget::Auto => "auto",
        };
        f.write_str(name)
    }
}

impl FromStr for ComputeTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cpu"                   => Ok(ComputeTarget::Cpu),
            "wgpu" | "cuda" | "gpu" => Ok(ComputeTarget::Wgpu),
            "auto"                  => Ok(ComputeTarget::Auto),
            other => Err(format!("unknown device '{other}' (expected cpu, wgpu, cuda or auto)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSection {
    pub device:      ComputeTarget,
    pub num_workers: usize,
    pub pin_memory:  bool,
    pub seed:        u64,
}

impl Default for SystemSection {
    fn default() -> Self {
        Self { device: ComputeTarget::Cpu, num_workers: 1, pin_memory: false, seed: 42 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceSection {
    pub min_reasoning_steps: usize,
    pub max_reasoning_steps: usize,
    pub reasoning_threshold: f64,
    pub temperature:         f64,
}

impl Default for InferenceSection {
    fn default() -> Self {
        Self {
            min_reasoning_steps: 2,
            max_reasoning_steps: 5,
            reasoning_threshold: 0.85,
            temperature:         1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSection {
    pub train_path:  PathBuf,
    #[serde(default)]
    pub val_path:    Option<PathBuf>,
    #[serde(default)]
    pub data_type:   Option<DataKind>,
    #[serde(default = "default_image_size")]
    pub image_size:  usize,
    #[serde(default = "default_train_split")]
    pub train_split: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextSection {
    pub max_length: usize,
}

impl Default for TextSection {
    fn default() -> Self {
        Self { max_length: 128 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointSection {
    pub dir:         PathBuf,
    pub keep_last_n: usize,
}

impl Default for CheckpointSection {
    fn default() -> Self {
        Self { dir: PathBuf::from("checkpoints"), keep_last_n: 5 }
    }
}

/// `empty_cache_freq == 0` disables the cache-release hook.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemorySection {
    pub empty_cache_freq: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixedPrecisionSection {
    pub enabled: bool,
}

/// Class count of each task head; the heads are laid out
/// consecutively over the model's output logits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MultiTaskSection {
    pub task_classes: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GanSection {
    pub latent_size: usize,
}

impl Default for GanSection {
    fn default() -> Self {
        Self { latent_size: 64 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReinforcementSection {
    pub buffer_capacity: usize,
}

impl Default for ReinforcementSection {
    fn default() -> Self {
        Self { buffer_capacity: 10_000 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingSection {
    pub dir: PathBuf,
}

impl Default for TrackingSection {
    fn default() -> Self {
        Self { dir: PathBuf::from("experiments") }
    }
}

fn default_dropout() -> f64 { 0.1 }
fn default_vocab_size() -> usize { 30_000 }
fn default_architecture() -> String { "reasoning_network".to_string() }
fn default_num_heads() -> usize { 4 }
fn default_true() -> bool { true }
fn default_patience() -> usize { 5 }
fn default_image_size() -> usize { 28 }
fn default_train_split() -> f64 { 0.8 }

// ─── Overrides ────────────────────────────────────────────────────────────────
/// Command-line overrides, applied after the file is loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub batch_size:    Option<usize>,
    pub learning_rate: Option<f64>,
    pub epochs:        Option<usize>,
    pub hidden_size:   Option<usize>,
    pub dropout:       Option<f64>,
    pub device:        Option<ComputeTarget>,
    pub num_workers:   Option<usize>,
}

// ─── Loading and validation ───────────────────────────────────────────────────
impl ExperimentConfig {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        let config = serde_yaml::from_str(text).map_err(|e| {
            // serde reports absent keys as "missing field `name`"
            let message = e.to_string();
            match message.split('`').nth(1) {
                Some(key) if message.contains("missing field") => {
                    ConfigError::MissingKey(key.to_string())
                }
                _ => ConfigError::Parse(e),
            }
        })?;
        Ok(config)
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(v) = overrides.batch_size    { self.training.batch_size    = v; }
        if let Some(v) = overrides.learning_rate { self.training.learning_rate = v; }
        if let Some(v) = overrides.epochs        { self.training.epochs        = v; }
        if let Some(v) = overrides.hidden_size   { self.model.hidden_size      = v; }
        if let Some(v) = overrides.dropout       { self.model.dropout_rate     = v; }
        if let Some(v) = overrides.device        { self.system.device          = v; }
        if let Some(v) = overrides.num_workers   { self.system.num_workers     = v; }
    }

    /// The configured data kind, or the one inferred from the
    /// training path's extension.
    pub fn data_kind(&self) -> DataKind {
        self.data
            .data_type
            .unwrap_or_else(|| DataKind::infer(&self.data.train_path))
    }

    pub fn mode(&self) -> ModeKind {
        self.learning_mode.kind
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let model = &self.model;
        let inference = &self.inference;

        if model.reasoning_steps == 0 {
            return Err(ConfigError::ZeroReasoningSteps);
        }
        if inference.min_reasoning_steps == 0
            || inference.min_reasoning_steps > inference.max_reasoning_steps
        {
            return Err(ConfigError::InvalidStepBounds {
                min: inference.min_reasoning_steps,
                max: inference.max_reasoning_steps,
            });
        }
        if !(inference.temperature > 0.0) {
            return Err(invalid("inference.temperature must be positive"));
        }
        if model.input_size == 0 || model.hidden_size == 0 || model.output_size == 0 {
            return Err(invalid("model sizes must be non-zero"));
        }
        if model.num_heads == 0 || (2 * model.hidden_size) % model.num_heads != 0 {
            return Err(invalid(format!(
                "2 * hidden_size ({}) must be divisible by num_heads ({})",
                2 * model.hidden_size,
                model.num_heads
            )));
        }
        if !(0.0..1.0).contains(&model.dropout_rate) {
            return Err(invalid("model.dropout_rate must be in [0, 1)"));
        }
        if self.training.batch_size == 0 {
            return Err(invalid("training.batch_size must be non-zero"));
        }
        if !(self.training.learning_rate > 0.0) {
            return Err(invalid("training.learning_rate must be positive"));
        }
        if !(self.data.train_split > 0.0 && self.data.train_split < 1.0) {
            return Err(invalid("data.train_split must be in (0, 1)"));
        }

        match self.mode() {
            ModeKind::MultiTask => {
                let heads = &self.multi_task.task_classes;
                if heads.is_empty() {
                    return Err(ConfigError::MissingKey("multi_task.task_classes".into()));
                }
                if heads.iter().any(|&c| c == 0) || heads.iter().sum::<usize>() != model.output_size {
                    return Err(invalid(format!(
                        "multi_task.task_classes {heads:?} must be non-zero and sum to output_size ({})",
                        model.output_size
                    )));
                }
            }
            ModeKind::Gan => {
                if model.output_size != 2 {
                    return Err(invalid("gan discriminator needs model.output_size == 2"));
                }
                if self.gan.latent_size == 0 {
                    return Err(invalid("gan.latent_size must be non-zero"));
                }
            }
            _ => {}
        }

        if self.data_kind() == DataKind::Image {
            let side = self.data.image_size;
            if side * side != model.input_size {
                return Err(invalid(format!(
                    "image data needs model.input_size == image_size² ({})",
                    side * side
                )));
            }
        }
        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const MINIMAL: &str = r#"
learning_mode:
  type: supervised
model:
  input_size: 16
  hidden_size: 8
  output_size: 3
  reasoning_steps: 2
  vocab_size: 64
training:
  batch_size: 4
  learning_rate: 0.001
  epochs: 3
data:
  train_path: data/train.json
"#;

    #[test]
    fn test_minimal_config_fills_defaults() {
        let cfg = ExperimentConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(cfg.mode(), ModeKind::Supervised);
        assert_eq!(cfg.system.device, ComputeTarget::Cpu);
        assert_eq!(cfg.inference.min_reasoning_steps, 2);
        assert_eq!(cfg.inference.max_reasoning_steps, 5);
        assert_eq!(cfg.checkpoint.keep_last_n, 5);
        assert_eq!(cfg.training.optimizer, OptimizerKind::Adam);
        assert!(cfg.training.use_scheduler);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_missing_section_names_the_key() {
        let text = MINIMAL.replace("data:\n  train_path: data/train.json\n", "");
        match ExperimentConfig::from_yaml_str(&text) {
            Err(ConfigError::MissingKey(key)) => assert_eq!(key, "data"),
            other => panic!("expected MissingKey, got {other:?}"),
        }
    }

    #[test]
    fn test_inverted_step_bounds_rejected() {
        let mut cfg = ExperimentConfig::from_yaml_str(MINIMAL).unwrap();
        cfg.inference.min_reasoning_steps = 4;
        cfg.inference.max_reasoning_steps = 3;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidStepBounds { min: 4, max: 3 })
        ));
    }

    #[test]
    fn test_zero_reasoning_steps_rejected() {
        let mut cfg = ExperimentConfig::from_yaml_str(MINIMAL).unwrap();
        cfg.model.reasoning_steps = 0;
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroReasoningSteps)));
    }

    #[test]
    fn test_overrides_apply_before_validation() {
        let mut cfg = ExperimentConfig::from_yaml_str(MINIMAL).unwrap();
        cfg.apply_overrides(&ConfigOverrides {
            batch_size:  Some(16),
            epochs:      Some(9),
            hidden_size: Some(12),
            device:      Some(ComputeTarget::Wgpu),
            ..Default::default()
        });
        assert_eq!(cfg.training.batch_size, 16);
        assert_eq!(cfg.training.epochs, 9);
        assert_eq!(cfg.model.hidden_size, 12);
        assert_eq!(cfg.system.device, ComputeTarget::Wgpu);
        // 2 * 12 = 24 is divisible by the default 4 heads
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_head_mismatch_rejected() {
        let mut cfg = ExperimentConfig::from_yaml_str(MINIMAL).unwrap();
        cfg.model.num_heads = 5;
        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_multi_task_heads_must_cover_output() {
        let mut cfg = ExperimentConfig::from_yaml_str(MINIMAL).unwrap();
        cfg.learning_mode.kind = ModeKind::MultiTask;
        assert!(matches!(cfg.validate(), Err(ConfigError::MissingKey(_))));
        cfg.multi_task.task_classes = vec![2, 2];
        assert!(cfg.validate().is_err());
        cfg.multi_task.task_classes = vec![2, 1];
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_device_aliases() {
        assert_eq!("cuda".parse::<ComputeTarget>(), Ok(ComputeTarget::Wgpu));
        assert_eq!("CPU".parse::<ComputeTarget>(),  Ok(ComputeTarget::Cpu));
        let yaml = MINIMAL.to_string() + "system:\n  device: cuda\n";
        let cfg = ExperimentConfig::from_yaml_str(&yaml).unwrap();
        assert_eq!(cfg.system.device, ComputeTarget::Wgpu);
    }

    #[test]
    fn test_data_kind_inferred_from_train_path() {
        let mut cfg = ExperimentConfig::from_yaml_str(MINIMAL).unwrap();
        assert_eq!(cfg.data_kind(), DataKind::Text);
        cfg.data.data_type = Some(DataKind::Tabular);
        assert_eq!(cfg.data_kind(), DataKind::Tabular);
    }
}
