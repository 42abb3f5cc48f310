// ============================================================
// Layer 3 — Error Taxonomy
// ============================================================
// Typed errors for the library layers. The application and CLI
// layers wrap these in anyhow with extra context.
//
//   ConfigError     → bad or unsupported configuration, raised
//                     before any data I/O or model construction
//   DataError       → unsupported input shapes, missing or
//                     corrupt datasets
//   FrameworkError  → everything the ModeManager can surface,
//                     including compute and checkpoint faults
//
// Reference: Rust Book §9 (Error Handling), thiserror docs

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::modes::{DataKind, ModeKind};

/// Configuration problems. Always raised before allocation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file '{path}': {source}")]
    Read {
        path:   PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("missing required configuration key '{0}'")]
    MissingKey(String),

    #[error("invalid reasoning step bounds: min={min}, max={max} (need 0 < min <= max)")]
    InvalidStepBounds { min: usize, max: usize },

    #[error("model.reasoning_steps must be at least 1")]
    ZeroReasoningSteps,

    #[error("unsupported configuration: no adapter registered for mode '{mode}' with data kind '{data_kind}'")]
    Unsupported { mode: ModeKind, data_kind: DataKind },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Data adaptation and dataset problems.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("unsupported input: cannot adapt a value of kind '{kind}'")]
    UnsupportedInput { kind: String },

    #[error("dataset file '{0}' does not exist")]
    Missing(PathBuf),

    #[error("corrupt dataset '{path}': {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("required field '{0}' is missing")]
    MissingField(&'static str),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("token id {id} is outside the vocabulary (size {vocab_size})")]
    TokenOutOfRange { id: u32, vocab_size: usize },

    #[error("{target} {label} is outside the {classes} output classes")]
    LabelOutOfRange { target: String, label: usize, classes: usize },

    #[error("no data: {0}")]
    Empty(&'static str),
}

/// Errors surfaced by the mode manager and its collaborators.
#[derive(Debug, Error)]
pub enum FrameworkError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Data(#[from] DataError),

    #[error("compute error: {0}")]
    Compute(String),

    #[error("checkpoint error at '{path}': {message}")]
    Checkpoint { message: String, path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type FrameworkResult<T> = Result<T, FrameworkError>;

impl FrameworkError {
    pub fn checkpoint(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Checkpoint { message: message.to_string(), path: path.into() }
    }
}
