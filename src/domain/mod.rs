// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types shared by every other layer:
//   - config:  the experiment configuration loaded from YAML
//   - modes:   learning-mode and data-kind identifiers
//   - sample:  one host-side training example
//   - metrics: per-epoch metrics and the run summary
//   - error:   the typed error taxonomy
//   - traits:  the experiment-sink abstraction
//
// Nothing in this layer touches Burn tensors.
//
// Reference: Rust Book §7 (Modules)

pub mod config;
pub mod error;
pub mod metrics;
pub mod modes;
pub mod sample;
pub mod traits;
