// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Persistence that several layers share:
//
//   checkpoint.rs      — epoch checkpoints (model, optimiser,
//                        resumable training state), best-model
//                        promotion and retention
//
//   tokenizer_store.rs — builds a word-level tokenizer from the
//                        first training corpus and reloads it for
//                        every later run, so ids stay stable
//
//   metrics.rs         — file-backed experiment tracker: run
//                        metadata, per-epoch CSV, artifacts and
//                        an end-of-run report
//
// Reference: Rust Book §7 (Modules)
//            Burn Book §5 (Checkpointing)

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Tokenizer building, saving, and loading
pub mod tokenizer_store;

/// Experiment tracking to CSV/JSON files
pub mod metrics;
