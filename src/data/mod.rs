// ============================================================
// Layer 4 — Data Layer
// ============================================================
// Everything between a dataset on disk and a Batch of tensors:
//
//   records.rs       → parse JSON / JSONL / TXT / CSV / image files
//   features.rs      → fixed-width numeric encodings
//   dataset.rs       → records → Samples, Burn Dataset impl
//   batcher.rs       → Samples → Batch on a device
//   splitter.rs      → seeded train/validation split
//   adapter.rs       → DataInput → AdaptedData → BatchSource
//   mode_adapters.rs → one adapter per learning mode
//   registry.rs      → (mode, data kind) → adapter constructor
//
// Reference: Burn Book §4 (Data)

pub mod adapter;
pub mod batcher;
pub mod dataset;
pub mod features;
pub mod mode_adapters;
pub mod records;
pub mod registry;
pub mod splitter;
