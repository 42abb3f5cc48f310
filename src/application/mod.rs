// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// This layer orchestrates the other layers to accomplish one
// goal (train, evaluate, predict).
//
// Rules for this layer:
//   - No ML math or model code here
//   - No printing here (that's Layer 1)
//   - Errors become anyhow::Error with context for the user
//
// Reference: Clean Architecture pattern
//            Rust Book §7 (Module System)

// system.device → Burn backend
pub mod backend;

// config/<mode>/<name>.yaml lookup
pub mod catalog;

// The training workflow
pub mod train_use_case;

// Checkpoint evaluation
pub mod evaluate_use_case;

// Adaptive-depth prediction
pub mod predict_use_case;
