// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// Everything that touches tensors, gradients or optimisers.
//
// What's in this layer:
//
//   model.rs          — ReasoningNetwork: understanding encoder,
//                       k stacked reasoning blocks with a
//                       cross-step memory, chain weights and
//                       a two-layer output head
//
//   inference.rs      — adaptive-depth prediction policy
//
//   criterion.rs      — one loss per learning paradigm
//   optim.rs          — adam | adamw | sgd behind one trait
//   scheduler.rs      — reduce-on-plateau learning rate
//   early_stopping.rs — patience counter on validation loss
//
//   modes/            — supervised, unsupervised, reinforcement,
//                       gan and multi-task training contracts
//
//   manager.rs        — ModeManager: the train / evaluate /
//                       predict loop, checkpoints and tracking
//
// Reference: Burn Book §3 (Building Blocks)
//            Burn Book §5 (Training)

/// Iterative reasoning network
pub mod model;

/// Confidence-driven step count at prediction time
pub mod inference;

/// Loss functions per paradigm
pub mod criterion;

/// Optimiser construction and type erasure
pub mod optim;

/// Reduce-on-plateau learning-rate scheduler
pub mod scheduler;

/// Early stopping on validation loss
pub mod early_stopping;

/// Learning paradigms sharing one contract
pub mod modes;

/// Run orchestration
pub mod manager;
