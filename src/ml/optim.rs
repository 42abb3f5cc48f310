// ============================================================
// Layer 5 — Optimiser Construction
// ============================================================
// Burn's Optimizer trait is generic over its record type, so the
// three configured optimisers (adam, adamw, sgd) have different
// concrete types. ModelOptimizer erases that difference behind a
// trait object the manager can own, step and checkpoint.
//
// Update rules:
//   adam   m = β1·m + (1−β1)·g, v = β2·v + (1−β2)·g², θ −= lr·m̂/(√v̂+ε)
//   adamw  adam with decoupled weight decay
//   sgd    θ −= lr·g
//
// Optional gradient clipping by global norm applies to all three.
//
// Reference: Kingma & Ba (2015) Adam, Loshchilov & Hutter (2019) AdamW

use std::path::PathBuf;

use burn::{
    grad_clipping::GradientClippingConfig,
    module::AutodiffModule,
    optim::{
        decay::WeightDecayConfig, AdamConfig, AdamWConfig, GradientsParams, Optimizer,
        SgdConfig,
    },
    record::{FullPrecisionSettings, NamedMpkGzFileRecorder, Recorder, RecorderError},
    tensor::backend::AutodiffBackend,
};

use crate::domain::config::{OptimizerKind, TrainingSection};

/// Full precision so a save/load round trip is exact.
pub type StateRecorder = NamedMpkGzFileRecorder<FullPrecisionSettings>;

pub trait ModelOptimizer<M, B>
where
    M: AutodiffModule<B>,
    B: AutodiffBackend,
{
    fn step(&mut self, lr: f64, module: M, grads: GradientsParams) -> M;

    /// Write the optimiser state; the recorder adds the extension.
    fn save_state(&self, path: PathBuf) -> Result<(), RecorderError>;

    fn load_state(
        self: Box<Self>,
        path:   PathBuf,
        device: &B::Device,
    ) -> Result<Box<dyn ModelOptimizer<M, B>>, RecorderError>;
}

impl<M, B, O> ModelOptimizer<M, B> for O
where
    M: AutodiffModule<B>,
    B: AutodiffBackend,
    O: Optimizer<M, B> + 'static,
{
    fn step(&mut self, lr: f64, module: M, grads: GradientsParams) -> M {
        Optimizer::step(self, lr, module, grads)
    }

    fn save_state(&self, path: PathBuf) -> Result<(), RecorderError> {
        Recorder::<B>::record(&StateRecorder::new(), self.to_record(), path)
    }

    fn load_state(
        self: Box<Self>,
        path:   PathBuf,
        device: &B::Device,
    ) -> Result<Box<dyn ModelOptimizer<M, B>>, RecorderError> {
        let record = Recorder::<B>::load(&StateRecorder::new(), path, device)?;
        Ok(Box::new((*self).load_record(record)))
    }
}

fn boxed<M, B, O>(optimizer: O) -> Box<dyn ModelOptimizer<M, B>>
where
    M: AutodiffModule<B>,
    B: AutodiffBackend,
    O: Optimizer<M, B> + 'static,
{
    Box::new(optimizer)
}

/// Build the configured optimiser.
pub fn build_optimizer<M, B>(training: &TrainingSection) -> Box<dyn ModelOptimizer<M, B>>
where
    M: AutodiffModule<B> + 'static,
    B: AutodiffBackend,
{
    let clipping = training
        .grad_clip_norm
        .map(|norm| GradientClippingConfig::Norm(norm as f32));
    let decay = (training.weight_decay > 0.0)
        .then(|| WeightDecayConfig::new(training.weight_decay as f32));

    tracing::debug!(
        optimizer = ?training.optimizer,
        clip = ?training.grad_clip_norm,
        weight_decay = training.weight_decay,
        "building optimiser"
    );

    match training.optimizer {
        OptimizerKind::Adam => boxed(
            AdamConfig::new()
                .with_epsilon(1e-8)
                .with_weight_decay(decay)
                .with_grad_clipping(clipping)
                .init(),
        ),
        OptimizerKind::AdamW => boxed(
            AdamWConfig::new()
                .with_weight_decay(training.weight_decay as f32)
                .with_grad_clipping(clipping)
                .init(),
        ),
        OptimizerKind::Sgd => boxed(
            SgdConfig::new()
                .with_weight_decay(decay)
                .with_gradient_clipping(clipping)
                .init(),
        ),
    }
}
