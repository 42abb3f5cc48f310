// ============================================================
// Adversarial training
// ============================================================
// The reasoning network is the discriminator with two classes
// (0 = generated, 1 = real). A small generator maps Gaussian noise
// to feature vectors:
//
//   z ~ N(0, 1)^latent → Linear → ReLU → Linear → sigmoid → [input_size]
//
// Each training batch runs two alternating updates:
//   1. discriminator: real rows → 1, detached fakes → 0
//   2. generator:     fresh fakes scored by the updated
//                     discriminator against target 1
//
// Only the discriminator loss is reported as the batch loss.
// Evaluation scores the discriminator on real plus generated rows.
//
// Reference: Goodfellow et al. (2014) Generative Adversarial Nets

use burn::{
    module::AutodiffModule,
    nn::{Linear, LinearConfig},
    optim::{AdamConfig, GradientsParams},
    prelude::*,
    tensor::{activation, backend::AutodiffBackend, Distribution},
};

use super::{optimise, scalar, BatchEvaluation, LearningMode, NetworkOptimizer};
use crate::data::batcher::{Batch, ModelInput};
use crate::domain::{
    config::ExperimentConfig,
    error::{DataError, FrameworkResult},
    modes::ModeKind,
};
use crate::ml::{
    criterion::{count_correct, cross_entropy},
    model::ReasoningNetwork,
    optim::ModelOptimizer,
};

pub const FAKE: i64 = 0;
pub const REAL: i64 = 1;

#[derive(Module, Debug)]
pub struct Generator<B: Backend> {
    hidden: Linear<B>,
    output: Linear<B>,
    latent: usize,
}

impl<B: Backend> Generator<B> {
    pub fn new(latent: usize, hidden: usize, output: usize, device: &B::Device) -> Self {
        Self {
            hidden: LinearConfig::new(latent, hidden).init(device),
            output: LinearConfig::new(hidden, output).init(device),
            latent,
        }
    }

    pub fn forward(&self, noise: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = activation::relu(self.hidden.forward(noise));
        activation::sigmoid(self.output.forward(x))
    }

    /// Draw `count` samples.
    pub fn sample(&self, count: usize, device: &B::Device) -> Tensor<B, 2> {
        let noise = Tensor::random([count, self.latent], Distribution::Normal(0.0, 1.0), device);
        self.forward(noise)
    }
}

pub struct GanMode<B: AutodiffBackend> {
    generator: Generator<B>,
    optimizer: Box<dyn ModelOptimizer<Generator<B>, B>>,
}

impl<B: AutodiffBackend> GanMode<B> {
    pub fn new(config: &ExperimentConfig, device: &B::Device) -> Self {
        let generator = Generator::new(
            config.gan.latent_size,
            config.model.hidden_size,
            config.model.input_size,
            device,
        );
        let optimizer: Box<dyn ModelOptimizer<Generator<B>, B>> =
            Box::new(AdamConfig::new().init::<B, Generator<B>>());
        Self { generator, optimizer }
    }

    pub fn generator(&self) -> &Generator<B> {
        &self.generator
    }
}

fn real_features<B: Backend>(inputs: &ModelInput<B>) -> FrameworkResult<Tensor<B, 2>> {
    match inputs {
        ModelInput::Features(x) => Ok(x.clone()),
        ModelInput::Tokens { .. } => Err(DataError::ShapeMismatch(
            "adversarial training needs feature inputs, got token ids".into(),
        )
        .into()),
    }
}

fn targets<B: Backend>(real: usize, fake: usize, device: &B::Device) -> Tensor<B, 1, Int> {
    let mut values = vec![REAL; real];
    values.extend(std::iter::repeat(FAKE).take(fake));
    Tensor::from_data(TensorData::new(values, [real + fake]), device)
}

impl<B: AutodiffBackend> LearningMode<B> for GanMode<B> {
    fn kind(&self) -> ModeKind {
        ModeKind::Gan
    }

    fn train_batch(
        &mut self,
        model:     ReasoningNetwork<B>,
        optimizer: &mut NetworkOptimizer<B>,
        lr:        f64,
        batch:     Batch<B>,
    ) -> FrameworkResult<(ReasoningNetwork<B>, f64)> {
        let real = real_features(&batch.inputs)?;
        let [n, _] = real.dims();
        let device = real.device();

        // Discriminator update
        let fake = self.generator.sample(n, &device).detach();
        let inputs = ModelInput::Features(Tensor::cat(vec![real, fake], 0));
        let d_loss = cross_entropy(model.forward(&inputs), targets(n, n, &device));
        let (model, d_value) = optimise(model, optimizer, lr, d_loss)?;

        // Generator update against the refreshed discriminator
        let fake = self.generator.sample(n, &device);
        let g_loss = cross_entropy(model.forward(&ModelInput::Features(fake)), targets(n, 0, &device));
        let g_value = scalar(g_loss.clone())?;
        let grads = GradientsParams::from_grads(g_loss.backward(), &self.generator);
        self.generator = self.optimizer.step(lr, self.generator.clone(), grads);

        tracing::trace!(d_loss = d_value, g_loss = g_value, "adversarial step");
        Ok((model, d_value))
    }

    fn evaluate_batch(
        &self,
        model: &ReasoningNetwork<B::InnerBackend>,
        batch: Batch<B::InnerBackend>,
    ) -> FrameworkResult<BatchEvaluation> {
        let real = real_features(&batch.inputs)?;
        let [n, _] = real.dims();
        let device = real.device();

        let fake = self.generator.valid().sample(n, &device);
        let inputs = ModelInput::Features(Tensor::cat(vec![real, fake], 0));
        let labels = targets(n, n, &device);

        let logits = model.forward(&inputs);
        let correct = count_correct(logits.clone(), labels.clone());
        let loss = scalar(cross_entropy(logits, labels))?;
        Ok(BatchEvaluation { loss, correct, total: 2 * n })
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    #[test]
    fn test_generator_output_shape_and_range() {
        let device = Default::default();
        let generator = Generator::<TestBackend>::new(4, 8, 6, &device);
        let samples = generator.sample(3, &device);
        assert_eq!(samples.dims(), [3, 6]);
        assert!(samples.into_data().iter::<f32>().all(|v| (0.0..=1.0).contains(&v)));
    }

    #[test]
    fn test_targets_put_real_first() {
        let t = targets::<TestBackend>(2, 1, &Default::default());
        let values: Vec<i64> = t.into_data().iter::<i64>().collect();
        assert_eq!(values, vec![REAL, REAL, FAKE]);
    }
}
