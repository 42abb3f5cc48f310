use burn::{
    module::Param,
    nn::{
        attention::{MhaInput, MultiHeadAttention, MultiHeadAttentionConfig},
        BiLstm, BiLstmConfig,
        Dropout, DropoutConfig,
        Embedding, EmbeddingConfig,
        LayerNorm, LayerNormConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::{activation, Distribution},
};

use crate::data::batcher::ModelInput;
use crate::domain::{config::ModelSection, error::ConfigError};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally; adding them again gives conflicting impls.
#[derive(Config, Debug)]
pub struct ReasoningNetworkConfig {
    pub input_size:      usize,
    pub hidden_size:     usize,
    pub output_size:     usize,
    pub vocab_size:      usize,
    pub reasoning_steps: usize,
    #[config(default = 4)]
    pub num_heads:       usize,
    #[config(default = 0.1)]
    pub dropout:         f64,
}

impl From<&ModelSection> for ReasoningNetworkConfig {
    fn from(m: &ModelSection) -> Self {
        ReasoningNetworkConfig::new(
            m.input_size, m.hidden_size, m.output_size, m.vocab_size, m.reasoning_steps,
        )
        .with_num_heads(m.num_heads)
        .with_dropout(m.dropout_rate)
    }
}

impl ReasoningNetworkConfig {
    /// Width of the reasoning state: both LSTM directions concatenated.
    pub fn width(&self) -> usize {
        2 * self.hidden_size
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ReasoningNetwork<B>, ConfigError> {
        if self.reasoning_steps == 0 {
            return Err(ConfigError::ZeroReasoningSteps);
        }
        if self.input_size == 0 || self.hidden_size == 0 || self.output_size == 0 {
            return Err(ConfigError::Invalid("model sizes must be non-zero".into()));
        }
        if self.num_heads == 0 || self.width() % self.num_heads != 0 {
            return Err(ConfigError::Invalid(format!(
                "reasoning width {} is not divisible by {} heads",
                self.width(),
                self.num_heads
            )));
        }

        let width = self.width();
        let embedding     = EmbeddingConfig::new(self.vocab_size.max(1), self.input_size).init(device);
        let understanding = LinearConfig::new(self.input_size, width).init(device);
        let chain = Param::from_tensor(Tensor::random(
            [self.reasoning_steps, width],
            Distribution::Normal(0.0, 0.02),
            device,
        ));
        let blocks: Vec<ReasoningBlock<B>> = (0..self.reasoning_steps)
            .map(|_| self.build_block(device))
            .collect();
        let head_hidden = LinearConfig::new(width, self.hidden_size).init(device);
        let head_output = LinearConfig::new(self.hidden_size, self.output_size).init(device);
        let dropout     = DropoutConfig::new(self.dropout).init();

        Ok(ReasoningNetwork {
            embedding, understanding, chain, blocks,
            head_hidden, head_output, dropout,
            width,
            reasoning_steps: self.reasoning_steps,
        })
    }

    fn build_block<B: Backend>(&self, device: &B::Device) -> ReasoningBlock<B> {
        let width = self.width();
        ReasoningBlock {
            encoder:           BiLstmConfig::new(width, self.hidden_size, true).init(device),
            attention:         MultiHeadAttentionConfig::new(width, self.num_heads)
                                   .with_dropout(self.dropout)
                                   .init(device),
            attention_norm:    LayerNormConfig::new(width).init(device),
            memory_projection: LinearConfig::new(2 * width, width).init(device),
            ffn_expand:        LinearConfig::new(width, 4 * width).init(device),
            ffn_project:       LinearConfig::new(4 * width, width).init(device),
            ffn_norm:          LayerNormConfig::new(width).init(device),
            dropout:           DropoutConfig::new(self.dropout).init(),
        }
    }
}

// ─── ReasoningBlock ───────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ReasoningBlock<B: Backend> {
    pub encoder:           BiLstm<B>,
    pub attention:         MultiHeadAttention<B>,
    pub attention_norm:    LayerNorm<B>,
    pub memory_projection: Linear<B>,
    pub ffn_expand:        Linear<B>,
    pub ffn_project:       Linear<B>,
    pub ffn_norm:          LayerNorm<B>,
    pub dropout:           Dropout,
}

impl<B: Backend> ReasoningBlock<B> {
    /// state: [batch, seq, width], memory entries of the same shape.
    pub fn forward(
        &self,
        state:    Tensor<B, 3>,
        memory:   &[Tensor<B, 3>],
        pad_mask: Option<Tensor<B, 2, Bool>>,
    ) -> Tensor<B, 3> {
        let (encoded, _) = self.encoder.forward(state, None);

        let mut input = MhaInput::self_attn(encoded.clone());
        if let Some(mask) = pad_mask {
            input = input.mask_pad(mask);
        }
        let attended = self.attention.forward(input).context;
        let mut x = self.attention_norm.forward(encoded + self.dropout.forward(attended));

        if let Some(summary) = memory_summary(memory) {
            x = self.memory_projection.forward(Tensor::cat(vec![x, summary], 2));
        }

        let ffn = self.ffn_project.forward(activation::gelu(self.ffn_expand.forward(x.clone())));
        self.ffn_norm.forward(x + self.dropout.forward(ffn))
    }
}

/// Elementwise mean across reasoning steps; `None` for an empty memory.
pub fn memory_summary<B: Backend>(memory: &[Tensor<B, 3>]) -> Option<Tensor<B, 3>> {
    if memory.is_empty() {
        return None;
    }
    Some(Tensor::stack::<4>(memory.to_vec(), 0).mean_dim(0).squeeze::<3>(0))
}

// ─── ReasoningNetwork ─────────────────────────────────────────────────────────
#[derive(Module, Debug)]
pub struct ReasoningNetwork<B: Backend> {
    pub embedding:       Embedding<B>,
    pub understanding:   Linear<B>,
    /// One chain-weight row per allocated reasoning step: [steps, width]
    pub chain:           Param<Tensor<B, 2>>,
    pub blocks:          Vec<ReasoningBlock<B>>,
    pub head_hidden:     Linear<B>,
    pub head_output:     Linear<B>,
    pub dropout:         Dropout,
    pub width:           usize,
    pub reasoning_steps: usize,
}

/// Everything one forward pass produced.
pub struct ReasoningTrace<B: Backend> {
    /// One entry per reasoning step, in step order
    pub memory:         Vec<Tensor<B, 3>>,
    /// Mean of the memory entries: [batch, seq, width]
    pub representation: Tensor<B, 3>,
    pub logits:         Tensor<B, 2>,
}

impl<B: Backend> ReasoningNetwork<B> {
    pub fn forward(&self, input: &ModelInput<B>) -> Tensor<B, 2> {
        self.forward_with_steps(input, self.reasoning_steps)
    }

    pub fn forward_with_steps(&self, input: &ModelInput<B>, steps: usize) -> Tensor<B, 2> {
        self.trace(input, steps).logits
    }

    /// Steps beyond the allocated count reuse the last chain row and
    /// the last block. A request for zero steps runs one.
    pub fn trace(&self, input: &ModelInput<B>, steps: usize) -> ReasoningTrace<B> {
        let steps = steps.max(1);
        let (mut state, pad_mask) = self.understand(input);

        let mut memory: Vec<Tensor<B, 3>> = Vec::with_capacity(steps);
        for step in 0..steps {
            let weights = self.chain_weights(step).unsqueeze::<3>(); // [1, 1, width]
            let block = &self.blocks[step.min(self.blocks.len() - 1)];
            state = block.forward(state * weights, &memory, pad_mask.clone());
            memory.push(state.clone());
        }

        let representation = Tensor::stack::<4>(memory.clone(), 0)
            .mean_dim(0)
            .squeeze::<3>(0);
        let pooled = self.pool(representation.clone(), input);
        let hidden = activation::relu(self.head_hidden.forward(pooled));
        let logits = self.head_output.forward(self.dropout.forward(hidden));

        ReasoningTrace { memory, representation, logits }
    }

    /// softmax(chain[step]) over the feature channels: [width]
    pub fn chain_weights(&self, step: usize) -> Tensor<B, 1> {
        let row = step.min(self.reasoning_steps - 1);
        let raw = self.chain.val().slice([row..row + 1, 0..self.width]);
        activation::softmax(raw, 1).reshape([self.width])
    }

    /// Initial reasoning state and the attention padding mask.
    fn understand(&self, input: &ModelInput<B>) -> (Tensor<B, 3>, Option<Tensor<B, 2, Bool>>) {
        match input {
            ModelInput::Tokens { ids, mask } => {
                let embedded = self.embedding.forward(ids.clone());
                let pad_mask = mask.as_ref().map(|m| m.clone().equal_elem(0));
                (self.understanding.forward(embedded), pad_mask)
            }
            ModelInput::Features(x) => {
                let projected = self.understanding.forward(x.clone());
                (projected.unsqueeze_dim::<3>(1), None)
            }
        }
    }

    /// Mean over valid sequence positions: [batch, width]
    fn pool(&self, representation: Tensor<B, 3>, input: &ModelInput<B>) -> Tensor<B, 2> {
        let [batch, _, width] = representation.dims();
        match input {
            ModelInput::Tokens { mask: Some(mask), .. } => {
                let valid = mask.clone().float();                              // [batch, seq]
                let counts = valid.clone().sum_dim(1).clamp_min(1.0);         // [batch, 1]
                let summed = (representation * valid.unsqueeze_dim::<3>(2))   // [batch, seq, width]
                    .sum_dim(1)
                    .reshape([batch, width]);
                summed / counts
            }
            _ => representation.mean_dim(1).reshape([batch, width]),
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use proptest::prelude::*;

    type TestBackend = NdArray;

    fn config(steps: usize) -> ReasoningNetworkConfig {
        ReasoningNetworkConfig::new(6, 4, 3, 20, steps).with_num_heads(2).with_dropout(0.0)
    }

    fn features(batch: usize) -> ModelInput<TestBackend> {
        let device = Default::default();
        ModelInput::Features(Tensor::random([batch, 6], Distribution::Default, &device))
    }

    fn max_abs_diff(a: Tensor<TestBackend, 3>, b: Tensor<TestBackend, 3>) -> f32 {
        (a - b).abs().max().into_scalar()
    }

    #[test]
    fn test_zero_steps_rejected_at_construction() {
        let err = config(0).init::<TestBackend>(&Default::default()).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroReasoningSteps));
    }

    #[test]
    fn test_heads_must_divide_width() {
        let cfg = config(1).with_num_heads(3);
        assert!(cfg.init::<TestBackend>(&Default::default()).is_err());
    }

    #[test]
    fn test_memory_has_one_entry_per_step() {
        let model = config(3).init::<TestBackend>(&Default::default()).unwrap();
        let trace = model.trace(&features(2), 3);
        assert_eq!(trace.memory.len(), 3);
        assert_eq!(trace.logits.dims(), [2, 3]);
        for entry in &trace.memory {
            assert_eq!(entry.dims(), [2, 1, 8]);
        }
    }

    #[test]
    fn test_single_step_aggregation_is_identity() {
        let model = config(1).init::<TestBackend>(&Default::default()).unwrap();
        let trace = model.trace(&features(2), 1);
        assert!(max_abs_diff(trace.representation, trace.memory[0].clone()) < 1e-6);
    }

    #[test]
    fn test_representation_is_mean_of_memory() {
        let model = config(3).init::<TestBackend>(&Default::default()).unwrap();
        let trace = model.trace(&features(2), 3);

        let m = &trace.memory;
        // Distinguishable block outputs
        assert!(max_abs_diff(m[0].clone(), m[1].clone()) > 1e-6);

        let expected = (m[0].clone() + m[1].clone() + m[2].clone()) / 3.0;
        assert!(max_abs_diff(trace.representation, expected) < 1e-5);
    }

    #[test]
    fn test_extra_steps_clamp_to_last_allocated() {
        let model = config(2).init::<TestBackend>(&Default::default()).unwrap();
        let trace = model.trace(&features(1), 4);
        assert_eq!(trace.memory.len(), 4);

        let last: Vec<f32> = model.chain_weights(1).into_data().iter::<f32>().collect();
        let beyond: Vec<f32> = model.chain_weights(7).into_data().iter::<f32>().collect();
        assert_eq!(last, beyond);
    }

    #[test]
    fn test_token_input_with_padding() {
        let device = Default::default();
        let model = config(2).init::<TestBackend>(&device).unwrap();
        let ids = Tensor::<TestBackend, 2, Int>::from_data(
            TensorData::new(vec![4i64, 5, 0, 0, 7, 8, 9, 0], [2, 4]),
            &device,
        );
        let mask = Tensor::<TestBackend, 2, Int>::from_data(
            TensorData::new(vec![1i64, 1, 0, 0, 1, 1, 1, 0], [2, 4]),
            &device,
        );
        let logits = model.forward(&ModelInput::Tokens { ids, mask: Some(mask) });
        assert_eq!(logits.dims(), [2, 3]);
        let values: Vec<f32> = logits.into_data().iter::<f32>().collect();
        assert!(values.iter().all(|v| v.is_finite()));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(16))]

        #[test]
        fn prop_chain_weights_on_simplex(seed in any::<u64>(), steps in 1usize..4, hidden in 1usize..5) {
            TestBackend::seed(seed);
            let cfg = ReasoningNetworkConfig::new(3, hidden, 2, 10, steps).with_num_heads(2);
            let model = cfg.init::<TestBackend>(&Default::default()).unwrap();
            for step in 0..steps {
                let w: Vec<f32> = model.chain_weights(step).into_data().iter::<f32>().collect();
                prop_assert_eq!(w.len(), 2 * hidden);
                prop_assert!(w.iter().all(|&v| v >= 0.0));
                let sum: f32 = w.iter().sum();
                prop_assert!((sum - 1.0).abs() < 1e-5);
            }
        }
    }
}
