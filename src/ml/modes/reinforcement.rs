// Reinforcement learning from logged transitions: the network is the
// policy over actions and is trained with REINFORCE against the
// recorded rewards. Evaluation reports the policy-gradient loss and how
// often the policy agrees with the logged action.

use burn::tensor::backend::AutodiffBackend;

use super::{optimise, require, scalar, BatchEvaluation, LearningMode, NetworkOptimizer};
use crate::data::batcher::Batch;
use crate::domain::{error::FrameworkResult, modes::ModeKind};
use crate::ml::{
    criterion::{count_correct, policy_gradient},
    model::ReasoningNetwork,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReinforcementMode;

impl<B: AutodiffBackend> LearningMode<B> for ReinforcementMode {
    fn kind(&self) -> ModeKind {
        ModeKind::Reinforcement
    }

    fn train_batch(
        &mut self,
        model:     ReasoningNetwork<B>,
        optimizer: &mut NetworkOptimizer<B>,
        lr:        f64,
        batch:     Batch<B>,
    ) -> FrameworkResult<(ReasoningNetwork<B>, f64)> {
        let actions = require(batch.labels, "actions")?;
        let rewards = require(batch.rewards, "rewards")?;
        let logits = model.forward(&batch.inputs);
        let loss = policy_gradient(logits, actions, rewards);
        optimise(model, optimizer, lr, loss)
    }

    fn evaluate_batch(
        &self,
        model: &ReasoningNetwork<B::InnerBackend>,
        batch: Batch<B::InnerBackend>,
    ) -> FrameworkResult<BatchEvaluation> {
        let actions = require(batch.labels, "actions")?;
        let rewards = require(batch.rewards, "rewards")?;
        let total = actions.dims()[0];
        let logits = model.forward(&batch.inputs);
        let correct = count_correct(logits.clone(), actions.clone());
        let loss = scalar(policy_gradient(logits, actions, rewards))?;
        Ok(BatchEvaluation { loss, correct, total })
    }
}
