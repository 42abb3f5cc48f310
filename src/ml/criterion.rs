// ============================================================
// Layer 5 — Loss Criteria
// ============================================================
// One loss per learning paradigm, all returning a scalar [1]
// tensor so the caller can call backward() on it:
//
//   cross_entropy     supervised classification
//   clustering_loss   information maximisation:
//                       mean H(p(y|x)) − H(mean p(y|x))
//                     confident per-example, balanced overall
//   policy_gradient   −mean(log π(a|s) · (r − mean r))
//   multi_task_loss   mean of per-head cross-entropies
//
// Reference: Hu et al. (2017) IMSAT, Williams (1992) REINFORCE

use burn::{nn::loss::CrossEntropyLossConfig, prelude::*, tensor::activation};

const LOG_EPS: f64 = 1e-8;

pub fn cross_entropy<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> Tensor<B, 1> {
    CrossEntropyLossConfig::new()
        .init(&logits.device())
        .forward(logits, targets)
}

/// Number of rows whose argmax equals the target.
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    logits
        .argmax(1)
        .flatten::<1>(0, 1)
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

pub fn clustering_loss<B: Backend>(logits: Tensor<B, 2>) -> Tensor<B, 1> {
    let probs     = activation::softmax(logits.clone(), 1);
    let log_probs = activation::log_softmax(logits, 1);

    let conditional_entropy = (probs.clone() * log_probs).sum_dim(1).mean().neg();

    let marginal = probs.mean_dim(0); // [1, classes]
    let marginal_entropy = (marginal.clone() * marginal.add_scalar(LOG_EPS).log())
        .sum()
        .neg();

    conditional_entropy - marginal_entropy
}

pub fn policy_gradient<B: Backend>(
    logits:  Tensor<B, 2>,
    actions: Tensor<B, 1, Int>,
    rewards: Tensor<B, 1>,
) -> Tensor<B, 1> {
    let [batch, _] = logits.dims();
    let log_probs = activation::log_softmax(logits, 1);
    let chosen = log_probs
        .gather(1, actions.reshape([batch, 1]))
        .reshape([batch]);

    // A single transition has no baseline to compare against
    let advantage = if batch > 1 {
        rewards.clone() - rewards.mean()
    } else {
        rewards
    };
    (chosen * advantage).mean().neg()
}

/// `heads` holds the class count of each task, laid out left to
/// right over the logit columns; `labels` is [batch, tasks].
pub fn multi_task_loss<B: Backend>(
    logits: Tensor<B, 2>,
    labels: Tensor<B, 2, Int>,
    heads:  &[usize],
) -> Tensor<B, 1> {
    let [batch, _] = logits.dims();
    let device = logits.device();

    let mut total = Tensor::<B, 1>::zeros([1], &device);
    let mut offset = 0;
    for (task, &classes) in heads.iter().enumerate() {
        let task_logits = logits.clone().slice([0..batch, offset..offset + classes]);
        let task_labels = labels.clone().slice([0..batch, task..task + 1]).reshape([batch]);
        total = total + cross_entropy(task_logits, task_labels);
        offset += classes;
    }
    total.div_scalar(heads.len().max(1) as f64)
}

/// Per-task argmax for every row: result[row][task].
pub fn task_predictions<B: Backend>(logits: Tensor<B, 2>, heads: &[usize]) -> Vec<Vec<usize>> {
    let [batch, _] = logits.dims();
    let mut rows = vec![Vec::with_capacity(heads.len()); batch];

    let mut offset = 0;
    for &classes in heads {
        let task_logits = logits.clone().slice([0..batch, offset..offset + classes]);
        for (row, class) in rows.iter_mut().zip(crate::ml::inference::argmax_rows(task_logits)) {
            row.push(class);
        }
        offset += classes;
    }
    rows
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn floats(values: Vec<f32>, shape: [usize; 2]) -> Tensor<TestBackend, 2> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    fn ints(values: Vec<i64>) -> Tensor<TestBackend, 1, Int> {
        let n = values.len();
        Tensor::from_data(TensorData::new(values, [n]), &Default::default())
    }

    fn scalar(t: Tensor<TestBackend, 1>) -> f32 {
        t.into_scalar()
    }

    #[test]
    fn test_count_correct() {
        let logits = floats(vec![0.1, 0.9, 0.8, 0.2, 0.3, 0.7], [3, 2]);
        assert_eq!(count_correct(logits, ints(vec![1, 0, 0])), 2);
    }

    #[test]
    fn test_cross_entropy_lower_for_right_answer() {
        let good = cross_entropy(floats(vec![0.0, 5.0], [1, 2]), ints(vec![1]));
        let bad  = cross_entropy(floats(vec![0.0, 5.0], [1, 2]), ints(vec![0]));
        assert!(scalar(good) < scalar(bad));
    }

    #[test]
    fn test_clustering_prefers_confident_balanced_assignments() {
        // Confident and balanced: each row sure of a different cluster
        let balanced  = clustering_loss(floats(vec![9.0, 0.0, 0.0, 9.0], [2, 2]));
        // Confident but collapsed onto one cluster
        let collapsed = clustering_loss(floats(vec![9.0, 0.0, 9.0, 0.0], [2, 2]));
        // Balanced marginal but unsure per row
        let uncertain = clustering_loss(floats(vec![0.0, 0.0, 0.0, 0.0], [2, 2]));

        let balanced = scalar(balanced);
        assert!(balanced < scalar(collapsed));
        assert!(balanced < scalar(uncertain));
    }

    #[test]
    fn test_policy_gradient_rewards_good_actions() {
        // Action 1 earned the higher reward; raising its logit must lower the loss
        let actions = || ints(vec![1, 0]);
        let rewards = || {
            Tensor::<TestBackend, 1>::from_data(TensorData::new(vec![1.0f32, 0.0], [2]), &Default::default())
        };
        let favours_good = policy_gradient(floats(vec![0.0, 2.0, 0.0, 2.0], [2, 2]), actions(), rewards());
        let favours_bad  = policy_gradient(floats(vec![2.0, 0.0, 2.0, 0.0], [2, 2]), actions(), rewards());
        assert!(scalar(favours_good) < scalar(favours_bad));
    }

    #[test]
    fn test_multi_task_slices_heads() {
        // Two heads: 2 classes then 3 classes
        let logits = floats(vec![5.0, 0.0, 0.0, 0.0, 5.0], [1, 5]);
        let labels = Tensor::<TestBackend, 2, Int>::from_data(
            TensorData::new(vec![0i64, 2], [1, 2]),
            &Default::default(),
        );
        let loss = scalar(multi_task_loss(logits.clone(), labels, &[2, 3]));
        assert!(loss < 0.05);
        assert_eq!(task_predictions(logits, &[2, 3]), vec![vec![0, 2]]);
    }
}
