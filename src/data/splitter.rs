// ============================================================
// Layer 4 — Train/Validation Splitter
// ============================================================
// Shuffles samples with a seeded RNG and splits them into a
// training set and a validation set. Used when the configuration
// names no validation path, and for explicit training data.
//
// The seed comes from `system.seed`, so the same configuration
// always produces the same split.
//
// A dataset too small to split (fewer than two samples) is
// validated on its own training set rather than on nothing.
//
// Reference: rand crate documentation (SliceRandom, StdRng)

use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

/// Shuffle `samples` with `seed` and split into (train, validation).
pub fn split_train_val<T: Clone>(
    mut samples:    Vec<T>,
    train_fraction: f64,
    seed:           u64,
) -> (Vec<T>, Vec<T>) {
    let mut rng = StdRng::seed_from_u64(seed);
    samples.shuffle(&mut rng);

    let total = samples.len();
    if total < 2 {
        let val = samples.clone();
        return (samples, val);
    }

    // Keep at least one sample on each side
    let split_at = ((total as f64) * train_fraction).round() as usize;
    let split_at = split_at.clamp(1, total - 1);

    let val = samples.split_off(split_at);

    tracing::debug!(
        "Dataset split: {} training, {} validation ({}% / {}%)",
        samples.len(),
        val.len(),
        (samples.len() * 100) / total,
        (val.len()     * 100) / total,
    );

    (samples, val)
}
