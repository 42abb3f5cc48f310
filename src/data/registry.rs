// ============================================================
// Layer 4 — Mode Registry
// ============================================================
// A fixed table from (mode, data kind) to the dataset kind to
// load and the adapter constructor to call. Lookup happens before
// any file is opened, so an unsupported combination fails fast.
//
//   mode            data kinds
//   supervised      text, image, tabular
//   unsupervised    text, image
//   reinforcement   sequence (environment), memory (replay buffer)
//   gan             image, text
//   multi_task      multi_modal

use crate::data::{
    adapter::DataAdapter,
    mode_adapters::{
        GanAdapter, MultiTaskAdapter, ReinforcementAdapter, SupervisedAdapter,
        UnsupervisedAdapter,
    },
};
use crate::domain::{
    config::ExperimentConfig,
    error::ConfigError,
    modes::{DataKind, DatasetKind, ModeKind},
};

pub type AdapterConstructor = fn(ExperimentConfig, RegistryEntry) -> Box<dyn DataAdapter>;

#[derive(Clone, Copy)]
pub struct RegistryEntry {
    pub mode:      ModeKind,
    pub data_kind: DataKind,
    pub dataset:   DatasetKind,
    pub build:     AdapterConstructor,
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("mode", &self.mode)
            .field("data_kind", &self.data_kind)
            .field("dataset", &self.dataset)
            .finish()
    }
}

const fn entry(
    mode:      ModeKind,
    data_kind: DataKind,
    dataset:   DatasetKind,
    build:     AdapterConstructor,
) -> RegistryEntry {
    RegistryEntry { mode, data_kind, dataset, build }
}

pub const REGISTRY: &[RegistryEntry] = &[
    entry(ModeKind::Supervised,    DataKind::Text,       DatasetKind::TextClassification,  SupervisedAdapter::boxed),
    entry(ModeKind::Supervised,    DataKind::Image,      DatasetKind::ImageClassification, SupervisedAdapter::boxed),
    entry(ModeKind::Supervised,    DataKind::Tabular,    DatasetKind::Tabular,             SupervisedAdapter::boxed),
    entry(ModeKind::Unsupervised,  DataKind::Text,       DatasetKind::TextClustering,      UnsupervisedAdapter::boxed),
    entry(ModeKind::Unsupervised,  DataKind::Image,      DatasetKind::ImageClustering,     UnsupervisedAdapter::boxed),
    entry(ModeKind::Reinforcement, DataKind::Sequence,   DatasetKind::RlEnvironment,       ReinforcementAdapter::boxed),
    entry(ModeKind::Reinforcement, DataKind::Memory,     DatasetKind::ReplayBuffer,        ReinforcementAdapter::boxed),
    entry(ModeKind::Gan,           DataKind::Image,      DatasetKind::ImageGeneration,     GanAdapter::boxed),
    entry(ModeKind::Gan,           DataKind::Text,       DatasetKind::TextGeneration,      GanAdapter::boxed),
    entry(ModeKind::MultiTask,     DataKind::MultiModal, DatasetKind::MultiTask,           MultiTaskAdapter::boxed),
];

/// Find the entry for a (mode, data kind) pair.
pub fn resolve(mode: ModeKind, data_kind: DataKind) -> Result<RegistryEntry, ConfigError> {
    REGISTRY
        .iter()
        .copied()
        .find(|e| e.mode == mode && e.data_kind == data_kind)
        .ok_or(ConfigError::Unsupported { mode, data_kind })
}

/// Resolve the configured pair and construct its adapter. No I/O.
pub fn adapter_for(config: &ExperimentConfig) -> Result<Box<dyn DataAdapter>, ConfigError> {
    let entry = resolve(config.mode(), config.data_kind())?;
    tracing::debug!(?entry, "resolved registry entry");
    Ok((entry.build)(config.clone(), entry))
}

/// Data kinds registered for a mode.
pub fn data_kinds_for(mode: ModeKind) -> Vec<DataKind> {
    REGISTRY.iter().filter(|e| e.mode == mode).map(|e| e.data_kind).collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::config::ExperimentConfig;

    #[test]
    fn test_every_mode_has_an_entry() {
        for mode in ModeKind::ALL {
            assert!(!data_kinds_for(mode).is_empty(), "{mode} has no registry entry");
        }
    }

    #[test]
    fn test_known_pair_resolves() {
        let entry = resolve(ModeKind::Reinforcement, DataKind::Memory).unwrap();
        assert_eq!(entry.dataset, DatasetKind::ReplayBuffer);
    }

    #[test]
    fn test_unknown_pair_fails_before_io() {
        // The training path does not exist; lookup must fail on the pair alone
        let yaml = r#"
learning_mode: { type: reinforcement }
model: { input_size: 4, hidden_size: 4, output_size: 2, reasoning_steps: 1 }
training: { batch_size: 2, learning_rate: 0.01, epochs: 1 }
data: { train_path: /does/not/exist.png }
"#;
        let config = ExperimentConfig::from_yaml_str(yaml).unwrap();
        match adapter_for(&config) {
            Err(ConfigError::Unsupported { mode, data_kind }) => {
                assert_eq!(mode, ModeKind::Reinforcement);
                assert_eq!(data_kind, DataKind::Image);
            }
            Err(other) => panic!("expected Unsupported, got {other:?}"),
            Ok(_) => panic!("expected Unsupported, got an adapter"),
        }
    }

    #[test]
    fn test_adapter_carries_its_entry() {
        let yaml = r#"
learning_mode: { type: multi_task }
model: { input_size: 4, hidden_size: 4, output_size: 2, reasoning_steps: 1 }
training: { batch_size: 2, learning_rate: 0.01, epochs: 1 }
data: { train_path: mt.json, data_type: multi_modal }
"#;
        let config = ExperimentConfig::from_yaml_str(yaml).unwrap();
        let adapter = adapter_for(&config).unwrap();
        assert_eq!(adapter.entry().dataset, DatasetKind::MultiTask);
        assert_eq!(adapter.structured_fields(), &["features", "task_labels"]);
    }
}
