// ============================================================
// Layer 4 — Per-mode Adapters
// ============================================================
// One adapter per learning mode. They share AdapterCore for
// loading and differ in which keys a pre-structured batch may
// carry:
//
//   supervised     → input_ids, attention_mask, features, labels
//   unsupervised   → input_ids, attention_mask, features, labels
//                    (labels only score the clustering)
//   reinforcement  → features, states, actions, rewards
//   gan            → features
//   multi_task     → features, task_labels

use crate::data::{
    adapter::{AdapterCore, DataAdapter},
    registry::RegistryEntry,
};
use crate::domain::config::ExperimentConfig;

pub struct SupervisedAdapter {
    core: AdapterCore,
}

impl SupervisedAdapter {
    pub fn boxed(config: ExperimentConfig, entry: RegistryEntry) -> Box<dyn DataAdapter> {
        Box::new(Self { core: AdapterCore::new(config, entry) })
    }
}

impl DataAdapter for SupervisedAdapter {
    fn core(&self) -> &AdapterCore { &self.core }

    fn structured_fields(&self) -> &'static [&'static str] {
        &["input_ids", "attention_mask", "features", "labels"]
    }
}

pub struct UnsupervisedAdapter {
    core: AdapterCore,
}

impl UnsupervisedAdapter {
    pub fn boxed(config: ExperimentConfig, entry: RegistryEntry) -> Box<dyn DataAdapter> {
        Box::new(Self { core: AdapterCore::new(config, entry) })
    }
}

impl DataAdapter for UnsupervisedAdapter {
    fn core(&self) -> &AdapterCore { &self.core }

    fn structured_fields(&self) -> &'static [&'static str] {
        &["input_ids", "attention_mask", "features", "labels"]
    }
}

pub struct ReinforcementAdapter {
    core: AdapterCore,
}

impl ReinforcementAdapter {
    pub fn boxed(config: ExperimentConfig, entry: RegistryEntry) -> Box<dyn DataAdapter> {
        Box::new(Self { core: AdapterCore::new(config, entry) })
    }
}

impl DataAdapter for ReinforcementAdapter {
    fn core(&self) -> &AdapterCore { &self.core }

    fn structured_fields(&self) -> &'static [&'static str] {
        &["features", "states", "actions", "rewards"]
    }
}

pub struct GanAdapter {
    core: AdapterCore,
}

impl GanAdapter {
    pub fn boxed(config: ExperimentConfig, entry: RegistryEntry) -> Box<dyn DataAdapter> {
        Box::new(Self { core: AdapterCore::new(config, entry) })
    }
}

impl DataAdapter for GanAdapter {
    fn core(&self) -> &AdapterCore { &self.core }

    fn structured_fields(&self) -> &'static [&'static str] {
        &["features"]
    }
}

pub struct MultiTaskAdapter {
    core: AdapterCore,
}

impl MultiTaskAdapter {
    pub fn boxed(config: ExperimentConfig, entry: RegistryEntry) -> Box<dyn DataAdapter> {
        Box::new(Self { core: AdapterCore::new(config, entry) })
    }
}

impl DataAdapter for MultiTaskAdapter {
    fn core(&self) -> &AdapterCore { &self.core }

    fn structured_fields(&self) -> &'static [&'static str] {
        &["features", "task_labels"]
    }
}
