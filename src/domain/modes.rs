// ============================================================
// Layer 3 — Learning Modes and Data Kinds
// ============================================================
// Closed enums for the five learning paradigms and the kinds of
// data they can consume. The registry in the data layer maps a
// (ModeKind, DataKind) pair onto a concrete DatasetKind and
// adapter constructor.
//
// Data kind inference from a file extension:
//   .txt .json .jsonl .csv  → text
//   .png .jpg .jpeg         → image
//   anything else           → text (documented fallback)

use std::{fmt, path::Path, str::FromStr};

use serde::{Deserialize, Serialize};

// ─── ModeKind ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModeKind {
    Supervised,
    Unsupervised,
    Reinforcement,
    Gan,
    MultiTask,
}

impl ModeKind {
    pub const ALL: [ModeKind; 5] = [
        ModeKind::Supervised,
        ModeKind::Unsupervised,
        ModeKind::Reinforcement,
        ModeKind::Gan,
        ModeKind::MultiTask,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ModeKind::Supervised    => "supervised",
            ModeKind::Unsupervised  => "unsupervised",
            ModeKind::Reinforcement => "reinforcement",
            ModeKind::Gan           => "gan",
            ModeKind::MultiTask     => "multi_task",
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModeKind::ALL
            .into_iter()
            .find(|m| m.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| {
                let names: Vec<&str> = ModeKind::ALL.iter().map(|m| m.as_str()).collect();
                format!("unknown mode '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

// ─── DataKind ─────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataKind {
    Text,
    Image,
    Tabular,
    Sequence,
    Memory,
    MultiModal,
}

impl DataKind {
    pub fn as_str(self) -> &'static str {
        match self {
            DataKind::Text       => "text",
            DataKind::Image      => "image",
            DataKind::Tabular    => "tabular",
            DataKind::Sequence   => "sequence",
            DataKind::Memory     => "memory",
            DataKind::MultiModal => "multi_modal",
        }
    }

    /// Infer the data kind from a path's extension.
    pub fn infer(path: &Path) -> DataKind {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "png" | "jpg" | "jpeg" => DataKind::Image,
            _                      => DataKind::Text,
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── DatasetKind ──────────────────────────────────────────────────────────────
/// The concrete dataset a registry entry loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetKind {
    TextClassification,
    ImageClassification,
    Tabular,
    TextClustering,
    ImageClustering,
    RlEnvironment,
    ReplayBuffer,
    ImageGeneration,
    TextGeneration,
    MultiTask,
}

/// How a dataset presents its inputs to the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputForm {
    Tokens,
    Features,
}

impl DatasetKind {
    pub fn input_form(self) -> InputForm {
        match self {
            DatasetKind::TextClassification | DatasetKind::TextClustering => InputForm::Tokens,
            _ => InputForm::Features,
        }
    }

    /// Whether `label` indexes the output layer (a class or an action).
    /// Clustering labels are ground truth for purity and generation
    /// datasets ignore them.
    pub fn labels_are_classes(self) -> bool {
        matches!(
            self,
            DatasetKind::TextClassification
                | DatasetKind::ImageClassification
                | DatasetKind::Tabular
                | DatasetKind::RlEnvironment
                | DatasetKind::ReplayBuffer
        )
    }

    pub fn is_image(self) -> bool {
        matches!(
            self,
            DatasetKind::ImageClassification
                | DatasetKind::ImageClustering
                | DatasetKind::ImageGeneration
        )
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_data_kind_from_extension() {
        assert_eq!(DataKind::infer(Path::new("data/train.json")), DataKind::Text);
        assert_eq!(DataKind::infer(Path::new("data/train.csv")),  DataKind::Text);
        assert_eq!(DataKind::infer(Path::new("digits/7.PNG")),    DataKind::Image);
        assert_eq!(DataKind::infer(Path::new("digits/7.jpeg")),   DataKind::Image);
    }

    #[test]
    fn test_unknown_extension_falls_back_to_text() {
        assert_eq!(DataKind::infer(Path::new("data/blob.parquet")), DataKind::Text);
        assert_eq!(DataKind::infer(Path::new("no_extension")),      DataKind::Text);
    }

    #[test]
    fn test_mode_parses_from_cli_names() {
        assert_eq!("multi_task".parse::<ModeKind>(), Ok(ModeKind::MultiTask));
        assert_eq!("GAN".parse::<ModeKind>(),        Ok(ModeKind::Gan));
        assert!("semi_supervised".parse::<ModeKind>().is_err());
    }

    #[test]
    fn test_token_datasets_use_token_form() {
        assert_eq!(DatasetKind::TextClassification.input_form(), InputForm::Tokens);
        assert_eq!(DatasetKind::TextGeneration.input_form(),     InputForm::Features);
        assert!(DatasetKind::ImageGeneration.is_image());
    }
}
