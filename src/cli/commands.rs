// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `evaluate` and
// `predict`, and all their configurable flags.
//
// Every command names a configuration with --mode and --type,
// which resolves to <config-dir>/<mode>/<type>.yaml.
//
// Reference: Rust Book §12 (Building a CLI Program)

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::train_use_case::RunRequest;
use crate::domain::{
    config::{ComputeTarget, ConfigOverrides},
    modes::ModeKind,
};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train a reasoning network with the named configuration
    Train(TrainArgs),

    /// Evaluate a trained checkpoint
    Evaluate(EvaluateArgs),

    /// Predict classes for every example in an input file
    Predict(PredictArgs),
}

/// Selects `<config-dir>/<mode>/<type>.yaml` and its overrides.
#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Learning mode: supervised, unsupervised, reinforcement, gan, multi_task
    #[arg(long)]
    pub mode: ModeKind,

    /// Configuration variant within the mode, e.g. `basic`
    #[arg(long = "type")]
    pub config_type: String,

    /// Root directory of the configuration catalog
    #[arg(long, default_value = "config")]
    pub config_dir: PathBuf,

    /// Samples per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Initial learning rate
    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Number of training epochs
    #[arg(long)]
    pub epochs: Option<usize>,

    /// Hidden width of the reasoning network
    #[arg(long)]
    pub hidden_size: Option<usize>,

    /// Dropout probability
    #[arg(long)]
    pub dropout: Option<f64>,

    /// cpu, wgpu or auto
    #[arg(long)]
    pub device: Option<ComputeTarget>,

    /// Data-loading worker threads
    #[arg(long)]
    pub num_workers: Option<usize>,
}

/// The boundary between Layer 1 and Layer 2: the application
/// layer never sees clap types.
impl From<ConfigArgs> for RunRequest {
    fn from(a: ConfigArgs) -> Self {
        RunRequest {
            mode:        a.mode,
            config_name: a.config_type,
            config_dir:  a.config_dir,
            overrides:   ConfigOverrides {
                batch_size:    a.batch_size,
                learning_rate: a.learning_rate,
                epochs:        a.epochs,
                hidden_size:   a.hidden_size,
                dropout:       a.dropout,
                device:        a.device,
                num_workers:   a.num_workers,
            },
        }
    }
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Resume from a checkpoint directory (or checkpoint root)
    #[arg(long)]
    pub resume: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Checkpoint directory; defaults to checkpoint.dir (best/ first)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,

    /// Dataset to evaluate; defaults to the configured validation data
    #[arg(long)]
    pub data: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Record file (or image) to predict
    #[arg(long)]
    pub input: PathBuf,

    /// Checkpoint directory; defaults to checkpoint.dir (best/ first)
    #[arg(long)]
    pub checkpoint: Option<PathBuf>,
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_flags_become_overrides() {
        let cli = Cli::try_parse_from([
            "reasoning-trainer", "train",
            "--mode", "supervised", "--type", "basic",
            "--epochs", "3", "--device", "cpu",
        ])
        .unwrap();

        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let request = RunRequest::from(args.config);
        assert_eq!(request.mode, ModeKind::Supervised);
        assert_eq!(request.config_name, "basic");
        assert_eq!(request.config_dir, PathBuf::from("config"));
        assert_eq!(request.overrides.epochs, Some(3));
        assert_eq!(request.overrides.device, Some(ComputeTarget::Cpu));
        assert_eq!(request.overrides.batch_size, None);
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result = Cli::try_parse_from([
            "reasoning-trainer", "train", "--mode", "semi", "--type", "basic",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_predict_requires_input() {
        assert!(Cli::try_parse_from([
            "reasoning-trainer", "predict", "--mode", "gan", "--type", "basic",
        ])
        .is_err());
    }
}
