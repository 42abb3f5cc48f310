// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction. Parses arguments with
// clap and delegates everything else to Layer 2.
//
// Three commands are supported:
//   1. `train`    — trains a network from config/<mode>/<type>.yaml
//   2. `evaluate` — reports loss and accuracy of a checkpoint
//   3. `predict`  — prints one line per example with the predicted
//                   class(es) and the reasoning steps used
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, EvaluateArgs, PredictArgs, TrainArgs};

use crate::application::train_use_case::RunRequest;

#[derive(Parser, Debug)]
#[command(
    name = "reasoning-trainer",
    version,
    about = "Train, evaluate and query iterative reasoning networks across five learning modes."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route the subcommand to its use case.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)    => run_train(args),
            Commands::Evaluate(args) => run_evaluate(args),
            Commands::Predict(args)  => run_predict(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let request = RunRequest::from(args.config);
    tracing::info!("Starting {} training with '{}'", request.mode, request.config_name);

    let summary = TrainUseCase::from_request(&request)?
        .resume_from(args.resume)
        .execute()?;

    println!("Training finished after {} epoch(s): {:?}", summary.epochs_run, summary.stop_reason);
    if let Some(best) = summary.best {
        println!(
            "Best epoch {}: val_loss={:.4}, val_accuracy={:.4}",
            best.epoch, best.val_loss, best.val_accuracy
        );
    }
    Ok(())
}

fn run_evaluate(args: EvaluateArgs) -> Result<()> {
    use crate::application::evaluate_use_case::EvaluateUseCase;

    let config = RunRequest::from(args.config).load_config()?;
    let report = EvaluateUseCase::new(config, args.checkpoint, args.data).execute()?;

    println!(
        "loss={:.4} accuracy={:.4} samples={} batches={}",
        report.loss, report.accuracy, report.samples, report.batches
    );
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::PredictUseCase;

    let config = RunRequest::from(args.config).load_config()?;
    let examples = PredictUseCase::new(config, args.checkpoint, args.input).execute()?;

    for example in examples {
        println!(
            "{}\t{}\tsteps={}\tconfidence={:.4}",
            example.index,
            example.classes.join(","),
            example.reasoning_steps,
            example.confidence
        );
    }
    Ok(())
}
