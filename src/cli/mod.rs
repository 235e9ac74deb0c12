// ============================================================
// Layer 1 - CLI / Presentation Layer
// ============================================================
// Parses the command line with clap and hands a TrainConfig to
// Layer 2. This is the only layer that prints to stdout.
//
//   1. `train`    trains on the satellite tiles, then predicts
//   2. `predict`  restores the saved checkpoint and predicts

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::Commands;

use crate::application::train_use_case::{RunReport, TrainConfig, TrainUseCase};

#[derive(Parser, Debug)]
#[command(
    name = "road-segmentation",
    version = "0.1.0",
    about = "Train a patch-level road classifier on satellite images and render its predictions."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Route to the use case; never computes anything itself.
    pub fn run(self) -> Result<()> {
        let config: TrainConfig = match self.command {
            Commands::Train(args)   => args.into(),
            Commands::Predict(args) => args.into(),
        };

        tracing::info!(
            "Data: '{}', checkpoints: '{}'",
            config.data_dir.display(),
            config.train_dir.display()
        );
        let predictions_dir = config.predictions_dir.clone();
        let report = TrainUseCase::new(config).execute()?;
        print_report(&report, &predictions_dir.display().to_string());
        Ok(())
    }
}

fn print_report(report: &RunReport, predictions_dir: &str) {
    match &report.training {
        Some(t) => println!(
            "Training complete: {} epoch(s), {} step(s), final loss {}.",
            t.epochs,
            t.steps,
            t.last_loss.map_or_else(|| "n/a".to_string(), |l| format!("{l:.4}")),
        ),
        None => println!("Model restored from checkpoint."),
    }
    println!("Wrote {} prediction(s) to {}", report.rendered, predictions_dir);
}
