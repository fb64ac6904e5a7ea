// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `train`   — trains the regressor on image samples
//   2. `predict` — loads a checkpoint and predicts
//   3. `summary` — prints shapes and parameter counts for a config

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, OutputFormat, PredictArgs, SummaryArgs, TrainArgs};

#[derive(Parser, Debug)]
#[command(
    name = "vit-regressor",
    version = "0.1.0",
    about = "Train a Vision Transformer to regress values from multi-channel images."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. Routing only.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
            Commands::Summary(args) => run_summary(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    match &args.data {
        Some(path) => tracing::info!("Starting training on samples in: {}", path),
        None => tracing::info!(
            "No --data given, training on {} synthetic samples",
            args.synthetic_samples
        ),
    }

    let checkpoint_dir = args.checkpoint_dir.clone();
    let report = TrainUseCase::new(args.into()).execute()?;

    match report.best_epoch {
        Some(epoch) => println!(
            "Training complete. Best epoch {} saved under '{}'.",
            epoch, checkpoint_dir
        ),
        None => println!(
            "Training complete. {} epoch(s) saved under '{}'.",
            report.epochs.len(),
            checkpoint_dir
        ),
    }
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    use crate::application::predict_use_case::{mean_absolute_error, PredictUseCase};

    let use_case    = PredictUseCase::new(&args.checkpoint_dir, args.epoch)?;
    let predictions = use_case.run(&args.input)?;
    let mae         = mean_absolute_error(&predictions);

    match args.format {
        OutputFormat::Json => {
            let body = serde_json::json!({
                "predictions": predictions,
                "mae": mae,
            });
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        OutputFormat::Text => {
            for p in &predictions {
                match &p.target {
                    Some(t) => println!("#{:<5} prediction {:?}  target {:?}", p.index, p.prediction, t),
                    None    => println!("#{:<5} prediction {:?}", p.index, p.prediction),
                }
            }
            if let Some(mae) = mae {
                println!("\nMAE over labelled samples: {:.6}", mae);
            }
        }
    }
    Ok(())
}

fn run_summary(args: SummaryArgs) -> Result<()> {
    use crate::ml::{summary::ModelSummary, vit::ViTConfig};

    let config: ViTConfig = args.model.into();
    let summary = ModelSummary::from_config(&config)?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => print!("{}", summary.display()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::domain::shape::Dims2;
    use crate::ml::vit::Pooling;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["vit-regressor", "train"]).unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.image_shape, Dims2::new(160, 106));
        assert_eq!(cfg.patch_shape, Dims2::new(32, 53));
        assert_eq!(cfg.pooling, Pooling::Mean);
        assert!(cfg.data_path.is_none());
    }

    #[test]
    fn test_train_shape_and_pooling_flags() {
        let cli = Cli::try_parse_from([
            "vit-regressor", "train",
            "--image-shape", "(8, 6)",
            "--patch-shape", "4x3",
            "--pooling", "cls",
            "--data", "samples.jsonl",
        ])
        .unwrap();
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.image_shape, Dims2::new(8, 6));
        assert_eq!(cfg.patch_shape, Dims2::new(4, 3));
        assert_eq!(cfg.pooling, Pooling::Cls);
        assert_eq!(cfg.data_path.as_deref(), Some("samples.jsonl"));
    }

    #[test]
    fn test_bad_shape_is_a_parse_error() {
        let res = Cli::try_parse_from(["vit-regressor", "summary", "--image-shape", "tall"]);
        assert!(res.is_err());
    }

    #[test]
    fn test_predict_requires_input() {
        assert!(Cli::try_parse_from(["vit-regressor", "predict"]).is_err());
        let cli = Cli::try_parse_from([
            "vit-regressor", "predict", "--input", "x.jsonl", "--epoch", "3", "--format", "json",
        ])
        .unwrap();
        let Commands::Predict(args) = cli.command else { panic!("expected predict") };
        assert_eq!(args.epoch, Some(3));
        assert_eq!(args.format, OutputFormat::Json);
    }
}
