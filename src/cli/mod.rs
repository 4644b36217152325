// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Parses arguments with clap and hands off to Layer 2. The only
// place that prints to stdout.

pub mod commands;

use std::fs;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;
use commands::{Commands, PredictArgs, TrainArgs};

use crate::application::{retrain_use_case::RetrainUseCase, serving::ModelService};
use crate::domain::record::Record;
use crate::domain::traits::Predictor;
use crate::infra::artifact_store::ArtifactPaths;
use crate::infra::prediction_log::{PredictionLogEntry, PredictionLogger};

#[derive(Parser, Debug)]
#[command(
    name = "filing-predictor",
    version,
    about = "Retrain and query the tax-filing completion classifier."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Train(args)   => run_train(args),
            Commands::Predict(args) => run_predict(args),
        }
    }
}

fn run_train(args: TrainArgs) -> Result<()> {
    tracing::info!("Retraining: data path '{}'", args.data_path.display());

    let use_case = RetrainUseCase::new(args.into());
    let outcome  = use_case.execute().context("retraining failed")?;

    println!("{}", outcome.report);
    println!(
        "\nModel saved to '{}', preprocessor saved to '{}'.",
        use_case.config().model_path.display(),
        use_case.config().preprocessor_path.display()
    );
    Ok(())
}

fn run_predict(args: PredictArgs) -> Result<()> {
    let json = match (&args.record, &args.record_file) {
        (Some(inline), _) => inline.clone(),
        (None, Some(path)) => fs::read_to_string(path)
            .with_context(|| format!("cannot read record file '{}'", path.display()))?,
        (None, None) => anyhow::bail!("either --record or --record-file is required"),
    };
    let record = Record::from_json(&json)?;

    let service = ModelService::start(ArtifactPaths::new(&args.model_path, &args.preprocessor_path))
        .context("cannot load model artifacts; run `train` first")?;

    let started    = Instant::now();
    let prediction = service.predict(&record)?;
    let elapsed    = started.elapsed();
    tracing::info!(
        "Prediction: {}, probability: {:.4} ({:.3} ms)",
        prediction.label,
        prediction.probability,
        elapsed.as_secs_f64() * 1000.0
    );

    if let Some(path) = &args.prediction_log {
        PredictionLogger::new(path)?.log(&PredictionLogEntry::new(&record, &prediction, elapsed))?;
    }

    println!("{}", serde_json::to_string(&prediction)?);
    Ok(())
}
