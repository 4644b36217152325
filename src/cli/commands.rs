// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Two subcommands:
//   train    — run one retraining job and print the report
//   predict  — score one JSON record against the saved pair
//
// Defaults mirror RetrainConfig::default().

use std::path::PathBuf;

use clap::{Args, Subcommand};

use crate::application::retrain_use_case::RetrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Retrain the classifier on a labelled CSV and save the artifact pair
    Train(TrainArgs),

    /// Predict filing completion for one record
    Predict(PredictArgs),
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Labelled CSV with the ten feature columns and completed_filing
    #[arg(long, default_value = "data/dataset.csv")]
    pub data_path: PathBuf,

    /// Share of rows held out from training (validation + inference)
    #[arg(long, default_value_t = 0.2)]
    pub val_size: f64,

    /// Share of the held-out rows reserved for the inference partition
    #[arg(long, default_value_t = 0.05)]
    pub inference_size: f64,

    #[arg(long, default_value = "output_models/model.json")]
    pub model_path: PathBuf,

    #[arg(long, default_value = "output_models/preprocessor.json")]
    pub preprocessor_path: PathBuf,

    /// Shuffle seed for the split
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 300)]
    pub epochs: usize,

    #[arg(long, default_value_t = 0.05)]
    pub learning_rate: f64,

    /// L2 penalty strength, 0 disables it
    #[arg(long, default_value_t = 1.0)]
    pub l2_strength: f64,

    /// Also write the transformed X_*/y_* partitions here
    #[arg(long)]
    pub export_dir: Option<PathBuf>,
}

impl From<TrainArgs> for RetrainConfig {
    fn from(a: TrainArgs) -> Self {
        RetrainConfig {
            data_path:         a.data_path,
            val_size:          a.val_size,
            inference_size:    a.inference_size,
            model_path:        a.model_path,
            preprocessor_path: a.preprocessor_path,
            seed:              a.seed,
            epochs:            a.epochs,
            learning_rate:     a.learning_rate,
            l2_strength:       a.l2_strength,
            export_dir:        a.export_dir,
        }
    }
}

#[derive(Args, Debug)]
pub struct PredictArgs {
    /// The record as inline JSON
    #[arg(long, conflicts_with = "record_file", required_unless_present = "record_file")]
    pub record: Option<String>,

    /// A file holding the record as JSON
    #[arg(long)]
    pub record_file: Option<PathBuf>,

    #[arg(long, default_value = "output_models/model.json")]
    pub model_path: PathBuf,

    #[arg(long, default_value = "output_models/preprocessor.json")]
    pub preprocessor_path: PathBuf,

    /// Append each prediction as a JSON line to this file
    #[arg(long)]
    pub prediction_log: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    #[test]
    fn test_train_defaults_match_config_defaults() {
        let cli = Cli::try_parse_from(["filing-predictor", "train"]).unwrap();
        let Commands::Train(args) = cli.command else {
            panic!("expected train");
        };
        assert_eq!(RetrainConfig::from(args), RetrainConfig::default());
    }

    #[test]
    fn test_predict_needs_exactly_one_record_source() {
        assert!(Cli::try_parse_from(["filing-predictor", "predict"]).is_err());
        assert!(Cli::try_parse_from([
            "filing-predictor", "predict", "--record", "{}", "--record-file", "r.json",
        ])
        .is_err());
        assert!(Cli::try_parse_from(["filing-predictor", "predict", "--record-file", "r.json"]).is_ok());
    }
}
