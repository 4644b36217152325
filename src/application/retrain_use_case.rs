// ============================================================
// Layer 2 — RetrainUseCase
// ============================================================
// Orchestrates one retraining run, in order:
//
//   Step 1: Validate split ratios        (Layer 4 - data)
//   Step 2: Ingest the labelled CSV      (Layer 4 - data)
//   Step 3: Split train/val/inference    (Layer 4 - data)
//   Step 4: Fit preprocessor on train,
//           transform every partition    (Layer 4 - data)
//   Step 5: Train + evaluate classifier  (Layer 5 - ml)
//   Step 6: Export partitions (optional) (Layer 4 - data)
//   Step 7: Save + rotate artifact pair  (Layer 6 - infra)
//
// Any failure aborts the run before Step 7, so the canonical
// artifacts on disk are only replaced by a complete new pair.
//
// Steps 2-7 run under the artifact store's write lock. A second run
// aimed at the same model path, from this process or another one,
// fails with RetrainInProgress instead of racing the first.

use std::path::PathBuf;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::data::{
    export::{export_partitions, PartitionExport},
    loader::CsvLoader,
    preprocessor::Preprocessor,
    splitter::{split_partitions, PartitionSizes, SplitRatios, DEFAULT_SPLIT_SEED},
};
use crate::domain::error::{ModelError, ModelResult};
use crate::domain::record::Record;
use crate::domain::traits::DatasetSource;
use crate::infra::artifact_store::{ArtifactLock, ArtifactPair, ArtifactPaths, ArtifactStore};
use crate::ml::evaluation::EvaluationReport;
use crate::ml::trainer::{train, TrainerConfig};

// ─── Retraining Configuration ─────────────────────────────────────────────────
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrainConfig {
    pub data_path:         PathBuf,
    pub val_size:          f64,
    pub inference_size:    f64,
    pub model_path:        PathBuf,
    pub preprocessor_path: PathBuf,
    pub seed:              u64,
    pub epochs:            usize,
    pub learning_rate:     f64,
    pub l2_strength:       f64,
    /// Where to dump X_*/y_* partition CSVs; skipped when unset.
    pub export_dir:        Option<PathBuf>,
}

impl Default for RetrainConfig {
    fn default() -> Self {
        let trainer = TrainerConfig::new();
        Self {
            data_path:         PathBuf::from("data/dataset.csv"),
            val_size:          0.2,
            inference_size:    0.05,
            model_path:        PathBuf::from("output_models/model.json"),
            preprocessor_path: PathBuf::from("output_models/preprocessor.json"),
            seed:              DEFAULT_SPLIT_SEED,
            epochs:            trainer.epochs,
            learning_rate:     trainer.learning_rate,
            l2_strength:       trainer.l2_strength,
            export_dir:        None,
        }
    }
}

impl RetrainConfig {
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.model_path, &self.preprocessor_path)
    }

    pub fn trainer_config(&self) -> TrainerConfig {
        TrainerConfig::new()
            .with_epochs(self.epochs)
            .with_learning_rate(self.learning_rate)
            .with_l2_strength(self.l2_strength)
    }
}

/// What a successful run produced.
#[derive(Debug, Clone)]
pub struct RetrainOutcome {
    pub pair:       ArtifactPair,
    pub report:     EvaluationReport,
    pub sizes:      PartitionSizes,
    pub final_loss: f64,
}

// ─── RetrainUseCase ───────────────────────────────────────────────────────────
pub struct RetrainUseCase {
    config: RetrainConfig,
}

impl RetrainUseCase {
    pub fn new(config: RetrainConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RetrainConfig {
        &self.config
    }

    /// Run the whole pipeline on `data_path` and persist the new
    /// artifact pair.
    pub fn execute(&self) -> ModelResult<RetrainOutcome> {
        self.execute_on(&CsvLoader::new(&self.config.data_path))
    }

    /// Same pipeline, reading rows from `source` instead of `data_path`.
    pub fn execute_on(&self, source: &dyn DatasetSource) -> ModelResult<RetrainOutcome> {
        // ── Step 1: Ratios are checked before touching the filesystem ─────────
        let ratios = SplitRatios::new(self.config.val_size, self.config.inference_size)?;
        let lock   = self.lock_artifacts()?;
        self.run(source, ratios, &lock)
    }

    /// Claim this run's artifact paths without starting the pipeline.
    pub fn lock_artifacts(&self) -> ModelResult<ArtifactLock> {
        ArtifactStore::new(self.config.artifact_paths()).lock()
    }

    /// `execute` for a caller already holding `lock_artifacts()`.
    pub fn execute_locked(&self, lock: &ArtifactLock) -> ModelResult<RetrainOutcome> {
        let ratios = SplitRatios::new(self.config.val_size, self.config.inference_size)?;
        self.run(&CsvLoader::new(&self.config.data_path), ratios, lock)
    }

    fn run(&self, source: &dyn DatasetSource, ratios: SplitRatios, lock: &ArtifactLock) -> ModelResult<RetrainOutcome> {
        let cfg     = &self.config;
        let started = Instant::now();

        // ── Step 2: Ingestion ─────────────────────────────────────────────────
        tracing::info!("Retraining: ingesting data from '{}'", source.describe());
        let dataset = source.load()?;
        if dataset.is_empty() {
            return Err(ModelError::training(format!(
                "dataset '{}' has no rows",
                source.describe()
            )));
        }
        let labels = dataset.labels()?;
        tracing::info!("Retraining: ingested {} rows", dataset.len());

        // ── Step 3: Split ─────────────────────────────────────────────────────
        let rows: Vec<(Record, u8)> = dataset.into_records().into_iter().zip(labels).collect();
        let partitions = split_partitions(rows, ratios, cfg.seed);
        let sizes      = partitions.sizes();
        tracing::info!(
            "Retraining: split into {} train, {} validation, {} inference rows",
            sizes.train,
            sizes.validation,
            sizes.inference
        );

        let (train_rows, y_train): (Vec<Record>, Vec<u8>) = partitions.train.into_iter().unzip();
        let (val_rows, y_val): (Vec<Record>, Vec<u8>)     = partitions.validation.into_iter().unzip();
        let (inf_rows, y_inf): (Vec<Record>, Vec<u8>)     = partitions.inference.into_iter().unzip();

        // ── Step 4: Fit on train only, apply everywhere ──────────────────────
        let (x_train, preprocessor) = Preprocessor::new().fit_transform(&train_rows)?;
        let x_val = preprocessor.transform(&val_rows)?;
        let x_inf = preprocessor.transform(&inf_rows)?;

        // ── Step 5: Train + evaluate ──────────────────────────────────────────
        let outcome = train(&x_train, &y_train, &x_val, &y_val, &cfg.trainer_config())?;

        // ── Step 6: Optional partition export ────────────────────────────────
        if let Some(dir) = &cfg.export_dir {
            export_partitions(
                dir,
                &preprocessor.feature_names(),
                &[
                    PartitionExport { name: "train",     features: &x_train, labels: &y_train },
                    PartitionExport { name: "val",       features: &x_val,   labels: &y_val },
                    PartitionExport { name: "inference", features: &x_inf,   labels: &y_inf },
                ],
            )?;
        }

        // ── Step 7: Persist as one unit ───────────────────────────────────────
        let pair = ArtifactPair::new(outcome.classifier, preprocessor)?;
        ArtifactStore::new(cfg.artifact_paths()).save_locked(lock, &pair)?;

        tracing::info!(
            "Retraining: completed in {:.2}s",
            started.elapsed().as_secs_f64()
        );

        Ok(RetrainOutcome {
            pair,
            report: outcome.report,
            sizes,
            final_loss: outcome.final_loss,
        })
    }
}
