// ============================================================
// Layer 2 — Model Service
// ============================================================
// The process-wide "current artifact pair" plus the retraining
// discipline around it.
//
//   predict  ─┐  read lock, clone Arc, release ─▶ score on snapshot
//   predict  ─┤  (unlimited concurrency)
//   predict  ─┘
//
//   retrain  ─▶ try_lock(retrain_guard) ── held? ─▶ RetrainInProgress
//                     │
//                     ▼
//               artifact lock file ──────── held? ─▶ RetrainInProgress
//                     │                (other service or process)
//                     ▼
//               full pipeline (readers keep serving the old pair)
//                     │
//                     ▼
//               write lock, replace Arc  (single atomic swap)
//
// A prediction never sees a model from one generation paired with
// a preprocessor from another: both live in one ArtifactPair and
// the Arc is replaced as a whole.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::Serialize;

use crate::application::retrain_use_case::{RetrainConfig, RetrainOutcome, RetrainUseCase};
use crate::data::splitter::PartitionSizes;
use crate::domain::error::{ModelError, ModelResult};
use crate::domain::prediction::Prediction;
use crate::domain::record::Record;
use crate::domain::traits::Predictor;
use crate::infra::artifact_store::{ArtifactPair, ArtifactPaths, ArtifactStore};

/// Outcome of the most recent retraining request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RetrainStatus {
    Idle,
    Running,
    Succeeded {
        sizes:    PartitionSizes,
        /// None when the validation partition was empty.
        accuracy: Option<f64>,
    },
    Failed {
        error: String,
    },
}

pub struct ModelService {
    paths:         ArtifactPaths,
    current:       RwLock<Arc<ArtifactPair>>,
    retrain_guard: Mutex<()>,
    status:        Mutex<RetrainStatus>,
}

impl ModelService {
    /// Load the canonical pair from `paths`. A missing artifact is
    /// returned as `ArtifactNotFound` and the service does not start.
    pub fn start(paths: ArtifactPaths) -> ModelResult<Self> {
        let pair = ArtifactStore::new(paths.clone()).load()?;
        tracing::info!("Model service started from '{}'", paths.model.display());
        Ok(Self::from_pair(paths, pair))
    }

    pub fn from_pair(paths: ArtifactPaths, pair: ArtifactPair) -> Self {
        Self {
            paths,
            current:       RwLock::new(Arc::new(pair)),
            retrain_guard: Mutex::new(()),
            status:        Mutex::new(RetrainStatus::Idle),
        }
    }

    pub fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }

    /// The pair currently being served. Holding the returned Arc keeps
    /// that generation alive even if a swap happens meanwhile.
    pub fn snapshot(&self) -> Arc<ArtifactPair> {
        Arc::clone(&self.current.read())
    }

    pub fn status(&self) -> RetrainStatus {
        self.status.lock().clone()
    }

    /// Re-read the canonical pair from disk and serve it.
    pub fn reload(&self) -> ModelResult<()> {
        let pair = ArtifactStore::new(self.paths.clone()).load()?;
        self.swap(pair);
        tracing::info!("Model service reloaded from '{}'", self.paths.model.display());
        Ok(())
    }

    /// Run a retraining job. Only one runs at a time; a second caller
    /// gets `RetrainInProgress` immediately instead of waiting.
    ///
    /// When the job writes to this service's canonical paths the new
    /// pair is served as soon as it has been saved.
    pub fn retrain(&self, config: RetrainConfig) -> ModelResult<RetrainOutcome> {
        let Some(_guard) = self.retrain_guard.try_lock() else {
            tracing::warn!("Retraining: rejected, another job is still running");
            return Err(ModelError::RetrainInProgress);
        };
        let target  = config.artifact_paths();
        let usecase = RetrainUseCase::new(config);
        let lock = match usecase.lock_artifacts() {
            Ok(lock) => lock,
            Err(ModelError::RetrainInProgress) => return Err(ModelError::RetrainInProgress),
            Err(e) => {
                self.set_status(RetrainStatus::Failed { error: e.to_string() });
                return Err(e);
            }
        };
        self.set_status(RetrainStatus::Running);

        match usecase.execute_locked(&lock) {
            Ok(outcome) => {
                if target == self.paths {
                    self.swap(outcome.pair.clone());
                    tracing::info!("Retraining: now serving the new artifact pair");
                } else {
                    tracing::info!(
                        "Retraining: artifacts written to '{}', serving pair unchanged",
                        target.model.display()
                    );
                }
                self.set_status(RetrainStatus::Succeeded {
                    sizes:    outcome.sizes,
                    accuracy: outcome.report.scored().map(|r| r.accuracy),
                });
                Ok(outcome)
            }
            Err(e) => {
                tracing::error!("Retraining: failed: {e}");
                self.set_status(RetrainStatus::Failed { error: e.to_string() });
                Err(e)
            }
        }
    }

    fn swap(&self, pair: ArtifactPair) {
        *self.current.write() = Arc::new(pair);
    }

    fn set_status(&self, status: RetrainStatus) {
        *self.status.lock() = status;
    }
}

impl Predictor for ModelService {
    fn predict(&self, record: &Record) -> ModelResult<Prediction> {
        self.snapshot().predict(record)
    }
}
