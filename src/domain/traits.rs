// ============================================================
// Layer 3 — Core Traits
// ============================================================
// Seams between the application layer and the concrete data
// sources / predictors. The retraining pipeline only sees a
// DatasetSource; request handlers only see a Predictor.

use crate::domain::error::ModelResult;
use crate::domain::prediction::Prediction;
use crate::domain::record::{Dataset, Record};

// ─── DatasetSource ────────────────────────────────────────────────────────────
/// Anything that can produce a labelled dataset for retraining.
///
/// Implementations:
///   - CsvLoader → reads a delimited file from disk
///   - Dataset   → an already materialised in-memory table
pub trait DatasetSource {
    fn load(&self) -> ModelResult<Dataset>;

    /// Human-readable origin, used in log lines.
    fn describe(&self) -> String;
}

impl DatasetSource for Dataset {
    fn load(&self) -> ModelResult<Dataset> {
        Ok(self.clone())
    }

    fn describe(&self) -> String {
        format!("in-memory dataset ({} rows)", self.len())
    }
}

// ─── Predictor ────────────────────────────────────────────────────────────────
/// Anything that can score a single record.
///
/// Implementations:
///   - ArtifactPair → a loaded (model, preprocessor) pair
///   - ModelService → the process-wide current pair
pub trait Predictor {
    fn predict(&self, record: &Record) -> ModelResult<Prediction>;
}
