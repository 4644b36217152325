// ============================================================
// Layer 5 — Inference Engine
// ============================================================
// Scores one live record against a (classifier, preprocessor) pair:
//
//   record ──transform_one──▶ feature row ──classifier──▶ (label, p)
//
// Pure function of its inputs. The pair must come from the same
// retraining run; ArtifactPair guarantees that when it is loaded
// through the artifact store.

use crate::data::preprocessor::FittedPreprocessor;
use crate::domain::error::ModelResult;
use crate::domain::prediction::Prediction;
use crate::domain::record::Record;
use crate::domain::traits::Predictor;
use crate::infra::artifact_store::ArtifactPair;
use crate::ml::model::Classifier;

/// Transform `record` with `preprocessor`, then ask `model` for the
/// positive-class probability.
pub fn predict_one(
    record:       &Record,
    model:        &Classifier,
    preprocessor: &FittedPreprocessor,
) -> ModelResult<Prediction> {
    record.validate()?;
    let features   = preprocessor.transform_one(record)?;
    let prediction = model.predict(&features)?;

    tracing::debug!(
        "Predicted label={} p={:.4}",
        prediction.label,
        prediction.probability
    );
    Ok(prediction)
}

impl Predictor for ArtifactPair {
    fn predict(&self, record: &Record) -> ModelResult<Prediction> {
        predict_one(record, self.model(), self.preprocessor())
    }
}
