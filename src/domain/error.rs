// ============================================================
// Layer 3 — Error Kinds
// ============================================================
// Every stage of the pipeline reports failures through ModelError.
// Stages never translate each other's errors: a SchemaError raised
// while reading the CSV reaches the caller of retrain() as-is.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Result alias used throughout the library layers.
pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    /// The input dataset path does not resolve to a readable file.
    #[error("dataset not found at '{}': {reason}", path.display())]
    DataNotFound { path: PathBuf, reason: String },

    /// Missing or malformed columns in training or inference data.
    #[error("schema error: {0}")]
    Schema(String),

    /// Degenerate training input, e.g. single-class labels.
    #[error("training failed: {0}")]
    Training(String),

    /// Model or preprocessor file missing at load time.
    #[error("artifact not found: '{}'", .0.display())]
    ArtifactNotFound(PathBuf),

    /// Filesystem or encoding failure while writing/reading artifacts.
    #[error("persistence failure at '{}': {reason}", path.display())]
    Persistence { path: PathBuf, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("a retraining job is already running")]
    RetrainInProgress,
}

impl ModelError {
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    pub fn training(msg: impl Into<String>) -> Self {
        Self::Training(msg.into())
    }

    pub fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Persistence {
            path:   path.into(),
            reason: reason.to_string(),
        }
    }

    /// Prepend `location` to the message of a `Schema` or `Training`
    /// error. Other kinds pass through unchanged.
    pub fn prefixed(self, location: impl fmt::Display) -> Self {
        match self {
            Self::Schema(msg)   => Self::Schema(format!("{location}: {msg}")),
            Self::Training(msg) => Self::Training(format!("{location}: {msg}")),
            other => other,
        }
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_not_found_names_path() {
        let err = ModelError::ArtifactNotFound(PathBuf::from("out/preprocessor.json"));
        assert_eq!(err.to_string(), "artifact not found: 'out/preprocessor.json'");
    }

    #[test]
    fn test_persistence_helper() {
        let err = ModelError::persistence("out/model.json", "disk full");
        assert_eq!(err.to_string(), "persistence failure at 'out/model.json': disk full");
    }

    #[test]
    fn test_prefixed_keeps_single_kind_label() {
        let err = ModelError::schema("field 'device_type' is empty").prefixed("line 3");
        assert_eq!(err.to_string(), "schema error: line 3: field 'device_type' is empty");
        assert!(matches!(ModelError::RetrainInProgress.prefixed("x"), ModelError::RetrainInProgress));
    }

    #[test]
    fn test_error_implements_std_error() {
        fn assert_std_error<E: std::error::Error + Send + Sync + 'static>() {}
        assert_std_error::<ModelError>();
    }
}
