// ============================================================
// Layer 6 — Prediction Log
// ============================================================
// Appends one JSON object per served prediction to a log file
// (JSON Lines), for later auditing of what the model was asked
// and what it answered.
//
// Example line:
//   {"timestamp":1760781234.51,"input_features":{"age":41.0,..},
//    "prediction":1,"probability":0.8731,"processing_time":0.00021}
//
// timestamp is seconds since the Unix epoch; processing_time is
// seconds spent in transform + predict.

use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use serde::{Deserialize, Serialize};

use crate::domain::error::{ModelError, ModelResult};
use crate::domain::prediction::Prediction;
use crate::domain::record::Record;

/// One logged prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionLogEntry {
    pub timestamp:       f64,
    pub input_features:  Record,
    pub prediction:      u8,
    pub probability:     f64,
    pub processing_time: f64,
}

impl PredictionLogEntry {
    pub fn new(record: &Record, prediction: &Prediction, elapsed: Duration) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        Self {
            timestamp,
            input_features:  record.clone(),
            prediction:      prediction.label,
            probability:     prediction.probability,
            processing_time: elapsed.as_secs_f64(),
        }
    }
}

/// Append-only JSON Lines writer.
pub struct PredictionLogger {
    path: PathBuf,
}

impl PredictionLogger {
    /// Creates the parent directory if needed. The file itself is
    /// created on first write.
    pub fn new(path: impl Into<PathBuf>) -> ModelResult<Self> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir).map_err(|e| ModelError::persistence(dir, e))?;
        }
        Ok(Self { path })
    }

    pub fn log(&self, entry: &PredictionLogEntry) -> ModelResult<()> {
        let fail = |e: std::io::Error| ModelError::persistence(&self.path, e);

        let mut line = serde_json::to_string(entry).map_err(|e| ModelError::persistence(&self.path, e))?;
        line.push('\n');

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(fail)?;
        file.write_all(line.as_bytes()).map_err(fail)?;

        tracing::debug!(
            "Logged prediction {} (p={:.4}) to '{}'",
            entry.prediction,
            entry.probability,
            self.path.display()
        );
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::record;

    #[test]
    fn test_appends_one_line_per_prediction() {
        let dir    = tempfile::tempdir().unwrap();
        let logger = PredictionLogger::new(dir.path().join("logs/predictions.jsonl")).unwrap();
        let input  = record(33.0, "salaried", None);

        for p in [0.9, 0.1] {
            let entry = PredictionLogEntry::new(&input, &Prediction::from_probability(p), Duration::from_millis(2));
            logger.log(&entry).unwrap();
        }

        let text = fs::read_to_string(logger.path()).unwrap();
        let entries: Vec<PredictionLogEntry> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].prediction, 1);
        assert_eq!(entries[1].prediction, 0);
        assert_eq!(entries[0].input_features, input);
        assert!((entries[0].processing_time - 0.002).abs() < 1e-9);
    }
}
