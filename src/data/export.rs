// ============================================================
// Layer 4 — Partition Export
// ============================================================
// Writes the transformed partitions of a retraining run to CSV so
// they can be inspected or reused outside the service:
//
//   <dir>/X_train.csv      header = preprocessor feature names
//   <dir>/y_train.csv      header = completed_filing
//   (same for val and inference)

use std::{fs, path::Path};

use crate::data::preprocessor::FeatureMatrix;
use crate::domain::error::{ModelError, ModelResult};
use crate::domain::record::TARGET_COLUMN;

/// One named partition to export.
pub struct PartitionExport<'a> {
    pub name:     &'a str,
    pub features: &'a FeatureMatrix,
    pub labels:   &'a [u8],
}

pub fn export_partitions(
    dir:           &Path,
    feature_names: &[String],
    partitions:    &[PartitionExport<'_>],
) -> ModelResult<()> {
    fs::create_dir_all(dir).map_err(|e| ModelError::persistence(dir, e))?;

    for part in partitions {
        let x_path = dir.join(format!("X_{}.csv", part.name));
        write_features(&x_path, feature_names, part.features)?;

        let y_path = dir.join(format!("y_{}.csv", part.name));
        write_labels(&y_path, part.labels)?;

        tracing::debug!("Exported partition '{}' ({} rows)", part.name, part.features.rows());
    }

    tracing::info!("Exported {} partitions to '{}'", partitions.len(), dir.display());
    Ok(())
}

fn write_features(path: &Path, names: &[String], matrix: &FeatureMatrix) -> ModelResult<()> {
    let fail = |e: csv::Error| ModelError::persistence(path, e);
    let mut writer = csv::Writer::from_path(path).map_err(fail)?;

    writer.write_record(names).map_err(fail)?;
    for row in matrix.iter_rows() {
        writer
            .write_record(row.iter().map(|v| v.to_string()))
            .map_err(fail)?;
    }
    writer.flush().map_err(|e| ModelError::persistence(path, e))
}

fn write_labels(path: &Path, labels: &[u8]) -> ModelResult<()> {
    let fail = |e: csv::Error| ModelError::persistence(path, e);
    let mut writer = csv::Writer::from_path(path).map_err(fail)?;

    writer.write_record([TARGET_COLUMN]).map_err(fail)?;
    for label in labels {
        writer.write_record([label.to_string()]).map_err(fail)?;
    }
    writer.flush().map_err(|e| ModelError::persistence(path, e))
}
