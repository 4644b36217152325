// ============================================================
// Layer 4 — Feature Transformer
// ============================================================
// Turns records into a dense numeric matrix the classifier can use.
//
//   numeric features     → standardised: (x - mean) / scale
//   categorical features → one-hot, one column per category seen
//                          while fitting, sorted lexicographically
//
// Output column layout (width = 5 + total category count):
//
//   [ age | income | time | sessions | filled | employment_type_* | ... | referral_source_* ]
//
// Statistics are learned once, by Preprocessor::fit_transform on the
// training partition. FittedPreprocessor::transform only reads them,
// so validation, holdout and live requests all see the exact mapping
// the model was trained against. A category that never appeared in
// training encodes as an all-zero block.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::domain::error::{ModelError, ModelResult};
use crate::domain::record::{Record, CATEGORICAL_FEATURES, NUMERIC_FEATURES};

// ─── FeatureMatrix ────────────────────────────────────────────────────────────
/// Row-major dense matrix of transformed features.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    rows:   usize,
    cols:   usize,
    values: Vec<f64>,
}

impl FeatureMatrix {
    pub fn new(rows: usize, cols: usize, values: Vec<f64>) -> ModelResult<Self> {
        if values.len() != rows * cols {
            return Err(ModelError::schema(format!(
                "matrix of {rows}x{cols} needs {} values, got {}",
                rows * cols,
                values.len()
            )));
        }
        Ok(Self { rows, cols, values })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.values[index * self.cols..(index + 1) * self.cols]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact panics on a zero chunk size.
        self.values.chunks_exact(self.cols.max(1)).take(self.rows)
    }
}

// ─── Fitted state ─────────────────────────────────────────────────────────────
/// Mean/scale pair learned for one numeric column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericScaler {
    pub feature: String,
    pub mean:    f64,
    pub scale:   f64,
}

impl NumericScaler {
    fn fit(feature: &str, column: &[f64]) -> Self {
        if column.is_empty() {
            return Self { feature: feature.to_string(), mean: 0.0, scale: 1.0 };
        }
        let n    = column.len() as f64;
        let mean = column.iter().sum::<f64>() / n;
        let var  = column.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        let std  = var.sqrt();

        // Constant columns keep a unit scale.
        let scale = if std > f64::EPSILON && std.is_finite() { std } else { 1.0 };
        Self { feature: feature.to_string(), mean, scale }
    }

    fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.scale
    }
}

/// Category vocabulary learned for one categorical column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryEncoder {
    pub feature:    String,
    /// Sorted, deduplicated.
    pub categories: Vec<String>,
}

impl CategoryEncoder {
    fn fit<'a>(feature: &str, column: impl Iterator<Item = &'a str>) -> Self {
        let categories: BTreeSet<&str> = column.collect();
        Self {
            feature:    feature.to_string(),
            categories: categories.into_iter().map(str::to_string).collect(),
        }
    }

    /// Column offset of `value` inside this encoder's block.
    fn position(&self, value: &str) -> Option<usize> {
        self.categories
            .binary_search_by(|c| c.as_str().cmp(value))
            .ok()
    }
}

/// Scaling and encoding statistics learned from one training partition.
///
/// Immutable once built; paired 1:1 with the classifier trained on its output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    numeric:     Vec<NumericScaler>,
    categorical: Vec<CategoryEncoder>,
}

impl FittedPreprocessor {
    pub fn numeric(&self) -> &[NumericScaler] {
        &self.numeric
    }

    pub fn categorical(&self) -> &[CategoryEncoder] {
        &self.categorical
    }

    /// Number of columns `transform` produces.
    pub fn output_width(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.categories.len()).sum::<usize>()
    }

    /// Column names in output order, e.g. `num__age`,
    /// `cat__device_type_mobile`.
    pub fn feature_names(&self) -> Vec<String> {
        let numeric = self.numeric.iter().map(|s| format!("num__{}", s.feature));
        let categorical = self.categorical.iter().flat_map(|enc| {
            enc.categories
                .iter()
                .map(move |c| format!("cat__{}_{}", enc.feature, c))
        });
        numeric.chain(categorical).collect()
    }

    /// Check the invariants `transform` relies on: one scaler per numeric
    /// feature and one encoder per categorical feature, in schema order,
    /// finite statistics with a positive scale, and strictly sorted
    /// categories. Fitting always produces a valid preprocessor; this is
    /// for state read back from disk.
    pub fn validate(&self) -> ModelResult<()> {
        let numeric_names: Vec<&str> = self.numeric.iter().map(|s| s.feature.as_str()).collect();
        if numeric_names != NUMERIC_FEATURES {
            return Err(ModelError::schema(format!(
                "numeric scalers {numeric_names:?} do not match features {NUMERIC_FEATURES:?}"
            )));
        }
        let categorical_names: Vec<&str> = self.categorical.iter().map(|e| e.feature.as_str()).collect();
        if categorical_names != CATEGORICAL_FEATURES {
            return Err(ModelError::schema(format!(
                "category encoders {categorical_names:?} do not match features {CATEGORICAL_FEATURES:?}"
            )));
        }

        for scaler in &self.numeric {
            if !scaler.mean.is_finite() || !scaler.scale.is_finite() || scaler.scale <= 0.0 {
                return Err(ModelError::schema(format!(
                    "scaler for '{}' has mean {} and scale {}",
                    scaler.feature, scaler.mean, scaler.scale
                )));
            }
        }
        for encoder in &self.categorical {
            if encoder.categories.windows(2).any(|pair| pair[0] >= pair[1]) {
                return Err(ModelError::schema(format!(
                    "categories for '{}' are not sorted and unique",
                    encoder.feature
                )));
            }
        }
        Ok(())
    }

    /// Apply the learned mapping to any partition without refitting.
    pub fn transform(&self, records: &[Record]) -> ModelResult<FeatureMatrix> {
        let cols = self.output_width();
        let mut values = Vec::with_capacity(records.len() * cols);
        for record in records {
            self.encode_into(record, &mut values)?;
        }
        FeatureMatrix::new(records.len(), cols, values)
    }

    /// Transform a single live record into one feature row.
    pub fn transform_one(&self, record: &Record) -> ModelResult<Vec<f64>> {
        let mut row = Vec::with_capacity(self.output_width());
        self.encode_into(record, &mut row)?;
        Ok(row)
    }

    fn encode_into(&self, record: &Record, out: &mut Vec<f64>) -> ModelResult<()> {
        for (scaler, value) in self.numeric.iter().zip(record.numeric_values()) {
            if !value.is_finite() {
                return Err(ModelError::schema(format!(
                    "numeric feature '{}' is not a finite number ({value})",
                    scaler.feature
                )));
            }
            out.push(scaler.apply(value));
        }

        for (encoder, value) in self.categorical.iter().zip(record.categorical_values()) {
            let start = out.len();
            out.resize(start + encoder.categories.len(), 0.0);
            if let Some(offset) = encoder.position(value) {
                out[start + offset] = 1.0;
            }
        }
        Ok(())
    }
}

// ─── Preprocessor ─────────────────────────────────────────────────────────────
/// Unfitted transformer over the fixed record schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct Preprocessor;

impl Preprocessor {
    pub fn new() -> Self {
        Self
    }

    /// Learn scaling and encoding from `records` and return the
    /// transformed matrix together with the fitted state.
    pub fn fit_transform(
        &self,
        records: &[Record],
    ) -> ModelResult<(FeatureMatrix, FittedPreprocessor)> {
        for (i, record) in records.iter().enumerate() {
            record
                .validate()
                .map_err(|e| e.prefixed(format_args!("training row {i}")))?;
        }

        let numeric = NUMERIC_FEATURES
            .iter()
            .enumerate()
            .map(|(col, name)| {
                let column: Vec<f64> = records.iter().map(|r| r.numeric_values()[col]).collect();
                NumericScaler::fit(name, &column)
            })
            .collect();

        let categorical = CATEGORICAL_FEATURES
            .iter()
            .enumerate()
            .map(|(col, name)| {
                CategoryEncoder::fit(name, records.iter().map(|r| r.categorical_values()[col]))
            })
            .collect();

        let fitted = FittedPreprocessor { numeric, categorical };
        let matrix = fitted.transform(records)?;

        tracing::info!(
            "Preprocessor fitted on {} rows → {} feature columns",
            records.len(),
            fitted.output_width()
        );
        Ok((matrix, fitted))
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{record, synthetic_records};

    #[test]
    fn test_standardises_numeric_columns() {
        let rows = vec![
            record(20.0, "full_time", Some(1)),
            record(40.0, "part_time", Some(0)),
        ];
        let (matrix, fitted) = Preprocessor::new().fit_transform(&rows).unwrap();

        let age = &fitted.numeric()[0];
        assert_eq!(age.mean, 30.0);
        assert_eq!(age.scale, 10.0);
        assert_eq!(matrix.row(0)[0], -1.0);
        assert_eq!(matrix.row(1)[0], 1.0);
    }

    #[test]
    fn test_constant_column_uses_unit_scale() {
        let rows = vec![
            record(30.0, "full_time", Some(1)),
            record(30.0, "full_time", Some(0)),
        ];
        let (matrix, fitted) = Preprocessor::new().fit_transform(&rows).unwrap();
        assert_eq!(fitted.numeric()[0].scale, 1.0);
        assert!(matrix.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_one_hot_columns_are_sorted() {
        let rows = vec![
            record(30.0, "unemployed", Some(1)),
            record(31.0, "full_time", Some(0)),
            record(32.0, "part_time", Some(0)),
        ];
        let (matrix, fitted) = Preprocessor::new().fit_transform(&rows).unwrap();

        let employment = &fitted.categorical()[0];
        assert_eq!(employment.categories, vec!["full_time", "part_time", "unemployed"]);
        // row 0 is "unemployed" → third indicator of the first block
        assert_eq!(&matrix.row(0)[5..8], &[0.0, 0.0, 1.0]);

        let names = fitted.feature_names();
        assert_eq!(names.len(), fitted.output_width());
        assert_eq!(names[0], "num__age");
        assert_eq!(names[5], "cat__employment_type_full_time");
    }

    #[test]
    fn test_transform_is_repeatable() {
        let rows = synthetic_records(200, 3);
        let (train_matrix, fitted) = Preprocessor::new().fit_transform(&rows).unwrap();
        let snapshot = fitted.clone();

        let first  = fitted.transform(&rows).unwrap();
        let second = fitted.transform(&rows).unwrap();

        assert_eq!(first, train_matrix);
        assert_eq!(first, second);
        assert_eq!(fitted, snapshot);
    }

    #[test]
    fn test_unseen_category_encodes_as_zero_block() {
        let rows = synthetic_records(100, 5);
        let (_, fitted) = Preprocessor::new().fit_transform(&rows).unwrap();

        let mut live = rows[0].clone();
        live.employment_type = "gig_worker".to_string();
        let encoded = fitted.transform_one(&live).unwrap();

        let width = fitted.categorical()[0].categories.len();
        assert_eq!(encoded.len(), fitted.output_width());
        assert!(encoded[5..5 + width].iter().all(|v| *v == 0.0));
        // the other blocks still carry exactly one indicator each
        let ones = encoded[5..].iter().filter(|v| **v == 1.0).count();
        assert_eq!(ones, CATEGORICAL_FEATURES.len() - 1);
    }

    #[test]
    fn test_non_finite_numeric_is_schema_error() {
        let rows = synthetic_records(20, 1);
        let (_, fitted) = Preprocessor::new().fit_transform(&rows).unwrap();

        let mut bad = rows[0].clone();
        bad.income = f64::NAN;
        let err = fitted.transform(&[bad]).unwrap_err();
        assert!(matches!(err, ModelError::Schema(_)));
    }

    #[test]
    fn test_empty_partition_transforms_to_empty_matrix() {
        let rows = synthetic_records(20, 1);
        let (_, fitted) = Preprocessor::new().fit_transform(&rows).unwrap();
        let matrix = fitted.transform(&[]).unwrap();
        assert!(matrix.is_empty());
        assert_eq!(matrix.cols(), fitted.output_width());
        assert_eq!(matrix.iter_rows().count(), 0);
    }

    #[test]
    fn test_fitted_preprocessor_is_valid() {
        let (_, fitted) = Preprocessor::new().fit_transform(&synthetic_records(30, 6)).unwrap();
        fitted.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_broken_state() {
        let (_, fitted) = Preprocessor::new().fit_transform(&synthetic_records(30, 6)).unwrap();

        let mut unsorted = fitted.clone();
        unsorted.categorical[0].categories.reverse();
        assert!(matches!(unsorted.validate(), Err(ModelError::Schema(_))));

        let mut zero_scale = fitted.clone();
        zero_scale.numeric[2].scale = 0.0;
        assert!(matches!(zero_scale.validate(), Err(ModelError::Schema(_))));

        let mut short = fitted.clone();
        short.numeric.pop();
        assert!(matches!(short.validate(), Err(ModelError::Schema(_))));

        let mut extra = fitted;
        let copy = extra.categorical[0].clone();
        extra.categorical.push(copy);
        assert!(matches!(extra.validate(), Err(ModelError::Schema(_))));
    }

    #[test]
    fn test_invalid_training_row_message_is_not_doubled() {
        let mut rows = synthetic_records(5, 1);
        rows[3].marital_status = String::new();
        let err = Preprocessor::new().fit_transform(&rows).unwrap_err().to_string();
        assert_eq!(err.matches("schema error").count(), 1, "{err}");
        assert!(err.contains("training row 3"), "{err}");
    }
}
