// ============================================================
// Layer 3 — Record and Dataset
// ============================================================
// One row of the fixed tax-filing schema:
//
//   numeric      age, income, time_spent_on_platform,
//                number_of_sessions, fields_filled_percentage
//   categorical  employment_type, marital_status,
//                previous_year_filing, device_type, referral_source
//   target       completed_filing (0/1, absent at inference time)
//
// The same struct is used for training rows read from CSV and for
// single inference requests parsed from JSON.

use serde::{Deserialize, Deserializer, Serialize};

use crate::domain::error::{ModelError, ModelResult};

/// Numeric feature columns, in the order the transformer emits them.
pub const NUMERIC_FEATURES: [&str; 5] = [
    "age",
    "income",
    "time_spent_on_platform",
    "number_of_sessions",
    "fields_filled_percentage",
];

/// Categorical feature columns, in the order the transformer emits them.
pub const CATEGORICAL_FEATURES: [&str; 5] = [
    "employment_type",
    "marital_status",
    "previous_year_filing",
    "device_type",
    "referral_source",
];

pub const TARGET_COLUMN: &str = "completed_filing";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub age:                      f64,
    pub income:                   f64,
    pub time_spent_on_platform:   f64,
    pub number_of_sessions:       f64,
    pub fields_filled_percentage: f64,

    #[serde(deserialize_with = "category")]
    pub employment_type:      String,
    #[serde(deserialize_with = "category")]
    pub marital_status:       String,
    #[serde(deserialize_with = "category")]
    pub previous_year_filing: String,
    #[serde(deserialize_with = "category")]
    pub device_type:          String,
    #[serde(deserialize_with = "category")]
    pub referral_source:      String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_filing: Option<u8>,
}

impl Record {
    /// Parse a single inference request.
    ///
    /// Any missing or mistyped feature is reported as a schema error,
    /// never as a parse panic.
    pub fn from_json(json: &str) -> ModelResult<Self> {
        let record: Record = serde_json::from_str(json)
            .map_err(|e| ModelError::schema(format!("invalid record: {e}")))?;
        record.validate()?;
        Ok(record)
    }

    /// Values of the numeric features in `NUMERIC_FEATURES` order.
    pub fn numeric_values(&self) -> [f64; 5] {
        [
            self.age,
            self.income,
            self.time_spent_on_platform,
            self.number_of_sessions,
            self.fields_filled_percentage,
        ]
    }

    /// Values of the categorical features in `CATEGORICAL_FEATURES` order.
    pub fn categorical_values(&self) -> [&str; 5] {
        [
            &self.employment_type,
            &self.marital_status,
            &self.previous_year_filing,
            &self.device_type,
            &self.referral_source,
        ]
    }

    /// Check that all ten features carry a usable value.
    pub fn validate(&self) -> ModelResult<()> {
        for (name, value) in NUMERIC_FEATURES.iter().zip(self.numeric_values()) {
            if !value.is_finite() {
                return Err(ModelError::schema(format!(
                    "numeric feature '{name}' is not a finite number ({value})"
                )));
            }
        }
        for (name, value) in CATEGORICAL_FEATURES.iter().zip(self.categorical_values()) {
            if value.is_empty() {
                return Err(ModelError::schema(format!(
                    "categorical feature '{name}' is empty"
                )));
            }
        }
        if let Some(label) = self.completed_filing {
            if label > 1 {
                return Err(ModelError::schema(format!(
                    "target '{TARGET_COLUMN}' must be 0 or 1, got {label}"
                )));
            }
        }
        Ok(())
    }
}

// Categorical values arrive as strings in CSV, but JSON clients commonly
// send `previous_year_filing` as 0/1 or a boolean.
#[derive(Deserialize)]
#[serde(untagged)]
enum CategoryValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Flag(bool),
}

fn category<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match CategoryValue::deserialize(deserializer)? {
        CategoryValue::Text(s)    => s.trim().to_string(),
        CategoryValue::Integer(i) => i.to_string(),
        CategoryValue::Float(f)   => f.to_string(),
        CategoryValue::Flag(b)    => u8::from(b).to_string(),
    })
}

// ─── Dataset ──────────────────────────────────────────────────────────────────
/// An ordered sequence of records sharing the fixed schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    records: Vec<Record>,
}

impl Dataset {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Target labels for every record.
    ///
    /// Training needs a label on every row; a single unlabelled row is a
    /// schema error rather than being silently dropped.
    pub fn labels(&self) -> ModelResult<Vec<u8>> {
        self.records
            .iter()
            .enumerate()
            .map(|(i, r)| {
                r.completed_filing.ok_or_else(|| {
                    ModelError::schema(format!(
                        "record {i} has no '{TARGET_COLUMN}' value"
                    ))
                })
            })
            .collect()
    }
}

impl From<Vec<Record>> for Dataset {
    fn from(records: Vec<Record>) -> Self {
        Self::new(records)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    const REQUEST: &str = r#"{
        "age": 12,
        "income": 75000.5,
        "employment_type": "full_time",
        "marital_status": "married",
        "time_spent_on_platform": 210.5,
        "number_of_sessions": 22,
        "fields_filled_percentage": 95.2,
        "previous_year_filing": 0,
        "device_type": "desktop",
        "referral_source": "organic_search"
    }"#;

    #[test]
    fn test_parses_request_with_integer_category() {
        let record = Record::from_json(REQUEST).unwrap();
        assert_eq!(record.age, 12.0);
        assert_eq!(record.number_of_sessions, 22.0);
        assert_eq!(record.previous_year_filing, "0");
        assert_eq!(record.completed_filing, None);
    }

    #[test]
    fn test_missing_field_is_schema_error() {
        let err = Record::from_json(r#"{"age": 30, "income": 75000.5}"#).unwrap_err();
        assert!(matches!(err, ModelError::Schema(_)));
    }

    #[test]
    fn test_non_numeric_value_is_schema_error() {
        let bad = REQUEST.replace("\"age\": 12", "\"age\": \"invalid\"");
        let err = Record::from_json(&bad).unwrap_err();
        assert!(matches!(err, ModelError::Schema(_)));
    }

    #[test]
    fn test_boolean_category_becomes_digit() {
        let json = REQUEST.replace("\"previous_year_filing\": 0", "\"previous_year_filing\": true");
        let record = Record::from_json(&json).unwrap();
        assert_eq!(record.previous_year_filing, "1");
    }

    #[test]
    fn test_labels_require_every_row() {
        let mut record = Record::from_json(REQUEST).unwrap();
        record.completed_filing = Some(1);
        let mut unlabelled = record.clone();
        unlabelled.completed_filing = None;

        assert_eq!(Dataset::new(vec![record.clone()]).labels().unwrap(), vec![1]);
        let err = Dataset::new(vec![record, unlabelled]).labels().unwrap_err();
        assert!(matches!(err, ModelError::Schema(_)));
    }
}
