// ============================================================
// Layer 4 — Dataset Reader
// ============================================================
// Reads a delimited file with a header row into a Dataset.
//
// Columns are located by header name, so the file may order them
// freely and carry extra columns. Every feature column must be
// present; the target column is optional here and only required
// later, when the retraining pipeline asks for labels.
//
// Failure modes:
//   - path missing / unreadable          → DataNotFound
//   - required column absent             → Schema
//   - unparseable or empty feature cell  → Schema (with line number)

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use csv::{ReaderBuilder, StringRecord, Trim};

use crate::domain::error::{ModelError, ModelResult};
use crate::domain::record::{
    Dataset, Record, CATEGORICAL_FEATURES, NUMERIC_FEATURES, TARGET_COLUMN,
};
use crate::domain::traits::DatasetSource;

/// Loads a Dataset from a CSV file on disk.
pub struct CsvLoader {
    path: PathBuf,
}

impl CsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DatasetSource for CsvLoader {
    fn load(&self) -> ModelResult<Dataset> {
        read_dataset(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Read every row of `path` into a Dataset.
pub fn read_dataset(path: &Path) -> ModelResult<Dataset> {
    let not_found = |reason: String| ModelError::DataNotFound {
        path: path.to_path_buf(),
        reason,
    };

    if !path.is_file() {
        return Err(not_found("no such file".to_string()));
    }
    let file = File::open(path).map_err(|e| not_found(e.to_string()))?;

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .from_reader(BufReader::new(file));

    let headers = reader
        .headers()
        .map_err(|e| ModelError::schema(format!("cannot read header row: {e}")))?
        .clone();
    let columns = ColumnIndex::locate(&headers)?;

    let mut records = Vec::new();
    for (i, row) in reader.records().enumerate() {
        // Header is line 1.
        let line = i + 2;
        let row = row.map_err(|e| {
            if e.is_io_error() {
                not_found(e.to_string())
            } else {
                ModelError::schema(format!("line {line}: {e}"))
            }
        })?;
        records.push(columns.parse_row(&row, line)?);
    }

    tracing::debug!("Read {} rows from '{}'", records.len(), path.display());
    Ok(Dataset::new(records))
}

// ─── Column lookup ────────────────────────────────────────────────────────────
/// Positions of the schema columns inside one particular file.
struct ColumnIndex {
    numeric:     [usize; 5],
    categorical: [usize; 5],
    target:      Option<usize>,
}

impl ColumnIndex {
    fn locate(headers: &StringRecord) -> ModelResult<Self> {
        let position = |name: &str| headers.iter().position(|h| h == name);

        let missing: Vec<&str> = NUMERIC_FEATURES
            .iter()
            .chain(CATEGORICAL_FEATURES.iter())
            .copied()
            .filter(|name| position(name).is_none())
            .collect();
        if !missing.is_empty() {
            return Err(ModelError::schema(format!(
                "missing required columns: {}",
                missing.join(", ")
            )));
        }

        // Every name was found above.
        let numeric     = NUMERIC_FEATURES.map(|name| position(name).unwrap_or_default());
        let categorical = CATEGORICAL_FEATURES.map(|name| position(name).unwrap_or_default());

        Ok(Self {
            numeric,
            categorical,
            target: position(TARGET_COLUMN),
        })
    }

    fn parse_row(&self, row: &StringRecord, line: usize) -> ModelResult<Record> {
        let cell = |idx: usize| row.get(idx).unwrap_or("");

        let mut numeric = [0.0f64; 5];
        for (slot, (&idx, name)) in numeric
            .iter_mut()
            .zip(self.numeric.iter().zip(NUMERIC_FEATURES))
        {
            let raw = cell(idx);
            *slot = raw.parse::<f64>().map_err(|_| {
                ModelError::schema(format!(
                    "line {line}: column '{name}' is not numeric ('{raw}')"
                ))
            })?;
        }

        let categorical = self.categorical.map(|idx| cell(idx).to_string());

        let completed_filing = match self.target {
            Some(idx) => parse_target(cell(idx), line)?,
            None => None,
        };

        let [age, income, time_spent_on_platform, number_of_sessions, fields_filled_percentage] =
            numeric;
        let [employment_type, marital_status, previous_year_filing, device_type, referral_source] =
            categorical;

        let record = Record {
            age,
            income,
            time_spent_on_platform,
            number_of_sessions,
            fields_filled_percentage,
            employment_type,
            marital_status,
            previous_year_filing,
            device_type,
            referral_source,
            completed_filing,
        };
        record
            .validate()
            .map_err(|e| e.prefixed(format_args!("line {line}")))?;
        Ok(record)
    }
}

/// Empty target cells are unlabelled rows; anything else must be 0 or 1.
fn parse_target(raw: &str, line: usize) -> ModelResult<Option<u8>> {
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(v) if v == 0.0 => Ok(Some(0)),
        Ok(v) if v == 1.0 => Ok(Some(1)),
        _ => Err(ModelError::schema(format!(
            "line {line}: column '{TARGET_COLUMN}' must be 0 or 1 ('{raw}')"
        ))),
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const HEADER: &str = "age,income,employment_type,marital_status,time_spent_on_platform,\
number_of_sessions,fields_filled_percentage,previous_year_filing,device_type,referral_source,\
completed_filing";

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("dataset.csv");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn test_reads_rows_in_order() {
        let dir  = tempfile::tempdir().unwrap();
        let body = format!(
            "{HEADER}\n\
             34,52000.0,full_time,married,120.5,12,88.0,1,desktop,organic_search,1\n\
             22,18000.0,part_time,single,15.0,2,10.5,0,mobile,social_media_ad,0\n"
        );
        let dataset = CsvLoader::new(write(&dir, &body)).load().unwrap();

        assert_eq!(dataset.len(), 2);
        let first = &dataset.records()[0];
        assert_eq!(first.age, 34.0);
        assert_eq!(first.employment_type, "full_time");
        assert_eq!(first.previous_year_filing, "1");
        assert_eq!(dataset.labels().unwrap(), vec![1, 0]);
    }

    #[test]
    fn test_columns_may_be_reordered_and_target_omitted() {
        let dir  = tempfile::tempdir().unwrap();
        let body = "referral_source,device_type,previous_year_filing,fields_filled_percentage,\
number_of_sessions,time_spent_on_platform,marital_status,employment_type,income,age,extra\n\
friend_referral,tablet,0,50,3,40,divorced,unemployed,0,61,ignored\n";
        let dataset = read_dataset(&write(&dir, body)).unwrap();

        let record = &dataset.records()[0];
        assert_eq!(record.age, 61.0);
        assert_eq!(record.referral_source, "friend_referral");
        assert_eq!(record.completed_filing, None);
    }

    #[test]
    fn test_missing_file_is_data_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_dataset(&dir.path().join("absent.csv")).unwrap_err();
        assert!(matches!(err, ModelError::DataNotFound { .. }));
    }

    #[test]
    fn test_directory_is_data_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_dataset(dir.path()).unwrap_err();
        assert!(matches!(err, ModelError::DataNotFound { .. }));
    }

    #[test]
    fn test_missing_columns_are_listed() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_dataset(&write(&dir, "age,income\n30,1000\n")).unwrap_err();
        match err {
            ModelError::Schema(msg) => {
                assert!(msg.contains("employment_type"));
                assert!(msg.contains("referral_source"));
                assert!(!msg.contains("income,"));
            }
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_numeric_cell_reports_line() {
        let dir  = tempfile::tempdir().unwrap();
        let body = format!(
            "{HEADER}\n\
             34,52000.0,full_time,married,120.5,12,88.0,1,desktop,organic_search,1\n\
             abc,18000.0,part_time,single,15.0,2,10.5,0,mobile,social_media_ad,0\n"
        );
        let err = read_dataset(&write(&dir, &body)).unwrap_err();
        match err {
            ModelError::Schema(msg) => assert!(msg.contains("line 3"), "{msg}"),
            other => panic!("expected schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_target_outside_binary_is_rejected() {
        let dir  = tempfile::tempdir().unwrap();
        let body = format!(
            "{HEADER}\n34,52000.0,full_time,married,120.5,12,88.0,1,desktop,organic_search,2\n"
        );
        let err = read_dataset(&write(&dir, &body)).unwrap_err();
        assert!(matches!(err, ModelError::Schema(_)));
    }

    #[test]
    fn test_empty_category_message_names_line_once() {
        let dir  = tempfile::tempdir().unwrap();
        let body = format!(
            "{HEADER}\n34,52000.0,full_time,married,120.5,12,88.0,1,,organic_search,1\n"
        );
        let err = read_dataset(&write(&dir, &body)).unwrap_err().to_string();
        assert_eq!(err.matches("schema error").count(), 1, "{err}");
        assert!(err.contains("line 2"), "{err}");
        assert!(err.contains("device_type"), "{err}");
    }
}
