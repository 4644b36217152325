// Shared fixtures for unit tests.

use std::path::Path;

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::domain::record::{Record, CATEGORICAL_FEATURES, NUMERIC_FEATURES, TARGET_COLUMN};

const EMPLOYMENT: [&str; 4] = ["full_time", "part_time", "self_employed", "unemployed"];
const MARITAL:    [&str; 3] = ["divorced", "married", "single"];
const DEVICE:     [&str; 3] = ["desktop", "mobile", "tablet"];
const REFERRAL:   [&str; 3] = ["friend_referral", "organic_search", "social_media_ad"];

/// A record that differs from its siblings only in age and employment type.
pub fn record(age: f64, employment_type: &str, completed_filing: Option<u8>) -> Record {
    Record {
        age,
        income:                   50_000.0,
        time_spent_on_platform:   120.0,
        number_of_sessions:       10.0,
        fields_filled_percentage: 75.0,
        employment_type:          employment_type.to_string(),
        marital_status:           "single".to_string(),
        previous_year_filing:     "1".to_string(),
        device_type:              "desktop".to_string(),
        referral_source:          "organic_search".to_string(),
        completed_filing,
    }
}

/// Deterministic labelled records whose target depends mostly on
/// `fields_filled_percentage` and `previous_year_filing`.
pub fn synthetic_records(n: usize, seed: u64) -> Vec<Record> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let fields: f64  = rng.gen_range(0.0..100.0);
            let time: f64    = rng.gen_range(5.0..400.0);
            let previous     = rng.gen_bool(0.6);
            let noise: f64   = rng.gen_range(-1.0..1.0);
            let history = if previous { 0.8 } else { -0.8 };
            let score   = 0.08 * (fields - 50.0) + history + 0.004 * (time - 200.0) + noise;

            Record {
                age:                      rng.gen_range(18..80) as f64,
                income:                   rng.gen_range(10_000.0..120_000.0),
                time_spent_on_platform:   time,
                number_of_sessions:       rng.gen_range(1..40) as f64,
                fields_filled_percentage: fields,
                employment_type:          EMPLOYMENT[rng.gen_range(0..EMPLOYMENT.len())].to_string(),
                marital_status:           MARITAL[rng.gen_range(0..MARITAL.len())].to_string(),
                previous_year_filing:     u8::from(previous).to_string(),
                device_type:              DEVICE[rng.gen_range(0..DEVICE.len())].to_string(),
                referral_source:          REFERRAL[rng.gen_range(0..REFERRAL.len())].to_string(),
                completed_filing:         Some(u8::from(score > 0.0)),
            }
        })
        .collect()
}

/// Write records as a CSV file with the canonical header.
pub fn write_csv(path: &Path, records: &[Record]) {
    let mut writer = csv::Writer::from_path(path).unwrap();

    let mut header: Vec<&str> = NUMERIC_FEATURES.to_vec();
    header.extend(CATEGORICAL_FEATURES);
    header.push(TARGET_COLUMN);
    writer.write_record(&header).unwrap();

    for r in records {
        let mut row: Vec<String> = r.numeric_values().iter().map(|v| v.to_string()).collect();
        row.extend(r.categorical_values().iter().map(|c| c.to_string()));
        row.push(r.completed_filing.map(|l| l.to_string()).unwrap_or_default());
        writer.write_record(&row).unwrap();
    }
    writer.flush().unwrap();
}
