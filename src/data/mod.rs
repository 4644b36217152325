// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// From a CSV on disk to model-ready feature matrices:
//
//   dataset.csv
//       │
//       ▼
//   CsvLoader          → Dataset of typed Records
//       │
//       ▼
//   split_partitions   → train / validation / inference
//       │
//       ▼
//   Preprocessor       → fit on train, FittedPreprocessor
//       │                 transforms every partition
//       ▼
//   FeatureMatrix      → handed to the ml layer
//
// export.rs optionally dumps the transformed partitions.

/// Reads the tabular dataset from disk
pub mod loader;

/// Deterministic three-way split
pub mod splitter;

/// Standardisation + one-hot encoding
pub mod preprocessor;

/// CSV dump of transformed partitions
pub mod export;
