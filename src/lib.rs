#![recursion_limit = "256"]

// ============================================================
// filing-predictor
// ============================================================
// Predicts whether a user will complete the tax-filing flow,
// and retrains that classifier against a fresh labelled CSV.
//
// Layers (same numbering is used in every module header):
//   1. cli          — command line surface
//   2. application  — retraining pipeline + serving state
//   3. domain       — records, dataset, error kinds
//   4. data         — reader, splitter, feature transformer
//   5. ml           — logistic model, trainer, inference
//   6. infra        — artifact store, prediction log

pub mod cli;
pub mod application;
pub mod domain;
pub mod data;
pub mod ml;
pub mod infra;

#[cfg(test)]
pub(crate) mod testing;

pub use domain::error::{ModelError, ModelResult};
pub use domain::record::{Dataset, Record};
