// ============================================================
// Layer 2 — Application / Use Cases
// ============================================================
// Coordinates the other layers; holds no ML math and does no
// printing.
//
//   retrain_use_case.rs — one retraining run, CSV to saved pair
//   serving.rs          — the live pair behind predictions, and
//                         the one-job-at-a-time retrain guard

/// The retraining workflow
pub mod retrain_use_case;

/// Current-pair state for inference
pub mod serving;
