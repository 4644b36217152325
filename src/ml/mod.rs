// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All burn framework code lives here; no other layer imports it.
//
//   model.rs      — LogisticModel (burn Module) and the plain
//                   Classifier extracted from it after fitting
//
//   trainer.rs    — full-batch Adam fit + validation scoring
//
//   evaluation.rs — precision / recall / F1 / support report
//
//   inferencer.rs — transform + predict for a single record
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

/// Logistic regression module and fitted classifier
pub mod model;

/// Training loop with validation report
pub mod trainer;

/// Per-class classification report
pub mod evaluation;

/// Single-record inference
pub mod inferencer;
