// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Filesystem concerns shared by training and serving:
//
//   artifact_store.rs  — Persisting the (classifier, preprocessor)
//                        pair as one unit. Staged writes, one
//                        rotated backup generation, all-or-nothing
//                        loads.
//
//   prediction_log.rs  — JSON Lines audit log of served
//                        predictions.

/// Paired model/preprocessor persistence with rotation
pub mod artifact_store;

/// Append-only prediction audit log
pub mod prediction_log;
