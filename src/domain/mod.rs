// ============================================================
// Layer 3 — Domain Layer
// ============================================================
// Plain Rust types shared by every other layer. Nothing in here
// touches the filesystem or the ML backend.

// Error kinds surfaced by every pipeline stage
pub mod error;

// Record schema and the in-memory dataset
pub mod record;

// Label + probability returned by inference
pub mod prediction;

// DatasetSource / Predictor seams
pub mod traits;
