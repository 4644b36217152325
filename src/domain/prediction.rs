// ============================================================
// Layer 3 — Prediction
// ============================================================
// The answer to one inference request: a hard label and the
// model's probability for the positive class ("completed").

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// 1 when the user is predicted to complete the filing flow.
    #[serde(rename = "prediction")]
    pub label: u8,

    /// Probability of the positive class, always within [0, 1].
    pub probability: f64,
}

impl Prediction {
    /// Decision threshold applied to the positive-class probability.
    pub const THRESHOLD: f64 = 0.5;

    pub fn from_probability(probability: f64) -> Self {
        let probability = probability.clamp(0.0, 1.0);
        let label = u8::from(probability >= Self::THRESHOLD);
        Self { label, probability }
    }
}
