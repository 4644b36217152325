// ============================================================
// Layer 5 — Logistic Model
// ============================================================
// Binary logistic regression expressed as a single burn Linear
// layer: logit = x·w + b, probability = sigmoid(logit).
//
// Two representations:
//   LogisticModel<B> — burn Module, used while fitting (autodiff)
//   Classifier       — plain weights extracted after fitting; this is
//                      what gets evaluated, persisted and served
//
// The weights start at zero, so fitting does not depend on any
// random initialisation.

use burn::{
    nn::{Initializer, Linear, LinearConfig},
    prelude::*,
    tensor::TensorData,
};
use serde::{Deserialize, Serialize};

use crate::domain::error::{ModelError, ModelResult};
use crate::domain::prediction::Prediction;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct LogisticModelConfig {
    pub n_features: usize,
}

impl LogisticModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> LogisticModel<B> {
        let linear = LinearConfig::new(self.n_features, 1)
            .with_initializer(Initializer::Zeros)
            .init(device);
        LogisticModel { linear }
    }
}

#[derive(Module, Debug)]
pub struct LogisticModel<B: Backend> {
    pub linear: Linear<B>,
}

impl<B: Backend> LogisticModel<B> {
    /// features: [batch, n_features] → logits: [batch, 1]
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        self.linear.forward(features)
    }

    /// Sum of squared weights (bias excluded), for the L2 penalty.
    pub fn weight_norm_squared(&self) -> Tensor<B, 1> {
        let weight = self.linear.weight.val();
        (weight.clone() * weight).sum()
    }
}

// ─── Classifier ───────────────────────────────────────────────────────────────
/// Fitted logistic regression weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classifier {
    weights: Vec<f64>,
    bias:    f64,
}

impl Classifier {
    pub fn new(weights: Vec<f64>, bias: f64) -> Self {
        Self { weights, bias }
    }

    /// Copy the parameters out of a fitted burn module.
    pub fn from_module<B: Backend>(model: &LogisticModel<B>) -> ModelResult<Self> {
        let to_vec = |tensor_data: TensorData| {
            tensor_data
                .to_vec::<f32>()
                .map_err(|e| ModelError::training(format!("cannot read model parameters: {e:?}")))
        };

        // Weight shape is [n_features, 1]; row-major order is feature order.
        let weights = to_vec(model.linear.weight.val().into_data())?
            .into_iter()
            .map(f64::from)
            .collect();
        let bias = match &model.linear.bias {
            Some(bias) => to_vec(bias.val().into_data())?
                .first()
                .copied()
                .map(f64::from)
                .unwrap_or(0.0),
            None => 0.0,
        };
        Ok(Self { weights, bias })
    }

    /// Input width this classifier was trained on.
    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }

    /// Probability of the positive class for one feature row.
    pub fn probability(&self, features: &[f64]) -> ModelResult<f64> {
        if features.len() != self.weights.len() {
            return Err(ModelError::schema(format!(
                "classifier expects {} features, got {}",
                self.weights.len(),
                features.len()
            )));
        }
        let logit = self
            .weights
            .iter()
            .zip(features)
            .fold(self.bias, |acc, (w, x)| acc + w * x);
        Ok(sigmoid(logit))
    }

    pub fn predict(&self, features: &[f64]) -> ModelResult<Prediction> {
        self.probability(features).map(Prediction::from_probability)
    }
}

/// Numerically stable logistic function.
fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}
