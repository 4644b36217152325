// ============================================================
// Layer 5 — Classifier Trainer
// ============================================================
// Full-batch logistic regression fit with burn's Adam optimiser
// on the CPU NdArray backend, followed by evaluation against the
// validation partition.
//
//   loss = BCE(logits, y) + 0.5 * l2_strength / n * ||w||²
//
// Zero-initialised weights + full-batch updates: identical inputs
// and config give identical weights on every run.
//
// Reference: Burn Book §5 (Training), Kingma & Ba (2015) Adam

use burn::{
    backend::{ndarray::NdArrayDevice, Autodiff, NdArray},
    module::AutodiffModule,
    nn::loss::BinaryCrossEntropyLossConfig,
    optim::{AdamConfig, GradientsParams, Optimizer},
    prelude::*,
    tensor::TensorData,
};

use crate::data::preprocessor::FeatureMatrix;
use crate::domain::error::{ModelError, ModelResult};
use crate::ml::evaluation::EvaluationReport;
use crate::ml::model::{Classifier, LogisticModel, LogisticModelConfig};

type TrainBackend = Autodiff<NdArray>;

#[derive(Config, Debug)]
pub struct TrainerConfig {
    /// Full-batch optimisation steps.
    #[config(default = 300)]
    pub epochs: usize,

    #[config(default = 0.05)]
    pub learning_rate: f64,

    /// Inverse of scikit-learn's `C`; 0 disables the penalty.
    #[config(default = 1.0)]
    pub l2_strength: f64,
}

/// Fitted classifier and how it scored on the validation partition.
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub classifier: Classifier,
    pub report:     EvaluationReport,
    pub final_loss: f64,
}

/// Fit a classifier on (`x_train`, `y_train`) and evaluate it on
/// (`x_val`, `y_val`).
pub fn train(
    x_train: &FeatureMatrix,
    y_train: &[u8],
    x_val:   &FeatureMatrix,
    y_val:   &[u8],
    config:  &TrainerConfig,
) -> ModelResult<TrainingOutcome> {
    validate_inputs(x_train, y_train, x_val, y_val, config)?;

    tracing::info!(
        "Training the model: {} rows x {} features, {} epochs",
        x_train.rows(),
        x_train.cols(),
        config.epochs
    );

    let (classifier, final_loss) = fit(x_train, y_train, config)?;
    tracing::info!("Model trained (final loss {:.5})", final_loss);

    let predictions = x_val
        .iter_rows()
        .map(|row| classifier.predict(row).map(|p| p.label))
        .collect::<ModelResult<Vec<u8>>>()?;
    let report = EvaluationReport::from_predictions(y_val, &predictions);
    tracing::info!("Classification report:\n{}", report);

    Ok(TrainingOutcome { classifier, report, final_loss })
}

fn validate_inputs(
    x_train: &FeatureMatrix,
    y_train: &[u8],
    x_val:   &FeatureMatrix,
    y_val:   &[u8],
    config:  &TrainerConfig,
) -> ModelResult<()> {
    if x_train.rows() != y_train.len() || x_val.rows() != y_val.len() {
        return Err(ModelError::schema(format!(
            "feature/label row counts differ (train {} vs {}, validation {} vs {})",
            x_train.rows(),
            y_train.len(),
            x_val.rows(),
            y_val.len()
        )));
    }
    if !x_val.is_empty() && x_val.cols() != x_train.cols() {
        return Err(ModelError::schema(format!(
            "validation has {} feature columns, training has {}",
            x_val.cols(),
            x_train.cols()
        )));
    }
    if let Some(bad) = y_train.iter().chain(y_val).find(|&&label| label > 1) {
        return Err(ModelError::schema(format!("labels must be 0 or 1, got {bad}")));
    }

    let positives = y_train.iter().filter(|&&label| label == 1).count();
    if positives == 0 || positives == y_train.len() {
        return Err(ModelError::training(format!(
            "training labels need 2 distinct classes ({} rows, {} positive)",
            y_train.len(),
            positives
        )));
    }

    if config.epochs == 0 {
        return Err(ModelError::InvalidConfig("epochs must be at least 1".to_string()));
    }
    if !(config.learning_rate > 0.0) || !(config.l2_strength >= 0.0) {
        return Err(ModelError::InvalidConfig(format!(
            "learning_rate must be > 0 and l2_strength >= 0 (got {}, {})",
            config.learning_rate, config.l2_strength
        )));
    }
    Ok(())
}

fn fit(
    x_train: &FeatureMatrix,
    y_train: &[u8],
    config:  &TrainerConfig,
) -> ModelResult<(Classifier, f64)> {
    let device = NdArrayDevice::default();
    let rows   = x_train.rows();
    let cols   = x_train.cols();

    // ── Tensors ───────────────────────────────────────────────────────────────
    let features: Vec<f32> = x_train.values().iter().map(|&v| v as f32).collect();
    let features = Tensor::<TrainBackend, 2>::from_data(TensorData::new(features, [rows, cols]), &device);

    let targets: Vec<i64> = y_train.iter().map(|&label| i64::from(label)).collect();
    let targets = Tensor::<TrainBackend, 2, Int>::from_data(TensorData::new(targets, [rows, 1]), &device);

    // ── Model, loss, optimiser ────────────────────────────────────────────────
    let mut model: LogisticModel<TrainBackend> = LogisticModelConfig::new(cols).init(&device);
    let bce = BinaryCrossEntropyLossConfig::new()
        .with_logits(true)
        .init(&device);
    let mut optim = AdamConfig::new().init();
    let penalty_weight = 0.5 * config.l2_strength / rows as f64;

    // ── Full-batch loop ───────────────────────────────────────────────────────
    let mut final_loss = f64::NAN;
    for epoch in 1..=config.epochs {
        let logits = model.forward(features.clone());
        let loss   = bce.forward(logits, targets.clone())
            + model.weight_norm_squared().mul_scalar(penalty_weight);

        final_loss = loss.clone().into_scalar().elem::<f64>();
        if !final_loss.is_finite() {
            return Err(ModelError::training(format!(
                "loss diverged at epoch {epoch} ({final_loss})"
            )));
        }
        if epoch % 50 == 0 {
            tracing::debug!("epoch {:>4}/{} | loss={:.6}", epoch, config.epochs, final_loss);
        }

        let grads = loss.backward();
        let grads = GradientsParams::from_grads(grads, &model);
        model = optim.step(config.learning_rate, model, grads);
    }

    let classifier = Classifier::from_module(&model.valid())?;
    Ok((classifier, final_loss))
}
