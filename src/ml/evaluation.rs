// ============================================================
// Layer 5 — Evaluation Report
// ============================================================
// Precision / recall / F1 / support per class for a binary
// classifier, plus accuracy and macro / weighted averages.
//
//   precision = tp / (tp + fp)     (0 when nothing was predicted)
//   recall    = tp / (tp + fn)     (0 when the class is absent)
//   f1        = 2pr / (p + r)      (0 when p + r = 0)
//
// An empty validation partition produces EvaluationReport::Empty
// instead of a table of NaNs.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label:     u8,
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
    pub support:   usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageMetrics {
    pub precision: f64,
    pub recall:    f64,
    pub f1:        f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationReport {
    /// Always two entries: label 0 then label 1.
    pub classes:      Vec<ClassMetrics>,
    pub accuracy:     f64,
    pub macro_avg:    AverageMetrics,
    pub weighted_avg: AverageMetrics,
    pub support:      usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum EvaluationReport {
    /// Validation partition had no rows.
    Empty,
    Scored(ClassificationReport),
}

impl EvaluationReport {
    /// Compare true labels against predictions, position by position.
    pub fn from_predictions(y_true: &[u8], y_pred: &[u8]) -> Self {
        let total = y_true.len().min(y_pred.len());
        if total == 0 {
            return Self::Empty;
        }

        let pairs = || y_true.iter().zip(y_pred).take(total);
        let classes: Vec<ClassMetrics> = [0u8, 1u8]
            .into_iter()
            .map(|label| {
                let tp = pairs().filter(|(t, p)| **t == label && **p == label).count();
                let fp = pairs().filter(|(t, p)| **t != label && **p == label).count();
                let fn_ = pairs().filter(|(t, p)| **t == label && **p != label).count();

                let precision = ratio(tp, tp + fp);
                let recall    = ratio(tp, tp + fn_);
                let f1 = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };
                ClassMetrics { label, precision, recall, f1, support: tp + fn_ }
            })
            .collect();

        let correct  = pairs().filter(|(t, p)| t == p).count();
        let accuracy = ratio(correct, total);

        let n_classes = classes.len() as f64;
        let macro_avg = AverageMetrics {
            precision: classes.iter().map(|c| c.precision).sum::<f64>() / n_classes,
            recall:    classes.iter().map(|c| c.recall).sum::<f64>() / n_classes,
            f1:        classes.iter().map(|c| c.f1).sum::<f64>() / n_classes,
        };
        let weighted = |metric: fn(&ClassMetrics) -> f64| {
            classes.iter().map(|c| metric(c) * c.support as f64).sum::<f64>() / total as f64
        };
        let weighted_avg = AverageMetrics {
            precision: weighted(|c| c.precision),
            recall:    weighted(|c| c.recall),
            f1:        weighted(|c| c.f1),
        };

        Self::Scored(ClassificationReport {
            classes,
            accuracy,
            macro_avg,
            weighted_avg,
            support: total,
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn scored(&self) -> Option<&ClassificationReport> {
        match self {
            Self::Empty => None,
            Self::Scored(report) => Some(report),
        }
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let report = match self {
            Self::Empty => return write!(f, "no validation rows: report is empty"),
            Self::Scored(report) => report,
        };

        writeln!(f, "{:>12} {:>9} {:>9} {:>9} {:>9}", "", "precision", "recall", "f1-score", "support")?;
        writeln!(f)?;
        for c in &report.classes {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                c.label, c.precision, c.recall, c.f1, c.support
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:>12} {:>9} {:>9} {:>9.2} {:>9}", "accuracy", "", "", report.accuracy, report.support)?;
        for (name, avg) in [("macro avg", report.macro_avg), ("weighted avg", report.weighted_avg)] {
            writeln!(
                f,
                "{:>12} {:>9.2} {:>9.2} {:>9.2} {:>9}",
                name, avg.precision, avg.recall, avg.f1, report.support
            )?;
        }
        Ok(())
    }
}
