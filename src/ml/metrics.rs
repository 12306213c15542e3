use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Model evaluation metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetrics {
    /// Accuracy
    pub accuracy: f64,

    /// Macro-averaged precision
    pub precision: f64,

    /// Macro-averaged recall
    pub recall: f64,

    /// Macro-averaged F1 score
    pub f1_score: f64,

    /// Support-weighted F1 score
    pub weighted_f1_score: f64,

    /// Rows are true classes, columns predicted classes
    pub confusion_matrix: Array2<usize>,

    /// Per-class metrics, in class index order
    pub per_class_metrics: Vec<ClassMetrics>,

    /// Number of evaluated samples
    pub support: usize,
}

/// Per-class evaluation metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassMetrics {
    pub label: String,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    pub support: usize,
}

impl ModelMetrics {
    /// Score predictions against ground truth for classes `0..class_names.len()`
    pub fn calculate(y_true: &[usize], y_pred: &[usize], class_names: &[String]) -> Self {
        let n_classes = class_names.len();
        let n_samples = y_true.len();

        let mut confusion = Array2::<usize>::zeros((n_classes, n_classes));
        for (&t, &p) in y_true.iter().zip(y_pred.iter()) {
            if t < n_classes && p < n_classes {
                confusion[[t, p]] += 1;
            }
        }

        // Calculate accuracy
        let correct = y_true
            .iter()
            .zip(y_pred.iter())
            .filter(|(t, p)| t == p)
            .count();
        let accuracy = if n_samples > 0 {
            correct as f64 / n_samples as f64
        } else {
            0.0
        };

        // Calculate per-class metrics
        let per_class: Vec<ClassMetrics> = class_names
            .iter()
            .enumerate()
            .map(|(class_idx, label)| {
                let tp = confusion[[class_idx, class_idx]];
                let predicted = confusion.column(class_idx).sum();
                let support = confusion.row(class_idx).sum();

                let precision = ratio(tp, predicted);
                let recall = ratio(tp, support);
                let f1_score = if precision + recall > 0.0 {
                    2.0 * precision * recall / (precision + recall)
                } else {
                    0.0
                };

                ClassMetrics {
                    label: label.clone(),
                    precision,
                    recall,
                    f1_score,
                    support,
                }
            })
            .collect();

        let macro_avg = |f: fn(&ClassMetrics) -> f64| {
            if n_classes == 0 {
                0.0
            } else {
                per_class.iter().map(f).sum::<f64>() / n_classes as f64
            }
        };

        let total_support: usize = per_class.iter().map(|m| m.support).sum();
        let weighted_f1_score = if total_support > 0 {
            per_class
                .iter()
                .map(|m| m.f1_score * m.support as f64)
                .sum::<f64>()
                / total_support as f64
        } else {
            0.0
        };

        Self {
            accuracy,
            precision: macro_avg(|m| m.precision),
            recall: macro_avg(|m| m.recall),
            f1_score: macro_avg(|m| m.f1_score),
            weighted_f1_score,
            confusion_matrix: confusion,
            per_class_metrics: per_class,
            support: n_samples,
        }
    }

    /// Plain-text classification report
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>12} {:>10} {:>10} {:>10} {:>10}",
            "", "precision", "recall", "f1-score", "support"
        );
        for m in &self.per_class_metrics {
            let _ = writeln!(
                out,
                "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
                m.label, m.precision, m.recall, m.f1_score, m.support
            );
        }
        let _ = writeln!(out);
        let _ = writeln!(
            out,
            "{:>12} {:>10} {:>10} {:>10.2} {:>10}",
            "accuracy", "", "", self.accuracy, self.support
        );
        let _ = writeln!(
            out,
            "{:>12} {:>10.2} {:>10.2} {:>10.2} {:>10}",
            "macro avg", self.precision, self.recall, self.f1_score, self.support
        );
        let _ = write!(
            out,
            "{:>12} {:>10} {:>10} {:>10.2} {:>10}",
            "weighted avg", "", "", self.weighted_f1_score, self.support
        );
        out
    }
}

fn ratio(num: usize, den: usize) -> f64 {
    if den > 0 {
        num as f64 / den as f64
    } else {
        0.0
    }
}
