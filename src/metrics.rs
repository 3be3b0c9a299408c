// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Binary classification metrics for the hoax classifier
//!
//! Hoax is the positive class. AUC-ROC is only defined when the evaluated
//! partition contains both classes, which is why [`evaluate`] returns an
//! [`Evaluation`] rather than bare numbers.

use crate::datasets::Label;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Confusion matrix for binary classification
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    /// Hoax predicted as hoax
    pub tp: usize,
    /// Authentic predicted as authentic
    pub tn: usize,
    /// Authentic predicted as hoax
    pub fp: usize,
    /// Hoax predicted as authentic
    pub fn_: usize,
}

impl ConfusionMatrix {
    pub fn from_predictions(predictions: &[Label], ground_truth: &[Label]) -> Self {
        let mut matrix = Self::default();

        for (pred, truth) in predictions.iter().zip(ground_truth.iter()) {
            match (pred, truth) {
                (Label::Hoax, Label::Hoax) => matrix.tp += 1,
                (Label::Authentic, Label::Authentic) => matrix.tn += 1,
                (Label::Hoax, Label::Authentic) => matrix.fp += 1,
                (Label::Authentic, Label::Hoax) => matrix.fn_ += 1,
            }
        }

        matrix
    }

    pub fn total(&self) -> usize {
        self.tp + self.tn + self.fp + self.fn_
    }

    /// Accuracy: (TP + TN) / Total
    pub fn accuracy(&self) -> f64 {
        ratio(self.tp + self.tn, self.total())
    }

    /// Precision: TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        ratio(self.tp, self.tp + self.fp)
    }

    /// Recall: TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        ratio(self.tp, self.tp + self.fn_)
    }

    pub fn f1_score(&self) -> f64 {
        let precision = self.precision();
        let recall = self.recall();
        let denom = precision + recall;
        if denom == 0.0 {
            return 0.0;
        }
        2.0 * precision * recall / denom
    }

    /// Matthews Correlation Coefficient, -1 to 1
    pub fn mcc(&self) -> f64 {
        let tp = self.tp as f64;
        let tn = self.tn as f64;
        let fp = self.fp as f64;
        let fn_ = self.fn_ as f64;

        let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
        if denominator == 0.0 {
            return 0.0;
        }
        (tp * tn - fp * fn_) / denominator
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// Metrics computed on a partition holding both classes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinaryMetrics {
    pub confusion_matrix: ConfusionMatrix,
    pub accuracy: f64,
    pub auc_roc: f64,
    pub f1_score: f64,
    pub precision: f64,
    pub recall: f64,
    pub mcc: f64,
    /// Mean binary cross-entropy of the hoax probabilities
    pub log_loss: f64,
    pub support: usize,
}

impl BinaryMetrics {
    pub fn format(&self) -> String {
        format!(
            r#"Classification Report
=====================
Accuracy:  {:.4}
AUC-ROC:   {:.4}
F1 Score:  {:.4}
Precision: {:.4}
Recall:    {:.4}
MCC:       {:.4}
Log-loss:  {:.4}
Support:   {}

Confusion Matrix:
                 Predicted
                 Hoax     Authentic
Actual Hoax      {:>6}   {:>6}
       Authentic {:>6}   {:>6}
"#,
            self.accuracy,
            self.auc_roc,
            self.f1_score,
            self.precision,
            self.recall,
            self.mcc,
            self.log_loss,
            self.support,
            self.confusion_matrix.tp,
            self.confusion_matrix.fn_,
            self.confusion_matrix.fp,
            self.confusion_matrix.tn,
        )
    }
}

/// Outcome of evaluating the classifier on a held-out partition
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Evaluation {
    Computed(BinaryMetrics),
    /// Fewer than two classes present; `present` is `None` for an empty partition
    SingleClass { present: Option<Label>, support: usize },
}

impl Evaluation {
    pub fn metrics(&self) -> Option<&BinaryMetrics> {
        match self {
            Evaluation::Computed(metrics) => Some(metrics),
            Evaluation::SingleClass { .. } => None,
        }
    }
}

/// Evaluate predictions against ground truth.
///
/// `probabilities` are P(hoax) aligned with `predictions`.
pub fn evaluate(predictions: &[Label], ground_truth: &[Label], probabilities: &[f64]) -> Evaluation {
    let n_pos = ground_truth.iter().filter(|l| **l == Label::Hoax).count();
    let n_neg = ground_truth.len() - n_pos;

    if n_pos == 0 || n_neg == 0 {
        let present = ground_truth.first().copied();
        return Evaluation::SingleClass {
            present,
            support: ground_truth.len(),
        };
    }

    let cm = ConfusionMatrix::from_predictions(predictions, ground_truth);
    Evaluation::Computed(BinaryMetrics {
        accuracy: cm.accuracy(),
        auc_roc: auc_roc(ground_truth, probabilities, n_pos, n_neg),
        f1_score: cm.f1_score(),
        precision: cm.precision(),
        recall: cm.recall(),
        mcc: cm.mcc(),
        log_loss: log_loss(ground_truth, probabilities),
        support: cm.total(),
        confusion_matrix: cm,
    })
}

/// Trapezoidal AUC-ROC; samples with equal scores form a single step
fn auc_roc(ground_truth: &[Label], probabilities: &[f64], n_pos: usize, n_neg: usize) -> f64 {
    let mut pairs: Vec<(Label, f64)> = ground_truth
        .iter()
        .copied()
        .zip(probabilities.iter().copied())
        .collect();
    pairs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

    let n_pos = n_pos as f64;
    let n_neg = n_neg as f64;
    let mut tp = 0.0;
    let mut fp = 0.0;
    let mut tpr_prev = 0.0;
    let mut fpr_prev = 0.0;
    let mut auc = 0.0;

    let mut i = 0;
    while i < pairs.len() {
        let threshold = pairs[i].1;
        loop {
            if pairs[i].0 == Label::Hoax {
                tp += 1.0;
            } else {
                fp += 1.0;
            }
            i += 1;
            if i >= pairs.len() || pairs[i].1 != threshold {
                break;
            }
        }

        let tpr = tp / n_pos;
        let fpr = fp / n_neg;
        auc += (fpr - fpr_prev) * (tpr + tpr_prev) / 2.0;
        tpr_prev = tpr;
        fpr_prev = fpr;
    }

    auc
}

fn log_loss(ground_truth: &[Label], probabilities: &[f64]) -> f64 {
    let eps = 1e-15;
    let total: f64 = ground_truth
        .iter()
        .zip(probabilities.iter())
        .map(|(label, p)| {
            let p = p.clamp(eps, 1.0 - eps);
            if *label == Label::Hoax {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();

    if ground_truth.is_empty() {
        return 0.0;
    }
    total / ground_truth.len() as f64
}
