// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! L2-regularised logistic regression over sparse features
//!
//! Trained with stochastic gradient descent. The weight vector is kept as
//! `scale * v` so the per-step L2 shrink costs O(1) instead of O(features).

use crate::featurizer::SparseVector;
use anyhow::{bail, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

/// Below this the scaled weights are folded back into `v`
const MIN_SCALE: f64 = 1e-9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainerOptions {
    /// Passes over the training data
    pub epochs: usize,
    /// Initial step size; decays as `lr / (1 + lr * l2 * t)`
    pub learning_rate: f64,
    /// L2 penalty strength
    pub l2: f64,
    /// Seed for the per-epoch shuffle
    pub seed: u64,
}

impl Default for TrainerOptions {
    fn default() -> Self {
        Self {
            epochs: 10,
            learning_rate: 0.5,
            l2: 1e-4,
            seed: 42,
        }
    }
}

impl TrainerOptions {
    fn validate(&self) -> Result<()> {
        if self.epochs == 0 {
            bail!("Trainer needs at least one epoch");
        }
        if !(self.learning_rate > 0.0) {
            bail!("Learning rate must be positive, got {}", self.learning_rate);
        }
        if !(self.l2 >= 0.0) || self.learning_rate * self.l2 >= 1.0 {
            bail!(
                "L2 penalty must be non-negative and below 1/learning_rate, got {}",
                self.l2
            );
        }
        Ok(())
    }
}

/// Fitted binary logistic regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticRegression {
    weights: Vec<f64>,
    bias: f64,
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

impl LogisticRegression {
    /// Fit on `features` against boolean `labels` (true = positive class).
    pub fn fit(
        features: &[SparseVector],
        labels: &[bool],
        dimension: usize,
        options: &TrainerOptions,
    ) -> Result<Self> {
        options.validate()?;
        if features.len() != labels.len() {
            bail!(
                "Feature and label counts differ: {} vs {}",
                features.len(),
                labels.len()
            );
        }
        if features.is_empty() {
            bail!("Cannot train on an empty dataset");
        }

        let mut rng = ChaCha8Rng::seed_from_u64(options.seed);
        let mut order: Vec<usize> = (0..features.len()).collect();
        let mut v = vec![0.0; dimension];
        let mut scale = 1.0;
        let mut bias = 0.0;
        let mut step = 0u64;

        let progress = ProgressBar::new(options.epochs as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} Training: [{wide_bar:.cyan/blue}] {pos}/{len} epochs {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );

        for epoch in 0..options.epochs {
            order.shuffle(&mut rng);
            let mut total_loss = 0.0;

            for &i in &order {
                let x = &features[i];
                let y = if labels[i] { 1.0 } else { 0.0 };
                let eta = options.learning_rate / (1.0 + options.learning_rate * options.l2 * step as f64);

                let p = sigmoid(scale * x.dot(&v) + bias);
                let gradient = p - y;

                let eps = 1e-15;
                total_loss -= y * (p + eps).ln() + (1.0 - y) * (1.0 - p + eps).ln();

                scale *= 1.0 - eta * options.l2;
                if scale < MIN_SCALE {
                    v.iter_mut().for_each(|w| *w *= scale);
                    scale = 1.0;
                }

                for &(j, value) in &x.entries {
                    if let Some(w) = v.get_mut(j) {
                        *w -= eta * gradient * value / scale;
                    }
                }
                bias -= eta * gradient;
                step += 1;
            }

            let mean_loss = total_loss / features.len() as f64;
            tracing::debug!("Epoch {}/{}: mean log-loss {:.6}", epoch + 1, options.epochs, mean_loss);
            progress.set_message(format!("loss {:.4}", mean_loss));
            progress.inc(1);
        }

        progress.finish_and_clear();

        Ok(Self {
            weights: v.into_iter().map(|w| w * scale).collect(),
            bias,
        })
    }

    /// Raw decision score `w·x + b`
    pub fn score(&self, x: &SparseVector) -> f64 {
        x.dot(&self.weights) + self.bias
    }

    /// Probability of the positive class
    pub fn predict_proba(&self, x: &SparseVector) -> f64 {
        sigmoid(self.score(x))
    }

    /// Positive class when the probability reaches 0.5
    pub fn predict(&self, x: &SparseVector) -> bool {
        self.score(x) >= 0.0
    }

    pub fn dimension(&self) -> usize {
        self.weights.len()
    }

    pub fn bias(&self) -> f64 {
        self.bias
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn one_hot(idx: usize) -> SparseVector {
        SparseVector {
            entries: vec![(idx, 1.0)],
        }
    }

    #[test]
    fn test_separable_data() {
        // features 0/1 mark negatives, 2/3 mark positives
        let features = vec![one_hot(0), one_hot(1), one_hot(0), one_hot(2), one_hot(3), one_hot(2)];
        let labels = vec![false, false, false, true, true, true];
        let options = TrainerOptions {
            epochs: 50,
            ..TrainerOptions::default()
        };

        let model = LogisticRegression::fit(&features, &labels, 4, &options).unwrap();

        for (x, &y) in features.iter().zip(labels.iter()) {
            assert_eq!(model.predict(x), y);
        }
        assert!(model.predict_proba(&one_hot(2)) > 0.8);
        assert!(model.predict_proba(&one_hot(0)) < 0.2);
    }

    #[test]
    fn test_empty_vector_uses_bias() {
        let features = vec![one_hot(0), one_hot(1)];
        let labels = vec![true, false];
        let model = LogisticRegression::fit(&features, &labels, 2, &TrainerOptions::default()).unwrap();

        let empty = SparseVector::default();
        assert!((model.score(&empty) - model.bias()).abs() < 1e-12);
    }

    #[test]
    fn test_fit_is_deterministic() {
        let features = vec![one_hot(0), one_hot(1), one_hot(2)];
        let labels = vec![true, false, true];
        let options = TrainerOptions::default();

        let a = LogisticRegression::fit(&features, &labels, 3, &options).unwrap();
        let b = LogisticRegression::fit(&features, &labels, 3, &options).unwrap();

        assert_eq!(a.weights, b.weights);
        assert_eq!(a.bias, b.bias);
    }

    #[test]
    fn test_rejects_bad_input() {
        let options = TrainerOptions::default();
        assert!(LogisticRegression::fit(&[], &[], 3, &options).is_err());
        assert!(LogisticRegression::fit(&[one_hot(0)], &[true, false], 3, &options).is_err());

        let zero_epochs = TrainerOptions {
            epochs: 0,
            ..TrainerOptions::default()
        };
        assert!(LogisticRegression::fit(&[one_hot(0)], &[true], 3, &zero_epochs).is_err());
    }

    #[test]
    fn test_l2_shrinks_weights() {
        let features = vec![one_hot(0), one_hot(1)];
        let labels = vec![true, false];
        let loose = TrainerOptions {
            l2: 0.0,
            ..TrainerOptions::default()
        };
        let tight = TrainerOptions {
            l2: 0.5,
            ..TrainerOptions::default()
        };

        let a = LogisticRegression::fit(&features, &labels, 2, &loose).unwrap();
        let b = LogisticRegression::fit(&features, &labels, 2, &tight).unwrap();

        assert!(b.weights[0].abs() < a.weights[0].abs());
        assert_eq!(a.dimension(), 2);
    }
}
