// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Hoax news detection for the Konoha news datasets
//!
//! This crate provides:
//! - Dataset combination (true/fake CSVs into one labeled CSV)
//! - Typed loading and seeded train/test splitting
//! - TF-IDF featurization and logistic regression
//! - Evaluation metrics (Accuracy, F1, AUC-ROC) with explicit single-class handling
//! - Model persistence as a zip archive with its training schema
//! - The end-to-end batch pipeline used by the `deteksi-hoaks` binary

pub mod classifier;
pub mod combiner;
pub mod datasets;
pub mod featurizer;
pub mod metrics;
pub mod model;
pub mod pipeline;

pub use classifier::{LogisticRegression, TrainerOptions};
pub use combiner::{combine_datasets, ensure_combined, CombineOutcome, CombineSummary};
pub use datasets::{Label, LoadedDataset, NewsRecord};
pub use featurizer::{FeaturizerOptions, SparseVector, TextFeaturizer};
pub use metrics::{BinaryMetrics, ConfusionMatrix, Evaluation};
pub use model::{HoaxModel, ModelArtifact, ModelSchema, Prediction};
pub use pipeline::{HoaxPipeline, PipelineConfig, RunResults};
