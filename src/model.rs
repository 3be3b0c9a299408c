// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! The fitted hoax classification pipeline and its on-disk artifact
//!
//! A [`HoaxModel`] is the TF-IDF featurizer over the `text` column followed
//! by logistic regression against the label. [`ModelArtifact`] stores it as
//! a zip archive with two entries: `schema.json` and `model.json`.

use crate::classifier::{LogisticRegression, TrainerOptions};
use crate::datasets::{label_distribution, Label, NewsRecord, COMBINED_HEADER};
use crate::featurizer::{FeaturizerOptions, TextFeaturizer};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const SCHEMA_ENTRY: &str = "schema.json";
const MODEL_ENTRY: &str = "model.json";

/// Prediction for a single article
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: Label,
    /// P(hoax)
    pub probability: f64,
    /// Raw decision score
    pub score: f64,
}

/// Featurizer + classifier fitted on the combined dataset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HoaxModel {
    featurizer: TextFeaturizer,
    classifier: LogisticRegression,
}

impl HoaxModel {
    pub fn fit(
        records: &[NewsRecord],
        featurizer_options: FeaturizerOptions,
        trainer_options: &TrainerOptions,
    ) -> Result<Self> {
        let texts: Vec<&str> = records.iter().map(|r| r.text.as_str()).collect();
        let labels: Vec<bool> = records.iter().map(|r| r.label.to_bool()).collect();

        let featurizer = TextFeaturizer::fit(&texts, featurizer_options);
        let features = featurizer.transform_batch(&texts);

        tracing::info!(
            "Training logistic regression on {} records ({} features)",
            records.len(),
            featurizer.dimension()
        );

        let classifier = LogisticRegression::fit(&features, &labels, featurizer.dimension(), trainer_options)
            .context("Failed to train classifier")?;

        Ok(Self {
            featurizer,
            classifier,
        })
    }

    pub fn predict(&self, text: &str) -> Prediction {
        let features = self.featurizer.transform(text);
        let score = self.classifier.score(&features);
        let probability = self.classifier.predict_proba(&features);

        Prediction {
            label: Label::from_bool(self.classifier.predict(&features)),
            probability,
            score,
        }
    }

    pub fn predict_batch(&self, records: &[NewsRecord]) -> Vec<Prediction> {
        records.iter().map(|r| self.predict(&r.text)).collect()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.featurizer.dimension()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Text,
    Boolean,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub kind: ColumnKind,
}

/// Training schema saved alongside the fitted model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSchema {
    pub columns: Vec<ColumnSchema>,
    pub feature_column: String,
    pub label_column: String,
    /// Class reported when the label column is `true`
    pub positive_class: String,
    pub training_rows: usize,
    pub hoax_rows: usize,
    pub authentic_rows: usize,
    pub vocabulary_size: usize,
    /// SHA-256 of the combined dataset the model was trained from
    pub dataset_sha256: Option<String>,
    pub created_at: DateTime<Utc>,
    pub version: String,
}

impl ModelSchema {
    pub fn for_training(train: &[NewsRecord], model: &HoaxModel, dataset_sha256: Option<String>) -> Self {
        let dist = label_distribution(train);
        let columns = COMBINED_HEADER
            .iter()
            .map(|name| ColumnSchema {
                name: name.to_string(),
                kind: if *name == "label" {
                    ColumnKind::Boolean
                } else {
                    ColumnKind::Text
                },
            })
            .collect();

        Self {
            columns,
            feature_column: "text".to_string(),
            label_column: "label".to_string(),
            positive_class: "hoax".to_string(),
            training_rows: train.len(),
            hoax_rows: *dist.get(&Label::Hoax).unwrap_or(&0),
            authentic_rows: *dist.get(&Label::Authentic).unwrap_or(&0),
            vocabulary_size: model.vocabulary_size(),
            dataset_sha256,
            created_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Serialized model: schema plus fitted pipeline
#[derive(Debug, Clone)]
pub struct ModelArtifact {
    pub schema: ModelSchema,
    pub model: HoaxModel,
}

impl ModelArtifact {
    /// Write the artifact as a zip archive, replacing any existing file
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path).with_context(|| format!("Failed to create model file: {}", path.display()))?;
        let mut zip = ZipWriter::new(file);

        zip.start_file(SCHEMA_ENTRY, entry_options())?;
        zip.write_all(&serde_json::to_vec_pretty(&self.schema)?)?;

        zip.start_file(MODEL_ENTRY, entry_options())?;
        zip.write_all(&serde_json::to_vec(&self.model)?)?;

        zip.finish()
            .with_context(|| format!("Failed to finish model archive: {}", path.display()))?;

        tracing::info!("Model saved to {}", path.display());
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).with_context(|| format!("Failed to open model file: {}", path.display()))?;
        let mut archive =
            ZipArchive::new(file).with_context(|| format!("Not a model archive: {}", path.display()))?;

        let schema: ModelSchema = {
            let entry = archive
                .by_name(SCHEMA_ENTRY)
                .with_context(|| format!("{} missing from {}", SCHEMA_ENTRY, path.display()))?;
            serde_json::from_reader(BufReader::new(entry))?
        };
        let model: HoaxModel = {
            let entry = archive
                .by_name(MODEL_ENTRY)
                .with_context(|| format!("{} missing from {}", MODEL_ENTRY, path.display()))?;
            serde_json::from_reader(BufReader::new(entry))?
        };

        Ok(Self { schema, model })
    }
}

fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Hex SHA-256 of a file's contents
pub fn fingerprint_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(text: &str, label: Label) -> NewsRecord {
        NewsRecord {
            label,
            ..NewsRecord::from_text(text)
        }
    }

    fn training_records() -> Vec<NewsRecord> {
        let hoax = [
            "shocking miracle cure doctors hate",
            "secret conspiracy revealed shocking truth",
            "miracle snake with five heads found",
            "shocking secret the government hides",
        ];
        let real = [
            "ministry announces new scholarship program",
            "official report on regional budget published",
            "government opens scholarship registration",
            "official statement from the ministry spokesperson",
        ];

        hoax.iter()
            .map(|t| record(t, Label::Hoax))
            .chain(real.iter().map(|t| record(t, Label::Authentic)))
            .collect()
    }

    fn fitted() -> HoaxModel {
        let options = TrainerOptions {
            epochs: 50,
            ..TrainerOptions::default()
        };
        HoaxModel::fit(&training_records(), FeaturizerOptions::default(), &options).unwrap()
    }

    #[test]
    fn test_fit_and_predict() {
        let model = fitted();

        let hoax = model.predict("shocking miracle secret");
        assert_eq!(hoax.label, Label::Hoax);
        assert!(hoax.probability > 0.5);

        let real = model.predict("official ministry scholarship");
        assert_eq!(real.label, Label::Authentic);
        assert!(real.probability < 0.5);

        assert_eq!(model.predict_batch(&training_records()).len(), 8);
    }

    #[test]
    fn test_fit_empty_fails() {
        assert!(HoaxModel::fit(&[], FeaturizerOptions::default(), &TrainerOptions::default()).is_err());
    }

    #[test]
    fn test_schema_counts() {
        let model = fitted();
        let schema = ModelSchema::for_training(&training_records(), &model, None);

        assert_eq!(schema.training_rows, 8);
        assert_eq!(schema.hoax_rows, 4);
        assert_eq!(schema.authentic_rows, 4);
        assert_eq!(schema.columns.len(), 5);
        assert_eq!(schema.columns[4].kind, ColumnKind::Boolean);
        assert_eq!(schema.vocabulary_size, model.vocabulary_size());
    }

    #[test]
    fn test_artifact_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_hoax.zip");
        let model = fitted();
        let artifact = ModelArtifact {
            schema: ModelSchema::for_training(&training_records(), &model, Some("abc".to_string())),
            model,
        };

        artifact.save(&path).unwrap();
        let loaded = ModelArtifact::load(&path).unwrap();

        assert_eq!(loaded.schema.dataset_sha256.as_deref(), Some("abc"));
        let text = "miracle found in the ministry";
        let before = artifact.model.predict(text);
        let after = loaded.model.predict(text);
        assert_eq!(after.label, before.label);
        assert!((after.probability - before.probability).abs() < 1e-9);
    }

    #[test]
    fn test_load_rejects_non_archive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_hoax.zip");
        std::fs::write(&path, "not a zip").unwrap();

        assert!(ModelArtifact::load(&path).is_err());
    }

    #[test]
    fn test_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.csv");
        std::fs::write(&path, "abc").unwrap();

        assert_eq!(
            fingerprint_file(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
