// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Batch pipeline: combine, load, split, train, evaluate, save, predict
//!
//! The human-readable report (Indonesian) is written to the writer passed
//! to [`HoaxPipeline::run`]; diagnostics go through `tracing`.

use crate::classifier::TrainerOptions;
use crate::combiner::{ensure_combined, CombineOutcome};
use crate::datasets::{label_distribution, load_combined, train_test_split, Label, NewsRecord};
use crate::featurizer::FeaturizerOptions;
use crate::metrics::{evaluate, Evaluation};
use crate::model::{fingerprint_file, HoaxModel, ModelArtifact, ModelSchema, Prediction};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Articles classified after training
pub const SAMPLE_TEXTS: [&str; 2] = [
    "Ular berkepala 5 ditemukan di desa Konoha",
    "Pemerintah Konoha membuka program beasiswa baru tahun ini",
];

const RULE: &str = "-----------------------------------";

/// Configuration for the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Headered CSV of genuine articles
    pub true_path: PathBuf,
    /// Headered CSV of hoax articles
    pub fake_path: PathBuf,
    /// Combined dataset, created when absent
    pub combined_path: PathBuf,
    /// Model archive, overwritten every run
    pub model_path: PathBuf,
    /// Seed for the train/test split and the trainer
    pub seed: u64,
    /// Share of records held out for evaluation
    pub test_fraction: f64,
    /// Rebuild the combined dataset even if it exists
    pub force_combine: bool,
    pub featurizer: FeaturizerOptions,
    pub trainer: TrainerOptions,
    /// Optional JSON report of the run
    pub report_path: Option<PathBuf>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            true_path: PathBuf::from("true.csv"),
            fake_path: PathBuf::from("fake.csv"),
            combined_path: PathBuf::from("combined.csv"),
            model_path: PathBuf::from("model_hoax.zip"),
            seed: 42,
            test_fraction: 0.2,
            force_combine: false,
            featurizer: FeaturizerOptions::default(),
            trainer: TrainerOptions::default(),
            report_path: None,
        }
    }
}

impl PipelineConfig {
    /// Default file names resolved under `dir`
    pub fn in_dir(dir: &Path) -> Self {
        let defaults = Self::default();
        Self {
            true_path: dir.join(&defaults.true_path),
            fake_path: dir.join(&defaults.fake_path),
            combined_path: dir.join(&defaults.combined_path),
            model_path: dir.join(&defaults.model_path),
            ..defaults
        }
    }
}

/// Label counts of the held-out partition
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionSummary {
    pub total: usize,
    pub hoax: usize,
    pub authentic: usize,
}

impl PartitionSummary {
    pub fn of(records: &[NewsRecord]) -> Self {
        let dist = label_distribution(records);
        Self {
            total: records.len(),
            hoax: *dist.get(&Label::Hoax).unwrap_or(&0),
            authentic: *dist.get(&Label::Authentic).unwrap_or(&0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplePrediction {
    pub text: String,
    pub prediction: Prediction,
}

/// Everything a run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResults {
    pub config: PipelineConfig,
    /// Rows written when the combined file was (re)built this run
    pub combined_rows: Option<usize>,
    pub loaded_records: usize,
    pub skipped_rows: usize,
    pub train_records: usize,
    pub test: PartitionSummary,
    pub evaluation: Evaluation,
    pub samples: Vec<SamplePrediction>,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

pub struct HoaxPipeline {
    config: PipelineConfig,
}

impl HoaxPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run every step, writing the report to `out`
    pub fn run<W: Write>(&self, out: &mut W) -> Result<RunResults> {
        let config = &self.config;

        writeln!(out, "## 1. Memuat dan Memproses Data (Biner)...")?;

        let combined_rows = match ensure_combined(config, out)? {
            CombineOutcome::Created(summary) => Some(summary.total_rows()),
            CombineOutcome::AlreadyPresent => None,
        };

        let loaded = load_combined(&config.combined_path)?;
        let loaded_records = loaded.records.len();
        let (train, test) = train_test_split(loaded.records, config.test_fraction, config.seed)?;

        let test_summary = PartitionSummary::of(&test);
        writeln!(out, "--- Diagnostik Data ---")?;
        writeln!(out, "Total Data: {}", test_summary.total)?;
        writeln!(out, "Positif (hoax): {}", test_summary.hoax)?;
        writeln!(out, "Negatif (benar): {}", test_summary.authentic)?;
        writeln!(out, "-----------------------")?;

        writeln!(out, "\n## 2. Mendefinisikan Pipeline dan Melatih Model (Biner)...")?;
        let trainer = TrainerOptions {
            seed: config.seed,
            ..config.trainer.clone()
        };
        let model = HoaxModel::fit(&train, config.featurizer.clone(), &trainer)?;
        writeln!(out, "Pelatihan model selesai.")?;

        writeln!(out, "\n## 3. Mengevaluasi Model...")?;
        let evaluation = Self::evaluate_model(&model, &test);
        Self::write_evaluation(&evaluation, out)?;

        let dataset_sha256 = match fingerprint_file(&config.combined_path) {
            Ok(hash) => Some(hash),
            Err(e) => {
                tracing::warn!("Could not fingerprint {}: {:#}", config.combined_path.display(), e);
                None
            }
        };
        let artifact = ModelArtifact {
            schema: ModelSchema::for_training(&train, &model, dataset_sha256),
            model,
        };
        artifact.save(&config.model_path)?;
        writeln!(out, "\nModel disimpan ke: {}", config.model_path.display())?;

        writeln!(out, "\n## 4. Uji Prediksi Contoh...")?;
        let mut samples = Vec::with_capacity(SAMPLE_TEXTS.len());
        for text in SAMPLE_TEXTS {
            let prediction = artifact.model.predict(text);
            Self::write_prediction(text, &prediction, out)?;
            samples.push(SamplePrediction {
                text: text.to_string(),
                prediction,
            });
        }

        let results = RunResults {
            config: config.clone(),
            combined_rows,
            loaded_records,
            skipped_rows: loaded.skipped_rows,
            train_records: train.len(),
            test: test_summary,
            evaluation,
            samples,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        };

        if let Some(ref path) = config.report_path {
            Self::save_results(&results, path)?;
        }

        Ok(results)
    }

    fn evaluate_model(model: &HoaxModel, test: &[NewsRecord]) -> Evaluation {
        let predictions = model.predict_batch(test);
        let pred_labels: Vec<Label> = predictions.iter().map(|p| p.label).collect();
        let true_labels: Vec<Label> = test.iter().map(|r| r.label).collect();
        let probabilities: Vec<f64> = predictions.iter().map(|p| p.probability).collect();

        let evaluation = evaluate(&pred_labels, &true_labels, &probabilities);
        match &evaluation {
            Evaluation::Computed(metrics) => {
                tracing::info!(
                    "Accuracy: {:.4}, AUC: {:.4}, F1: {:.4}, MCC: {:.4}",
                    metrics.accuracy,
                    metrics.auc_roc,
                    metrics.f1_score,
                    metrics.mcc
                );
                tracing::debug!("\n{}", metrics.format());
            }
            Evaluation::SingleClass { present, support } => {
                tracing::warn!("Test partition has {} records of a single class ({:?})", support, present);
            }
        }
        evaluation
    }

    fn write_evaluation<W: Write>(evaluation: &Evaluation, out: &mut W) -> Result<()> {
        match evaluation {
            Evaluation::Computed(metrics) => {
                writeln!(out, "Akurasi: {}", percent(metrics.accuracy))?;
                writeln!(out, "AUC: {}", percent(metrics.auc_roc))?;
                writeln!(out, "F1 Score: {}", percent(metrics.f1_score))?;
            }
            Evaluation::SingleClass { .. } => {
                writeln!(out, "⚠️ Tidak dapat menghitung AUC: hanya satu kelas di data uji.")?;
            }
        }
        Ok(())
    }

    fn write_prediction<W: Write>(text: &str, prediction: &Prediction, out: &mut W) -> Result<()> {
        let verdict = match prediction.label {
            Label::Hoax => "HOAX",
            Label::Authentic => "BENAR",
        };
        writeln!(out, "Teks: {}", text)?;
        writeln!(out, "Prediksi: {}", verdict)?;
        writeln!(out, "Probabilitas: {}", percent(prediction.probability))?;
        writeln!(out, "{}", RULE)?;
        Ok(())
    }

    /// Save results to a JSON file
    pub fn save_results(results: &RunResults, output_path: &Path) -> Result<()> {
        if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(output_path, json)
            .with_context(|| format!("Failed to write report: {}", output_path.display()))?;
        tracing::info!("Results saved to {}", output_path.display());
        Ok(())
    }
}

fn percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOAX_LINES: [&str; 6] = [
        "Ular raksasa,Ular berkepala lima muncul di sawah warga,hoaks,2020",
        "Obat ajaib,Minum air garam menyembuhkan semua penyakit,hoaks,2020",
        "Rahasia,Pemerintah menyembunyikan alien di desa,hoaks,2021",
        "Heboh,Ular ajaib berkepala tujuh ditemukan warga,hoaks,2021",
        "Viral,Air ajaib dari sumur menyembuhkan kanker,hoaks,2022",
        "Mengejutkan,Alien mendarat di sawah desa Konoha,hoaks,2022",
    ];

    const TRUE_LINES: [&str; 6] = [
        "Beasiswa,Pemerintah membuka program beasiswa untuk pelajar,pendidikan,2020",
        "Anggaran,Kementerian merilis laporan anggaran tahunan,ekonomi,2020",
        "Jalan,Pemerintah daerah memperbaiki jalan provinsi,infrastruktur,2021",
        "Sekolah,Program beasiswa baru dibuka kementerian pendidikan,pendidikan,2021",
        "Pajak,Kementerian keuangan mengumumkan laporan pajak,ekonomi,2022",
        "Kesehatan,Pemerintah membuka program vaksinasi gratis,kesehatan,2022",
    ];

    fn write_sources(dir: &Path, copies: usize) -> PipelineConfig {
        let config = PipelineConfig::in_dir(dir);
        let mut true_csv = String::from("title,text,subject,date\n");
        let mut fake_csv = String::from("title,text,subject,date\n");
        for _ in 0..copies {
            for line in TRUE_LINES {
                true_csv.push_str(line);
                true_csv.push('\n');
            }
            for line in HOAX_LINES {
                fake_csv.push_str(line);
                fake_csv.push('\n');
            }
        }
        std::fs::write(&config.true_path, true_csv).unwrap();
        std::fs::write(&config.fake_path, fake_csv).unwrap();
        config
    }

    #[test]
    fn test_run_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_sources(dir.path(), 5);
        config.report_path = Some(dir.path().join("reports").join("run.json"));

        let mut out = Vec::new();
        let results = HoaxPipeline::new(config.clone()).run(&mut out).unwrap();
        let console = String::from_utf8(out).unwrap();

        assert_eq!(results.combined_rows, Some(60));
        assert_eq!(results.loaded_records, 60);
        assert_eq!(results.test.total, 12);
        assert_eq!(results.train_records, 48);
        assert_eq!(results.samples.len(), 2);

        assert!(config.combined_path.exists());
        assert!(config.model_path.exists());
        assert!(config.report_path.as_ref().unwrap().exists());

        assert!(console.contains("Menggabungkan"));
        assert!(console.contains("Total Data: 12"));
        assert!(console.contains("Pelatihan model selesai."));
        assert!(console.contains("Model disimpan ke:"));
        assert_eq!(console.matches("Teks: ").count(), 2);
        assert!(console.contains("Prediksi: HOAX") || console.contains("Prediksi: BENAR"));

        let artifact = ModelArtifact::load(&config.model_path).unwrap();
        assert_eq!(artifact.schema.training_rows, 48);
        assert!(artifact.schema.dataset_sha256.is_some());
    }

    #[test]
    fn test_quoted_sources_load_every_combined_row() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::in_dir(dir.path());
        let mut true_csv = String::from("title,text,subject,date\n");
        let mut fake_csv = String::from("title,text,subject,date\n");
        for i in 0..10 {
            true_csv.push_str(&format!(
                "\"Pemerintah, DPR sepakati anggaran {}\",\"JAKARTA - Kementerian merilis laporan, kata pejabat\",politik,\"Desember {}, 2017 \"\n",
                i, i
            ));
            fake_csv.push_str(&format!(
                "\"Heboh ular ajaib {},Warga menemukan ular \"\"berkepala lima\"\", viral,hoaks,2020\n",
                i
            ));
        }
        std::fs::write(&config.true_path, true_csv).unwrap();
        std::fs::write(&config.fake_path, fake_csv).unwrap();

        let results = HoaxPipeline::new(config.clone()).run(&mut Vec::new()).unwrap();

        assert_eq!(results.combined_rows, Some(20));
        assert_eq!(results.loaded_records, results.combined_rows.unwrap());
        assert_eq!(results.skipped_rows, 0);

        let loaded = load_combined(&config.combined_path).unwrap();
        let dist = label_distribution(&loaded.records);
        assert_eq!(dist.get(&Label::Authentic), Some(&10));
        assert_eq!(dist.get(&Label::Hoax), Some(&10));
        assert!(loaded.records[0].title.starts_with("\"Pemerintah"));
    }

    #[test]
    fn test_second_run_reuses_combined_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_sources(dir.path(), 5);
        let pipeline = HoaxPipeline::new(config.clone());

        pipeline.run(&mut Vec::new()).unwrap();
        let before = std::fs::read(&config.combined_path).unwrap();

        let mut out = Vec::new();
        let results = pipeline.run(&mut out).unwrap();

        assert_eq!(results.combined_rows, None);
        assert_eq!(std::fs::read(&config.combined_path).unwrap(), before);
        assert!(!String::from_utf8(out).unwrap().contains("Menggabungkan"));
    }

    #[test]
    fn test_single_class_test_partition_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_sources(dir.path(), 5);
        // one held-out record can only hold one class
        config.test_fraction = 1.0 / 60.0;

        let mut out = Vec::new();
        let results = HoaxPipeline::new(config.clone()).run(&mut out).unwrap();
        let console = String::from_utf8(out).unwrap();

        assert_eq!(results.test.total, 1);
        assert!(matches!(results.evaluation, Evaluation::SingleClass { support: 1, .. }));
        assert!(console.contains("Tidak dapat menghitung AUC"));
        assert!(!console.contains("Akurasi:"));
        assert!(config.model_path.exists());
        assert!(console.contains("## 4. Uji Prediksi Contoh..."));
    }

    #[test]
    fn test_run_computes_metrics_on_mixed_partition() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = write_sources(dir.path(), 10);
        config.test_fraction = 0.5;

        let mut out = Vec::new();
        let results = HoaxPipeline::new(config).run(&mut out).unwrap();
        let console = String::from_utf8(out).unwrap();

        // 60 of 120 records held out: both classes are present
        let metrics = results.evaluation.metrics().expect("both classes in test partition");
        assert!(metrics.accuracy >= 0.0 && metrics.accuracy <= 1.0);
        assert!(console.contains("Akurasi:"));
        assert!(console.contains("AUC:"));
        assert!(console.contains("F1 Score:"));
    }

    #[test]
    fn test_missing_sources_fail() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::in_dir(dir.path());

        assert!(HoaxPipeline::new(config).run(&mut Vec::new()).is_err());
    }

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.true_path, PathBuf::from("true.csv"));
        assert_eq!(config.fake_path, PathBuf::from("fake.csv"));
        assert_eq!(config.combined_path, PathBuf::from("combined.csv"));
        assert_eq!(config.model_path, PathBuf::from("model_hoax.zip"));
        assert_eq!(config.seed, 42);
        assert!((config.test_fraction - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_percent() {
        assert_eq!(percent(0.95231), "95.23%");
        assert_eq!(percent(0.0), "0.00%");
    }
}
