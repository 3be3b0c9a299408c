// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Hoax detector CLI
//!
//! Usage:
//!   deteksi-hoaks
//!   deteksi-hoaks --data-dir ./data --seed 7 --report results/run.json

use anyhow::Result;
use clap::Parser;
use hoax_detector::pipeline::{HoaxPipeline, PipelineConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "deteksi-hoaks")]
#[command(about = "Combine news datasets, train the hoax classifier and run sample predictions")]
#[command(version)]
struct Args {
    /// Directory the default file names are resolved in (default: current directory)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// CSV of genuine articles (default: <data-dir>/true.csv)
    #[arg(long)]
    true_path: Option<PathBuf>,

    /// CSV of hoax articles (default: <data-dir>/fake.csv)
    #[arg(long)]
    fake_path: Option<PathBuf>,

    /// Combined dataset (default: <data-dir>/combined.csv)
    #[arg(long)]
    combined_path: Option<PathBuf>,

    /// Model archive (default: <data-dir>/model_hoax.zip)
    #[arg(long)]
    model_path: Option<PathBuf>,

    /// Random seed for the split and the trainer
    #[arg(short, long, default_value_t = 42)]
    seed: u64,

    /// Share of records held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    test_fraction: f64,

    /// Training epochs
    #[arg(long, default_value_t = 10)]
    epochs: usize,

    /// Rebuild the combined dataset even if it already exists
    #[arg(long)]
    force_combine: bool,

    /// Write a JSON report of the run
    #[arg(long)]
    report: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> PipelineConfig {
        let mut config = match self.data_dir {
            Some(ref dir) => PipelineConfig::in_dir(dir),
            None => PipelineConfig::default(),
        };
        if let Some(path) = self.true_path {
            config.true_path = path;
        }
        if let Some(path) = self.fake_path {
            config.fake_path = path;
        }
        if let Some(path) = self.combined_path {
            config.combined_path = path;
        }
        if let Some(path) = self.model_path {
            config.model_path = path;
        }
        config.seed = self.seed;
        config.test_fraction = self.test_fraction;
        config.trainer.epochs = self.epochs;
        config.force_combine = self.force_combine;
        config.report_path = self.report;
        config
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Args::parse().into_config();
    tracing::debug!("Configuration: {:?}", config);

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    HoaxPipeline::new(config).run(&mut out)?;

    Ok(())
}
