// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Typed loading and splitting of the combined news dataset

use anyhow::{bail, Context, Result};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

/// Header of the combined dataset, in column order
pub const COMBINED_HEADER: [&str; 5] = ["title", "text", "subject", "date", "label"];

/// Binary label for hoax detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    /// Fabricated or misleading news (stored as `true`)
    Hoax,
    /// Genuine news (stored as `false`)
    Authentic,
}

impl Label {
    /// On-disk boolean value: hoax = true
    pub fn to_bool(self) -> bool {
        matches!(self, Label::Hoax)
    }

    pub fn from_bool(value: bool) -> Self {
        if value {
            Label::Hoax
        } else {
            Label::Authentic
        }
    }

    /// Literal written to the label column of the combined file
    pub fn as_csv_literal(self) -> &'static str {
        if self.to_bool() {
            "true"
        } else {
            "false"
        }
    }

    /// Parse a boolean label cell (`true`/`false`/`1`/`0`, any case)
    pub fn parse_cell(cell: &str) -> Option<Self> {
        match cell.trim().to_ascii_lowercase().as_str() {
            "true" | "1" => Some(Label::Hoax),
            "false" | "0" => Some(Label::Authentic),
            _ => None,
        }
    }
}

/// One row of the combined dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    pub title: String,
    pub text: String,
    pub subject: String,
    pub date: String,
    pub label: Label,
}

impl NewsRecord {
    /// Record carrying only article text, used for point predictions
    pub fn from_text(text: &str) -> Self {
        Self {
            title: String::new(),
            text: text.to_string(),
            subject: String::new(),
            date: String::new(),
            label: Label::Authentic,
        }
    }
}

/// Records read from the combined file plus the rows that were skipped
#[derive(Debug, Clone)]
pub struct LoadedDataset {
    pub records: Vec<NewsRecord>,
    /// Rows with too few cells or a label cell that is not a boolean
    pub skipped_rows: usize,
}

/// Load the combined dataset with its typed schema.
///
/// Cells are split on every comma, matching how the combiner builds rows,
/// so a field that opens a quote without closing it stays in its own cell.
/// One layer of surrounding quotes is then removed from each cell (see
/// [`unquote_cell`]).
///
/// The header must match [`COMBINED_HEADER`] exactly. Rows without exactly
/// five cells or with a non-boolean label are skipped and counted; any I/O
/// or CSV error is returned.
pub fn load_combined(path: &Path) -> Result<LoadedDataset> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open combined dataset: {}", path.display()))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .from_reader(file);

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .clone();
    let header_cells: Vec<&str> = headers.iter().map(str::trim).collect();
    if header_cells != COMBINED_HEADER {
        bail!(
            "Unexpected header in {}: expected '{}', found '{}'",
            path.display(),
            COMBINED_HEADER.join(","),
            header_cells.join(",")
        );
    }

    let mut records = Vec::new();
    let mut skipped_rows = 0usize;

    for (idx, result) in reader.records().enumerate() {
        let row = result.with_context(|| format!("Failed to read record {} in {}", idx, path.display()))?;

        if row.len() != COMBINED_HEADER.len() {
            skipped_rows += 1;
            continue;
        }

        let Some(label) = row.get(4).and_then(Label::parse_cell) else {
            skipped_rows += 1;
            continue;
        };

        records.push(NewsRecord {
            title: unquote_cell(row.get(0).unwrap_or("")),
            text: unquote_cell(row.get(1).unwrap_or("")),
            subject: unquote_cell(row.get(2).unwrap_or("")),
            date: unquote_cell(row.get(3).unwrap_or("")),
            label,
        });
    }

    if skipped_rows > 0 {
        tracing::warn!(
            "Skipped {} rows in {} that did not match the schema",
            skipped_rows,
            path.display()
        );
    }
    tracing::info!("Loaded {} records from {}", records.len(), path.display());

    Ok(LoadedDataset {
        records,
        skipped_rows,
    })
}

/// Strip one layer of surrounding quotes and undo doubled quotes.
///
/// Cells that do not both start and end with `"` (such as a title whose
/// opening quote was cut off by the combiner's split) are kept verbatim.
pub fn unquote_cell(cell: &str) -> String {
    match cell.strip_prefix('"').and_then(|c| c.strip_suffix('"')) {
        Some(inner) => inner.replace("\"\"", "\""),
        None => cell.to_string(),
    }
}

/// Shuffle with a seeded ChaCha8 generator and split into (train, test).
///
/// The test partition holds `round(n * test_fraction)` records.
pub fn train_test_split(
    mut records: Vec<NewsRecord>,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<NewsRecord>, Vec<NewsRecord>)> {
    if !(0.0..1.0).contains(&test_fraction) {
        bail!("Test fraction must be in [0, 1), got {}", test_fraction);
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    records.shuffle(&mut rng);

    let n = records.len();
    let test_size = ((n as f64) * test_fraction).round() as usize;
    let test = records.split_off(n - test_size.min(n));

    tracing::debug!("Split {} records: train={}, test={}", n, records.len(), test.len());

    Ok((records, test))
}

/// Get label distribution for a set of records
pub fn label_distribution(records: &[NewsRecord]) -> HashMap<Label, usize> {
    let mut dist = HashMap::new();
    for record in records {
        *dist.entry(record.label).or_insert(0) += 1;
    }
    dist
}
