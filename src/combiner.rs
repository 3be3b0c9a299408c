// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2024 Hyperpolymath

//! Merge the true/fake news CSV files into one labeled dataset
//!
//! Source lines are split naively on `,` (no quote awareness). Lines with
//! fewer than four parts are dropped without any error. The first four parts
//! are quoted unless they already start with a quote, and the label literal
//! is appended: `false` for the true file, `true` for the fake file.

use crate::datasets::{Label, COMBINED_HEADER};
use crate::pipeline::PipelineConfig;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Number of leading source fields carried into the combined file
const FIELD_COUNT: usize = 4;

/// Row counts produced by one combination run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CombineSummary {
    /// Rows written from the true dataset
    pub true_rows: usize,
    /// Rows written from the fake dataset
    pub fake_rows: usize,
    /// Source lines with fewer than four fields
    pub dropped_rows: usize,
}

impl CombineSummary {
    pub fn total_rows(&self) -> usize {
        self.true_rows + self.fake_rows
    }
}

/// Result of [`ensure_combined`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineOutcome {
    /// The combined file existed; nothing was written
    AlreadyPresent,
    /// The combined file was (re)written
    Created(CombineSummary),
}

/// Wrap a field in quotes, doubling embedded quotes, unless it already
/// starts with a quote character.
pub fn quote_field(field: &str) -> Cow<'_, str> {
    if field.starts_with('"') {
        Cow::Borrowed(field)
    } else {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    }
}

/// Turn one source line into a combined row, or `None` if it has fewer
/// than four comma-separated parts.
pub fn combine_line(line: &str, label: Label) -> Option<String> {
    let parts: Vec<&str> = line.split(',').collect();
    if parts.len() < FIELD_COUNT {
        return None;
    }

    let mut row = String::with_capacity(line.len() + 16);
    for part in &parts[..FIELD_COUNT] {
        row.push_str(&quote_field(part));
        row.push(',');
    }
    row.push_str(label.as_csv_literal());
    Some(row)
}

/// Create the combined file only if it does not exist yet (or `force_combine`
/// is set). No freshness check against the source files is made.
pub fn ensure_combined<W: Write>(config: &PipelineConfig, out: &mut W) -> Result<CombineOutcome> {
    if config.combined_path.exists() && !config.force_combine {
        tracing::info!(
            "Combined dataset already present at {}, skipping",
            config.combined_path.display()
        );
        return Ok(CombineOutcome::AlreadyPresent);
    }

    let summary = combine_datasets(&config.true_path, &config.fake_path, &config.combined_path, out)?;
    Ok(CombineOutcome::Created(summary))
}

/// Combine the two source files into `combined_path`, overwriting it.
///
/// Both sources are opened before anything is written and the output is
/// written to a sibling temporary file that replaces `combined_path` only
/// once every row has been written.
pub fn combine_datasets<W: Write>(
    true_path: &Path,
    fake_path: &Path,
    combined_path: &Path,
    out: &mut W,
) -> Result<CombineSummary> {
    writeln!(
        out,
        "Menggabungkan {} dan {}...",
        display_name(true_path),
        display_name(fake_path)
    )?;

    let true_reader = open_source(true_path)?;
    let fake_reader = open_source(fake_path)?;

    let staging_path = staging_path(combined_path);
    let summary = match write_staging(&staging_path, (true_reader, true_path), (fake_reader, fake_path)) {
        Ok(summary) => summary,
        Err(e) => {
            if let Err(remove_err) = std::fs::remove_file(&staging_path) {
                tracing::debug!("Could not remove {}: {}", staging_path.display(), remove_err);
            }
            return Err(e);
        }
    };

    std::fs::rename(&staging_path, combined_path).with_context(|| {
        format!(
            "Failed to move {} to {}",
            staging_path.display(),
            combined_path.display()
        )
    })?;

    tracing::debug!(
        "Combined {} true rows and {} fake rows, dropped {} short lines",
        summary.true_rows,
        summary.fake_rows,
        summary.dropped_rows
    );

    writeln!(
        out,
        "✅ File {} berhasil dibuat dengan format aman.",
        display_name(combined_path)
    )?;

    Ok(summary)
}

fn open_source(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).with_context(|| format!("Failed to open source dataset: {}", path.display()))?;
    Ok(BufReader::new(file))
}

/// Write the header and both sources to the staging file
fn write_staging<R: BufRead>(
    staging_path: &Path,
    (true_reader, true_path): (R, &Path),
    (fake_reader, fake_path): (R, &Path),
) -> Result<CombineSummary> {
    let file = File::create(staging_path)
        .with_context(|| format!("Failed to create {}", staging_path.display()))?;
    let mut writer = BufWriter::new(file);
    let mut summary = CombineSummary::default();

    writeln!(writer, "{}", COMBINED_HEADER.join(","))?;

    let (written, dropped) = copy_rows(true_reader, true_path, Label::Authentic, &mut writer)?;
    summary.true_rows = written;
    summary.dropped_rows += dropped;

    let (written, dropped) = copy_rows(fake_reader, fake_path, Label::Hoax, &mut writer)?;
    summary.fake_rows = written;
    summary.dropped_rows += dropped;

    writer
        .flush()
        .with_context(|| format!("Failed to write {}", staging_path.display()))?;

    Ok(summary)
}

/// Copy every data line (header skipped) and return (written, dropped).
///
/// Invalid UTF-8 is replaced with U+FFFD rather than failing the run.
fn copy_rows<R: BufRead, W: Write>(
    mut reader: R,
    source: &Path,
    label: Label,
    writer: &mut W,
) -> Result<(usize, usize)> {
    let mut written = 0usize;
    let mut dropped = 0usize;
    let mut buffer = Vec::new();
    let mut idx = 0usize;

    loop {
        buffer.clear();
        let bytes_read = reader
            .read_until(b'\n', &mut buffer)
            .with_context(|| format!("Failed to read line {} in {}", idx, source.display()))?;
        if bytes_read == 0 {
            break;
        }
        idx += 1;
        if idx == 1 {
            continue;
        }

        let line = String::from_utf8_lossy(trim_line_ending(&buffer));
        match combine_line(&line, label) {
            Some(row) => {
                writeln!(writer, "{}", row)?;
                written += 1;
            }
            None => dropped += 1,
        }
    }

    Ok((written, dropped))
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

fn staging_path(combined_path: &Path) -> PathBuf {
    let mut name = combined_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    combined_path.with_file_name(name)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
