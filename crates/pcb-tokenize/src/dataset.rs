//! Batch encoding of board collections into a one-board-per-line corpus.

use crate::error::TokenizeError;
use crate::{board_to_tokens, ConvertOptions};
use log::{info, warn};
use serde::Serialize;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct DatasetFailure {
    /// File path, or `archive.zip:entry` for archive members.
    pub source: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DatasetSummary {
    pub encoded: usize,
    pub failures: Vec<DatasetFailure>,
    /// Length in characters of the longest token string written.
    pub longest_line: usize,
}

impl DatasetSummary {
    fn fail(&mut self, source: String, error: impl std::fmt::Display) {
        warn!("skipping {source}: {error}");
        self.failures.push(DatasetFailure {
            source,
            message: error.to_string(),
        });
    }
}

fn is_board_name(name: &str) -> bool {
    let lower = name.to_lowercase();
    lower.ends_with(".brd") || lower.ends_with(".brd.gz")
}

fn is_archive(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"))
}

/// Board files and archives below `path`, in a stable order.
fn collect_sources(path: &Path, out: &mut Vec<PathBuf>) -> Result<(), TokenizeError> {
    if path.is_dir() {
        let mut entries = std::fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort();
        for entry in entries {
            collect_sources(&entry, out)?;
        }
    } else if is_archive(path) || path.to_str().is_some_and(is_board_name) {
        out.push(path.to_path_buf());
    }
    Ok(())
}

/// Writes one encoded board per line, collecting failures instead of
/// aborting the batch. Only write errors on `out` are returned.
pub fn build_dataset<W: Write>(
    inputs: &[PathBuf],
    opts: &ConvertOptions,
    out: &mut W,
) -> Result<DatasetSummary, TokenizeError> {
    let mut sources = Vec::new();
    for input in inputs {
        collect_sources(input, &mut sources)?;
    }

    let mut summary = DatasetSummary::default();
    for source in &sources {
        let label = source.display().to_string();
        let data = match std::fs::read(source) {
            Ok(d) => d,
            Err(e) => {
                summary.fail(label, e);
                continue;
            }
        };
        if is_archive(source) {
            encode_archive(&data, &label, opts, out, &mut summary)?;
        } else {
            encode_board(&data, label, opts, out, &mut summary)?;
        }
    }
    info!(
        "encoded {} boards, {} failures",
        summary.encoded,
        summary.failures.len()
    );
    Ok(summary)
}

/// Encode every board member of a zip archive.
pub fn encode_archive<W: Write>(
    data: &[u8],
    label: &str,
    opts: &ConvertOptions,
    out: &mut W,
    summary: &mut DatasetSummary,
) -> Result<(), TokenizeError> {
    let mut archive = match zip::ZipArchive::new(Cursor::new(data)) {
        Ok(a) => a,
        Err(e) => {
            summary.fail(label.to_string(), e);
            return Ok(());
        }
    };

    for i in 0..archive.len() {
        let mut file = match archive.by_index(i) {
            Ok(f) => f,
            Err(e) => {
                summary.fail(format!("{label}:#{i}"), e);
                continue;
            }
        };
        if file.is_dir() || !is_board_name(file.name()) {
            continue;
        }
        let source = format!("{label}:{}", file.name());
        let mut content = Vec::new();
        if let Err(e) = file.read_to_end(&mut content) {
            summary.fail(source, e);
            continue;
        }
        encode_board(&content, source, opts, out, summary)?;
    }
    Ok(())
}

fn encode_board<W: Write>(
    data: &[u8],
    source: String,
    opts: &ConvertOptions,
    out: &mut W,
    summary: &mut DatasetSummary,
) -> Result<(), TokenizeError> {
    match board_to_tokens(data, opts) {
        Ok(tokens) => {
            info!("encoded {source} ({} chars)", tokens.chars().count());
            summary.longest_line = summary.longest_line.max(tokens.chars().count());
            summary.encoded += 1;
            writeln!(out, "{tokens}")?;
        }
        Err(e) => summary.fail(source, e),
    }
    Ok(())
}
