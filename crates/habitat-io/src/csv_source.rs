//! Shared CSV plumbing for the sample and cell readers.

use std::collections::HashMap;
use std::fs::File;
use std::path::Path;

use crate::IoError;

/// Open `path` as a headed CSV.
///
/// `flexible(true)` lets rows of any width through so the readers can report
/// [`IoError::InconsistentRowLength`] instead of a generic parse error.
pub(crate) fn open(path: &Path) -> Result<csv::Reader<File>, IoError> {
    let file = File::open(path).map_err(|e| IoError::FileNotFound {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok(csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file))
}

pub(crate) fn parse_error(path: &Path, e: csv::Error) -> IoError {
    IoError::CsvParse {
        path: path.to_path_buf(),
        offset: e.position().map_or(0, |p| p.byte()),
        source: e,
    }
}

/// Parse one numeric cell, rejecting NaN and infinities.
pub(crate) fn parse_finite(
    path: &Path,
    row_index: usize,
    column: &str,
    raw: &str,
) -> Result<f64, IoError> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(IoError::NonFiniteValue {
            path: path.to_path_buf(),
            row_index,
            column: column.to_string(),
            raw: raw.to_string(),
        }),
    }
}

/// Tracks IDs already seen and the row they first appeared on.
#[derive(Default)]
pub(crate) struct SeenIds(HashMap<String, usize>);

impl SeenIds {
    pub(crate) fn insert(&mut self, path: &Path, id: &str, row_index: usize) -> Result<(), IoError> {
        if let Some(&first_row) = self.0.get(id) {
            return Err(IoError::DuplicateId {
                path: path.to_path_buf(),
                id: id.to_string(),
                first_row,
                second_row: row_index,
            });
        }
        self.0.insert(id.to_string(), row_index);
        Ok(())
    }
}

/// Check a record against the header width.
pub(crate) fn check_width(
    path: &Path,
    record: &csv::StringRecord,
    row_index: usize,
    expected: usize,
) -> Result<(), IoError> {
    if record.len() != expected {
        return Err(IoError::InconsistentRowLength {
            path: path.to_path_buf(),
            row_index,
            id: record.get(0).unwrap_or("").to_string(),
            expected,
            got: record.len(),
        });
    }
    Ok(())
}
