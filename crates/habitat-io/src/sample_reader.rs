//! CSV reader for labelled occurrence samples.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::csv_source::{self, SeenIds};
use crate::domain::{SampleId, SampleSet};

/// Leading non-feature columns: `sample_id`, `presence`.
const ID_COLUMNS: usize = 2;

/// Reads labelled presence/absence samples from a CSV file.
///
/// Expected CSV format:
/// - Header row required: `sample_id,presence,feature1,...,featureN`
/// - `presence` is one of `1/0`, `true/false`, `presence/absence` (any case)
/// - One row per sample, all rows must have the same number of columns
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoFeatureColumns`] | No columns after `presence` |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::InvalidLabel`] | Unrecognised presence value |
/// | [`IoError::NonFiniteValue`] | Feature is NaN, Inf, or unparseable |
/// | [`IoError::DuplicateId`] | Same sample_id appears twice |
pub struct SampleReader {
    path: PathBuf,
}

fn parse_label(raw: &str) -> Option<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "presence" => Some(true),
        "0" | "false" | "absence" => Some(false),
        _ => None,
    }
}

impl SampleReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`SampleSet`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<SampleSet, IoError> {
        let path = self.path.as_path();
        let mut rdr = csv_source::open(path)?;

        let header = rdr
            .headers()
            .map_err(|e| csv_source::parse_error(path, e))?
            .clone();
        let expected_cols = header.len();
        debug!(expected_cols, "read CSV header");
        if expected_cols <= ID_COLUMNS {
            return Err(IoError::NoFeatureColumns {
                path: self.path.clone(),
                min_columns: ID_COLUMNS + 1,
            });
        }
        let feature_names: Vec<String> = header.iter().skip(ID_COLUMNS).map(String::from).collect();

        let mut ids = Vec::new();
        let mut labels = Vec::new();
        let mut features = Vec::new();
        let mut seen = SeenIds::default();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| csv_source::parse_error(path, e))?;
            csv_source::check_width(path, &record, row_index, expected_cols)?;

            let id = record.get(0).unwrap_or("");
            seen.insert(path, id, row_index)?;

            let raw_label = record.get(1).unwrap_or("");
            let label = parse_label(raw_label).ok_or_else(|| IoError::InvalidLabel {
                path: self.path.clone(),
                row_index,
                raw: raw_label.to_string(),
            })?;

            let row = record
                .iter()
                .skip(ID_COLUMNS)
                .zip(&feature_names)
                .map(|(raw, column)| csv_source::parse_finite(path, row_index, column, raw))
                .collect::<Result<Vec<_>, _>>()?;

            ids.push(SampleId::new(id.to_string()));
            labels.push(label);
            features.push(row);
        }

        if ids.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let set = SampleSet::new(ids, labels, feature_names, features);
        info!(
            n_samples = set.n_samples(),
            n_presences = set.n_presences(),
            n_features = set.n_features(),
            "sample set loaded"
        );
        Ok(set)
    }
}
