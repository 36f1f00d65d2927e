//! CSV reader for raster grid cells.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::csv_source::{self, SeenIds};
use crate::domain::{CellGrid, CellId};

/// Leading non-feature columns: `cell_id`, `x`, `y`.
const ID_COLUMNS: usize = 3;

/// Reads per-cell environmental covariates from a CSV file.
///
/// Expected CSV format: `cell_id,x,y,feature1,...,featureN`, one row per
/// cell. Coordinates must be finite like every feature.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::NoFeatureColumns`] | No columns after `y` |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::InconsistentRowLength`] | Row has different column count than header |
/// | [`IoError::NonFiniteValue`] | Coordinate or feature is NaN, Inf, or unparseable |
/// | [`IoError::DuplicateId`] | Same cell_id appears twice |
pub struct CellReader {
    path: PathBuf,
}

impl CellReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning a [`CellGrid`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<CellGrid, IoError> {
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
        let columns: Vec<String> = header.iter().map(String::from).collect();

        let mut ids = Vec::new();
        let mut coords = Vec::new();
        let mut features = Vec::new();
        let mut seen = SeenIds::default();

        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| csv_source::parse_error(path, e))?;
            csv_source::check_width(path, &record, row_index, expected_cols)?;

            let id = record.get(0).unwrap_or("");
            seen.insert(path, id, row_index)?;

            let values = record
                .iter()
                .zip(&columns)
                .skip(1)
                .map(|(raw, column)| csv_source::parse_finite(path, row_index, column, raw))
                .collect::<Result<Vec<_>, _>>()?;

            ids.push(CellId::new(id.to_string()));
            coords.push((values[0], values[1]));
            features.push(values[2..].to_vec());
        }

        if ids.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let feature_names = columns[ID_COLUMNS..].to_vec();
        let grid = CellGrid::new(ids, coords, feature_names, features);
        info!(
            n_cells = grid.n_cells(),
            n_features = grid.feature_names().len(),
            "cell grid loaded"
        );
        Ok(grid)
    }
}
