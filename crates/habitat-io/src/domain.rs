//! Domain types for habitat-io.

use crate::IoError;

/// An occurrence sample identifier, from the first column of a sample CSV.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SampleId(String);

impl SampleId {
    pub(crate) fn new(id: String) -> Self {
        Self(id)
    }

    /// Return the sample ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SampleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A raster grid cell identifier, from the first column of a cell CSV.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellId(String);

impl CellId {
    pub(crate) fn new(id: String) -> Self {
        Self(id)
    }

    /// Return the cell ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CellId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve `names` to column positions in `available`.
fn column_indices(available: &[String], names: &[String]) -> Result<Vec<usize>, IoError> {
    names
        .iter()
        .map(|name| {
            available
                .iter()
                .position(|a| a == name)
                .ok_or_else(|| IoError::MissingFeature {
                    name: name.clone(),
                    available: available.to_vec(),
                })
        })
        .collect()
}

fn reorder(rows: &[Vec<f64>], indices: &[usize]) -> Vec<Vec<f64>> {
    rows.iter()
        .map(|row| indices.iter().map(|&i| row[i]).collect())
        .collect()
}

/// Labelled occurrence samples.
///
/// Produced by [`SampleReader`](crate::SampleReader). `ids[i]`, `labels[i]`
/// and `features[i]` describe the same sample.
#[derive(Debug, Clone)]
pub struct SampleSet {
    ids: Vec<SampleId>,
    labels: Vec<bool>,
    feature_names: Vec<String>,
    features: Vec<Vec<f64>>,
}

impl SampleSet {
    pub(crate) fn new(
        ids: Vec<SampleId>,
        labels: Vec<bool>,
        feature_names: Vec<String>,
        features: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            ids,
            labels,
            feature_names,
            features,
        }
    }

    /// Return the sample IDs.
    #[must_use]
    pub fn ids(&self) -> &[SampleId] {
        &self.ids
    }

    /// Return the presence labels (`true` = presence).
    #[must_use]
    pub fn labels(&self) -> &[bool] {
        &self.labels
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the feature matrix (row-major).
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the number of samples.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.ids.len()
    }

    /// Return the number of feature columns.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the number of presence samples.
    #[must_use]
    pub fn n_presences(&self) -> usize {
        self.labels.iter().filter(|&&l| l).count()
    }

    /// Positions of `names` among the feature columns.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::MissingFeature`] for the first unknown name.
    pub fn feature_indices(&self, names: &[String]) -> Result<Vec<usize>, IoError> {
        column_indices(&self.feature_names, names)
    }

    /// Keep only the columns in `names`, in that order.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::MissingFeature`] for the first unknown name.
    pub fn select_columns(&self, names: &[String]) -> Result<Self, IoError> {
        let indices = self.feature_indices(names)?;
        Ok(Self {
            ids: self.ids.clone(),
            labels: self.labels.clone(),
            feature_names: names.to_vec(),
            features: reorder(&self.features, &indices),
        })
    }
}

/// Environmental covariates for raster grid cells.
///
/// Produced by [`CellReader`](crate::CellReader). `ids[i]`, `coords[i]` and
/// `features[i]` describe the same cell.
#[derive(Debug, Clone)]
pub struct CellGrid {
    ids: Vec<CellId>,
    coords: Vec<(f64, f64)>,
    feature_names: Vec<String>,
    features: Vec<Vec<f64>>,
}

impl CellGrid {
    pub(crate) fn new(
        ids: Vec<CellId>,
        coords: Vec<(f64, f64)>,
        feature_names: Vec<String>,
        features: Vec<Vec<f64>>,
    ) -> Self {
        Self {
            ids,
            coords,
            feature_names,
            features,
        }
    }

    /// Return the cell IDs.
    #[must_use]
    pub fn ids(&self) -> &[CellId] {
        &self.ids
    }

    /// Return the `(x, y)` coordinates of each cell.
    #[must_use]
    pub fn coords(&self) -> &[(f64, f64)] {
        &self.coords
    }

    /// Return the feature column names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the feature matrix (row-major).
    #[must_use]
    pub fn features(&self) -> &[Vec<f64>] {
        &self.features
    }

    /// Return the number of cells.
    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.ids.len()
    }

    /// Reorder the columns to match `names`, e.g. a fitted model's features.
    ///
    /// Extra columns are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::MissingFeature`] for the first unknown name.
    pub fn select_columns(&self, names: &[String]) -> Result<Self, IoError> {
        let indices = column_indices(&self.feature_names, names)?;
        Ok(Self {
            ids: self.ids.clone(),
            coords: self.coords.clone(),
            feature_names: names.to_vec(),
            features: reorder(&self.features, &indices),
        })
    }

    /// Keep only the first `n` cells.
    #[must_use]
    pub fn truncate(mut self, n: usize) -> Self {
        self.ids.truncate(n);
        self.coords.truncate(n);
        self.features.truncate(n);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> CellGrid {
        CellGrid::new(
            vec![CellId::new("c1".into()), CellId::new("c2".into())],
            vec![(0.0, 0.0), (1.0, 0.0)],
            vec!["bio1".into(), "bio12".into(), "elev".into()],
            vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]],
        )
    }

    #[test]
    fn sample_id_as_str_returns_inner() {
        let id = SampleId::new("occ_0001".to_string());
        assert_eq!(id.as_str(), "occ_0001");
    }

    #[test]
    fn experiment_name_valid() {
        let name = ExperimentName::new("lynx-2024_a".to_string());
        assert_eq!(name.unwrap().as_str(), "lynx-2024_a");
    }

    #[test]
    fn experiment_name_rejects_empty() {
        let name = ExperimentName::new(String::new());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn experiment_name_rejects_special_chars() {
        let name = ExperimentName::new("lynx/2024".to_string());
        assert!(matches!(name, Err(IoError::InvalidExperimentName { .. })));
    }

    #[test]
    fn select_columns_reorders() {
        let selected = grid()
            .select_columns(&["elev".to_string(), "bio1".to_string()])
            .unwrap();
        assert_eq!(selected.feature_names(), &["elev", "bio1"]);
        assert_eq!(selected.features()[1], vec![6.0, 4.0]);
        assert_eq!(selected.n_cells(), 2);
    }

    #[test]
    fn select_columns_missing_feature() {
        let err = grid().select_columns(&["slope".to_string()]).unwrap_err();
        assert!(matches!(err, IoError::MissingFeature { ref name, .. } if name == "slope"));
    }

    #[test]
    fn sample_feature_indices() {
        let set = SampleSet::new(
            vec![SampleId::new("s1".into())],
            vec![true],
            vec!["a".into(), "b".into()],
            vec![vec![1.0, 2.0]],
        );
        assert_eq!(set.feature_indices(&["b".to_string()]).unwrap(), vec![1]);
        assert_eq!(set.n_presences(), 1);
    }

    #[test]
    fn truncate_keeps_prefix() {
        let grid = grid().truncate(1);
        assert_eq!(grid.n_cells(), 1);
        assert_eq!(grid.ids()[0].as_str(), "c1");
    }
}
