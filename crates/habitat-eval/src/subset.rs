//! Ordered feature subsets.

use crate::error::EvalError;

/// An ordered, duplicate-free selection of feature columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSubset {
    indices: Vec<usize>,
    n_features: usize,
}

impl FeatureSubset {
    /// Create a subset of `n_features` columns.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptySubset`] | `indices` is empty |
    /// | [`EvalError::FeatureOutOfRange`] | an index is `>= n_features` |
    /// | [`EvalError::DuplicateFeature`] | an index repeats |
    pub fn new(indices: Vec<usize>, n_features: usize) -> Result<Self, EvalError> {
        if indices.is_empty() {
            return Err(EvalError::EmptySubset);
        }
        let mut seen = vec![false; n_features];
        for &index in &indices {
            if index >= n_features {
                return Err(EvalError::FeatureOutOfRange { index, n_features });
            }
            if seen[index] {
                return Err(EvalError::DuplicateFeature { index });
            }
            seen[index] = true;
        }
        Ok(Self {
            indices,
            n_features,
        })
    }

    /// The subset containing every column in order.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::EmptySubset`] if `n_features` is zero.
    pub fn all(n_features: usize) -> Result<Self, EvalError> {
        Self::new((0..n_features).collect(), n_features)
    }

    /// Return a new subset with `index` appended.
    ///
    /// # Errors
    ///
    /// Same as [`FeatureSubset::new`].
    pub fn with(&self, index: usize) -> Result<Self, EvalError> {
        let mut indices = self.indices.clone();
        indices.push(index);
        Self::new(indices, self.n_features)
    }

    /// Whether `index` is already selected.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.indices.contains(&index)
    }

    /// Gather the selected columns of one row, in subset order.
    #[must_use]
    pub fn project(&self, row: &[f64]) -> Vec<f64> {
        self.indices.iter().map(|&i| row[i]).collect()
    }

    /// Gather the selected columns of every row.
    #[must_use]
    pub fn project_all(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.project(row)).collect()
    }

    /// Names of the selected columns.
    #[must_use]
    pub fn names(&self, feature_names: &[String]) -> Vec<String> {
        self.indices
            .iter()
            .map(|&i| feature_names.get(i).cloned().unwrap_or_else(|| format!("f{i}")))
            .collect()
    }

    /// Return the selected indices.
    #[must_use]
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    /// Return the number of selected features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// Always `false`; an empty subset cannot be constructed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Return the width of the full feature matrix.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.n_features
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_in_subset_order() {
        let subset = FeatureSubset::new(vec![2, 0], 3).unwrap();
        assert_eq!(subset.project(&[1.0, 2.0, 3.0]), vec![3.0, 1.0]);
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(subset.names(&names), vec!["c", "a"]);
    }

    #[test]
    fn with_appends() {
        let subset = FeatureSubset::new(vec![1], 3).unwrap().with(0).unwrap();
        assert_eq!(subset.indices(), &[1, 0]);
        assert!(subset.contains(0));
        assert!(!subset.contains(2));
        assert!(matches!(subset.with(1), Err(EvalError::DuplicateFeature { index: 1 })));
    }

    #[test]
    fn rejects_invalid_subsets() {
        assert!(matches!(FeatureSubset::new(vec![], 3), Err(EvalError::EmptySubset)));
        assert!(matches!(
            FeatureSubset::new(vec![3], 3),
            Err(EvalError::FeatureOutOfRange {
                index: 3,
                n_features: 3
            })
        ));
        assert!(matches!(FeatureSubset::all(0), Err(EvalError::EmptySubset)));
    }
}
