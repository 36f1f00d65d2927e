//! Configuration builder for Gaussian Naive Bayes training.

use crate::error::NbError;
use crate::model::GaussianNaiveBayes;

/// Default lower bound applied to per-class feature variances.
pub const DEFAULT_VARIANCE_FLOOR: f64 = 1e-9;

/// Default decision threshold on P(presence | x).
pub const DEFAULT_THRESHOLD: f64 = 0.5;

/// How to treat a feature whose variance within a class is (near) zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VariancePolicy {
    /// Clamp every per-class variance from below at the given epsilon.
    Floor(f64),
    /// Fail with [`NbError::ZeroVariance`] when a class has a constant feature.
    Reject,
}

/// Configuration for Gaussian Naive Bayes training.
///
/// Construct via [`GaussianNbConfig::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter         | Default        |
/// |-------------------|----------------|
/// | `variance_policy` | `Floor(1e-9)`  |
/// | `threshold`       | 0.5            |
#[derive(Debug, Clone)]
pub struct GaussianNbConfig {
    pub(crate) variance_policy: VariancePolicy,
    pub(crate) threshold: f64,
}

impl Default for GaussianNbConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl GaussianNbConfig {
    /// Create a config with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            variance_policy: VariancePolicy::Floor(DEFAULT_VARIANCE_FLOOR),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Set the zero-variance policy.
    #[must_use]
    pub fn with_variance_policy(mut self, variance_policy: VariancePolicy) -> Self {
        self.variance_policy = variance_policy;
        self
    }

    /// Set the decision threshold stored in the fitted model.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Return the zero-variance policy.
    #[must_use]
    pub fn variance_policy(&self) -> VariancePolicy {
        self.variance_policy
    }

    /// Return the decision threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Validate the configuration without fitting.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`NbError::InvalidThreshold`] | threshold outside [0, 1] or NaN |
    /// | [`NbError::InvalidVarianceFloor`] | floor not finite or not > 0 |
    pub fn validate(&self) -> Result<(), NbError> {
        validate_threshold(self.threshold)?;
        if let VariancePolicy::Floor(floor) = self.variance_policy
            && !(floor.is_finite() && floor > 0.0)
        {
            return Err(NbError::InvalidVarianceFloor { floor });
        }
        Ok(())
    }

    /// Fit a classifier on the provided dataset.
    ///
    /// `features[sample_idx][feature_idx]`: row-major layout.
    /// `labels[sample_idx]`: `true` for presence, `false` for absence.
    /// `feature_names`: one name per feature column.
    ///
    /// # Errors
    ///
    /// | Variant                          | When                                         |
    /// |----------------------------------|----------------------------------------------|
    /// | [`NbError::EmptyDataset`]        | `features` is empty                          |
    /// | [`NbError::LabelCountMismatch`]  | row count differs from label count           |
    /// | [`NbError::ZeroFeatures`]        | rows have zero feature columns               |
    /// | [`NbError::FeatureCountMismatch`]| rows have inconsistent lengths               |
    /// | [`NbError::FeatureNameMismatch`] | name count differs from column count         |
    /// | [`NbError::NonFiniteValue`]      | any value is NaN or infinite                 |
    /// | [`NbError::EmptyClass`]          | no presences or no absences                  |
    /// | [`NbError::ZeroVariance`]        | constant feature under `Reject`              |
    /// | config errors                    | see [`GaussianNbConfig::validate`]           |
    pub fn fit(
        &self,
        features: &[Vec<f64>],
        labels: &[bool],
        feature_names: &[String],
    ) -> Result<GaussianNaiveBayes, NbError> {
        crate::model::train(self, features, labels, feature_names)
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<(), NbError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(NbError::InvalidThreshold { threshold });
    }
    Ok(())
}
