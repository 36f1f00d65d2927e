//! Gaussian Naive Bayes training.

use tracing::{debug, info, instrument};

use crate::class::Class;
use crate::config::{GaussianNbConfig, VariancePolicy};
use crate::error::NbError;
use crate::stats::ClassStats;

/// A fitted Gaussian Naive Bayes presence/absence classifier.
///
/// Immutable once fitted. Use [`GaussianNaiveBayes::with_threshold`] to get a
/// copy with a different decision threshold.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct GaussianNaiveBayes {
    pub(crate) presence: ClassStats,
    pub(crate) absence: ClassStats,
    pub(crate) feature_names: Vec<String>,
    pub(crate) threshold: f64,
}

/// A model that maps a feature vector to P(presence | x).
///
/// Cross-validation and Shapley estimation are written against this trait.
pub trait Classifier: Sync {
    /// Number of features the model expects per sample.
    fn n_features(&self) -> usize;

    /// Probability of the positive class for one sample.
    ///
    /// # Errors
    ///
    /// Implementations return an error when the sample cannot be scored,
    /// e.g. on a feature-count mismatch.
    fn probability(&self, sample: &[f64]) -> Result<f64, NbError>;
}

impl Classifier for GaussianNaiveBayes {
    fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    fn probability(&self, sample: &[f64]) -> Result<f64, NbError> {
        self.predict_proba(sample)
    }
}

/// Validate the training set and return the feature count.
fn validate_inputs(
    features: &[Vec<f64>],
    labels: &[bool],
    feature_names: &[String],
) -> Result<usize, NbError> {
    if features.is_empty() {
        return Err(NbError::EmptyDataset);
    }
    if features.len() != labels.len() {
        return Err(NbError::LabelCountMismatch {
            features: features.len(),
            labels: labels.len(),
        });
    }
    let n_features = features[0].len();
    if n_features == 0 {
        return Err(NbError::ZeroFeatures);
    }
    for (sample_index, row) in features.iter().enumerate() {
        if row.len() != n_features {
            return Err(NbError::FeatureCountMismatch {
                expected: n_features,
                got: row.len(),
                sample_index,
            });
        }
        if let Some(feature_index) = row.iter().position(|v| !v.is_finite()) {
            return Err(NbError::NonFiniteValue {
                sample_index,
                feature_index,
            });
        }
    }
    if feature_names.len() != n_features {
        return Err(NbError::FeatureNameMismatch {
            names: feature_names.len(),
            n_features,
        });
    }
    Ok(n_features)
}

#[instrument(skip_all, fields(n_samples = features.len()))]
pub(crate) fn train(
    config: &GaussianNbConfig,
    features: &[Vec<f64>],
    labels: &[bool],
    feature_names: &[String],
) -> Result<GaussianNaiveBayes, NbError> {
    config.validate()?;
    let n_features = validate_inputs(features, labels, feature_names)?;
    let n_samples = features.len();

    let mut presence_rows: Vec<&[f64]> = Vec::new();
    let mut absence_rows: Vec<&[f64]> = Vec::new();
    for (row, &label) in features.iter().zip(labels) {
        match Class::from_label(label) {
            Class::Presence => presence_rows.push(row),
            Class::Absence => absence_rows.push(row),
        }
    }

    let policy: VariancePolicy = config.variance_policy;
    let presence =
        ClassStats::estimate(Class::Presence, &presence_rows, n_features, n_samples, policy)?;
    let absence =
        ClassStats::estimate(Class::Absence, &absence_rows, n_features, n_samples, policy)?;

    debug!(
        presence_prior = presence.prior,
        absence_prior = absence.prior,
        "class priors estimated"
    );
    info!(
        n_samples,
        n_features,
        n_presence = presence.n_samples,
        n_absence = absence.n_samples,
        "naive bayes fitted"
    );

    Ok(GaussianNaiveBayes {
        presence,
        absence,
        feature_names: feature_names.to_vec(),
        threshold: config.threshold,
    })
}

impl GaussianNaiveBayes {
    /// Return the presence-class statistics.
    #[must_use]
    pub fn presence(&self) -> &ClassStats {
        &self.presence
    }

    /// Return the absence-class statistics.
    #[must_use]
    pub fn absence(&self) -> &ClassStats {
        &self.absence
    }

    /// Return the statistics for `class`.
    #[must_use]
    pub fn class_stats(&self, class: Class) -> &ClassStats {
        match class {
            Class::Presence => &self.presence,
            Class::Absence => &self.absence,
        }
    }

    /// Return the number of features this model was trained on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Return the feature names.
    #[must_use]
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Return the decision threshold used by [`GaussianNaiveBayes::predict`].
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Return a copy of this model that classifies at `threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`NbError::InvalidThreshold`] if `threshold` is outside [0, 1].
    pub fn with_threshold(&self, threshold: f64) -> Result<Self, NbError> {
        crate::config::validate_threshold(threshold)?;
        Ok(Self {
            threshold,
            ..self.clone()
        })
    }
}
