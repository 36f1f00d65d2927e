//! Posterior computation and batch prediction.

use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

use crate::config::validate_threshold;
use crate::error::NbError;
use crate::model::GaussianNaiveBayes;
use crate::stats::log_odds;

impl GaussianNaiveBayes {
    fn check_sample(&self, sample: &[f64]) -> Result<(), NbError> {
        if sample.len() != self.n_features() {
            return Err(NbError::PredictionFeatureMismatch {
                expected: self.n_features(),
                got: sample.len(),
            });
        }
        if let Some(feature_index) = sample.iter().position(|v| !v.is_finite()) {
            return Err(NbError::NonFiniteInput { feature_index });
        }
        Ok(())
    }

    /// Return P(presence | x) for a single sample.
    ///
    /// Normalizes the two unnormalized joint likelihoods,
    /// `P(+) / (P(+) + P(-))`, through the per-feature log odds so that
    /// samples far from both class means neither underflow to `0 / 0` nor
    /// overflow to `inf - inf`. The result is always in [0, 1].
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`NbError::PredictionFeatureMismatch`] | `sample.len() != n_features` |
    /// | [`NbError::NonFiniteInput`] | sample contains NaN or infinity |
    pub fn predict_proba(&self, sample: &[f64]) -> Result<f64, NbError> {
        self.check_sample(sample)?;
        let odds = log_odds(&self.presence, &self.absence, sample);
        Ok(1.0 / (1.0 + (-odds).exp()))
    }

    /// Classify a sample at the model's stored threshold.
    ///
    /// # Errors
    ///
    /// Same as [`GaussianNaiveBayes::predict_proba`].
    pub fn predict(&self, sample: &[f64]) -> Result<bool, NbError> {
        Ok(self.predict_proba(sample)? >= self.threshold)
    }

    /// Classify a sample at a caller-supplied threshold.
    ///
    /// # Errors
    ///
    /// Returns [`NbError::InvalidThreshold`] for a threshold outside [0, 1],
    /// otherwise the same errors as [`GaussianNaiveBayes::predict_proba`].
    pub fn predict_with_threshold(&self, sample: &[f64], threshold: f64) -> Result<bool, NbError> {
        validate_threshold(threshold)?;
        Ok(self.predict_proba(sample)? >= threshold)
    }

    /// Return P(presence | x) for a batch of samples in parallel.
    ///
    /// Output slot `i` belongs to `samples[i]`.
    ///
    /// # Errors
    ///
    /// Returns the first per-sample error encountered.
    pub fn predict_proba_batch(&self, samples: &[Vec<f64>]) -> Result<Vec<f64>, NbError> {
        samples
            .par_iter()
            .map(|sample| self.predict_proba(sample))
            .collect()
    }

    /// Classify a batch of samples in parallel at the stored threshold.
    ///
    /// # Errors
    ///
    /// Returns the first per-sample error encountered.
    pub fn predict_batch(&self, samples: &[Vec<f64>]) -> Result<Vec<bool>, NbError> {
        samples
            .par_iter()
            .map(|sample| self.predict(sample))
            .collect()
    }
}
