//! Permutation-sampling Shapley value estimator.

use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rayon::iter::{IndexedParallelIterator, IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use habitat_nb::Classifier;

use crate::error::ShapError;

/// Default number of Monte-Carlo draws per feature.
pub const DEFAULT_DRAWS: usize = 50;

/// Shapley estimator configuration.
///
/// Construct via [`ShapleyEstimator::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter         | Default |
/// |-------------------|---------|
/// | `n_draws`         | 50      |
/// | `seed`            | 42      |
/// | `non_finite_fill` | `None`  |
#[derive(Debug, Clone)]
pub struct ShapleyEstimator {
    n_draws: usize,
    seed: u64,
    non_finite_fill: Option<f64>,
}

/// Per-feature Shapley values for one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    /// One value per feature, in model feature order.
    pub values: Vec<f64>,
    /// P(presence | x) for the explained observation.
    pub probability: f64,
}

impl Default for ShapleyEstimator {
    fn default() -> Self {
        Self {
            n_draws: DEFAULT_DRAWS,
            seed: 42,
            non_finite_fill: None,
        }
    }
}

impl ShapleyEstimator {
    /// Create an estimator that averages `n_draws` permutations per feature.
    ///
    /// # Errors
    ///
    /// Returns [`ShapError::InvalidDrawCount`] if `n_draws` is zero.
    pub fn new(n_draws: usize) -> Result<Self, ShapError> {
        if n_draws == 0 {
            return Err(ShapError::InvalidDrawCount { n_draws });
        }
        Ok(Self {
            n_draws,
            ..Self::default()
        })
    }

    /// Set the master random seed.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Replace non-finite model outputs with `fill` instead of failing.
    #[must_use]
    pub fn with_non_finite_fill(mut self, fill: Option<f64>) -> Self {
        self.non_finite_fill = fill;
        self
    }

    /// Return the number of draws per feature.
    #[must_use]
    pub fn n_draws(&self) -> usize {
        self.n_draws
    }

    /// Return the master random seed.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Return the configured non-finite fill value.
    #[must_use]
    pub fn non_finite_fill(&self) -> Option<f64> {
        self.non_finite_fill
    }

    /// Estimate the Shapley value of `feature` for observation `x`.
    ///
    /// Each draw samples a permutation of the features and a reference row
    /// `z`. Features placed before `feature` take their value from `x`, the
    /// rest from `z`; the contribution is the change in probability when
    /// `feature` itself switches from `z` to `x`.
    ///
    /// Draws use the same per-feature seed as [`ShapleyEstimator::explain`],
    /// so the result equals the matching entry of its `values`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ShapError::EmptyReference`] | `reference` has no rows |
    /// | [`ShapError::FeatureOutOfRange`] | `feature >= model.n_features()` |
    /// | [`ShapError::DimensionMismatch`] | `x` or a reference row has the wrong width |
    /// | [`ShapError::NonFinitePrediction`] | the model returns NaN or infinity for a hybrid sample and no fill is set |
    /// | [`ShapError::Model`] | the model rejects a hybrid sample |
    pub fn estimate<C: Classifier + ?Sized>(
        &self,
        model: &C,
        x: &[f64],
        reference: &[Vec<f64>],
        feature: usize,
    ) -> Result<f64, ShapError> {
        check_inputs(model, x, reference)?;
        let n_features = model.n_features();
        if feature >= n_features {
            return Err(ShapError::FeatureOutOfRange {
                index: feature,
                n_features,
            });
        }
        let seed = feature_seeds(self.seed, n_features)[feature];
        self.estimate_with_seed(model, x, reference, feature, seed)
    }

    /// Shapley values of every feature for observation `x`.
    ///
    /// Feature `j` draws from its own seed, derived from the master seed, so
    /// results do not depend on evaluation order.
    ///
    /// # Errors
    ///
    /// Same as [`ShapleyEstimator::estimate`], plus
    /// [`ShapError::NonFiniteObservation`] when the probability of `x` itself
    /// is NaN or infinite and no fill is set.
    #[instrument(skip_all, fields(n_draws = self.n_draws, n_reference = reference.len()))]
    pub fn explain<C: Classifier + ?Sized>(
        &self,
        model: &C,
        x: &[f64],
        reference: &[Vec<f64>],
    ) -> Result<Attribution, ShapError> {
        check_inputs(model, x, reference)?;
        self.explain_with_seed(model, x, reference, self.seed)
    }

    /// Explain every row of `rows` in parallel.
    ///
    /// Row `i` uses the `i`-th seed drawn from the master seed, so the output
    /// is identical for any thread count.
    ///
    /// # Errors
    ///
    /// Same as [`ShapleyEstimator::estimate`]; the first failing row aborts the batch.
    #[instrument(skip_all, fields(n_rows = rows.len(), n_draws = self.n_draws))]
    pub fn explain_batch<C: Classifier + ?Sized>(
        &self,
        model: &C,
        rows: &[Vec<f64>],
        reference: &[Vec<f64>],
    ) -> Result<Vec<Attribution>, ShapError> {
        if reference.is_empty() {
            return Err(ShapError::EmptyReference);
        }
        for row in reference.iter().chain(rows) {
            check_width(model.n_features(), row)?;
        }

        let mut master_rng = ChaCha8Rng::seed_from_u64(self.seed);
        let row_seeds: Vec<u64> = (0..rows.len()).map(|_| master_rng.r#gen()).collect();

        let attributions = rows
            .par_iter()
            .zip(row_seeds.par_iter())
            .map(|(row, &seed)| self.explain_with_seed(model, row, reference, seed))
            .collect::<Result<Vec<_>, ShapError>>()?;

        info!(n_rows = attributions.len(), "shapley batch complete");
        Ok(attributions)
    }

    fn explain_with_seed<C: Classifier + ?Sized>(
        &self,
        model: &C,
        x: &[f64],
        reference: &[Vec<f64>],
        seed: u64,
    ) -> Result<Attribution, ShapError> {
        let probability = match model.probability(x)? {
            p if p.is_finite() => p,
            _ => self.non_finite_fill.ok_or(ShapError::NonFiniteObservation)?,
        };
        let values = feature_seeds(seed, model.n_features())
            .into_iter()
            .enumerate()
            .map(|(feature, feature_seed)| {
                self.estimate_with_seed(model, x, reference, feature, feature_seed)
            })
            .collect::<Result<Vec<_>, ShapError>>()?;

        debug!(probability, "observation explained");
        Ok(Attribution {
            values,
            probability,
        })
    }

    fn estimate_with_seed<C: Classifier + ?Sized>(
        &self,
        model: &C,
        x: &[f64],
        reference: &[Vec<f64>],
        feature: usize,
        seed: u64,
    ) -> Result<f64, ShapError> {
        let n_features = x.len();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut order: Vec<usize> = (0..n_features).collect();
        let mut x_plus = vec![0.0; n_features];
        let mut x_minus = vec![0.0; n_features];
        let mut total = 0.0;

        for draw in 0..self.n_draws {
            order.shuffle(&mut rng);
            let z = &reference[rng.gen_range(0..reference.len())];

            let mut from_x = true;
            for &j in &order {
                let value = if from_x { x[j] } else { z[j] };
                x_plus[j] = value;
                x_minus[j] = value;
                if j == feature {
                    x_minus[j] = z[j];
                    from_x = false;
                }
            }

            let with = self.checked(model.probability(&x_plus)?, draw)?;
            let without = self.checked(model.probability(&x_minus)?, draw)?;
            total += with - without;
        }

        Ok(total / self.n_draws as f64)
    }

    fn checked(&self, probability: f64, draw: usize) -> Result<f64, ShapError> {
        if probability.is_finite() {
            return Ok(probability);
        }
        self.non_finite_fill
            .ok_or(ShapError::NonFinitePrediction { draw })
    }
}

/// The `j`-th entry seeds the draws for feature `j`.
fn feature_seeds(seed: u64, n_features: usize) -> Vec<u64> {
    let mut seed_rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n_features).map(|_| seed_rng.r#gen()).collect()
}

fn check_width(expected: usize, row: &[f64]) -> Result<(), ShapError> {
    if row.len() != expected {
        return Err(ShapError::DimensionMismatch {
            expected,
            got: row.len(),
        });
    }
    Ok(())
}

fn check_inputs<C: Classifier + ?Sized>(
    model: &C,
    x: &[f64],
    reference: &[Vec<f64>],
) -> Result<(), ShapError> {
    if reference.is_empty() {
        return Err(ShapError::EmptyReference);
    }
    let expected = model.n_features();
    check_width(expected, x)?;
    for row in reference {
        check_width(expected, row)?;
    }
    Ok(())
}
