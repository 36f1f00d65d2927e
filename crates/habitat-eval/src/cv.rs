//! K-fold cross-validation of the Gaussian Naive Bayes classifier.

use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use habitat_nb::{GaussianNbConfig, NbError};

use crate::confusion::{ConfusionMatrix, validate_threshold};
use crate::error::EvalError;
use crate::split::{Fold, FoldStrategy, KFold, Shuffle};
use crate::subset::FeatureSubset;

/// Cross-validation configuration.
///
/// Construct via [`CrossValidation::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter   | Default       |
/// |-------------|---------------|
/// | `seed`      | 42            |
/// | `strategy`  | `Contiguous`  |
/// | `threshold` | 0.5           |
#[derive(Debug, Clone)]
pub struct CrossValidation {
    kfold: KFold,
    threshold: f64,
}

/// Score of one validation fold.
#[derive(Debug, Clone)]
pub struct FoldScore {
    /// Confusion matrix on the validation block.
    pub confusion: ConfusionMatrix,
    /// MCC on the validation block.
    pub mcc: f64,
    /// Number of validation samples.
    pub n_validation: usize,
}

/// Results of k-fold cross-validation.
#[derive(Debug, Clone)]
pub struct CrossValidationResult {
    /// Per-fold scores, in fold order.
    pub folds: Vec<FoldScore>,
    /// Mean MCC across folds.
    pub mean_mcc: f64,
    /// Population standard deviation of fold MCCs.
    pub std_mcc: f64,
    /// Sum of the fold confusion matrices.
    pub pooled: ConfusionMatrix,
    /// P(presence) for each sample from the fold model that did not train on it.
    pub out_of_fold: Vec<f64>,
    /// Number of samples.
    pub n_samples: usize,
    /// Number of features in the evaluated subset.
    pub n_features: usize,
}

struct FoldOutcome {
    score: FoldScore,
    validation: Vec<usize>,
    probabilities: Vec<f64>,
}

impl CrossValidation {
    /// Create a new cross-validation config with the given number of folds.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidFoldCount`] if `n_folds` < 2.
    pub fn new(n_folds: usize) -> Result<Self, EvalError> {
        Ok(Self {
            kfold: KFold::new(n_folds)?,
            threshold: habitat_nb::DEFAULT_THRESHOLD,
        })
    }

    /// Set the random seed for fold shuffling.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.kfold = self.kfold.with_shuffle(Shuffle::Seeded(seed));
        self
    }

    /// Set the fold strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: FoldStrategy) -> Self {
        self.kfold = self.kfold.with_strategy(strategy);
        self
    }

    /// Set the decision threshold used to score validation folds.
    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.kfold.n_folds()
    }

    /// Return the decision threshold.
    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Run k-fold cross-validation on the columns in `subset`.
    ///
    /// Folds are trained and scored in parallel. Each fold owns the
    /// out-of-fold slots of its validation indices.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptyPredictions`] | zero samples |
    /// | [`EvalError::LengthMismatch`] | row count differs from label count |
    /// | [`EvalError::InvalidThreshold`] | threshold outside [0, 1] |
    /// | split errors | see [`KFold::split`] |
    /// | [`EvalError::Model`] | a fold model cannot be fitted, e.g. a class is missing |
    #[instrument(skip_all, fields(n_folds = self.n_folds(), strategy = ?self.kfold.strategy(), n_samples = features.len(), subset = ?subset.indices()))]
    pub fn evaluate(
        &self,
        config: &GaussianNbConfig,
        features: &[Vec<f64>],
        labels: &[bool],
        subset: &FeatureSubset,
    ) -> Result<CrossValidationResult, EvalError> {
        if features.is_empty() {
            return Err(EvalError::EmptyPredictions);
        }
        if features.len() != labels.len() {
            return Err(EvalError::LengthMismatch {
                left: features.len(),
                right: labels.len(),
            });
        }
        validate_threshold(self.threshold)?;
        for (sample_index, row) in features.iter().enumerate() {
            if row.len() != subset.n_features() {
                return Err(NbError::FeatureCountMismatch {
                    expected: subset.n_features(),
                    got: row.len(),
                    sample_index,
                }
                .into());
            }
        }

        let n_samples = features.len();
        let projected = subset.project_all(features);
        let names: Vec<String> = subset.indices().iter().map(|i| format!("f{i}")).collect();
        let folds = self.kfold.split(labels)?;

        let outcomes: Vec<FoldOutcome> = folds
            .into_par_iter()
            .enumerate()
            .map(|(fold_index, fold)| {
                self.run_fold(config, &projected, labels, &names, fold_index, fold)
            })
            .collect::<Result<_, EvalError>>()?;

        let mut out_of_fold = vec![f64::NAN; n_samples];
        let mut scores = Vec::with_capacity(outcomes.len());
        for outcome in outcomes {
            for (&idx, &p) in outcome.validation.iter().zip(&outcome.probabilities) {
                out_of_fold[idx] = p;
            }
            scores.push(outcome.score);
        }

        let n_folds = scores.len() as f64;
        let mean_mcc = scores.iter().map(|s| s.mcc).sum::<f64>() / n_folds;
        let std_mcc = (scores
            .iter()
            .map(|s| (s.mcc - mean_mcc).powi(2))
            .sum::<f64>()
            / n_folds)
            .sqrt();
        let pooled: ConfusionMatrix = scores.iter().map(|s| s.confusion).sum();

        info!(mean_mcc, std_mcc, "cross-validation complete");

        Ok(CrossValidationResult {
            folds: scores,
            mean_mcc,
            std_mcc,
            pooled,
            out_of_fold,
            n_samples,
            n_features: subset.len(),
        })
    }

    fn run_fold(
        &self,
        config: &GaussianNbConfig,
        projected: &[Vec<f64>],
        labels: &[bool],
        names: &[String],
        fold_index: usize,
        fold: Fold,
    ) -> Result<FoldOutcome, EvalError> {
        let train_features: Vec<Vec<f64>> =
            fold.train.iter().map(|&i| projected[i].clone()).collect();
        let train_labels: Vec<bool> = fold.train.iter().map(|&i| labels[i]).collect();
        let model = config.fit(&train_features, &train_labels, names)?;

        let probabilities = fold
            .validation
            .iter()
            .map(|&i| model.predict_proba(&projected[i]))
            .collect::<Result<Vec<_>, _>>()?;
        let validation_labels: Vec<bool> = fold.validation.iter().map(|&i| labels[i]).collect();
        let confusion =
            ConfusionMatrix::from_probabilities(&probabilities, &validation_labels, self.threshold)?;
        let mcc = confusion.mcc();

        debug!(fold = fold_index, mcc, n_validation = fold.validation.len(), "fold completed");

        Ok(FoldOutcome {
            score: FoldScore {
                confusion,
                mcc,
                n_validation: fold.validation.len(),
            },
            validation: fold.validation,
            probabilities,
        })
    }
}
