use habitat_nb::NbError;

/// Errors from splitting, scoring, cross-validation and variable selection.
#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    /// Returned when n_folds is less than 2.
    #[error("n_folds must be at least 2, got {n_folds}")]
    InvalidFoldCount {
        /// The invalid n_folds value provided.
        n_folds: usize,
    },

    /// Returned when more folds are requested than there are samples.
    #[error("cannot split {n_samples} samples into {n_folds} folds")]
    TooManyFolds {
        /// The requested number of folds.
        n_folds: usize,
        /// The number of samples available.
        n_samples: usize,
    },

    /// Returned when a split needs more samples than were provided.
    #[error("need at least {required} samples, got {n_samples}")]
    TooFewSamples {
        /// Minimum number of samples required.
        required: usize,
        /// The number of samples available.
        n_samples: usize,
    },

    /// Returned when a class has fewer samples than the number of stratified folds.
    #[error("{class} has only {count} samples, need at least {n_folds} for stratified folds")]
    TooFewSamplesForFolds {
        /// The class with insufficient samples.
        class: habitat_nb::Class,
        /// The number of samples belonging to that class.
        count: usize,
        /// The requested number of folds.
        n_folds: usize,
    },

    /// Returned when the holdout train fraction is not in (0, 1).
    #[error("train fraction must be in (0, 1), got {fraction}")]
    InvalidTrainFraction {
        /// The invalid fraction.
        fraction: f64,
    },

    /// Returned when a decision threshold lies outside [0, 1].
    #[error("decision threshold must be in [0, 1], got {threshold}")]
    InvalidThreshold {
        /// The invalid threshold.
        threshold: f64,
    },

    /// Returned when a threshold sweep has fewer than two steps.
    #[error("threshold sweep needs at least 2 steps, got {n_steps}")]
    InvalidSweepSteps {
        /// The invalid step count.
        n_steps: usize,
    },

    /// Returned when a feature subset has no features.
    #[error("feature subset is empty")]
    EmptySubset,

    /// Returned when a feature subset references a column that does not exist.
    #[error("feature index {index} out of range for {n_features} features")]
    FeatureOutOfRange {
        /// The offending index.
        index: usize,
        /// The number of available features.
        n_features: usize,
    },

    /// Returned when a feature subset lists the same column twice.
    #[error("feature index {index} appears more than once in the subset")]
    DuplicateFeature {
        /// The repeated index.
        index: usize,
    },

    /// Returned when parallel sequences disagree in length.
    #[error("{left} rows or predictions but {right} labels")]
    LengthMismatch {
        /// Length of the feature or prediction sequence.
        left: usize,
        /// Length of the label sequence.
        right: usize,
    },

    /// Returned when there is nothing to score.
    #[error("no predictions to score")]
    EmptyPredictions,

    /// Returned when a probability is NaN or infinite.
    ///
    /// Callers must replace non-finite values before scoring.
    #[error("non-finite probability at index {index}")]
    NonFiniteProbability {
        /// The zero-based index of the offending probability.
        index: usize,
    },

    /// Returned when the underlying classifier fails.
    #[error(transparent)]
    Model(#[from] NbError),
}
