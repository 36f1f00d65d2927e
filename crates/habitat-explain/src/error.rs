use habitat_nb::NbError;

/// Errors from Shapley value estimation.
#[derive(Debug, thiserror::Error)]
pub enum ShapError {
    /// Returned when the number of Monte-Carlo draws is zero.
    #[error("n_draws must be at least 1, got {n_draws}")]
    InvalidDrawCount {
        /// The invalid draw count provided.
        n_draws: usize,
    },

    /// Returned when the reference pool has no rows.
    #[error("reference pool is empty")]
    EmptyReference,

    /// Returned when the attributed feature does not exist.
    #[error("feature index {index} out of range for {n_features} features")]
    FeatureOutOfRange {
        /// The offending index.
        index: usize,
        /// The number of features the model expects.
        n_features: usize,
    },

    /// Returned when an observation or reference row has the wrong width.
    #[error("expected {expected} features, got {got}")]
    DimensionMismatch {
        /// Number of features the model expects.
        expected: usize,
        /// Number of features provided.
        got: usize,
    },

    /// Returned when the model yields NaN or infinity and no fill value is set.
    #[error("model returned a non-finite probability in draw {draw}")]
    NonFinitePrediction {
        /// Zero-based index of the Monte-Carlo draw.
        draw: usize,
    },

    /// Returned when the explained observation itself has a NaN or infinite
    /// probability and no fill value is set.
    #[error("model returned a non-finite probability for the explained observation")]
    NonFiniteObservation,

    /// Returned when the underlying classifier fails.
    #[error(transparent)]
    Model(#[from] NbError),
}
