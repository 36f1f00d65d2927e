use std::path::PathBuf;

use crate::class::Class;

/// Errors from Naive Bayes training, prediction and persistence.
#[derive(Debug, thiserror::Error)]
pub enum NbError {
    /// Returned when the training dataset has zero samples.
    #[error("training dataset has zero samples")]
    EmptyDataset,

    /// Returned when the training dataset has zero feature columns.
    #[error("training dataset has zero feature columns")]
    ZeroFeatures,

    /// Returned when the feature matrix and label vector disagree in length.
    #[error("feature matrix has {features} rows but {labels} labels were provided")]
    LabelCountMismatch {
        /// Number of feature rows.
        features: usize,
        /// Number of labels.
        labels: usize,
    },

    /// Returned when a sample has a different number of features than expected.
    #[error("sample {sample_index} has {got} features, expected {expected}")]
    FeatureCountMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the sample.
        got: usize,
        /// The zero-based index of the offending sample.
        sample_index: usize,
    },

    /// Returned when the number of feature names differs from the number of columns.
    #[error("{names} feature names provided for {n_features} feature columns")]
    FeatureNameMismatch {
        /// Number of feature names.
        names: usize,
        /// Number of feature columns.
        n_features: usize,
    },

    /// Returned when one class has no training samples, so no prior can be estimated.
    #[error("class {class} has no training samples")]
    EmptyClass {
        /// The class without samples.
        class: Class,
    },

    /// Returned when a training value is NaN or infinite.
    #[error("non-finite value at sample {sample_index}, feature {feature_index}")]
    NonFiniteValue {
        /// The zero-based index of the offending sample.
        sample_index: usize,
        /// The zero-based index of the offending feature column.
        feature_index: usize,
    },

    /// Returned when a feature has zero variance within a class under [`VariancePolicy::Reject`].
    ///
    /// [`VariancePolicy::Reject`]: crate::VariancePolicy::Reject
    #[error("feature {feature} has zero variance in class {class}")]
    ZeroVariance {
        /// The class in which the feature is constant.
        class: Class,
        /// The zero-based feature index.
        feature: usize,
    },

    /// Returned when the variance floor is not a finite positive number.
    #[error("variance floor must be finite and > 0, got {floor}")]
    InvalidVarianceFloor {
        /// The invalid floor.
        floor: f64,
    },

    /// Returned when a decision threshold lies outside [0, 1].
    #[error("decision threshold must be in [0, 1], got {threshold}")]
    InvalidThreshold {
        /// The invalid threshold.
        threshold: f64,
    },

    /// Returned when a sample has a different number of features at prediction time.
    #[error("prediction input has {got} features, expected {expected}")]
    PredictionFeatureMismatch {
        /// The expected number of features.
        expected: usize,
        /// The actual number of features in the prediction input.
        got: usize,
    },

    /// Returned when a prediction input contains NaN or infinity.
    #[error("prediction input has a non-finite value at feature {feature_index}")]
    NonFiniteInput {
        /// The zero-based feature index.
        feature_index: usize,
    },

    /// Returned when model serialization fails.
    #[error("failed to serialize model")]
    SerializeModel {
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when model deserialization fails.
    #[error("failed to deserialize model from {path}")]
    DeserializeModel {
        /// Path to the model file that could not be deserialized.
        path: PathBuf,
        /// The underlying bincode error.
        source: Box<bincode::ErrorKind>,
    },

    /// Returned when writing the model file fails.
    #[error("failed to write model to {path}")]
    WriteModel {
        /// Path to the file that could not be written.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when reading the model file fails.
    #[error("failed to read model from {path}")]
    ReadModel {
        /// Path to the file that could not be read.
        path: PathBuf,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Returned when loading a model with an incompatible format version.
    #[error("incompatible model version in {path}: expected {expected}, found {found}")]
    IncompatibleModelVersion {
        /// The model format version this build expects.
        expected: u32,
        /// The model format version found in the file.
        found: u32,
        /// Path to the model file with the incompatible version.
        path: PathBuf,
    },

    /// Returned when a model file decodes but its contents contradict each other.
    #[error("inconsistent model in {path}: {reason}")]
    InconsistentModel {
        /// Path to the model file.
        path: PathBuf,
        /// Which consistency check failed.
        reason: &'static str,
    },
}
