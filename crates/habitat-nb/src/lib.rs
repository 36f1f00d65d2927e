//! Gaussian Naive Bayes presence/absence classification.
//!
//! Fits per-class, per-feature Gaussian parameters and class priors from
//! labelled environmental samples, predicts P(presence | x), classifies at a
//! decision threshold, and persists fitted models via bincode.

mod class;
mod config;
mod error;
mod model;
mod predict;
mod serialize;
mod stats;

pub use class::Class;
pub use config::{DEFAULT_THRESHOLD, DEFAULT_VARIANCE_FLOOR, GaussianNbConfig, VariancePolicy};
pub use error::NbError;
pub use model::{Classifier, GaussianNaiveBayes};
pub use stats::ClassStats;
