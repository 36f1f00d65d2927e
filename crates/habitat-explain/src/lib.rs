//! Monte-Carlo Shapley attributions for presence/absence classifiers.
//!
//! Approximates each feature's contribution to P(presence | x) relative to
//! a pool of reference rows, by sampling feature permutations.

mod error;
mod shapley;

pub use error::ShapError;
pub use shapley::{Attribution, DEFAULT_DRAWS, ShapleyEstimator};
