//! Evaluation toolkit for presence/absence classifiers.
//!
//! Holdout and k-fold splitters, a binary confusion matrix with rate metrics
//! and MCC, parallel cross-validation, decision-threshold tuning, and greedy
//! forward variable selection.

mod confusion;
mod cv;
mod error;
mod selection;
mod split;
mod subset;
mod threshold;

pub use confusion::ConfusionMatrix;
pub use cv::{CrossValidation, CrossValidationResult, FoldScore};
pub use error::EvalError;
pub use selection::{CandidateScore, ForwardSelection, SelectionResult, SelectionStep};
pub use split::{Fold, FoldStrategy, Holdout, HoldoutSplit, KFold, Shuffle};
pub use subset::FeatureSubset;
pub use threshold::{ThresholdCurve, ThresholdPoint, ThresholdSweep};
