//! Greedy forward variable selection driven by cross-validated MCC.

use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::{debug, info, instrument};

use habitat_nb::GaussianNbConfig;

use crate::cv::CrossValidation;
use crate::error::EvalError;
use crate::subset::FeatureSubset;

/// Forward selection configuration.
///
/// Construct via [`ForwardSelection::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter         | Default |
/// |-------------------|---------|
/// | `initial`         | empty   |
/// | `min_improvement` | 0.0     |
#[derive(Debug, Clone)]
pub struct ForwardSelection {
    cv: CrossValidation,
    initial: Vec<usize>,
    min_improvement: f64,
}

/// Cross-validated score of one candidate in one round.
#[derive(Debug, Clone, Copy)]
pub struct CandidateScore {
    /// Feature index of the candidate.
    pub feature: usize,
    /// Mean MCC of the current subset plus this candidate.
    pub mean_mcc: f64,
}

/// One accepted addition.
#[derive(Debug, Clone)]
pub struct SelectionStep {
    /// The feature added in this round.
    pub feature: usize,
    /// Mean MCC after adding it.
    pub score: f64,
    /// Every candidate evaluated in this round, by ascending feature index.
    pub candidates: Vec<CandidateScore>,
}

/// Outcome of forward selection.
#[derive(Debug, Clone)]
pub struct SelectionResult {
    /// Selected feature indices in selection order (initial features first).
    pub selected: Vec<usize>,
    /// Accepted additions; scores are strictly increasing.
    pub steps: Vec<SelectionStep>,
    /// Best cross-validated mean MCC, or `f64::NEG_INFINITY` if nothing was selected.
    pub best_score: f64,
}

impl ForwardSelection {
    /// Create a selector that scores subsets with `cv`.
    #[must_use]
    pub fn new(cv: CrossValidation) -> Self {
        Self {
            cv,
            initial: Vec::new(),
            min_improvement: 0.0,
        }
    }

    /// Start from these feature indices.
    #[must_use]
    pub fn with_initial(mut self, initial: Vec<usize>) -> Self {
        self.initial = initial;
        self
    }

    /// Require a candidate to beat the running best by more than `min_improvement`.
    #[must_use]
    pub fn with_min_improvement(mut self, min_improvement: f64) -> Self {
        self.min_improvement = min_improvement;
        self
    }

    /// Grow the subset greedily until no candidate improves the score.
    ///
    /// Each round scores every unselected feature in parallel and keeps the
    /// one with the highest mean MCC. Ties go to the lowest feature index.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptyPredictions`] | zero samples |
    /// | [`EvalError::FeatureOutOfRange`], [`EvalError::DuplicateFeature`] | invalid initial subset |
    /// | cross-validation errors | see [`CrossValidation::evaluate`] |
    #[instrument(skip_all, fields(n_samples = features.len(), initial = ?self.initial))]
    pub fn run(
        &self,
        config: &GaussianNbConfig,
        features: &[Vec<f64>],
        labels: &[bool],
    ) -> Result<SelectionResult, EvalError> {
        let n_features = features.first().map(Vec::len).ok_or(EvalError::EmptyPredictions)?;

        let mut current: Option<FeatureSubset> = if self.initial.is_empty() {
            None
        } else {
            Some(FeatureSubset::new(self.initial.clone(), n_features)?)
        };
        let mut best_score = match &current {
            Some(subset) => self.cv.evaluate(config, features, labels, subset)?.mean_mcc,
            None => f64::NEG_INFINITY,
        };
        debug!(baseline = best_score, "selection baseline scored");

        let mut steps = Vec::new();
        loop {
            let candidates: Vec<usize> = (0..n_features)
                .filter(|&f| current.as_ref().is_none_or(|s| !s.contains(f)))
                .collect();
            if candidates.is_empty() {
                break;
            }

            let scored: Vec<CandidateScore> = candidates
                .into_par_iter()
                .map(|feature| {
                    let subset = match &current {
                        Some(s) => s.with(feature)?,
                        None => FeatureSubset::new(vec![feature], n_features)?,
                    };
                    let result = self.cv.evaluate(config, features, labels, &subset)?;
                    Ok(CandidateScore {
                        feature,
                        mean_mcc: result.mean_mcc,
                    })
                })
                .collect::<Result<_, EvalError>>()?;

            // Strict comparison over ascending indices keeps the lowest index on ties.
            let mut winner = scored[0];
            for &candidate in &scored[1..] {
                if candidate.mean_mcc > winner.mean_mcc {
                    winner = candidate;
                }
            }

            if winner.mean_mcc <= best_score + self.min_improvement {
                debug!(
                    best_candidate = winner.feature,
                    score = winner.mean_mcc,
                    best_score,
                    "no candidate improves the score"
                );
                break;
            }

            best_score = winner.mean_mcc;
            current = Some(match current {
                Some(s) => s.with(winner.feature)?,
                None => FeatureSubset::new(vec![winner.feature], n_features)?,
            });
            info!(feature = winner.feature, score = best_score, "feature selected");
            steps.push(SelectionStep {
                feature: winner.feature,
                score: best_score,
                candidates: scored,
            });
        }

        let selected = current.map(|s| s.indices().to_vec()).unwrap_or_default();
        info!(?selected, best_score, "forward selection complete");

        Ok(SelectionResult {
            selected,
            steps,
            best_score,
        })
    }
}
