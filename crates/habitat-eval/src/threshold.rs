//! Decision-threshold tuning over an even grid.

use tracing::{info, instrument};

use crate::confusion::ConfusionMatrix;
use crate::error::EvalError;

/// Metrics at one candidate threshold.
#[derive(Debug, Clone)]
pub struct ThresholdPoint {
    /// The decision threshold.
    pub threshold: f64,
    /// Confusion matrix at this threshold.
    pub confusion: ConfusionMatrix,
    /// MCC at this threshold.
    pub mcc: f64,
    /// True positive rate at this threshold.
    pub tpr: f64,
    /// False positive rate at this threshold.
    pub fpr: f64,
}

/// Metrics across a grid of thresholds, in ascending threshold order.
#[derive(Debug, Clone)]
pub struct ThresholdCurve {
    points: Vec<ThresholdPoint>,
}

/// Threshold sweep configuration: `n_steps` evenly spaced thresholds in [0, 1].
#[derive(Debug, Clone)]
pub struct ThresholdSweep {
    n_steps: usize,
}

impl ThresholdSweep {
    /// Create a sweep over `n_steps` thresholds, endpoints included.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidSweepSteps`] if `n_steps < 2`.
    pub fn new(n_steps: usize) -> Result<Self, EvalError> {
        if n_steps < 2 {
            return Err(EvalError::InvalidSweepSteps { n_steps });
        }
        Ok(Self { n_steps })
    }

    /// Return the number of thresholds evaluated.
    #[must_use]
    pub fn n_steps(&self) -> usize {
        self.n_steps
    }

    /// Score `probabilities` against `labels` at every threshold.
    ///
    /// # Errors
    ///
    /// Same as [`ConfusionMatrix::from_probabilities`].
    #[instrument(skip_all, fields(n_steps = self.n_steps, n_samples = probabilities.len()))]
    pub fn sweep(&self, probabilities: &[f64], labels: &[bool]) -> Result<ThresholdCurve, EvalError> {
        let last = (self.n_steps - 1) as f64;
        let points = (0..self.n_steps)
            .map(|step| {
                let threshold = step as f64 / last;
                let confusion = ConfusionMatrix::from_probabilities(probabilities, labels, threshold)?;
                Ok(ThresholdPoint {
                    threshold,
                    confusion,
                    mcc: confusion.mcc(),
                    tpr: confusion.tpr(),
                    fpr: confusion.fpr(),
                })
            })
            .collect::<Result<Vec<_>, EvalError>>()?;

        let curve = ThresholdCurve { points };
        let best = curve.best();
        info!(
            best_threshold = best.threshold,
            best_mcc = best.mcc,
            auc = curve.roc_auc(),
            "threshold sweep complete"
        );
        Ok(curve)
    }
}

impl ThresholdCurve {
    /// Return every evaluated point.
    #[must_use]
    pub fn points(&self) -> &[ThresholdPoint] {
        &self.points
    }

    /// The point with the highest MCC.
    ///
    /// Ties go to the threshold closest to 0.5, then to the lower threshold.
    #[must_use]
    pub fn best(&self) -> &ThresholdPoint {
        let mut best = &self.points[0];
        for point in &self.points[1..] {
            let better = point.mcc > best.mcc
                || (point.mcc == best.mcc
                    && (point.threshold - 0.5).abs() < (best.threshold - 0.5).abs());
            if better {
                best = point;
            }
        }
        best
    }

    /// Trapezoidal area under the ROC points (FPR on x, TPR on y).
    ///
    /// The (0, 0) and (1, 1) corners are added when the grid does not reach them.
    #[must_use]
    pub fn roc_auc(&self) -> f64 {
        let mut roc: Vec<(f64, f64)> = self.points.iter().map(|p| (p.fpr, p.tpr)).collect();
        roc.push((0.0, 0.0));
        roc.push((1.0, 1.0));
        roc.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
        roc.windows(2)
            .map(|w| (w[1].0 - w[0].0) * (w[0].1 + w[1].1) / 2.0)
            .sum()
    }
}
