//! Binary confusion matrix and rate metrics.

use std::fmt;
use std::ops::Add;

use crate::error::EvalError;

/// Counts of prediction outcomes at one decision threshold.
///
/// Every rate returns 0.0 when its denominator is zero, so no metric is
/// ever NaN.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfusionMatrix {
    /// Predicted presence, observed presence.
    pub true_positives: usize,
    /// Predicted presence, observed absence.
    pub false_positives: usize,
    /// Predicted absence, observed absence.
    pub true_negatives: usize,
    /// Predicted absence, observed presence.
    pub false_negatives: usize,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<(), EvalError> {
    if !(0.0..=1.0).contains(&threshold) {
        return Err(EvalError::InvalidThreshold { threshold });
    }
    Ok(())
}

impl ConfusionMatrix {
    /// Build a matrix from raw counts.
    #[must_use]
    pub fn new(
        true_positives: usize,
        false_positives: usize,
        true_negatives: usize,
        false_negatives: usize,
    ) -> Self {
        Self {
            true_positives,
            false_positives,
            true_negatives,
            false_negatives,
        }
    }

    /// Tabulate probabilities against labels; `p >= threshold` counts as presence.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::EmptyPredictions`] | zero probabilities |
    /// | [`EvalError::LengthMismatch`] | lengths differ |
    /// | [`EvalError::InvalidThreshold`] | threshold outside [0, 1] |
    /// | [`EvalError::NonFiniteProbability`] | a probability is NaN or infinite |
    pub fn from_probabilities(
        probabilities: &[f64],
        labels: &[bool],
        threshold: f64,
    ) -> Result<Self, EvalError> {
        Self::check_lengths(probabilities.len(), labels.len())?;
        validate_threshold(threshold)?;
        let mut cm = Self::default();
        for (index, (&p, &label)) in probabilities.iter().zip(labels).enumerate() {
            if !p.is_finite() {
                return Err(EvalError::NonFiniteProbability { index });
            }
            cm.record(p >= threshold, label);
        }
        Ok(cm)
    }

    /// Tabulate hard predictions against labels.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::EmptyPredictions`] or [`EvalError::LengthMismatch`].
    pub fn from_predictions(predicted: &[bool], labels: &[bool]) -> Result<Self, EvalError> {
        Self::check_lengths(predicted.len(), labels.len())?;
        let mut cm = Self::default();
        for (&p, &label) in predicted.iter().zip(labels) {
            cm.record(p, label);
        }
        Ok(cm)
    }

    fn check_lengths(left: usize, right: usize) -> Result<(), EvalError> {
        if left == 0 {
            return Err(EvalError::EmptyPredictions);
        }
        if left != right {
            return Err(EvalError::LengthMismatch { left, right });
        }
        Ok(())
    }

    fn record(&mut self, predicted: bool, actual: bool) {
        match (predicted, actual) {
            (true, true) => self.true_positives += 1,
            (true, false) => self.false_positives += 1,
            (false, false) => self.true_negatives += 1,
            (false, true) => self.false_negatives += 1,
        }
    }

    /// Total number of tabulated samples.
    #[must_use]
    pub fn total(&self) -> usize {
        self.true_positives + self.false_positives + self.true_negatives + self.false_negatives
    }

    /// False positive rate: FP / (FP + TN).
    #[must_use]
    pub fn fpr(&self) -> f64 {
        ratio(self.false_positives, self.false_positives + self.true_negatives)
    }

    /// False negative rate: FN / (FN + TP).
    #[must_use]
    pub fn fnr(&self) -> f64 {
        ratio(self.false_negatives, self.false_negatives + self.true_positives)
    }

    /// True positive rate (sensitivity): TP / (TP + FN).
    #[must_use]
    pub fn tpr(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_negatives)
    }

    /// True negative rate (specificity): TN / (TN + FP).
    #[must_use]
    pub fn tnr(&self) -> f64 {
        ratio(self.true_negatives, self.true_negatives + self.false_positives)
    }

    /// Precision: TP / (TP + FP).
    #[must_use]
    pub fn precision(&self) -> f64 {
        ratio(self.true_positives, self.true_positives + self.false_positives)
    }

    /// Proportion of correct predictions.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        ratio(self.true_positives + self.true_negatives, self.total())
    }

    /// Harmonic mean of precision and TPR.
    #[must_use]
    pub fn f1(&self) -> f64 {
        let precision = self.precision();
        let recall = self.tpr();
        if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        }
    }

    /// True skill statistic: TPR + TNR - 1.
    #[must_use]
    pub fn tss(&self) -> f64 {
        self.tpr() + self.tnr() - 1.0
    }

    /// Matthews correlation coefficient.
    ///
    /// `(TP*TN - FP*FN) / sqrt((TP+FP)(TP+FN)(TN+FP)(TN+FN))`, or 0 when any
    /// marginal is zero.
    #[must_use]
    pub fn mcc(&self) -> f64 {
        let tp = self.true_positives as f64;
        let fp = self.false_positives as f64;
        let tn = self.true_negatives as f64;
        let fn_ = self.false_negatives as f64;
        let denominator = ((tp + fp) * (tp + fn_) * (tn + fp) * (tn + fn_)).sqrt();
        if denominator == 0.0 {
            0.0
        } else {
            (tp * tn - fp * fn_) / denominator
        }
    }
}

impl Add for ConfusionMatrix {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            true_positives: self.true_positives + rhs.true_positives,
            false_positives: self.false_positives + rhs.false_positives,
            true_negatives: self.true_negatives + rhs.true_negatives,
            false_negatives: self.false_negatives + rhs.false_negatives,
        }
    }
}

impl std::iter::Sum for ConfusionMatrix {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

impl fmt::Display for ConfusionMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:>10} {:>9} {:>9}", "", "pred_pres", "pred_abs")?;
        writeln!(
            f,
            "{:>10} {:>9} {:>9}",
            "presence", self.true_positives, self.false_negatives
        )?;
        writeln!(
            f,
            "{:>10} {:>9} {:>9}",
            "absence", self.false_positives, self.true_negatives
        )
    }
}
