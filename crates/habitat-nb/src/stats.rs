//! Per-class Gaussian sufficient statistics.

use std::cmp::Ordering;

use crate::class::Class;
use crate::config::VariancePolicy;
use crate::error::NbError;

/// Prior and per-feature Gaussian parameters for one class.
///
/// Standard deviations are population estimates (divided by `n`, not `n - 1`)
/// and already include the variance floor when one was configured.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ClassStats {
    pub(crate) class: Class,
    pub(crate) n_samples: usize,
    pub(crate) prior: f64,
    pub(crate) means: Vec<f64>,
    pub(crate) std_devs: Vec<f64>,
}

impl ClassStats {
    /// Estimate class statistics from the rows belonging to `class`.
    ///
    /// `n_total` is the size of the whole training set and sets the prior.
    pub(crate) fn estimate(
        class: Class,
        rows: &[&[f64]],
        n_features: usize,
        n_total: usize,
        policy: VariancePolicy,
    ) -> Result<Self, NbError> {
        if rows.is_empty() {
            return Err(NbError::EmptyClass { class });
        }
        let n = rows.len() as f64;

        let mut means = vec![0.0f64; n_features];
        for row in rows {
            for (m, &v) in means.iter_mut().zip(row.iter()) {
                *m += v;
            }
        }
        means.iter_mut().for_each(|m| *m /= n);

        let mut variances = vec![0.0f64; n_features];
        for row in rows {
            for ((var, &v), &m) in variances.iter_mut().zip(row.iter()).zip(means.iter()) {
                *var += (v - m) * (v - m);
            }
        }
        variances.iter_mut().for_each(|var| *var /= n);

        let std_devs = variances
            .iter()
            .enumerate()
            .map(|(feature, &var)| match policy {
                VariancePolicy::Floor(floor) => Ok(var.max(floor).sqrt()),
                VariancePolicy::Reject if var <= 0.0 => {
                    Err(NbError::ZeroVariance { class, feature })
                }
                VariancePolicy::Reject => Ok(var.sqrt()),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            class,
            n_samples: rows.len(),
            prior: n / n_total as f64,
            means,
            std_devs,
        })
    }

    /// Return the class these statistics describe.
    #[must_use]
    pub fn class(&self) -> Class {
        self.class
    }

    /// Return the number of training samples in this class.
    #[must_use]
    pub fn n_samples(&self) -> usize {
        self.n_samples
    }

    /// Return the class prior (class count / total count).
    #[must_use]
    pub fn prior(&self) -> f64 {
        self.prior
    }

    /// Return the per-feature means.
    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Return the per-feature population standard deviations.
    #[must_use]
    pub fn std_devs(&self) -> &[f64] {
        &self.std_devs
    }
}

/// Log posterior odds `ln P(presence | x) - ln P(absence | x)`.
///
/// Each feature contributes `ln(sd_a / sd_p) + (z_a - z_p)(z_a + z_p) / 2`
/// with both factors expanded linearly in `x`, so wide inputs neither lose
/// the mean gap to rounding nor square into `inf - inf`. Terms that still
/// overflow keep their sign; the result is finite or `+/-inf`, never `NaN`.
pub(crate) fn log_odds(presence: &ClassStats, absence: &ClassStats, sample: &[f64]) -> f64 {
    let mut finite = (presence.prior / absence.prior).ln();
    let mut pos_inf = 0_usize;
    let mut neg_inf = 0_usize;
    for (j, &x) in sample.iter().enumerate() {
        let term = feature_log_ratio(
            x,
            (presence.means[j], presence.std_devs[j]),
            (absence.means[j], absence.std_devs[j]),
        );
        if term == f64::INFINITY {
            pos_inf += 1;
        } else if term == f64::NEG_INFINITY {
            neg_inf += 1;
        } else {
            finite += term;
        }
    }
    match pos_inf.cmp(&neg_inf) {
        Ordering::Greater => f64::INFINITY,
        Ordering::Less => f64::NEG_INFINITY,
        // Opposite overflows cancel; the finite remainder decides.
        Ordering::Equal => finite,
    }
}

fn feature_log_ratio(x: f64, (mean_p, sd_p): (f64, f64), (mean_a, sd_a): (f64, f64)) -> f64 {
    let scale = (sd_a / sd_p).ln();
    let diff = x * (sd_a.recip() - sd_p.recip()) + (mean_p / sd_p - mean_a / sd_a);
    let sum = x * (sd_a.recip() + sd_p.recip()) - (mean_a / sd_a + mean_p / sd_p);
    let term = scale + 0.5 * diff * sum;
    if !term.is_nan() {
        return term;
    }
    // 0 * inf: the quadratic parts cancel exactly.
    if diff == 0.0 || sum == 0.0 || diff.is_nan() || sum.is_nan() {
        return scale;
    }
    if diff.signum() == sum.signum() {
        f64::INFINITY
    } else {
        f64::NEG_INFINITY
    }
}
