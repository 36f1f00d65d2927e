//! Holdout and k-fold index splitters.

use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use tracing::debug;

use habitat_nb::Class;

use crate::error::EvalError;

/// Whether to permute sample indices before splitting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shuffle {
    /// Keep the input order.
    None,
    /// Permute with a `ChaCha8Rng` seeded from the given value.
    Seeded(u64),
}

impl Shuffle {
    fn apply(self, indices: &mut [usize]) {
        if let Self::Seeded(seed) = self {
            indices.shuffle(&mut ChaCha8Rng::seed_from_u64(seed));
        }
    }
}

/// A disjoint train/test partition of sample indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldoutSplit {
    /// Indices used for fitting.
    pub train: Vec<usize>,
    /// Indices reserved for the final, single-use evaluation.
    pub test: Vec<usize>,
}

/// Holdout splitter.
///
/// Construct via [`Holdout::new`], then chain `with_shuffle` if desired.
/// Defaults to `Shuffle::Seeded(42)`.
#[derive(Debug, Clone)]
pub struct Holdout {
    train_fraction: f64,
    shuffle: Shuffle,
}

impl Holdout {
    /// Create a holdout splitter keeping `train_fraction` of samples for training.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidTrainFraction`] unless `0 < train_fraction < 1`.
    pub fn new(train_fraction: f64) -> Result<Self, EvalError> {
        if !(train_fraction > 0.0 && train_fraction < 1.0) {
            return Err(EvalError::InvalidTrainFraction {
                fraction: train_fraction,
            });
        }
        Ok(Self {
            train_fraction,
            shuffle: Shuffle::Seeded(42),
        })
    }

    /// Set the shuffling mode.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: Shuffle) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Return the train fraction.
    #[must_use]
    pub fn train_fraction(&self) -> f64 {
        self.train_fraction
    }

    /// Split `n_samples` indices into train and test sets.
    ///
    /// The train side gets `round(n_samples * train_fraction)` indices,
    /// clamped so that both sides keep at least one.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::TooFewSamples`] when `n_samples < 2`.
    pub fn split(&self, n_samples: usize) -> Result<HoldoutSplit, EvalError> {
        if n_samples < 2 {
            return Err(EvalError::TooFewSamples {
                required: 2,
                n_samples,
            });
        }
        let mut order: Vec<usize> = (0..n_samples).collect();
        self.shuffle.apply(&mut order);

        let n_train = ((n_samples as f64 * self.train_fraction).round() as usize)
            .clamp(1, n_samples - 1);
        let test = order.split_off(n_train);
        debug!(n_train, n_test = test.len(), "holdout split");
        Ok(HoldoutSplit { train: order, test })
    }
}

/// One cross-validation fold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Indices used to fit the fold model.
    pub train: Vec<usize>,
    /// Indices scored by the fold model.
    pub validation: Vec<usize>,
}

/// How validation blocks are formed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldStrategy {
    /// Nearly-equal contiguous blocks of the (optionally permuted) index list.
    Contiguous,
    /// Presences and absences dealt round-robin so each fold keeps the class ratio.
    Stratified,
}

/// K-fold splitter.
///
/// Construct via [`KFold::new`], then chain `with_*` methods.
///
/// # Defaults
///
/// | Parameter  | Default         |
/// |------------|-----------------|
/// | `shuffle`  | `Seeded(42)`    |
/// | `strategy` | `Contiguous`    |
#[derive(Debug, Clone)]
pub struct KFold {
    n_folds: usize,
    shuffle: Shuffle,
    strategy: FoldStrategy,
}

impl KFold {
    /// Create a k-fold splitter.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::InvalidFoldCount`] if `n_folds < 2`.
    pub fn new(n_folds: usize) -> Result<Self, EvalError> {
        if n_folds < 2 {
            return Err(EvalError::InvalidFoldCount { n_folds });
        }
        Ok(Self {
            n_folds,
            shuffle: Shuffle::Seeded(42),
            strategy: FoldStrategy::Contiguous,
        })
    }

    /// Set the shuffling mode.
    #[must_use]
    pub fn with_shuffle(mut self, shuffle: Shuffle) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Set the fold strategy.
    #[must_use]
    pub fn with_strategy(mut self, strategy: FoldStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Return the number of folds.
    #[must_use]
    pub fn n_folds(&self) -> usize {
        self.n_folds
    }

    /// Return the fold strategy.
    #[must_use]
    pub fn strategy(&self) -> FoldStrategy {
        self.strategy
    }

    /// Partition the samples described by `labels` into folds.
    ///
    /// Every index appears in exactly one validation set and never in the
    /// training set of the same fold. Index lists are sorted ascending.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`EvalError::TooManyFolds`] | `n_folds > labels.len()` |
    /// | [`EvalError::TooFewSamplesForFolds`] | stratified and a non-empty class has fewer than `n_folds` samples |
    pub fn split(&self, labels: &[bool]) -> Result<Vec<Fold>, EvalError> {
        let n_samples = labels.len();
        if self.n_folds > n_samples {
            return Err(EvalError::TooManyFolds {
                n_folds: self.n_folds,
                n_samples,
            });
        }
        let assignments = match self.strategy {
            FoldStrategy::Contiguous => self.contiguous_assignments(n_samples),
            FoldStrategy::Stratified => self.stratified_assignments(labels)?,
        };

        let mut folds: Vec<Fold> = (0..self.n_folds)
            .map(|_| Fold {
                train: Vec::with_capacity(n_samples),
                validation: Vec::new(),
            })
            .collect();
        for (index, &assigned) in assignments.iter().enumerate() {
            for (f, fold) in folds.iter_mut().enumerate() {
                if f == assigned {
                    fold.validation.push(index);
                } else {
                    fold.train.push(index);
                }
            }
        }
        debug!(
            n_folds = self.n_folds,
            sizes = ?folds.iter().map(|f| f.validation.len()).collect::<Vec<_>>(),
            "k-fold split"
        );
        Ok(folds)
    }

    /// Fold id per sample: contiguous blocks over the permuted order, the
    /// first `n % k` blocks one longer than the rest.
    fn contiguous_assignments(&self, n_samples: usize) -> Vec<usize> {
        let mut order: Vec<usize> = (0..n_samples).collect();
        self.shuffle.apply(&mut order);

        let base = n_samples / self.n_folds;
        let extra = n_samples % self.n_folds;
        let mut assignments = vec![0usize; n_samples];
        let mut start = 0;
        for fold in 0..self.n_folds {
            let len = base + usize::from(fold < extra);
            for &idx in &order[start..start + len] {
                assignments[idx] = fold;
            }
            start += len;
        }
        assignments
    }

    /// Fold id per sample: each class permuted separately, then dealt
    /// round-robin, continuing the rotation from one class to the next.
    fn stratified_assignments(&self, labels: &[bool]) -> Result<Vec<usize>, EvalError> {
        let mut presences: Vec<usize> = (0..labels.len()).filter(|&i| labels[i]).collect();
        let mut absences: Vec<usize> = (0..labels.len()).filter(|&i| !labels[i]).collect();

        for (class, members) in [(Class::Presence, &presences), (Class::Absence, &absences)] {
            if !members.is_empty() && members.len() < self.n_folds {
                return Err(EvalError::TooFewSamplesForFolds {
                    class,
                    count: members.len(),
                    n_folds: self.n_folds,
                });
            }
        }

        // Distinct streams so the two classes are not permuted identically.
        let (presence_shuffle, absence_shuffle) = match self.shuffle {
            Shuffle::None => (Shuffle::None, Shuffle::None),
            Shuffle::Seeded(seed) => (Shuffle::Seeded(seed), Shuffle::Seeded(seed.wrapping_add(1))),
        };
        presence_shuffle.apply(&mut presences);
        absence_shuffle.apply(&mut absences);

        let mut assignments = vec![0usize; labels.len()];
        for (j, &idx) in presences.iter().chain(absences.iter()).enumerate() {
            assignments[idx] = j % self.n_folds;
        }
        Ok(assignments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_partition(folds: &[Fold], n_samples: usize) {
        let mut seen = vec![0usize; n_samples];
        for fold in folds {
            for &i in &fold.validation {
                seen[i] += 1;
                assert!(!fold.train.contains(&i), "index {i} in both train and validation");
            }
            assert_eq!(fold.train.len() + fold.validation.len(), n_samples);
        }
        assert!(seen.iter().all(|&c| c == 1), "validation coverage: {seen:?}");
    }

    #[test]
    fn kfold_partitions_for_every_k() {
        let labels: Vec<bool> = (0..23).map(|i| i % 3 == 0).collect();
        for k in 2..=labels.len() {
            for shuffle in [Shuffle::None, Shuffle::Seeded(7)] {
                let folds = KFold::new(k).unwrap().with_shuffle(shuffle).split(&labels).unwrap();
                assert_eq!(folds.len(), k);
                assert_partition(&folds, labels.len());
            }
        }
    }

    #[test]
    fn contiguous_blocks_without_shuffle() {
        let labels = vec![false; 7];
        let folds = KFold::new(3)
            .unwrap()
            .with_shuffle(Shuffle::None)
            .split(&labels)
            .unwrap();
        assert_eq!(folds[0].validation, vec![0, 1, 2]);
        assert_eq!(folds[1].validation, vec![3, 4]);
        assert_eq!(folds[2].validation, vec![5, 6]);
        assert_eq!(folds[1].train, vec![0, 1, 2, 5, 6]);
    }

    #[test]
    fn block_sizes_nearly_equal() {
        let labels = vec![true; 103];
        let folds = KFold::new(10).unwrap().split(&labels).unwrap();
        let sizes: Vec<usize> = folds.iter().map(|f| f.validation.len()).collect();
        assert_eq!(sizes.iter().sum::<usize>(), 103);
        assert!(sizes.iter().all(|&s| s == 10 || s == 11), "{sizes:?}");
    }

    #[test]
    fn stratified_keeps_both_classes_in_training() {
        let labels: Vec<bool> = (0..40).map(|i| i < 8).collect();
        let folds = KFold::new(4)
            .unwrap()
            .with_strategy(FoldStrategy::Stratified)
            .split(&labels)
            .unwrap();
        assert_partition(&folds, labels.len());
        for fold in &folds {
            let presences = fold.validation.iter().filter(|&&i| labels[i]).count();
            assert_eq!(presences, 2);
            assert!(fold.train.iter().any(|&i| labels[i]));
            assert!(fold.train.iter().any(|&i| !labels[i]));
        }
    }

    #[test]
    fn builder_setters_are_reported_back() {
        let kfold = KFold::new(5).unwrap();
        assert_eq!(kfold.strategy(), FoldStrategy::Contiguous);
        let kfold = kfold.with_strategy(FoldStrategy::Stratified);
        assert_eq!(kfold.strategy(), FoldStrategy::Stratified);
        assert_eq!(kfold.n_folds(), 5);
    }

    #[test]
    fn stratified_too_few_samples_error() {
        let labels = vec![true, true, false, false, false, false];
        let err = KFold::new(3)
            .unwrap()
            .with_strategy(FoldStrategy::Stratified)
            .split(&labels)
            .unwrap_err();
        assert!(matches!(
            err,
            EvalError::TooFewSamplesForFolds {
                class: Class::Presence,
                count: 2,
                n_folds: 3
            }
        ));
    }

    #[test]
    fn shuffle_is_deterministic() {
        let labels = vec![false; 20];
        let a = KFold::new(4).unwrap().with_shuffle(Shuffle::Seeded(3)).split(&labels).unwrap();
        let b = KFold::new(4).unwrap().with_shuffle(Shuffle::Seeded(3)).split(&labels).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn invalid_fold_counts() {
        assert!(matches!(KFold::new(1), Err(EvalError::InvalidFoldCount { n_folds: 1 })));
        let err = KFold::new(5).unwrap().split(&[true, false, true]).unwrap_err();
        assert!(matches!(
            err,
            EvalError::TooManyFolds {
                n_folds: 5,
                n_samples: 3
            }
        ));
    }

    #[test]
    fn holdout_is_disjoint_and_complete() {
        for n in [2, 3, 10, 57] {
            for fraction in [0.1, 0.5, 0.7, 0.99] {
                let split = Holdout::new(fraction).unwrap().split(n).unwrap();
                assert!(!split.train.is_empty());
                assert!(!split.test.is_empty());
                let mut all: Vec<usize> =
                    split.train.iter().chain(split.test.iter()).copied().collect();
                all.sort_unstable();
                assert_eq!(all, (0..n).collect::<Vec<_>>());
            }
        }
    }

    #[test]
    fn holdout_sizes_follow_fraction() {
        let split = Holdout::new(0.7).unwrap().with_shuffle(Shuffle::None).split(10).unwrap();
        assert_eq!(split.train, (0..7).collect::<Vec<_>>());
        assert_eq!(split.test, vec![7, 8, 9]);
    }

    #[test]
    fn holdout_rejects_bad_input() {
        for fraction in [0.0, 1.0, -0.2, f64::NAN] {
            assert!(matches!(
                Holdout::new(fraction),
                Err(EvalError::InvalidTrainFraction { .. })
            ));
        }
        assert!(matches!(
            Holdout::new(0.5).unwrap().split(1),
            Err(EvalError::TooFewSamples { .. })
        ));
    }
}
