//! Accuracy regression tests for habitat-eval.
//!
//! These tests verify that the evaluation pipeline keeps recovering the
//! informative variables of a deterministic synthetic occurrence dataset.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use habitat_eval::{
    ConfusionMatrix, CrossValidation, FeatureSubset, FoldStrategy, ForwardSelection, Holdout,
    ThresholdSweep,
};
use habitat_nb::GaussianNbConfig;

// ---------------------------------------------------------------------------
// Helper: synthetic occurrence data
// ---------------------------------------------------------------------------

/// 200 sites, 6 covariates. Covariates 0 and 1 shift with presence, 2-5 do not.
/// Presences make up a quarter of the sites.
fn make_occurrences() -> (Vec<Vec<f64>>, Vec<bool>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let mut features = Vec::with_capacity(200);
    let mut labels = Vec::with_capacity(200);
    for i in 0..200 {
        let present = i % 4 == 0;
        let row: Vec<f64> = (0..6)
            .map(|f| {
                let shift = match (present, f) {
                    (true, 0) => 3.0,
                    (true, 1) => 1.5,
                    _ => 0.0,
                };
                shift + noise.sample(&mut rng)
            })
            .collect();
        features.push(row);
        labels.push(present);
    }
    (features, labels)
}

// ---------------------------------------------------------------------------
// a) cross-validated MCC on informative covariates
// ---------------------------------------------------------------------------

#[test]
fn cv_mcc_above_threshold() {
    let (features, labels) = make_occurrences();
    let subset = FeatureSubset::new(vec![0, 1], 6).unwrap();
    let cv = CrossValidation::new(5)
        .unwrap()
        .with_seed(42)
        .with_strategy(FoldStrategy::Stratified);
    let result = cv
        .evaluate(&GaussianNbConfig::new(), &features, &labels, &subset)
        .unwrap();
    assert!(result.mean_mcc > 0.6, "cv mean_mcc {} <= 0.6", result.mean_mcc);
}

// ---------------------------------------------------------------------------
// b) forward selection recovers the informative covariates
// ---------------------------------------------------------------------------

#[test]
fn selection_starts_with_strongest_covariate() {
    let (features, labels) = make_occurrences();
    let cv = CrossValidation::new(5)
        .unwrap()
        .with_seed(42)
        .with_strategy(FoldStrategy::Stratified);
    let result = ForwardSelection::new(cv)
        .run(&GaussianNbConfig::new(), &features, &labels)
        .unwrap();

    assert_eq!(result.selected.first(), Some(&0), "selected {:?}", result.selected);
    for pair in result.steps.windows(2) {
        assert!(pair[1].score > pair[0].score, "scores must increase: {:?}", result.steps);
    }
}

// ---------------------------------------------------------------------------
// c) holdout evaluation after fitting on the training part
// ---------------------------------------------------------------------------

#[test]
fn holdout_mcc_above_threshold() {
    let (features, labels) = make_occurrences();
    let split = Holdout::new(0.7).unwrap().split(features.len()).unwrap();
    let subset = FeatureSubset::new(vec![0, 1], 6).unwrap();
    let names = vec!["bio0".to_string(), "bio1".to_string()];

    let train_x: Vec<Vec<f64>> = split.train.iter().map(|&i| subset.project(&features[i])).collect();
    let train_y: Vec<bool> = split.train.iter().map(|&i| labels[i]).collect();
    let model = GaussianNbConfig::new().fit(&train_x, &train_y, &names).unwrap();

    let test_x: Vec<Vec<f64>> = split.test.iter().map(|&i| subset.project(&features[i])).collect();
    let test_y: Vec<bool> = split.test.iter().map(|&i| labels[i]).collect();
    let probabilities = model.predict_proba_batch(&test_x).unwrap();
    let cm = ConfusionMatrix::from_probabilities(&probabilities, &test_y, 0.5).unwrap();
    assert!(cm.mcc() > 0.5, "holdout mcc {} <= 0.5\n{cm}", cm.mcc());
}

// ---------------------------------------------------------------------------
// d) tuned threshold is at least as good as the default
// ---------------------------------------------------------------------------

#[test]
fn tuned_threshold_not_worse_than_default() {
    let (features, labels) = make_occurrences();
    let subset = FeatureSubset::new(vec![0, 1], 6).unwrap();
    let result = CrossValidation::new(5)
        .unwrap()
        .evaluate(&GaussianNbConfig::new(), &features, &labels, &subset)
        .unwrap();

    let curve = ThresholdSweep::new(101).unwrap().sweep(&result.out_of_fold, &labels).unwrap();
    let default = ConfusionMatrix::from_probabilities(&result.out_of_fold, &labels, 0.5).unwrap();
    assert!(curve.best().mcc >= default.mcc());
    assert!(curve.roc_auc() > 0.85, "auc = {}", curve.roc_auc());
}
