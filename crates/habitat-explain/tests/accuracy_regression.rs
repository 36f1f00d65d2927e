//! Accuracy regression tests for habitat-explain.
//!
//! These tests pin Shapley attributions of a fitted Gaussian Naive Bayes
//! model on deterministic synthetic data.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use habitat_explain::ShapleyEstimator;
use habitat_nb::{Classifier, GaussianNaiveBayes, GaussianNbConfig};

// ---------------------------------------------------------------------------
// Helper: model with one informative and one shared covariate
// ---------------------------------------------------------------------------

/// Feature 0 is N(3, 1) for presences and N(0, 1) for absences. Feature 1
/// takes the exact same values in both classes, so its class-conditional
/// densities coincide.
fn fit_model() -> (GaussianNaiveBayes, Vec<Vec<f64>>) {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let shared: Vec<f64> = (0..30).map(|_| 10.0 + noise.sample(&mut rng)).collect();

    let mut features = Vec::with_capacity(60);
    let mut labels = Vec::with_capacity(60);
    for label in [true, false] {
        let shift = if label { 3.0 } else { 0.0 };
        for &s in &shared {
            features.push(vec![shift + noise.sample(&mut rng), s]);
            labels.push(label);
        }
    }
    let names = vec!["bio1".to_string(), "bio12".to_string()];
    let model = GaussianNbConfig::new().fit(&features, &labels, &names).unwrap();
    (model, features)
}

// ---------------------------------------------------------------------------
// a) shared covariate gets zero attribution at every draw count
// ---------------------------------------------------------------------------

#[test]
fn shared_covariate_attribution_vanishes() {
    let (model, reference) = fit_model();
    for n_draws in [10, 100, 1000] {
        let est = ShapleyEstimator::new(n_draws).unwrap();
        let value = est.estimate(&model, &[3.0, 8.0], &reference, 1).unwrap();
        assert!(value.abs() < 1e-6, "n_draws {n_draws}: {value}");
    }
}

// ---------------------------------------------------------------------------
// b) informative covariate carries the prediction
// ---------------------------------------------------------------------------

#[test]
fn informative_covariate_dominates() {
    let (model, reference) = fit_model();
    let attribution = ShapleyEstimator::new(200)
        .unwrap()
        .explain(&model, &[3.0, 10.0], &reference)
        .unwrap();
    assert!(attribution.values[0] > 0.2, "{:?}", attribution.values);
    assert!(attribution.values[0].abs() > 10.0 * attribution.values[1].abs());
}

// ---------------------------------------------------------------------------
// c) attributions add up to the gap from the average reference prediction
// ---------------------------------------------------------------------------

#[test]
fn attributions_sum_to_prediction_gap() {
    let (model, reference) = fit_model();
    let x = [2.5, 10.0];
    let attribution = ShapleyEstimator::new(4000)
        .unwrap()
        .explain(&model, &x, &reference)
        .unwrap();

    let baseline = reference
        .iter()
        .map(|z| model.probability(z).unwrap())
        .sum::<f64>()
        / reference.len() as f64;
    let total: f64 = attribution.values.iter().sum();
    let gap = attribution.probability - baseline;
    assert!((total - gap).abs() < 0.05, "sum {total} vs gap {gap}");
}
