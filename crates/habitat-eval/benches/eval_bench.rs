//! Criterion benchmarks for habitat-eval: cross-validation and forward selection.

use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

use habitat_eval::{CrossValidation, FeatureSubset, ForwardSelection};
use habitat_nb::GaussianNbConfig;

fn make_occurrences(n_samples: usize, n_features: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<bool>) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let noise = Normal::new(0.0, 1.0).unwrap();
    let mut features = Vec::with_capacity(n_samples);
    let mut labels = Vec::with_capacity(n_samples);
    for i in 0..n_samples {
        let present = i % 3 == 0;
        let row: Vec<f64> = (0..n_features)
            .map(|f| {
                let shift = if present && f < 3 { 1.5 } else { 0.0 };
                shift + noise.sample(&mut rng)
            })
            .collect();
        features.push(row);
        labels.push(present);
    }
    (features, labels)
}

fn bench_cross_validation(c: &mut Criterion) {
    let (features, labels) = make_occurrences(2_000, 19, 42);
    let subset = FeatureSubset::all(19).unwrap();
    let cv = CrossValidation::new(10).unwrap();
    let config = GaussianNbConfig::new();

    c.bench_function("cv_10fold_2000x19", |b| {
        b.iter(|| cv.evaluate(&config, &features, &labels, &subset).unwrap());
    });
}

fn bench_forward_selection(c: &mut Criterion) {
    let (features, labels) = make_occurrences(500, 19, 42);
    let selection = ForwardSelection::new(CrossValidation::new(5).unwrap());
    let config = GaussianNbConfig::new();

    c.bench_function("forward_selection_500x19", |b| {
        b.iter(|| selection.run(&config, &features, &labels).unwrap());
    });
}

criterion_group!(benches, bench_cross_validation, bench_forward_selection);
criterion_main!(benches);
