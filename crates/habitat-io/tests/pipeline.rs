//! End-to-end integration tests: CSV -> fit/evaluate -> JSON -> deserialize.

use std::fs;
use std::path::Path;

use habitat_eval::{ConfusionMatrix, CrossValidation, FeatureSubset, FoldStrategy};
use habitat_io::{
    CellReader, CvRecord, ExperimentName, IoError, MetricsRecord, ResultWriter, SampleReader,
};
use habitat_nb::{GaussianNaiveBayes, GaussianNbConfig};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn metrics(cm: &ConfusionMatrix) -> MetricsRecord {
    MetricsRecord {
        true_positives: cm.true_positives,
        false_positives: cm.false_positives,
        true_negatives: cm.true_negatives,
        false_negatives: cm.false_negatives,
        tpr: cm.tpr(),
        tnr: cm.tnr(),
        fpr: cm.fpr(),
        fnr: cm.fnr(),
        precision: cm.precision(),
        accuracy: cm.accuracy(),
        f1: cm.f1(),
        tss: cm.tss(),
        mcc: cm.mcc(),
    }
}

#[test]
fn predict_round_trip() {
    // 1. Read samples and fit on every covariate
    let samples = SampleReader::new(&fixture_path("samples_12.csv"))
        .read()
        .expect("fixture should parse");
    assert_eq!(samples.n_samples(), 12);
    assert_eq!(samples.n_presences(), 6);

    let model = GaussianNbConfig::new()
        .fit(samples.features(), samples.labels(), samples.feature_names())
        .unwrap();

    // 2. Persist and reload the model through the writer's model path
    let dir = TempDir::new().unwrap();
    let experiment = ExperimentName::new("predict_rt".into()).unwrap();
    let writer = ResultWriter::new(dir.path(), experiment).unwrap();
    model.save(writer.model_path()).unwrap();
    let model = GaussianNaiveBayes::load(writer.model_path()).unwrap();

    // 3. Cells list the covariates in a different order; align to the model
    let cells = CellReader::new(&fixture_path("cells_6.csv"))
        .read()
        .unwrap()
        .select_columns(model.feature_names())
        .unwrap();
    assert_eq!(cells.feature_names(), samples.feature_names());

    let probabilities = model.predict_proba_batch(cells.features()).unwrap();
    let path = writer
        .write_predictions(cells.ids(), cells.coords(), &probabilities, model.threshold())
        .unwrap();

    // 4. Deserialize back and verify
    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["experiment"], "predict_rt");
    let entries = content["cells"].as_array().unwrap();
    assert_eq!(entries.len(), 6);

    let by_id = |id: &str| {
        entries
            .iter()
            .find(|e| e["cell_id"] == id)
            .unwrap_or_else(|| panic!("missing cell {id}"))
    };
    assert_eq!(by_id("r0c0")["presence"], true, "lowland warm cell");
    assert_eq!(by_id("r1c1")["presence"], false, "upland cold cell");
    for entry in entries {
        let p = entry["probability"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&p), "probability {p} out of range");
    }
}

#[test]
fn evaluate_round_trip() {
    let samples = SampleReader::new(&fixture_path("samples_12.csv")).read().unwrap();
    let indices = samples
        .feature_indices(&["bio1".to_string(), "elevation".to_string()])
        .unwrap();
    let subset = FeatureSubset::new(indices, samples.n_features()).unwrap();

    let cv = CrossValidation::new(3)
        .unwrap()
        .with_strategy(FoldStrategy::Stratified);
    let result = cv
        .evaluate(&GaussianNbConfig::new(), samples.features(), samples.labels(), &subset)
        .unwrap();

    let dir = TempDir::new().unwrap();
    let writer = ResultWriter::new(dir.path(), ExperimentName::new("eval_rt".into()).unwrap())
        .unwrap();
    let cv_record = CvRecord {
        n_folds: cv.n_folds(),
        mean_mcc: result.mean_mcc,
        std_mcc: result.std_mcc,
        fold_mcc: result.folds.iter().map(|f| f.mcc).collect(),
        pooled: metrics(&result.pooled),
    };
    let path = writer
        .write_evaluation(
            &subset.names(samples.feature_names()),
            cv.threshold(),
            samples.n_samples(),
            0,
            &metrics(&result.pooled),
            &cv_record,
        )
        .unwrap();
    assert_eq!(path, dir.path().join("eval_rt_evaluate.json"));

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["features"][1], "elevation");
    assert_eq!(content["cross_validation"]["fold_mcc"].as_array().unwrap().len(), 3);
    let mcc = content["cross_validation"]["mean_mcc"].as_f64().unwrap();
    assert!(mcc > 0.9, "mean mcc {mcc}");
    assert_eq!(content["cross_validation"]["pooled"]["true_positives"], 6);
}

#[test]
fn missing_model_feature_is_reported() {
    let cells = CellReader::new(&fixture_path("cells_6.csv")).read().unwrap();
    let err = cells.select_columns(&["bio5".to_string()]).unwrap_err();
    assert!(matches!(err, IoError::MissingFeature { ref name, .. } if name == "bio5"));
}
