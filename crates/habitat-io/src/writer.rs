//! JSON result writer for evaluation, selection, tuning, prediction and
//! attribution outputs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{CellId, ExperimentName};

/// Confusion counts and derived rates at one threshold.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsRecord {
    /// Presences predicted as presence.
    pub true_positives: usize,
    /// Absences predicted as presence.
    pub false_positives: usize,
    /// Absences predicted as absence.
    pub true_negatives: usize,
    /// Presences predicted as absence.
    pub false_negatives: usize,
    /// Sensitivity, `TP / (TP + FN)`.
    pub tpr: f64,
    /// Specificity, `TN / (TN + FP)`.
    pub tnr: f64,
    /// False positive rate, `FP / (FP + TN)`.
    pub fpr: f64,
    /// False negative rate, `FN / (FN + TP)`.
    pub fnr: f64,
    /// `TP / (TP + FP)`.
    pub precision: f64,
    /// Fraction of samples classified correctly.
    pub accuracy: f64,
    /// Harmonic mean of precision and sensitivity.
    pub f1: f64,
    /// True skill statistic, `TPR + TNR - 1`.
    pub tss: f64,
    /// Matthews correlation coefficient.
    pub mcc: f64,
}

/// Cross-validation summary.
#[derive(Debug, Clone, Serialize)]
pub struct CvRecord {
    /// Number of folds evaluated.
    pub n_folds: usize,
    /// Mean of the per-fold MCC values.
    pub mean_mcc: f64,
    /// Population standard deviation of the per-fold MCC values.
    pub std_mcc: f64,
    /// MCC of each fold, in fold order.
    pub fold_mcc: Vec<f64>,
    /// Metrics of the summed fold confusion matrices.
    pub pooled: MetricsRecord,
}

/// One accepted forward-selection round.
#[derive(Debug, Clone)]
pub struct SelectionRound {
    /// Index of the feature added.
    pub feature: usize,
    /// Mean MCC after adding it.
    pub score: f64,
    /// `(feature index, mean MCC)` of every candidate tried.
    pub candidates: Vec<(usize, f64)>,
}

/// Writes pipeline results to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_{stage}.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write holdout and cross-validation metrics to `{experiment}_evaluate.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all)]
    pub fn write_evaluation(
        &self,
        feature_names: &[String],
        threshold: f64,
        n_train: usize,
        n_holdout: usize,
        holdout: &MetricsRecord,
        cv: &CvRecord,
    ) -> Result<PathBuf, IoError> {
        let artifact = EvaluateArtifact {
            experiment: self.experiment.as_str(),
            features: feature_names,
            threshold,
            n_train,
            n_holdout,
            holdout,
            cross_validation: cv,
        };
        self.write_json("evaluate", &artifact)
    }

    /// Write a forward-selection trace to `{experiment}_select.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all)]
    pub fn write_selection(
        &self,
        feature_names: &[String],
        selected: &[usize],
        rounds: &[SelectionRound],
        best_score: f64,
    ) -> Result<PathBuf, IoError> {
        let name = |i: usize| feature_names.get(i).map_or("", String::as_str);
        let steps = rounds
            .iter()
            .enumerate()
            .map(|(round, r)| StepEntry {
                round,
                feature: name(r.feature),
                score: r.score,
                candidates: r
                    .candidates
                    .iter()
                    .map(|&(f, mean_mcc)| CandidateEntry {
                        feature: name(f),
                        mean_mcc,
                    })
                    .collect(),
            })
            .collect();

        let artifact = SelectArtifact {
            experiment: self.experiment.as_str(),
            selected: selected.iter().map(|&i| name(i)).collect(),
            // JSON has no -inf; nothing selected is written as null.
            best_score: best_score.is_finite().then_some(best_score),
            steps,
        };
        self.write_json("select", &artifact)
    }

    /// Write a threshold sweep to `{experiment}_threshold.json`.
    ///
    /// Each point is `(threshold, mcc, tpr, fpr)`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all)]
    pub fn write_threshold(
        &self,
        points: &[(f64, f64, f64, f64)],
        best_threshold: f64,
        best_mcc: f64,
        roc_auc: f64,
    ) -> Result<PathBuf, IoError> {
        let artifact = ThresholdArtifact {
            experiment: self.experiment.as_str(),
            best_threshold,
            best_mcc,
            roc_auc,
            curve: points
                .iter()
                .map(|&(threshold, mcc, tpr, fpr)| CurveEntry {
                    threshold,
                    mcc,
                    tpr,
                    fpr,
                })
                .collect(),
        };
        self.write_json("threshold", &artifact)
    }

    /// Write a probability surface to `{experiment}_predict.json`.
    ///
    /// A cell is marked present when its probability is at least `threshold`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all, fields(n_cells = ids.len()))]
    pub fn write_predictions(
        &self,
        ids: &[CellId],
        coords: &[(f64, f64)],
        probabilities: &[f64],
        threshold: f64,
    ) -> Result<PathBuf, IoError> {
        let cells: Vec<PredictionEntry> = ids
            .iter()
            .zip(coords)
            .zip(probabilities)
            .map(|((id, &(x, y)), &probability)| PredictionEntry {
                cell_id: id.as_str(),
                x,
                y,
                probability,
                presence: probability >= threshold,
            })
            .collect();

        let artifact = PredictArtifact {
            experiment: self.experiment.as_str(),
            threshold,
            n_cells: cells.len(),
            n_present: cells.iter().filter(|c| c.presence).count(),
            cells,
        };
        self.write_json("predict", &artifact)
    }

    /// Write per-cell Shapley values to `{experiment}_explain.json`.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::Serialize`] or [`IoError::WriteFile`].
    #[instrument(skip_all, fields(n_cells = ids.len()))]
    pub fn write_explanations(
        &self,
        ids: &[CellId],
        feature_names: &[String],
        probabilities: &[f64],
        values: &[Vec<f64>],
        n_draws: usize,
    ) -> Result<PathBuf, IoError> {
        let cells: Vec<ExplanationEntry> = ids
            .iter()
            .zip(probabilities)
            .zip(values)
            .map(|((id, &probability), row)| ExplanationEntry {
                cell_id: id.as_str(),
                probability,
                shapley: feature_names
                    .iter()
                    .zip(row)
                    .map(|(feature, &value)| ShapleyEntry {
                        feature: feature.as_str(),
                        value,
                    })
                    .collect(),
            })
            .collect();

        let artifact = ExplainArtifact {
            experiment: self.experiment.as_str(),
            n_draws,
            features: feature_names,
            cells,
        };
        self.write_json("explain", &artifact)
    }

    /// Return the path where the model binary should be saved.
    ///
    /// Does not write anything, just computes `{output_dir}/{experiment}_model.bin`.
    #[must_use]
    pub fn model_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_model.bin", self.experiment.as_str()))
    }

    fn write_json<T: Serialize>(&self, stage: &str, artifact: &T) -> Result<PathBuf, IoError> {
        let path = self
            .output_dir
            .join(format!("{}_{stage}.json", self.experiment.as_str()));
        let json = serde_json::to_string_pretty(artifact).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;
        info!(path = %path.display(), stage, "result written");
        Ok(path)
    }
}

// --- Shadow structs for JSON serialization ---

#[derive(Serialize)]
struct EvaluateArtifact<'a> {
    experiment: &'a str,
    features: &'a [String],
    threshold: f64,
    n_train: usize,
    n_holdout: usize,
    holdout: &'a MetricsRecord,
    cross_validation: &'a CvRecord,
}

#[derive(Serialize)]
struct SelectArtifact<'a> {
    experiment: &'a str,
    selected: Vec<&'a str>,
    best_score: Option<f64>,
    steps: Vec<StepEntry<'a>>,
}

#[derive(Serialize)]
struct StepEntry<'a> {
    round: usize,
    feature: &'a str,
    score: f64,
    candidates: Vec<CandidateEntry<'a>>,
}

#[derive(Serialize)]
struct CandidateEntry<'a> {
    feature: &'a str,
    mean_mcc: f64,
}

#[derive(Serialize)]
struct ThresholdArtifact<'a> {
    experiment: &'a str,
    best_threshold: f64,
    best_mcc: f64,
    roc_auc: f64,
    curve: Vec<CurveEntry>,
}

#[derive(Serialize)]
struct CurveEntry {
    threshold: f64,
    mcc: f64,
    tpr: f64,
    fpr: f64,
}

#[derive(Serialize)]
struct PredictArtifact<'a> {
    experiment: &'a str,
    threshold: f64,
    n_cells: usize,
    n_present: usize,
    cells: Vec<PredictionEntry<'a>>,
}

#[derive(Serialize)]
struct PredictionEntry<'a> {
    cell_id: &'a str,
    x: f64,
    y: f64,
    probability: f64,
    presence: bool,
}

#[derive(Serialize)]
struct ExplainArtifact<'a> {
    experiment: &'a str,
    n_draws: usize,
    features: &'a [String],
    cells: Vec<ExplanationEntry<'a>>,
}

#[derive(Serialize)]
struct ExplanationEntry<'a> {
    cell_id: &'a str,
    probability: f64,
    shapley: Vec<ShapleyEntry<'a>>,
}

#[derive(Serialize)]
struct ShapleyEntry<'a> {
    feature: &'a str,
    value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn writer(dir: &TempDir, name: &str) -> ResultWriter {
        ResultWriter::new(dir.path(), ExperimentName::new(name.to_string()).unwrap()).unwrap()
    }

    fn read_json(path: &Path) -> serde_json::Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[test]
    fn creates_nested_output_dir() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("b");
        let experiment = ExperimentName::new("run".into()).unwrap();
        ResultWriter::new(&nested, experiment).unwrap();
        assert!(nested.is_dir());
    }

    fn sample_metrics() -> MetricsRecord {
        MetricsRecord {
            true_positives: 8,
            false_positives: 2,
            true_negatives: 7,
            false_negatives: 3,
            tpr: 8.0 / 11.0,
            tnr: 7.0 / 9.0,
            fpr: 2.0 / 9.0,
            fnr: 3.0 / 11.0,
            precision: 0.8,
            accuracy: 0.75,
            f1: 16.0 / 21.0,
            tss: 8.0 / 11.0 + 7.0 / 9.0 - 1.0,
            mcc: 0.5,
        }
    }

    #[test]
    fn evaluation_writes_every_metric_field() {
        let dir = TempDir::new().unwrap();
        let cv = CvRecord {
            n_folds: 2,
            mean_mcc: 0.4,
            std_mcc: 0.1,
            fold_mcc: vec![0.3, 0.5],
            pooled: sample_metrics(),
        };
        let names = vec!["bio1".to_string()];
        let path = writer(&dir, "eval")
            .write_evaluation(&names, 0.5, 15, 5, &sample_metrics(), &cv)
            .unwrap();

        let json = read_json(&path);
        let holdout = json["holdout"].as_object().unwrap();
        for key in [
            "true_positives",
            "false_positives",
            "true_negatives",
            "false_negatives",
            "tpr",
            "tnr",
            "fpr",
            "fnr",
            "precision",
            "accuracy",
            "f1",
            "tss",
            "mcc",
        ] {
            assert!(holdout.contains_key(key), "missing {key}");
        }
        assert_eq!(holdout.len(), 13);
        assert_eq!(json["cross_validation"]["n_folds"], 2);
        assert_eq!(json["cross_validation"]["fold_mcc"].as_array().unwrap().len(), 2);
        assert_eq!(json["cross_validation"]["pooled"]["true_positives"], 8);
        assert_eq!(json["n_train"], 15);
    }

    #[test]
    fn model_path_naming() {
        let dir = TempDir::new().unwrap();
        let w = writer(&dir, "lynx");
        assert_eq!(w.model_path(), dir.path().join("lynx_model.bin"));
    }

    #[test]
    fn predictions_apply_threshold() {
        let dir = TempDir::new().unwrap();
        let ids = vec![CellId::new("c1".into()), CellId::new("c2".into())];
        let path = writer(&dir, "pred")
            .write_predictions(&ids, &[(0.0, 1.0), (2.0, 3.0)], &[0.5, 0.2], 0.5)
            .unwrap();
        assert_eq!(path, dir.path().join("pred_predict.json"));

        let json = read_json(&path);
        assert_eq!(json["n_cells"], 2);
        assert_eq!(json["n_present"], 1);
        assert_eq!(json["cells"][0]["cell_id"], "c1");
        assert_eq!(json["cells"][0]["presence"], true);
        assert_eq!(json["cells"][1]["presence"], false);
        assert_eq!(json["cells"][1]["y"], 3.0);
    }

    #[test]
    fn selection_uses_feature_names() {
        let dir = TempDir::new().unwrap();
        let names = vec!["bio1".to_string(), "bio12".to_string()];
        let rounds = vec![SelectionRound {
            feature: 1,
            score: 0.8,
            candidates: vec![(0, 0.3), (1, 0.8)],
        }];
        let path = writer(&dir, "sel")
            .write_selection(&names, &[1], &rounds, 0.8)
            .unwrap();
        let json = read_json(&path);
        assert_eq!(json["selected"][0], "bio12");
        assert_eq!(json["steps"][0]["candidates"][0]["feature"], "bio1");
        assert_eq!(json["best_score"], 0.8);
    }

    #[test]
    fn empty_selection_writes_null_score() {
        let dir = TempDir::new().unwrap();
        let path = writer(&dir, "none")
            .write_selection(&["a".to_string()], &[], &[], f64::NEG_INFINITY)
            .unwrap();
        assert!(read_json(&path)["best_score"].is_null());
    }

    #[test]
    fn explanations_pair_values_with_names() {
        let dir = TempDir::new().unwrap();
        let ids = vec![CellId::new("c1".into())];
        let names = vec!["bio1".to_string(), "bio12".to_string()];
        let path = writer(&dir, "shap")
            .write_explanations(&ids, &names, &[0.7], &[vec![0.15, -0.05]], 50)
            .unwrap();
        let json = read_json(&path);
        assert_eq!(json["n_draws"], 50);
        assert_eq!(json["cells"][0]["shapley"][1]["feature"], "bio12");
        assert_eq!(json["cells"][0]["shapley"][1]["value"], -0.05);
    }
}
