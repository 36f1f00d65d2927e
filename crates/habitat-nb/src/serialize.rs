//! Versioned on-disk model format.
//!
//! A saved model is a bincode envelope holding the format version, the
//! feature schema, and the fitted model. Loading checks the version first and
//! then that the schema header agrees with the statistics it describes.

use std::path::Path;

use tracing::{debug, info, instrument};

use crate::error::NbError;
use crate::model::GaussianNaiveBayes;

/// Current binary format version.
const FORMAT_VERSION: u32 = 1;

/// Borrowed view written by [`GaussianNaiveBayes::save`].
///
/// Field order and types match [`ModelEnvelope`], so bincode produces the
/// same bytes as for the owned form.
#[derive(serde::Serialize)]
struct EnvelopeRef<'a> {
    format_version: u32,
    n_features: usize,
    feature_names: &'a [String],
    model: &'a GaussianNaiveBayes,
}

/// Owned envelope read back by [`GaussianNaiveBayes::load`].
#[derive(serde::Serialize, serde::Deserialize)]
struct ModelEnvelope {
    format_version: u32,
    n_features: usize,
    feature_names: Vec<String>,
    model: GaussianNaiveBayes,
}

impl ModelEnvelope {
    /// Return the model once the header and the statistics agree.
    fn into_model(self, path: &Path) -> Result<GaussianNaiveBayes, NbError> {
        if self.format_version != FORMAT_VERSION {
            return Err(NbError::IncompatibleModelVersion {
                expected: FORMAT_VERSION,
                found: self.format_version,
                path: path.to_path_buf(),
            });
        }
        let inconsistent = |reason: &'static str| NbError::InconsistentModel {
            path: path.to_path_buf(),
            reason,
        };
        let model = self.model;
        if self.n_features != model.n_features() {
            return Err(inconsistent("header feature count differs from model"));
        }
        if self.feature_names != model.feature_names() {
            return Err(inconsistent("header feature names differ from model"));
        }
        for stats in [model.presence(), model.absence()] {
            if stats.means().len() != self.n_features || stats.std_devs().len() != self.n_features {
                return Err(inconsistent("class statistics have the wrong length"));
            }
            if stats.std_devs().iter().any(|&sd| !(sd.is_finite() && sd > 0.0)) {
                return Err(inconsistent("standard deviation is not positive and finite"));
            }
        }
        if !(0.0..=1.0).contains(&model.threshold()) {
            return Err(inconsistent("threshold outside [0, 1]"));
        }
        Ok(model)
    }
}

impl GaussianNaiveBayes {
    /// Save the model to a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`NbError::SerializeModel`] | bincode encoding failed |
    /// | [`NbError::WriteModel`] | file write failed |
    #[instrument(skip(self), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), NbError> {
        let path = path.as_ref();
        let envelope = EnvelopeRef {
            format_version: FORMAT_VERSION,
            n_features: self.n_features(),
            feature_names: self.feature_names(),
            model: self,
        };
        let bytes =
            bincode::serialize(&envelope).map_err(|source| NbError::SerializeModel { source })?;
        std::fs::write(path, &bytes).map_err(|source| NbError::WriteModel {
            path: path.to_path_buf(),
            source,
        })?;

        info!(
            size_bytes = bytes.len(),
            n_features = self.n_features(),
            format_version = FORMAT_VERSION,
            "model saved"
        );
        Ok(())
    }

    /// Load a model from a binary file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`NbError::ReadModel`] | file read failed |
    /// | [`NbError::DeserializeModel`] | bincode decoding failed |
    /// | [`NbError::IncompatibleModelVersion`] | format version mismatch |
    /// | [`NbError::InconsistentModel`] | header and statistics disagree |
    #[instrument(fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NbError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| NbError::ReadModel {
            path: path.to_path_buf(),
            source,
        })?;
        let envelope: ModelEnvelope =
            bincode::deserialize(&bytes).map_err(|source| NbError::DeserializeModel {
                path: path.to_path_buf(),
                source,
            })?;
        let model = envelope.into_model(path)?;

        debug!(
            n_features = model.n_features(),
            feature_names = ?model.feature_names(),
            threshold = model.threshold(),
            "model loaded"
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;
    use crate::config::GaussianNbConfig;

    fn train_simple_model() -> GaussianNaiveBayes {
        let features = vec![
            vec![1.0, 0.5],
            vec![2.0, 0.7],
            vec![3.0, 0.4],
            vec![10.0, 0.6],
            vec![11.0, 0.5],
            vec![12.0, 0.8],
        ];
        let labels = vec![false, false, false, true, true, true];
        let names = vec!["bio1".to_string(), "bio12".to_string()];
        GaussianNbConfig::new()
            .with_threshold(0.4)
            .fit(&features, &labels, &names)
            .unwrap()
    }

    #[test]
    fn round_trip_identical_predictions() {
        let dir = TempDir::new().unwrap();
        let model_path = dir.path().join("test_model.bin");

        let model = train_simple_model();
        model.save(&model_path).unwrap();
        let loaded = GaussianNaiveBayes::load(&model_path).unwrap();

        assert_eq!(loaded, model);
        for sample in [[1.5, 0.5], [11.0, 0.6], [6.5, 0.6]] {
            assert_eq!(
                model.predict_proba(&sample).unwrap(),
                loaded.predict_proba(&sample).unwrap()
            );
        }
        assert!((loaded.threshold() - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn version_mismatch_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.bin");
        let model = train_simple_model();
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION + 1,
            n_features: model.n_features(),
            feature_names: model.feature_names().to_vec(),
            model,
        };
        write_envelope(&path, &envelope);

        let err = GaussianNaiveBayes::load(&path).unwrap_err();
        assert!(matches!(err, NbError::IncompatibleModelVersion { .. }));
    }

    fn write_envelope(path: &Path, envelope: &ModelEnvelope) {
        std::fs::write(path, bincode::serialize(envelope).unwrap()).unwrap();
    }

    #[test]
    fn header_feature_count_must_match_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad_count.bin");
        let model = train_simple_model();
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_features: model.n_features() + 1,
            feature_names: model.feature_names().to_vec(),
            model,
        };
        write_envelope(&path, &envelope);

        let err = GaussianNaiveBayes::load(&path).unwrap_err();
        assert!(matches!(err, NbError::InconsistentModel { .. }), "{err}");
    }

    #[test]
    fn header_feature_names_must_match_model() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad_names.bin");
        let model = train_simple_model();
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_features: model.n_features(),
            feature_names: vec!["bio12".to_string(), "bio1".to_string()],
            model,
        };
        write_envelope(&path, &envelope);

        let err = GaussianNaiveBayes::load(&path).unwrap_err();
        assert!(matches!(err, NbError::InconsistentModel { .. }), "{err}");
    }

    #[test]
    fn zero_std_dev_in_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zero_sd.bin");
        let mut model = train_simple_model();
        model.absence.std_devs[1] = 0.0;
        let envelope = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_features: model.n_features(),
            feature_names: model.feature_names().to_vec(),
            model,
        };
        write_envelope(&path, &envelope);

        let err = GaussianNaiveBayes::load(&path).unwrap_err();
        assert!(matches!(err, NbError::InconsistentModel { .. }), "{err}");
    }

    #[test]
    fn borrowed_and_owned_envelopes_encode_identically() {
        let model = train_simple_model();
        let borrowed = EnvelopeRef {
            format_version: FORMAT_VERSION,
            n_features: model.n_features(),
            feature_names: model.feature_names(),
            model: &model,
        };
        let owned = ModelEnvelope {
            format_version: FORMAT_VERSION,
            n_features: model.n_features(),
            feature_names: model.feature_names().to_vec(),
            model: model.clone(),
        };
        assert_eq!(
            bincode::serialize(&borrowed).unwrap(),
            bincode::serialize(&owned).unwrap()
        );
    }

    #[test]
    fn load_nonexistent_file_error() {
        let dir = TempDir::new().unwrap();
        let err = GaussianNaiveBayes::load(dir.path().join("missing.bin")).unwrap_err();
        assert!(matches!(err, NbError::ReadModel { .. }));
    }

    #[test]
    fn load_corrupt_file_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("corrupt.bin");
        std::fs::write(&path, b"not a valid bincode file").unwrap();
        let err = GaussianNaiveBayes::load(&path).unwrap_err();
        assert!(matches!(err, NbError::DeserializeModel { .. }));
    }
}
