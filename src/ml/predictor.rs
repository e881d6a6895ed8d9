//! Inference over a loaded artifact bundle.

use crate::logging::{self, DataSource};
use crate::ml::artifacts::{ArtifactBundle, ArtifactStore};
use crate::ml::preprocess::Preprocessor;
use crate::model::{ArtifactError, PredictError, Record};

/// Point predictions, one per input record.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub values: Vec<f64>,
    /// Trained feature order the values were computed with
    pub features_used: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Predictor {
    bundle: ArtifactBundle,
    preprocessor: Preprocessor,
}

impl Predictor {
    pub fn new(bundle: ArtifactBundle) -> Self {
        Self {
            bundle,
            preprocessor: Preprocessor::default(),
        }
    }

    /// Load the bundle from `store`. A store with nothing saved yet means
    /// the model was never trained.
    pub fn from_store(store: &ArtifactStore) -> Result<Self, PredictError> {
        match store.load() {
            Ok(bundle) => Ok(Self::new(bundle)),
            Err(ArtifactError::NotFound(_)) => Err(PredictError::NotTrained),
            Err(e) => Err(PredictError::Artifact(e)),
        }
    }

    pub fn bundle(&self) -> &ArtifactBundle {
        &self.bundle
    }

    pub fn feature_names(&self) -> &[String] {
        &self.bundle.model.feature_names
    }

    pub fn predict(&self, records: &[Record]) -> Result<Prediction, PredictError> {
        let matrix = self.preprocessor.transform(records, &self.bundle.encoders);
        if matrix.is_empty() {
            return Err(PredictError::NoFeatures);
        }

        let trained = &self.bundle.model.feature_names;
        let missing = matrix.missing_columns(trained);
        if !missing.is_empty() {
            logging::warn(
                DataSource::Model,
                None,
                &format!("Input lacks trained features {missing:?}; treating them as 0"),
            );
        }
        let extra: Vec<&str> = matrix
            .columns
            .iter()
            .filter(|c| !trained.contains(c))
            .map(String::as_str)
            .collect();
        if !extra.is_empty() {
            logging::debug(
                DataSource::Model,
                None,
                &format!("Ignoring features the model was not trained on: {extra:?}"),
            );
        }

        let aligned = matrix.align_to(trained).fill_missing(0.0);
        let scaled = self.bundle.scaler.transform(&aligned.rows);
        let values = self.bundle.model.forest.predict(&scaled);

        Ok(Prediction {
            values,
            features_used: aligned.columns,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::forest::ForestConfig;
    use crate::ml::trainer::Trainer;

    fn training_records() -> Vec<Record> {
        (0..20)
            .map(|i| Record {
                date: Some(format!("2023-{:02}-10", i % 12 + 1)),
                wl_depth_below_gls: Some(4.0 + (i % 4) as f64),
                wl_depth_below_gls_in_premonsoons: Some(5.0 + (i % 3) as f64),
                ..Default::default()
            })
            .collect()
    }

    fn trained(dir: &std::path::Path) -> Predictor {
        let trainer = Trainer::new(ArtifactStore::new(dir), "wlDepthBelowGls").with_forest_config(ForestConfig {
            n_estimators: 8,
            ..Default::default()
        });
        let (_, bundle) = trainer.train(&training_records()).unwrap();
        Predictor::new(bundle)
    }

    #[test]
    fn test_from_empty_store_is_not_trained() {
        let dir = tempfile::tempdir().unwrap();
        let result = Predictor::from_store(&ArtifactStore::new(dir.path()));
        assert!(matches!(result, Err(PredictError::NotTrained)));
    }

    #[test]
    fn test_predicts_one_value_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = trained(dir.path());
        let prediction = predictor.predict(&training_records()).unwrap();

        assert_eq!(prediction.values.len(), 20);
        assert_eq!(prediction.features_used, predictor.feature_names());
        assert!(prediction.values.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_missing_trained_columns_are_zero_filled() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = trained(dir.path());

        // Only the target-named column is present at inference time
        let partial = vec![Record {
            wl_depth_below_gls: Some(5.0),
            ..Default::default()
        }];
        let prediction = predictor.predict(&partial).unwrap();
        assert_eq!(prediction.values.len(), 1);
        assert_eq!(prediction.features_used.len(), predictor.feature_names().len());
    }

    #[test]
    fn test_no_features_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let predictor = trained(dir.path());
        assert!(matches!(predictor.predict(&[]), Err(PredictError::NoFeatures)));

        let names_only = vec![Record {
            district_name: Some("Puri".into()),
            ..Default::default()
        }];
        assert!(matches!(predictor.predict(&names_only), Err(PredictError::NoFeatures)));
    }

    #[test]
    fn test_loaded_predictor_matches_in_memory_one() {
        let dir = tempfile::tempdir().unwrap();
        let in_memory = trained(dir.path());
        let loaded = Predictor::from_store(&ArtifactStore::new(dir.path())).unwrap();

        let records = training_records();
        assert_eq!(in_memory.predict(&records).unwrap(), loaded.predict(&records).unwrap());
    }
}
