//! Service facade: the three operations consumers call.
//!
//! `fetch` goes through the acquisition layer, `train` fits and persists a
//! new model, `predict` runs the current model. The predictor is loaded
//! from disk on first use and replaced wholesale by every successful
//! training run.

use std::sync::{Arc, RwLock};

use crate::config::ServiceConfig;
use crate::ingest::{Acquisition, RecordSource, WrisClient};
use crate::logging::{self, DataSource};
use crate::ml::{ArtifactStore, Prediction, Predictor, Trainer};
use crate::model::{PredictError, Record, RecordSet, WrisError};

pub struct GroundwaterService<S> {
    acquisition: Acquisition<S>,
    trainer: Trainer,
    store: ArtifactStore,
    predictor: RwLock<Option<Arc<Predictor>>>,
}

impl GroundwaterService<WrisClient> {
    /// Service talking to the live WRIS API.
    pub fn from_config(config: &ServiceConfig) -> Result<Self, WrisError> {
        let client = WrisClient::from_config(&config.wris)?;
        Ok(Self::with_source(client, config))
    }
}

impl<S: RecordSource> GroundwaterService<S> {
    pub fn with_source(source: S, config: &ServiceConfig) -> Self {
        let store = ArtifactStore::new(&config.model.models_dir);
        Self::new(
            Acquisition::from_config(source, &config.wris),
            Trainer::new(store.clone(), &config.model.target_column),
            store,
        )
    }

    pub fn new(acquisition: Acquisition<S>, trainer: Trainer, store: ArtifactStore) -> Self {
        Self {
            acquisition,
            trainer,
            store,
            predictor: RwLock::new(None),
        }
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Records for a district and date range: WRIS data when available,
    /// synthetic fallback records otherwise.
    pub async fn fetch(&self, state: &str, district: &str, start_date: &str, end_date: &str) -> RecordSet {
        self.acquisition.fetch(state, district, start_date, end_date).await
    }

    /// Train a new model on `records`. On failure the reason is logged and
    /// any previously loaded model stays in place.
    pub fn train(&self, records: &[Record]) -> bool {
        match self.trainer.train(records) {
            Ok((_, bundle)) => {
                let predictor = Arc::new(Predictor::new(bundle));
                *self.predictor.write().unwrap_or_else(|e| e.into_inner()) = Some(predictor);
                true
            }
            Err(e) => {
                logging::error(DataSource::Model, None, &format!("Training failed: {e}"));
                false
            }
        }
    }

    pub fn predict(&self, records: &[Record]) -> Result<Prediction, PredictError> {
        self.predictor()?.predict(records)
    }

    /// Current predictor, loading it from the artifact store if none is
    /// cached yet.
    fn predictor(&self) -> Result<Arc<Predictor>, PredictError> {
        if let Some(p) = self.predictor.read().unwrap_or_else(|e| e.into_inner()).as_ref() {
            return Ok(Arc::clone(p));
        }

        let mut slot = self.predictor.write().unwrap_or_else(|e| e.into_inner());
        if let Some(p) = slot.as_ref() {
            return Ok(Arc::clone(p));
        }

        let loaded = Arc::new(Predictor::from_store(&self.store)?);
        logging::info(
            DataSource::Model,
            None,
            &format!("Loaded model trained at {}", loaded.bundle().model.trained_at),
        );
        *slot = Some(Arc::clone(&loaded));
        Ok(loaded)
    }
}
