//! Model training: preprocess, split, scale, fit, evaluate, persist.

use chrono::Utc;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use crate::logging::{self, DataSource};
use crate::ml::artifacts::{ArtifactBundle, ArtifactStore, ModelArtifact};
use crate::ml::encoding::EncoderRegistry;
use crate::ml::forest::{ForestConfig, RandomForestRegressor};
use crate::ml::preprocess::Preprocessor;
use crate::ml::scaler::StandardScaler;
use crate::model::{Record, TrainError};

/// Fraction of rows held out for evaluation.
pub const TEST_FRACTION: f64 = 0.2;
/// Seed for the train/test shuffle.
pub const SPLIT_SEED: u64 = 42;

/// Summary of a successful training run.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainOutcome {
    pub feature_names: Vec<String>,
    pub n_train: usize,
    pub n_test: usize,
    pub train_score: f64,
    pub test_score: Option<f64>,
}

pub struct Trainer {
    store: ArtifactStore,
    target_column: String,
    preprocessor: Preprocessor,
    forest_config: ForestConfig,
}

impl Trainer {
    pub fn new(store: ArtifactStore, target_column: impl Into<String>) -> Self {
        Self {
            store,
            target_column: target_column.into(),
            preprocessor: Preprocessor::default(),
            forest_config: ForestConfig::default(),
        }
    }

    pub fn with_forest_config(mut self, config: ForestConfig) -> Self {
        self.forest_config = config;
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    /// Train on `records` and persist the resulting bundle.
    ///
    /// Returns the persisted bundle alongside the outcome so callers can
    /// start predicting without reading it back from disk.
    pub fn train(&self, records: &[Record]) -> Result<(TrainOutcome, ArtifactBundle), TrainError> {
        if records.is_empty() {
            return Err(TrainError::EmptyInput);
        }

        let mut encoders = EncoderRegistry::new();
        let matrix = self.preprocessor.fit_transform(records, &mut encoders);
        if matrix.is_empty() {
            return Err(TrainError::NoFeatures);
        }

        if !records.iter().any(|r| r.number(&self.target_column).is_some()) {
            return Err(TrainError::MissingTarget(self.target_column.clone()));
        }
        let target: Vec<f64> = records
            .iter()
            .map(|r| r.number(&self.target_column).unwrap_or(0.0))
            .collect();

        let matrix = matrix.fill_missing(0.0);
        let (train_idx, test_idx) = train_test_split(matrix.n_rows(), TEST_FRACTION, SPLIT_SEED);

        let pick_rows = |idx: &[usize]| -> Vec<Vec<f64>> { idx.iter().map(|&i| matrix.rows[i].clone()).collect() };
        let pick_target = |idx: &[usize]| -> Vec<f64> { idx.iter().map(|&i| target[i]).collect() };

        let x_train_raw = pick_rows(&train_idx);
        let scaler = StandardScaler::fit(&x_train_raw);
        let x_train = scaler.transform(&x_train_raw);
        let y_train = pick_target(&train_idx);

        let forest = RandomForestRegressor::fit(self.forest_config.clone(), &x_train, &y_train);

        let train_score = forest.score(&x_train, &y_train);
        let test_score = if test_idx.is_empty() {
            None
        } else {
            let x_test = scaler.transform(&pick_rows(&test_idx));
            Some(forest.score(&x_test, &pick_target(&test_idx)))
        };

        logging::info(
            DataSource::Model,
            None,
            &format!(
                "Model trained on {} rows ({} held out). Train R²: {:.4}, Test R²: {}",
                train_idx.len(),
                test_idx.len(),
                train_score,
                test_score.map_or_else(|| "n/a".to_string(), |s| format!("{s:.4}")),
            ),
        );

        let outcome = TrainOutcome {
            feature_names: matrix.columns.clone(),
            n_train: train_idx.len(),
            n_test: test_idx.len(),
            train_score,
            test_score,
        };

        let bundle = ArtifactBundle {
            model: ModelArtifact {
                forest,
                feature_names: matrix.columns,
                target_column: self.target_column.clone(),
                train_score,
                test_score,
                trained_at: Utc::now(),
            },
            scaler,
            encoders,
        };
        self.store.save(&bundle)?;

        logging::info(
            DataSource::Store,
            None,
            &format!("Model artifacts saved to {}", self.store.dir().display()),
        );

        Ok((outcome, bundle))
    }
}

/// Shuffle `0..n` with a fixed seed and hold out `ceil(n * test_fraction)`
/// rows, always leaving at least one row for training.
pub fn train_test_split(n: usize, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64 * test_fraction).ceil() as usize).min(n.saturating_sub(1));
    let test = indices.split_off(n - n_test);
    (indices, test)
}
