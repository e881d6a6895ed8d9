//! Persisted model state: the trained forest, the scaler and the label
//! encoders, saved and loaded together as one bundle.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::logging::{self, DataSource};
use crate::ml::encoding::EncoderRegistry;
use crate::ml::forest::RandomForestRegressor;
use crate::ml::scaler::StandardScaler;
use crate::model::ArtifactError;

pub const MODEL_FILE: &str = "groundwater_model.json";
pub const SCALER_FILE: &str = "scaler.json";
pub const ENCODERS_FILE: &str = "label_encoders.json";

/// The fitted forest plus what is needed to feed it correctly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub forest: RandomForestRegressor,
    /// Column order the forest was trained on
    pub feature_names: Vec<String>,
    pub target_column: String,
    pub train_score: f64,
    /// `None` when the data set was too small to hold out a test row
    pub test_score: Option<f64>,
    pub trained_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArtifactBundle {
    pub model: ModelArtifact,
    pub scaler: StandardScaler,
    pub encoders: EncoderRegistry,
}

/// Directory holding the three artifact files.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn model_path(&self) -> PathBuf {
        self.dir.join(MODEL_FILE)
    }

    pub fn scaler_path(&self) -> PathBuf {
        self.dir.join(SCALER_FILE)
    }

    pub fn encoders_path(&self) -> PathBuf {
        self.dir.join(ENCODERS_FILE)
    }

    /// True when all three files are on disk.
    pub fn exists(&self) -> bool {
        self.model_path().is_file() && self.scaler_path().is_file() && self.encoders_path().is_file()
    }

    /// Serialize all three artifacts to temporary files, then rename them
    /// into place. Nothing is renamed unless every write succeeded.
    ///
    /// The three renames are not atomic as a group: a reader racing a save
    /// can observe a mix of old and new files.
    pub fn save(&self, bundle: &ArtifactBundle) -> Result<(), ArtifactError> {
        fs::create_dir_all(&self.dir).map_err(|source| ArtifactError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let staged = [
            (self.model_path(), serde_json::to_vec(&bundle.model)?),
            (self.scaler_path(), serde_json::to_vec(&bundle.scaler)?),
            (self.encoders_path(), serde_json::to_vec(&bundle.encoders)?),
        ];

        let mut temps = Vec::with_capacity(staged.len());
        for (path, bytes) in &staged {
            let tmp = path.with_extension("json.tmp");
            fs::write(&tmp, bytes).map_err(|source| ArtifactError::Io {
                path: tmp.clone(),
                source,
            })?;
            temps.push((tmp, path));
        }

        for (tmp, path) in temps {
            fs::rename(&tmp, path).map_err(|source| ArtifactError::Io {
                path: path.clone(),
                source,
            })?;
        }

        logging::debug(
            DataSource::Store,
            None,
            &format!("Saved model artifacts to {}", self.dir.display()),
        );
        Ok(())
    }

    pub fn load(&self) -> Result<ArtifactBundle, ArtifactError> {
        let bundle = ArtifactBundle {
            model: read_json(&self.model_path())?,
            scaler: read_json(&self.scaler_path())?,
            encoders: read_json(&self.encoders_path())?,
        };
        logging::debug(
            DataSource::Store,
            None,
            &format!("Loaded model artifacts from {}", self.dir.display()),
        );
        Ok(bundle)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let bytes = fs::read(path).map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ArtifactError::NotFound(path.to_path_buf())
        } else {
            ArtifactError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    Ok(serde_json::from_slice(&bytes)?)
}
