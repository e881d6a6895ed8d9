//! Groundwater level model: preprocessing, training and inference.

pub mod artifacts;
pub mod encoding;
pub mod forest;
pub mod predictor;
pub mod preprocess;
pub mod scaler;
pub mod trainer;

pub use artifacts::{ArtifactBundle, ArtifactStore, ModelArtifact};
pub use encoding::{EncoderRegistry, LabelEncoder};
pub use forest::{ForestConfig, RandomForestRegressor};
pub use predictor::{Prediction, Predictor};
pub use preprocess::{FeatureMatrix, Preprocessor};
pub use scaler::StandardScaler;
pub use trainer::{TrainOutcome, Trainer};
