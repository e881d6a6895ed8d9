//! Service configuration.
//!
//! Loaded from a TOML file (`gwmon.toml` by default), then overridden from the
//! environment after `.env` has been read. Every key has a default so a
//! missing file section is never an error.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::logging::LogLevel;
use crate::model::ConfigError;

pub const DEFAULT_CONFIG_PATH: &str = "./gwmon.toml";

const DEFAULT_WRIS_URL: &str = "https://indiawris.gov.in/Dataset/Ground Water Level";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub wris: WrisConfig,
    pub model: ModelConfig,
    pub logging: LoggingConfig,
}

/// Upstream WRIS endpoint settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WrisConfig {
    pub base_url: String,
    pub agency: String,
    pub page_size: u32,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl Default for WrisConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_WRIS_URL.to_string(),
            agency: "CGWB".to_string(),
            page_size: 50,
            max_retries: 3,
            timeout_secs: 30,
        }
    }
}

impl WrisConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory holding the model, scaler and encoder artifacts.
    pub models_dir: PathBuf,
    /// Column the regressor learns to predict.
    pub target_column: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            models_dir: PathBuf::from("models"),
            target_column: "wlDepthBelowGls".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
            timestamps: true,
        }
    }
}

impl LoggingConfig {
    /// Parsed level; unrecognised strings fall back to info.
    pub fn min_level(&self) -> LogLevel {
        self.level.parse().unwrap_or(LogLevel::Info)
    }
}

impl ServiceConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ServiceConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file, apply `.env` and environment overrides.
    ///
    /// A missing file yields the defaults; a file that exists but cannot be
    /// parsed is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)?
        } else {
            ServiceConfig::default()
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `GWMON_*` overrides from `lookup`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("GWMON_WRIS_URL") {
            self.wris.base_url = url;
        }
        if let Some(dir) = lookup("GWMON_MODELS_DIR") {
            self.model.models_dir = PathBuf::from(dir);
        }
        if let Some(retries) = lookup("GWMON_MAX_RETRIES") {
            self.wris.max_retries = retries.trim().parse().map_err(|_| {
                ConfigError::InvalidValue(format!("GWMON_MAX_RETRIES='{}' is not a number", retries))
            })?;
        }
        if let Some(level) = lookup("GWMON_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(file) = lookup("GWMON_LOG_FILE") {
            self.logging.file = Some(file);
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.wris.max_retries == 0 {
            return Err(ConfigError::InvalidValue("wris.max_retries must be at least 1".into()));
        }
        if self.wris.page_size == 0 {
            return Err(ConfigError::InvalidValue("wris.page_size must be at least 1".into()));
        }
        if self.wris.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("wris.timeout_secs must be at least 1".into()));
        }
        if self.model.target_column.trim().is_empty() {
            return Err(ConfigError::InvalidValue("model.target_column must not be empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = ServiceConfig::from_toml_str("").unwrap();
        assert_eq!(config.wris.max_retries, 3);
        assert_eq!(config.wris.agency, "CGWB");
        assert_eq!(config.model.models_dir, PathBuf::from("models"));
        assert_eq!(config.model.target_column, "wlDepthBelowGls");
        assert_eq!(config.logging.min_level(), LogLevel::Info);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = ServiceConfig::from_toml_str(
            r#"
            [wris]
            page_size = 5
            max_retries = 5

            [model]
            models_dir = "/var/lib/gwmon/models"
            "#,
        )
        .unwrap();

        assert_eq!(config.wris.page_size, 5);
        assert_eq!(config.wris.max_retries, 5);
        assert_eq!(config.wris.timeout_secs, 30);
        assert_eq!(config.model.models_dir, PathBuf::from("/var/lib/gwmon/models"));
    }

    #[test]
    fn test_zero_retries_rejected() {
        let err = ServiceConfig::from_toml_str("[wris]\nmax_retries = 0\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = ServiceConfig::from_toml_str("[wris\nmax_retries = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_environment_overrides() {
        let env: HashMap<&str, &str> = [
            ("GWMON_WRIS_URL", "http://localhost:9000/gw"),
            ("GWMON_MODELS_DIR", "/tmp/gw-models"),
            ("GWMON_MAX_RETRIES", "7"),
            ("GWMON_LOG_LEVEL", "debug"),
        ]
        .into_iter()
        .collect();

        let mut config = ServiceConfig::default();
        config
            .apply_overrides(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.wris.base_url, "http://localhost:9000/gw");
        assert_eq!(config.model.models_dir, PathBuf::from("/tmp/gw-models"));
        assert_eq!(config.wris.max_retries, 7);
        assert_eq!(config.logging.min_level(), LogLevel::Debug);
    }

    #[test]
    fn test_non_numeric_retry_override_rejected() {
        let mut config = ServiceConfig::default();
        let result = config.apply_overrides(|key| {
            (key == "GWMON_MAX_RETRIES").then(|| "three".to_string())
        });
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }
}
