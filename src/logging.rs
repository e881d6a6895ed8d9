/// Structured logging for the groundwater level service
///
/// Provides source-tagged logging with optional district context and
/// severity levels, on top of `tracing`. Supports console output and an
/// append-only log file for unattended runs.

use std::fmt;
use std::fs::OpenOptions;
use std::str::FromStr;
use std::sync::Mutex;

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt as tracing_fmt};

use crate::model::WrisError;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

// ---------------------------------------------------------------------------
// Data Source Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    Wris,
    Fallback,
    Model,
    Store,
    System,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::Wris => write!(f, "WRIS"),
            DataSource::Fallback => write!(f, "FALLBACK"),
            DataSource::Model => write!(f, "MODEL"),
            DataSource::Store => write!(f, "STORE"),
            DataSource::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Failure Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureType {
    /// Expected failure - the API is known to reject requests intermittently
    Expected,
    /// Unexpected failure - indicates service degradation or configuration issue
    Unexpected,
    /// Unknown - cannot determine if this is expected or not
    Unknown,
}

impl fmt::Display for FailureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureType::Expected => write!(f, "EXPECTED"),
            FailureType::Unexpected => write!(f, "UNEXPECTED"),
            FailureType::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Setup
// ---------------------------------------------------------------------------

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `min_level` when set. Calling this more
/// than once is harmless; only the first call installs anything.
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(LevelFilter::from(min_level).into()));

    let console: Box<dyn Layer<Registry> + Send + Sync> = if console_timestamps {
        tracing_fmt::layer().with_writer(std::io::stderr).boxed()
    } else {
        tracing_fmt::layer()
            .with_writer(std::io::stderr)
            .without_time()
            .with_target(false)
            .boxed()
    };

    let file_layer = log_file.and_then(|path| {
        match OpenOptions::new().create(true).append(true).open(path) {
            Ok(file) => Some(
                tracing_fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            ),
            Err(e) => {
                eprintln!("Failed to open log file {}: {}", path, e);
                None
            }
        }
    });

    let _ = tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .with(filter)
        .try_init();
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Log a general informational message
pub fn info(source: DataSource, district: Option<&str>, message: &str) {
    tracing::info!(source = %source, district = district.unwrap_or("-"), "{}", message);
}

/// Log a warning message
pub fn warn(source: DataSource, district: Option<&str>, message: &str) {
    tracing::warn!(source = %source, district = district.unwrap_or("-"), "{}", message);
}

/// Log an error message
pub fn error(source: DataSource, district: Option<&str>, message: &str) {
    tracing::error!(source = %source, district = district.unwrap_or("-"), "{}", message);
}

/// Log a debug message
pub fn debug(source: DataSource, district: Option<&str>, message: &str) {
    tracing::debug!(source = %source, district = district.unwrap_or("-"), "{}", message);
}

// ---------------------------------------------------------------------------
// Failure Classification Helpers
// ---------------------------------------------------------------------------

/// Classify a WRIS fetch failure
pub fn classify_wris_failure(err: &WrisError) -> FailureType {
    match err {
        // WRIS answers 405 for a while under load, then recovers
        WrisError::TransientRejection { .. } => FailureType::Expected,
        WrisError::HttpError(_) | WrisError::ParseError(_) => FailureType::Unexpected,
        // Network-level failures could be either side's fault
        WrisError::RequestFailed(_) => FailureType::Unknown,
    }
}

/// Log a WRIS failure with automatic classification
pub fn log_wris_failure(district: &str, operation: &str, err: &WrisError) {
    let failure_type = classify_wris_failure(err);

    let message = format!("{} failed [{}]: {}", operation, failure_type, err);

    match failure_type {
        FailureType::Expected => debug(DataSource::Wris, Some(district), &message),
        FailureType::Unexpected => error(DataSource::Wris, Some(district), &message),
        FailureType::Unknown => warn(DataSource::Wris, Some(district), &message),
    }
}

// ---------------------------------------------------------------------------
// Summary Logging
// ---------------------------------------------------------------------------

/// Log a summary of a batch of fetches (used by source verification)
pub fn log_fetch_summary(source: DataSource, total: usize, successful: usize, failed: usize) {
    let message = format!(
        "Verification complete: {}/{} returned data, {} failed",
        successful, total, failed
    );

    if failed == 0 {
        info(source, None, &message);
    } else if successful == 0 {
        error(source, None, &message);
    } else {
        warn(source, None, &message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_parsing() {
        assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warning));
        assert_eq!(" info ".parse::<LogLevel>(), Ok(LogLevel::Info));
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_failure_classification() {
        let transient = WrisError::TransientRejection { attempts: 3 };
        assert_eq!(classify_wris_failure(&transient), FailureType::Expected);

        assert_eq!(classify_wris_failure(&WrisError::HttpError(500)), FailureType::Unexpected);
        let garbage = WrisError::ParseError("expected value at line 1".into());
        assert_eq!(classify_wris_failure(&garbage), FailureType::Unexpected);

        let network = WrisError::RequestFailed("connection refused".into());
        assert_eq!(classify_wris_failure(&network), FailureType::Unknown);
    }
}
