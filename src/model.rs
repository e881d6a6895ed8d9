/// Core data types for the groundwater level service.
///
/// Record, RecordSet and Provenance describe observations coming out of the
/// acquisition layer; the error enums cover every fallible step from fetching
/// to prediction. This module performs no I/O.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Provenance
// ---------------------------------------------------------------------------

/// Where a record set came from.
///
/// Serialized with the same tags the upstream consumers already expect in the
/// `dataSource` field of each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Provenance {
    #[serde(rename = "wrs_api")]
    Wris,
    #[serde(rename = "fallback_simulation")]
    FallbackSimulation,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Wris => "wrs_api",
            Provenance::FallbackSimulation => "fallback_simulation",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "wrs_api" => Some(Provenance::Wris),
            "fallback_simulation" => Some(Provenance::FallbackSimulation),
            _ => None,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Record
// ---------------------------------------------------------------------------

/// A single groundwater observation.
///
/// The WRIS dataset does not guarantee any particular field, so everything is
/// optional. Numeric fields accept either JSON numbers or numeric strings,
/// and fields this type does not know about are kept in `extra` so they
/// survive a round trip through the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub station_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub station_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub station_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub agency_name: Option<String>,

    // The upstream API and the fallback generator spell state/district
    // differently; both are kept.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub state_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub district_name: Option<String>,

    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub data_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub data_time: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub wl_depth_below_gls: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub wl_depth_below_gls_in_monsoons: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub wl_depth_below_gls_in_postmonsoons: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub wl_depth_below_gls_in_premonsoons: Option<f64>,

    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub created_date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<String>,

    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub well_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64", skip_serializing_if = "Option::is_none")]
    pub well_depth: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub well_aquifer_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,

    /// Provenance tag. Absent on real upstream records.
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub data_source: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Looks up a text field by its wire (camelCase) name.
    ///
    /// Falls back to `extra` for fields not modelled explicitly.
    pub fn text(&self, field: &str) -> Option<&str> {
        let known = match field {
            "stationCode" => &self.station_code,
            "stationName" => &self.station_name,
            "stationType" => &self.station_type,
            "agencyName" => &self.agency_name,
            "state" => &self.state,
            "district" => &self.district,
            "stateName" => &self.state_name,
            "districtName" => &self.district_name,
            "dataTime" => &self.data_time,
            "date" => &self.date,
            "createdDate" => &self.created_date,
            "modifiedDate" => &self.modified_date,
            "wellType" => &self.well_type,
            "wellAquiferType" => &self.well_aquifer_type,
            "description" => &self.description,
            "unit" => &self.unit,
            "dataSource" => &self.data_source,
            _ => return self.extra.get(field).and_then(Value::as_str),
        };
        known.as_deref()
    }

    /// Looks up a numeric field by its wire (camelCase) name.
    pub fn number(&self, field: &str) -> Option<f64> {
        match field {
            "latitude" => self.latitude,
            "longitude" => self.longitude,
            "dataValue" => self.data_value,
            "wlDepthBelowGls" => self.wl_depth_below_gls,
            "wlDepthBelowGlsInMonsoons" => self.wl_depth_below_gls_in_monsoons,
            "wlDepthBelowGlsInPostmonsoons" => self.wl_depth_below_gls_in_postmonsoons,
            "wlDepthBelowGlsInPremonsoons" => self.wl_depth_below_gls_in_premonsoons,
            "wellDepth" => self.well_depth,
            _ => self.extra.get(field).and_then(value_as_f64),
        }
    }

    /// Provenance recorded on this record, if the tag is a known one.
    pub fn provenance(&self) -> Option<Provenance> {
        self.data_source.as_deref().and_then(Provenance::parse)
    }
}

/// Records returned by an acquisition, tagged with where they came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSet {
    pub records: Vec<Record>,
    pub provenance: Provenance,
}

impl RecordSet {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn is_fallback(&self) -> bool {
        self.provenance == Provenance::FallbackSimulation
    }
}

/// Numeric value of a JSON number or numeric string. Non-finite values
/// ("inf", "NaN", overflowing exponents) count as missing.
pub(crate) fn value_as_f64(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_f64))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching records from the WRIS API.
#[derive(Debug, Error, PartialEq)]
pub enum WrisError {
    /// Non-success, non-transient HTTP response.
    #[error("HTTP error: {0}")]
    HttpError(u16),
    /// The transient status kept coming back until retries ran out.
    #[error("Transient rejection persisted after {attempts} attempts")]
    TransientRejection { attempts: u32 },
    /// Connection, timeout or body-read failure.
    #[error("Request failed: {0}")]
    RequestFailed(String),
    /// The response body could not be deserialized.
    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Errors reading or writing the persisted model artifacts.
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Artifact not found: {}", .0.display())]
    NotFound(PathBuf),
}

/// Reasons a training run can be rejected.
#[derive(Debug, Error)]
pub enum TrainError {
    #[error("No data available for training")]
    EmptyInput,
    #[error("No features available after preprocessing")]
    NoFeatures,
    #[error("Target column '{0}' not found")]
    MissingTarget(String),
    #[error("Failed to persist model artifacts: {0}")]
    Persist(#[from] ArtifactError),
}

/// Reasons a prediction request can fail.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("Model not trained yet")]
    NotTrained,
    #[error("No features available for prediction")]
    NoFeatures,
    #[error("Failed to load model artifacts: {0}")]
    Artifact(#[from] ArtifactError),
}

/// Errors loading the service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}
