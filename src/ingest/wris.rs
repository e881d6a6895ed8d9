/// India-WRIS groundwater level API client
///
/// Retrieves CGWB groundwater level observations for a state/district and
/// date range from the India Water Resources Information System, retrying
/// while the API answers with its transient 405 rejection and substituting
/// synthetic records when no usable data comes back.
///
/// Dataset: https://indiawris.gov.in/Dataset/Ground Water Level

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::WrisConfig;
use crate::ingest::fallback;
use crate::logging::{self, DataSource};
use crate::model::{Provenance, Record, RecordSet, WrisError};

/// Status WRIS returns when it temporarily refuses the POST method.
pub const TRANSIENT_STATUS: u16 = 405;

// ============================================================================
// Query / Response Structures
// ============================================================================

/// Query parameters for one WRIS request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WrisQuery {
    #[serde(rename = "stateName")]
    pub state: String,
    #[serde(rename = "districtName")]
    pub district: String,
    #[serde(rename = "agencyName")]
    pub agency: String,
    #[serde(rename = "startdate")]
    pub start_date: String,
    #[serde(rename = "enddate")]
    pub end_date: String,
    pub download: &'static str,
    pub page: u32,
    pub size: u32,
}

impl WrisQuery {
    pub fn new(state: &str, district: &str, start_date: &str, end_date: &str) -> Self {
        Self {
            state: state.to_string(),
            district: district.to_string(),
            agency: "CGWB".to_string(),
            start_date: start_date.to_string(),
            end_date: end_date.to_string(),
            download: "false",
            page: 0,
            size: 1000,
        }
    }

    pub fn with_agency(mut self, agency: &str) -> Self {
        self.agency = agency.to_string();
        self
    }

    pub fn with_page(mut self, page: u32, size: u32) -> Self {
        self.page = page;
        self.size = size;
        self
    }
}

/// Raw status and body of one upstream call.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceResponse {
    pub status: u16,
    pub body: String,
}

/// Top-level WRIS response body. Only `data` is used.
#[derive(Debug, Deserialize)]
struct WrisResponse {
    #[serde(default)]
    data: Option<Vec<Value>>,
}

// ============================================================================
// Record Source
// ============================================================================

/// Anything that can answer a WRIS query with a status and body.
///
/// The retry policy is written against this trait so it can be exercised
/// without a network.
#[async_trait]
pub trait RecordSource: Send + Sync {
    async fn post_query(&self, query: &WrisQuery) -> Result<SourceResponse, WrisError>;
}

/// reqwest-backed WRIS client.
pub struct WrisClient {
    client: reqwest::Client,
    base_url: String,
}

impl WrisClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, WrisError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WrisError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
        })
    }

    pub fn from_config(config: &WrisConfig) -> Result<Self, WrisError> {
        Self::new(&config.base_url, config.timeout())
    }
}

#[async_trait]
impl RecordSource for WrisClient {
    async fn post_query(&self, query: &WrisQuery) -> Result<SourceResponse, WrisError> {
        let response = self
            .client
            .post(&self.base_url)
            .query(query)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| WrisError::RequestFailed(e.to_string()))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| WrisError::RequestFailed(e.to_string()))?;

        Ok(SourceResponse { status, body })
    }
}

// ============================================================================
// Retry Policy
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_retries: u32,
    /// Backoff before retry `n` is `backoff_step * n`.
    pub backoff_step: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_step: Duration::from_secs(2),
        }
    }
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_step * attempt
    }
}

// ============================================================================
// Fetching
// ============================================================================

/// Fetch records, reporting why a fetch produced nothing.
///
/// Only [`TRANSIENT_STATUS`] is retried. Any other non-200 status, a network
/// error or an unparseable body ends the fetch on the spot.
pub async fn try_fetch<S>(
    source: &S,
    query: &WrisQuery,
    policy: &RetryPolicy,
) -> Result<Vec<Record>, WrisError>
where
    S: RecordSource + ?Sized,
{
    let district = query.district.as_str();

    for attempt in 1..=policy.max_retries {
        logging::debug(
            DataSource::Wris,
            Some(district),
            &format!("Attempt {}: fetching {}, {}", attempt, district, query.state),
        );

        let response = source.post_query(query).await?;

        match response.status {
            200 => {
                let records = parse_wris_response(&response.body)?;
                logging::info(
                    DataSource::Wris,
                    Some(district),
                    &format!("WRIS returned {} records for {}, {}", records.len(), district, query.state),
                );
                return Ok(records);
            }
            TRANSIENT_STATUS => {
                if attempt == policy.max_retries {
                    break;
                }
                let wait = policy.backoff(attempt);
                logging::warn(
                    DataSource::Wris,
                    Some(district),
                    &format!(
                        "{} from WRIS, attempt {}/{}; retrying in {}s",
                        TRANSIENT_STATUS,
                        attempt,
                        policy.max_retries,
                        wait.as_secs()
                    ),
                );
                tokio::time::sleep(wait).await;
            }
            other => return Err(WrisError::HttpError(other)),
        }
    }

    Err(WrisError::TransientRejection {
        attempts: policy.max_retries,
    })
}

/// Fetch records; every failure degrades to an empty list.
pub async fn fetch_records<S>(source: &S, query: &WrisQuery, policy: &RetryPolicy) -> Vec<Record>
where
    S: RecordSource + ?Sized,
{
    match try_fetch(source, query, policy).await {
        Ok(records) => records,
        Err(e) => {
            logging::log_wris_failure(&query.district, "WRIS fetch", &e);
            Vec::new()
        }
    }
}

/// Parse a WRIS response body into records.
///
/// A body without a `data` array yields no records. Individual entries that
/// are not JSON objects are skipped.
pub fn parse_wris_response(body: &str) -> Result<Vec<Record>, WrisError> {
    let response: WrisResponse =
        serde_json::from_str(body).map_err(|e| WrisError::ParseError(e.to_string()))?;

    let entries = response.data.unwrap_or_default();
    let mut records = Vec::with_capacity(entries.len());

    for entry in entries {
        if !entry.is_object() {
            continue;
        }
        match serde_json::from_value::<Record>(entry) {
            Ok(record) => records.push(record),
            Err(e) => logging::debug(DataSource::Wris, None, &format!("Skipping malformed record: {}", e)),
        }
    }

    Ok(records)
}

// ============================================================================
// Acquisition
// ============================================================================

/// Acquisition layer: WRIS first, synthetic records when that yields nothing.
pub struct Acquisition<S> {
    source: S,
    policy: RetryPolicy,
    agency: String,
    page_size: u32,
}

impl<S: RecordSource> Acquisition<S> {
    pub fn new(source: S, policy: RetryPolicy) -> Self {
        Self {
            source,
            policy,
            agency: "CGWB".to_string(),
            page_size: 50,
        }
    }

    pub fn from_config(source: S, config: &WrisConfig) -> Self {
        Self {
            source,
            policy: RetryPolicy::with_max_retries(config.max_retries),
            agency: config.agency.clone(),
            page_size: config.page_size,
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn query(&self, state: &str, district: &str, start_date: &str, end_date: &str) -> WrisQuery {
        WrisQuery::new(state, district, start_date, end_date)
            .with_agency(&self.agency)
            .with_page(0, self.page_size)
    }

    /// Fetch records for a district and date range. Never fails.
    pub async fn fetch(&self, state: &str, district: &str, start_date: &str, end_date: &str) -> RecordSet {
        let query = self.query(state, district, start_date, end_date);
        let records = fetch_records(&self.source, &query, &self.policy).await;

        if !records.is_empty() {
            return RecordSet {
                records,
                provenance: Provenance::Wris,
            };
        }

        logging::info(
            DataSource::Fallback,
            Some(district),
            &format!("WRIS returned no data, using fallback for {}", district),
        );
        RecordSet {
            records: fallback::generate(state, district, start_date, end_date),
            provenance: Provenance::FallbackSimulation,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
