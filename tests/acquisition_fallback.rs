/// Integration tests for the acquisition flow
///
/// These tests verify:
/// 1. Hard failures (non-405 status, request errors) give up after one attempt
/// 2. Repeated 405s back off 2s, 4s, ... and then give up
/// 3. Anything that yields no records is replaced by fallback records
/// 4. Real WRIS records are passed through untouched
///
/// WRIS is replaced by a scripted source and tokio's clock is paused, so no
/// test here touches the network or actually sleeps.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use gwmon_service::districts;
use gwmon_service::ingest::wris::{RecordSource, RetryPolicy, SourceResponse, WrisQuery};
use gwmon_service::ingest::Acquisition;
use gwmon_service::model::{Provenance, WrisError};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

/// Replays a fixed list of replies; once exhausted, keeps answering 405.
struct ScriptedSource {
    replies: Mutex<VecDeque<Result<SourceResponse, WrisError>>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    fn new(replies: Vec<Result<SourceResponse, WrisError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn always(status: u16) -> Self {
        Self::new((0..10).map(|_| reply(status, "")).collect())
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordSource for ScriptedSource {
    async fn post_query(&self, _query: &WrisQuery) -> Result<SourceResponse, WrisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| reply(405, ""))
    }
}

fn reply(status: u16, body: &str) -> Result<SourceResponse, WrisError> {
    Ok(SourceResponse {
        status,
        body: body.to_string(),
    })
}

fn acquisition(source: ScriptedSource) -> Acquisition<ScriptedSource> {
    Acquisition::new(source, RetryPolicy::default())
}

// ---------------------------------------------------------------------------
// Fallback substitution
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_http_500_yields_baleshwar_fallback() {
    let acq = acquisition(ScriptedSource::always(500));
    let set = acq.fetch("Odisha", "Baleshwar", "2024-01-01", "2024-01-05").await;

    assert_eq!(acq.source().calls(), 1, "non-transient status must not be retried");
    assert_eq!(set.provenance, Provenance::FallbackSimulation);
    assert_eq!(set.len(), 8);

    for record in &set.records {
        let value = record.data_value.expect("fallback records carry a dataValue");
        assert!((-7.5..=-4.5).contains(&value), "dataValue {value} outside Baleshwar band");
        assert_eq!(record.provenance(), Some(Provenance::FallbackSimulation));
        assert_eq!(record.data_time.as_deref(), Some("2024-01-01"));
        assert_eq!(record.district.as_deref(), Some("Baleshwar"));
    }
}

#[tokio::test(start_paused = true)]
async fn test_unknown_district_uses_default_pattern() {
    let acq = acquisition(ScriptedSource::always(503));
    let set = acq.fetch("Odisha", "Nowhere", "2024-01-01", "2024-01-05").await;

    let default = &districts::DEFAULT_PATTERN;
    assert_eq!(set.len(), default.stations);
    for record in &set.records {
        let value = record.data_value.unwrap();
        assert!(value >= default.min_level() && value <= default.max_level());
    }
}

#[tokio::test(start_paused = true)]
async fn test_request_error_falls_back_after_one_attempt() {
    let source = ScriptedSource::new(vec![Err(WrisError::RequestFailed("connection reset".into()))]);
    let acq = acquisition(source);
    let set = acq.fetch("Odisha", "Puri", "2024-01-01", "2024-01-05").await;

    assert_eq!(acq.source().calls(), 1);
    assert!(set.is_fallback());
    assert_eq!(set.len(), 6);
}

#[tokio::test(start_paused = true)]
async fn test_empty_data_array_falls_back() {
    let acq = acquisition(ScriptedSource::new(vec![reply(200, r#"{"data": []}"#)]));
    let set = acq.fetch("Odisha", "Cuttack", "2024-01-01", "2024-01-05").await;

    assert_eq!(acq.source().calls(), 1);
    assert!(set.is_fallback());
    assert_eq!(set.len(), 12);
}

#[tokio::test(start_paused = true)]
async fn test_unparseable_body_falls_back_without_retry() {
    let acq = acquisition(ScriptedSource::new(vec![reply(200, "<html>maintenance</html>")]));
    let set = acq.fetch("Odisha", "Khordha", "2024-01-01", "2024-01-05").await;

    assert_eq!(acq.source().calls(), 1);
    assert!(set.is_fallback());
}

// ---------------------------------------------------------------------------
// Transient rejection
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn test_persistent_405_backs_off_then_falls_back() {
    let acq = acquisition(ScriptedSource::always(405));
    let started = tokio::time::Instant::now();
    let set = acq.fetch("Odisha", "Ganjam", "2024-01-01", "2024-01-05").await;

    assert_eq!(acq.source().calls(), 3);
    // 2s after the first attempt, 4s after the second, nothing after the last
    assert_eq!(started.elapsed(), Duration::from_secs(6));
    assert!(set.is_fallback());
    assert_eq!(set.len(), 9);
}

#[tokio::test(start_paused = true)]
async fn test_405_then_success_returns_wris_records() {
    let body = r#"{"data": [
        {"stationCode": "CGWHYD0401", "stationName": "Balasore", "wlDepthBelowGls": "5.31", "date": "2024-01-02"},
        {"stationCode": "CGWHYD0402", "stationName": "Remuna", "wlDepthBelowGls": 6.02, "date": "2024-01-03"}
    ]}"#;
    let acq = acquisition(ScriptedSource::new(vec![reply(405, ""), reply(200, body)]));
    let started = tokio::time::Instant::now();
    let set = acq.fetch("Odisha", "Baleshwar", "2024-01-01", "2024-01-05").await;

    assert_eq!(acq.source().calls(), 2);
    assert_eq!(started.elapsed(), Duration::from_secs(2));
    assert_eq!(set.provenance, Provenance::Wris);
    assert_eq!(set.len(), 2);
    assert_eq!(set.records[0].wl_depth_below_gls, Some(5.31));
    assert_eq!(set.records[1].station_code.as_deref(), Some("CGWHYD0402"));
    assert!(set.records.iter().all(|r| r.data_source.is_none()));
}

#[tokio::test(start_paused = true)]
async fn test_configured_retry_count_is_respected() {
    let acq = Acquisition::new(ScriptedSource::always(405), RetryPolicy::with_max_retries(5));
    let started = tokio::time::Instant::now();
    let set = acq.fetch("Odisha", "Puri", "2024-01-01", "2024-01-05").await;

    assert_eq!(acq.source().calls(), 5);
    assert_eq!(started.elapsed(), Duration::from_secs(2 + 4 + 6 + 8));
    assert!(set.is_fallback());
}
