//! Groundwater level monitoring service.
//!
//! Pulls CGWB groundwater observations from India-WRIS (with a synthetic
//! fallback when the API has nothing), trains a random forest on them and
//! serves water-level predictions per district.

pub mod config;
pub mod districts;
pub mod ingest;
pub mod logging;
pub mod ml;
pub mod model;
pub mod service;
pub mod verify;

pub use config::ServiceConfig;
pub use model::{Provenance, Record, RecordSet};
pub use service::GroundwaterService;
