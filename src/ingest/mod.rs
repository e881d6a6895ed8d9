//! Data acquisition.
//!
//! - `wris`: India-WRIS client, retry policy and the acquisition flow.
//! - `fallback`: synthetic records used when WRIS yields nothing.

pub mod fallback;
pub mod wris;

pub use wris::{Acquisition, RecordSource, RetryPolicy, WrisClient, WrisQuery};
