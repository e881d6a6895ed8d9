//! Label encoding for categorical record fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Value substituted for a missing categorical field before encoding.
pub const MISSING_LABEL: &str = "Unknown";

/// Maps category strings to integer codes.
///
/// Codes are positions in the sorted list of classes seen at fit time.
/// A value that was never seen encodes to `classes.len()`, one past the last
/// real code.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelEncoder {
    classes: Vec<String>,
}

impl LabelEncoder {
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut classes: Vec<String> = values.into_iter().map(str::to_string).collect();
        classes.sort();
        classes.dedup();
        Self { classes }
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    /// The code reserved for values absent at fit time.
    pub fn unknown_code(&self) -> usize {
        self.classes.len()
    }

    pub fn encode(&self, value: &str) -> usize {
        self.classes
            .binary_search_by(|class| class.as_str().cmp(value))
            .unwrap_or(self.unknown_code())
    }

    pub fn is_known(&self, value: &str) -> bool {
        self.classes.binary_search_by(|class| class.as_str().cmp(value)).is_ok()
    }
}

/// Fitted encoders keyed by field name.
///
/// Encoders are only ever added, never re-fit: the first fit for a field
/// wins for the lifetime of the registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoderRegistry {
    encoders: BTreeMap<String, LabelEncoder>,
}

impl EncoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&LabelEncoder> {
        self.encoders.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.encoders.contains_key(field)
    }

    /// Return the encoder for `field`, fitting it on `values` if the field
    /// has not been seen before.
    pub fn fit_if_absent<'a, I>(&mut self, field: &str, values: I) -> &LabelEncoder
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.encoders
            .entry(field.to_string())
            .or_insert_with(|| LabelEncoder::fit(values))
    }

    /// Encode without fitting. Fields with no encoder encode everything to
    /// the unknown bucket of an empty encoder, i.e. `0`.
    pub fn encode(&self, field: &str, value: &str) -> usize {
        match self.encoders.get(field) {
            Some(encoder) => encoder.encode(value),
            None => 0,
        }
    }

    pub fn len(&self) -> usize {
        self.encoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.encoders.is_empty()
    }
}
