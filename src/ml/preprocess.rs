//! Record -> feature matrix preprocessing.
//!
//! Date fields are decomposed into year/month/day, categorical fields are
//! label-encoded, and the result is narrowed to the fixed candidate feature
//! list. Missing values are left as `NaN`: filling them is the caller's job
//! (see [`FeatureMatrix::fill_missing`]).

use std::collections::HashMap;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::ml::encoding::{EncoderRegistry, MISSING_LABEL};
use crate::model::Record;

/// Date fields decomposed into `<field>_year`, `<field>_month`, `<field>_day`.
pub const DATE_FIELDS: &[&str] = &["date", "createdDate", "modifiedDate"];

/// Categorical fields encoded into `<field>_encoded`.
pub const CATEGORICAL_FIELDS: &[&str] = &["stateName", "districtName", "agencyName", "stationName"];

/// Numeric fields passed through unchanged.
pub const NUMERIC_FIELDS: &[&str] = &[
    "wlDepthBelowGls",
    "wlDepthBelowGlsInMonsoons",
    "wlDepthBelowGlsInPostmonsoons",
    "wlDepthBelowGlsInPremonsoons",
];

/// Features the model may use, in column order.
pub const CANDIDATE_FEATURES: &[&str] = &[
    "wlDepthBelowGls",
    "wlDepthBelowGlsInMonsoons",
    "wlDepthBelowGlsInPostmonsoons",
    "wlDepthBelowGlsInPremonsoons",
    "date_year",
    "date_month",
    "date_day",
];

// ---------------------------------------------------------------------------
// Feature matrix
// ---------------------------------------------------------------------------

/// Named numeric columns, one row per record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    pub fn empty() -> Self {
        Self::default()
    }

    /// True when there is nothing to learn from or predict on: no columns
    /// or no rows.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Replace every `NaN` with `value`.
    pub fn fill_missing(mut self, value: f64) -> Self {
        for row in &mut self.rows {
            for x in row.iter_mut() {
                if x.is_nan() {
                    *x = value;
                }
            }
        }
        self
    }

    /// Reorder/select columns to exactly `names`. Columns this matrix lacks
    /// come back as `NaN`.
    pub fn align_to(&self, names: &[String]) -> Self {
        let mapping: Vec<Option<usize>> = names.iter().map(|n| self.column_index(n)).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                mapping
                    .iter()
                    .map(|idx| idx.map_or(f64::NAN, |i| row[i]))
                    .collect()
            })
            .collect();

        Self {
            columns: names.to_vec(),
            rows,
        }
    }

    /// Columns of `names` this matrix does not have.
    pub fn missing_columns<'a>(&self, names: &'a [String]) -> Vec<&'a str> {
        names
            .iter()
            .filter(|n| self.column_index(n).is_none())
            .map(String::as_str)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Preprocessor
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Preprocessor {
    candidates: Vec<String>,
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(CANDIDATE_FEATURES)
    }
}

enum EncoderMode<'a> {
    Fit(&'a mut EncoderRegistry),
    Reuse(&'a EncoderRegistry),
}

impl Preprocessor {
    pub fn new(candidates: &[&str]) -> Self {
        Self {
            candidates: candidates.iter().map(|c| c.to_string()).collect(),
        }
    }

    /// Training-time preprocessing. Fits an encoder for each categorical
    /// field the registry has not seen yet.
    pub fn fit_transform(&self, records: &[Record], encoders: &mut EncoderRegistry) -> FeatureMatrix {
        self.build(records, EncoderMode::Fit(encoders))
    }

    /// Inference-time preprocessing. Never fits; unseen categories fall into
    /// the encoder's unknown bucket.
    pub fn transform(&self, records: &[Record], encoders: &EncoderRegistry) -> FeatureMatrix {
        self.build(records, EncoderMode::Reuse(encoders))
    }

    fn build(&self, records: &[Record], mut mode: EncoderMode<'_>) -> FeatureMatrix {
        if records.is_empty() {
            return FeatureMatrix::empty();
        }

        let mut produced: HashMap<String, Vec<f64>> = HashMap::new();

        for &field in DATE_FIELDS {
            if !records.iter().any(|r| r.text(field).is_some()) {
                continue;
            }
            let parts: Vec<Option<(i32, u32, u32)>> =
                records.iter().map(|r| r.text(field).and_then(parse_date)).collect();

            let component = |f: fn(&(i32, u32, u32)) -> f64| -> Vec<f64> {
                parts.iter().map(|p| p.as_ref().map_or(f64::NAN, f)).collect()
            };
            produced.insert(format!("{field}_year"), component(|d| f64::from(d.0)));
            produced.insert(format!("{field}_month"), component(|d| f64::from(d.1)));
            produced.insert(format!("{field}_day"), component(|d| f64::from(d.2)));
        }

        for &field in CATEGORICAL_FIELDS {
            if !records.iter().any(|r| r.text(field).is_some()) {
                continue;
            }
            let labels: Vec<&str> = records
                .iter()
                .map(|r| r.text(field).unwrap_or(MISSING_LABEL))
                .collect();

            let codes = match &mut mode {
                EncoderMode::Fit(registry) => {
                    let encoder = registry.fit_if_absent(field, labels.iter().copied());
                    labels.iter().map(|l| encoder.encode(l) as f64).collect()
                }
                EncoderMode::Reuse(registry) => labels
                    .iter()
                    .map(|l| registry.encode(field, l) as f64)
                    .collect(),
            };
            produced.insert(format!("{field}_encoded"), codes);
        }

        for &field in NUMERIC_FIELDS {
            if !records.iter().any(|r| r.number(field).is_some()) {
                continue;
            }
            let values = records
                .iter()
                .map(|r| r.number(field).unwrap_or(f64::NAN))
                .collect();
            produced.insert(field.to_string(), values);
        }

        let columns: Vec<String> = self
            .candidates
            .iter()
            .filter(|c| produced.contains_key(c.as_str()))
            .cloned()
            .collect();
        if columns.is_empty() {
            return FeatureMatrix::empty();
        }

        let selected: Vec<&Vec<f64>> = columns.iter().filter_map(|c| produced.get(c)).collect();
        let rows = (0..records.len())
            .map(|i| selected.iter().map(|col| col[i]).collect())
            .collect();

        FeatureMatrix { columns, rows }
    }
}

/// Parse the date formats seen in WRIS exports. Anything else is treated as
/// missing rather than an error.
fn parse_date(raw: &str) -> Option<(i32, u32, u32)> {
    let raw = raw.trim();
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok().map(|dt| dt.date()))
        .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f").ok().map(|dt| dt.date()))
        .or_else(|| NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok())?;

    Some((date.year(), date.month(), date.day()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: Option<&str>, depth: Option<f64>, district: Option<&str>) -> Record {
        Record {
            date: date.map(str::to_string),
            wl_depth_below_gls: depth,
            district_name: district.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_input_gives_empty_matrix() {
        let mut encoders = EncoderRegistry::new();
        let matrix = Preprocessor::default().fit_transform(&[], &mut encoders);
        assert!(matrix.is_empty());
        assert!(encoders.is_empty());
    }

    #[test]
    fn test_date_decomposition_and_candidate_order() {
        let records = vec![
            record(Some("2024-03-15"), Some(4.5), Some("Puri")),
            record(Some("2023-11-02T06:30:00"), Some(6.0), Some("Ganjam")),
        ];
        let mut encoders = EncoderRegistry::new();
        let matrix = Preprocessor::default().fit_transform(&records, &mut encoders);

        assert_eq!(matrix.columns, ["wlDepthBelowGls", "date_year", "date_month", "date_day"]);
        assert_eq!(matrix.rows[0], vec![4.5, 2024.0, 3.0, 15.0]);
        assert_eq!(matrix.rows[1], vec![6.0, 2023.0, 11.0, 2.0]);
    }

    #[test]
    fn test_categoricals_are_encoded_but_not_selected() {
        let records = vec![record(None, Some(4.5), Some("Puri")), record(None, Some(5.5), None)];
        let mut encoders = EncoderRegistry::new();
        let matrix = Preprocessor::default().fit_transform(&records, &mut encoders);

        assert_eq!(matrix.columns, ["wlDepthBelowGls"]);
        let encoder = encoders.get("districtName").unwrap();
        assert_eq!(encoder.classes(), ["Puri", "Unknown"]);
        assert!(!encoders.contains("stateName"));
    }

    #[test]
    fn test_custom_candidates_can_select_encoded_columns() {
        let records = vec![record(None, None, Some("Puri")), record(None, None, Some("Cuttack"))];
        let preprocessor = Preprocessor::new(&["districtName_encoded"]);
        let mut encoders = EncoderRegistry::new();
        let matrix = preprocessor.fit_transform(&records, &mut encoders);

        assert_eq!(matrix.column("districtName_encoded"), Some(vec![1.0, 0.0]));

        // Prediction reuses the registry; unseen districts get the unknown code
        let unseen = vec![record(None, None, Some("Ganjam"))];
        let matrix = preprocessor.transform(&unseen, &encoders);
        assert_eq!(matrix.column("districtName_encoded"), Some(vec![2.0]));
        assert_eq!(encoders.get("districtName").unwrap().classes().len(), 2);
    }

    #[test]
    fn test_missing_values_stay_nan_until_filled() {
        let records = vec![
            record(Some("not a date"), Some(4.5), None),
            record(Some("2024-01-01"), None, None),
        ];
        let matrix = Preprocessor::default().transform(&records, &EncoderRegistry::new());

        assert!(matrix.rows[0][1].is_nan(), "unparseable date is missing");
        assert!(matrix.rows[1][0].is_nan(), "absent depth is missing");

        let filled = matrix.fill_missing(0.0);
        assert_eq!(filled.rows[0], vec![4.5, 0.0, 0.0, 0.0]);
        assert_eq!(filled.rows[1], vec![0.0, 2024.0, 1.0, 1.0]);
    }

    #[test]
    fn test_no_candidate_columns_gives_empty_matrix() {
        // Fallback-shaped records carry none of the candidate features
        let records = vec![Record {
            data_value: Some(-6.2),
            data_time: Some("2024-01-01".into()),
            station_name: Some("Puri Monitoring Station 1".into()),
            ..Default::default()
        }];
        let mut encoders = EncoderRegistry::new();
        let matrix = Preprocessor::default().fit_transform(&records, &mut encoders);
        assert!(matrix.is_empty());
        assert!(encoders.contains("stationName"));
    }

    #[test]
    fn test_align_to_fills_absent_columns_with_nan() {
        let matrix = FeatureMatrix {
            columns: vec!["b".into(), "c".into()],
            rows: vec![vec![2.0, 3.0]],
        };
        let names = vec!["a".to_string(), "b".to_string()];
        let aligned = matrix.align_to(&names);

        assert_eq!(aligned.columns, names);
        assert!(aligned.rows[0][0].is_nan());
        assert_eq!(aligned.rows[0][1], 2.0);
        assert_eq!(matrix.missing_columns(&names), vec!["a"]);
    }

    #[test]
    fn test_parse_date_formats() {
        assert_eq!(parse_date("2024-01-05"), Some((2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05T10:00:00+05:30"), Some((2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05 23:59:59"), Some((2024, 1, 5)));
        assert_eq!(parse_date("2024-01-05T23:59:59.123"), Some((2024, 1, 5)));
        assert_eq!(parse_date("05/01/2024"), None);
    }
}
