//! Standard (z-score) feature scaling.

use serde::{Deserialize, Serialize};

/// Per-feature mean and scale, fit once on training data.
///
/// Scale is the population standard deviation; features with zero variance
/// get a scale of 1 so they pass through centred but unscaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let n_features = rows.first().map_or(0, Vec::len);
        if rows.is_empty() {
            return Self {
                mean: vec![0.0; n_features],
                scale: vec![1.0; n_features],
            };
        }

        let n = rows.len() as f64;
        let mut mean = vec![0.0; n_features];
        for row in rows {
            for (m, &x) in mean.iter_mut().zip(row) {
                *m += x;
            }
        }
        for m in &mut mean {
            *m /= n;
        }

        let mut var = vec![0.0; n_features];
        for row in rows {
            for ((v, &x), &m) in var.iter_mut().zip(row).zip(&mean) {
                *v += (x - m).powi(2);
            }
        }

        let scale = var
            .into_iter()
            .map(|v| {
                let std = (v / n).sqrt();
                if std > f64::EPSILON { std } else { 1.0 }
            })
            .collect();

        Self { mean, scale }
    }

    pub fn n_features(&self) -> usize {
        self.mean.len()
    }

    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    pub fn transform_row(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(&x, (&m, &s))| (x - m) / s)
            .collect()
    }

    pub fn transform(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform_row(row)).collect()
    }
}
