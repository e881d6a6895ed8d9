//! Bagged regression trees (random forest regressor).

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Forest hyperparameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the ensemble
    pub n_estimators: usize,
    /// Maximum depth of each tree (root is depth 0)
    pub max_depth: usize,
    /// Minimum samples required to split a node
    pub min_samples_split: usize,
    /// Minimum samples in each child of a split
    pub min_samples_leaf: usize,
    /// Draw a bootstrap sample per tree
    pub bootstrap: bool,
    /// Base seed; tree `i` uses `seed + i`
    pub seed: u64,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            bootstrap: true,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Node {
    Leaf {
        value: f64,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

impl Node {
    fn predict(&self, row: &[f64]) -> f64 {
        let mut node = self;
        loop {
            match node {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let x = row.get(*feature).copied().unwrap_or(0.0);
                    node = if x <= *threshold { left } else { right };
                }
            }
        }
    }

    fn depth(&self) -> usize {
        match self {
            Node::Leaf { .. } => 0,
            Node::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }
}

/// A single CART regression tree using squared-error splits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Node,
}

struct Split {
    feature: usize,
    threshold: f64,
    sse: f64,
}

impl RegressionTree {
    pub fn fit(x: &[Vec<f64>], y: &[f64], indices: &[usize], config: &ForestConfig) -> Self {
        let mut indices = indices.to_vec();
        let root = build_node(x, y, &mut indices, 0, config);
        Self { root }
    }

    pub fn predict_one(&self, row: &[f64]) -> f64 {
        self.root.predict(row)
    }

    pub fn depth(&self) -> usize {
        self.root.depth()
    }
}

fn build_node(x: &[Vec<f64>], y: &[f64], indices: &mut [usize], depth: usize, config: &ForestConfig) -> Node {
    let n = indices.len();
    let (sum, sum_sq) = indices
        .iter()
        .fold((0.0, 0.0), |(s, sq), &i| (s + y[i], sq + y[i] * y[i]));
    let mean = if n == 0 { 0.0 } else { sum / n as f64 };
    let parent_sse = sum_sq - sum * sum / n.max(1) as f64;

    if depth >= config.max_depth || n < config.min_samples_split || parent_sse <= 1e-12 {
        return Node::Leaf { value: mean };
    }

    let Some(best) = best_split(x, y, indices, sum, sum_sq, config) else {
        return Node::Leaf { value: mean };
    };
    if best.sse >= parent_sse {
        return Node::Leaf { value: mean };
    }

    let mid = partition(indices, |i| x[i][best.feature] <= best.threshold);
    let (left_idx, right_idx) = indices.split_at_mut(mid);

    Node::Split {
        feature: best.feature,
        threshold: best.threshold,
        left: Box::new(build_node(x, y, left_idx, depth + 1, config)),
        right: Box::new(build_node(x, y, right_idx, depth + 1, config)),
    }
}

/// Exhaustive search over every feature, sweeping sorted values so each
/// candidate threshold costs O(1).
fn best_split(
    x: &[Vec<f64>],
    y: &[f64],
    indices: &[usize],
    total_sum: f64,
    total_sq: f64,
    config: &ForestConfig,
) -> Option<Split> {
    let n = indices.len();
    let n_features = x.get(indices[0]).map_or(0, Vec::len);
    let min_leaf = config.min_samples_leaf.max(1);
    let mut best: Option<Split> = None;
    let mut order = indices.to_vec();

    for feature in 0..n_features {
        order.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_sum = 0.0;
        let mut left_sq = 0.0;
        for k in 1..n {
            let prev = order[k - 1];
            left_sum += y[prev];
            left_sq += y[prev] * y[prev];

            let lo = x[prev][feature];
            let hi = x[order[k]][feature];
            if lo == hi || k < min_leaf || n - k < min_leaf {
                continue;
            }

            let n_left = k as f64;
            let n_right = (n - k) as f64;
            let right_sum = total_sum - left_sum;
            let right_sq = total_sq - left_sq;
            let sse = (left_sq - left_sum * left_sum / n_left) + (right_sq - right_sum * right_sum / n_right);

            if best.as_ref().is_none_or(|b| sse < b.sse) {
                best = Some(Split {
                    feature,
                    threshold: lo + (hi - lo) / 2.0,
                    sse,
                });
            }
        }
    }

    best
}

/// In-place partition; returns the number of elements satisfying `pred`,
/// which are moved to the front.
fn partition<F: Fn(usize) -> bool>(indices: &mut [usize], pred: F) -> usize {
    let mut mid = 0;
    for j in 0..indices.len() {
        if pred(indices[j]) {
            indices.swap(mid, j);
            mid += 1;
        }
    }
    mid
}

/// Random forest regressor: the mean of bootstrapped regression trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    config: ForestConfig,
    n_features: usize,
    trees: Vec<RegressionTree>,
}

impl RandomForestRegressor {
    /// Fit a forest on rows `x` against targets `y`.
    ///
    /// Trees are built in parallel; each draws its bootstrap sample from its
    /// own seeded RNG so the result does not depend on scheduling.
    pub fn fit(config: ForestConfig, x: &[Vec<f64>], y: &[f64]) -> Self {
        let n_samples = x.len().min(y.len());
        let n_features = x.first().map_or(0, Vec::len);

        let trees = if n_samples == 0 {
            Vec::new()
        } else {
            (0..config.n_estimators)
                .into_par_iter()
                .map(|i| {
                    let indices = if config.bootstrap {
                        let mut rng = ChaCha8Rng::seed_from_u64(config.seed.wrapping_add(i as u64));
                        (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect::<Vec<_>>()
                    } else {
                        (0..n_samples).collect()
                    };
                    RegressionTree::fit(x, y, &indices, &config)
                })
                .collect()
        };

        Self {
            config,
            n_features,
            trees,
        }
    }

    pub fn config(&self) -> &ForestConfig {
        &self.config
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn max_depth(&self) -> usize {
        self.trees.iter().map(RegressionTree::depth).max().unwrap_or(0)
    }

    pub fn predict_one(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        let total: f64 = self.trees.iter().map(|t| t.predict_one(row)).sum();
        total / self.trees.len() as f64
    }

    pub fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.predict_one(row)).collect()
    }

    /// Coefficient of determination on `(x, y)`.
    pub fn score(&self, x: &[Vec<f64>], y: &[f64]) -> f64 {
        r2_score(y, &self.predict(x))
    }
}

/// Coefficient of determination.
///
/// When the targets have no variance the score is 1 for a perfect fit and
/// 0 otherwise.
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        return if ss_res == 0.0 { 1.0 } else { 0.0 };
    }
    1.0 - ss_res / ss_tot
}
