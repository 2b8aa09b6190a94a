//! Isolation forest anomaly scoring over a single numeric column.
//!
//! Each tree partitions a random subsample with random thresholds until every
//! point is alone or the depth limit is hit. Points that are isolated after
//! few partitions get a score close to 1.

use crate::error::{DoctorError, Result};
use rand::prelude::*;
use rand::rngs::StdRng;

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

/// Scores within this distance of the threshold count as inliers, so a column
/// of identical values (score exactly 0.5 up to rounding) is never flagged.
const SCORE_TOLERANCE: f64 = 1e-9;

/// Average path length of an unsuccessful search in a binary search tree of
/// `n` points. Normalizes path lengths across subsample sizes.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf { size: usize },
    Split { threshold: f64, left: usize, right: usize },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(sample: &[f64], max_depth: usize, rng: &mut StdRng) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.build(sample.to_vec(), 0, max_depth, rng);
        tree
    }

    fn build(&mut self, points: Vec<f64>, depth: usize, max_depth: usize, rng: &mut StdRng) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { size: points.len() });

        if depth >= max_depth || points.len() <= 1 {
            return id;
        }

        let lo = points.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = points.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if lo >= hi {
            return id;
        }

        let threshold = rng.gen_range(lo..hi);
        let (left_points, right_points): (Vec<f64>, Vec<f64>) =
            points.into_iter().partition(|&v| v <= threshold);

        let left = self.build(left_points, depth + 1, max_depth, rng);
        let right = self.build(right_points, depth + 1, max_depth, rng);
        self.nodes[id] = Node::Split {
            threshold,
            left,
            right,
        };
        id
    }

    /// Path length to the leaf holding `x`, adjusted for unbuilt subtrees.
    fn path_length(&self, x: f64) -> f64 {
        let mut node = 0;
        let mut depth = 0.0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    threshold,
                    left,
                    right,
                } => {
                    node = if x <= *threshold { *left } else { *right };
                    depth += 1.0;
                }
            }
        }
    }
}

/// Seeded ensemble of isolation trees.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    sample_size: usize,
}

impl IsolationForest {
    /// Fit `n_trees` trees, each on a subsample of `min(max_samples, n)`
    /// distinct points drawn without replacement.
    pub fn fit(values: &[f64], n_trees: usize, max_samples: usize, seed: u64) -> Result<Self> {
        if values.is_empty() {
            return Err(DoctorError::EvaluationFailed(
                "isolation forest needs at least one value".to_string(),
            ));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DoctorError::EvaluationFailed(
                "isolation forest input contains non-finite values".to_string(),
            ));
        }
        if n_trees == 0 || max_samples == 0 {
            return Err(DoctorError::EvaluationFailed(
                "isolation forest needs at least one tree and one sample".to_string(),
            ));
        }

        let sample_size = max_samples.min(values.len());
        let max_depth = (sample_size as f64).log2().ceil().max(0.0) as usize;
        let mut rng = StdRng::seed_from_u64(seed);

        let trees = (0..n_trees)
            .map(|_| {
                let sample: Vec<f64> = rand::seq::index::sample(&mut rng, values.len(), sample_size)
                    .into_iter()
                    .map(|i| values[i])
                    .collect();
                IsolationTree::grow(&sample, max_depth, &mut rng)
            })
            .collect();

        Ok(Self { trees, sample_size })
    }

    /// Anomaly score in `(0, 1]`. Values above 0.5 are more isolated than
    /// an average point.
    pub fn score(&self, x: f64) -> f64 {
        let mean_path = self.trees.iter().map(|t| t.path_length(x)).sum::<f64>()
            / self.trees.len() as f64;
        let normalizer = average_path_length(self.sample_size);
        if normalizer == 0.0 {
            // A single-point subsample cannot separate anything.
            return 0.5;
        }
        2f64.powf(-mean_path / normalizer)
    }

    /// Positions in `values` whose score exceeds `threshold`.
    pub fn anomalies(&self, values: &[f64], threshold: f64) -> Vec<usize> {
        values
            .iter()
            .enumerate()
            .filter(|(_, v)| self.score(**v) > threshold + SCORE_TOLERANCE)
            .map(|(i, _)| i)
            .collect()
    }
}
