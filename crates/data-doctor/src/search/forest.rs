//! Random forest surrogate models (classification and regression).
//!
//! Trees are CART trees grown on bootstrap samples until pure or until no
//! threshold separates the node. Classification trees consider
//! `floor(sqrt(n_features))` candidate features per split and minimize gini
//! impurity; regression trees consider every feature and minimize squared
//! error.

use crate::error::{DoctorError, Result};
use rand::prelude::*;
use rand::rngs::StdRng;

/// Forest hyperparameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Copy)]
enum Target<'a> {
    Classes { labels: &'a [usize], n_classes: usize },
    Continuous(&'a [f64]),
}

impl Target<'_> {
    /// Class distribution (classification) or mean (regression) of a node.
    fn leaf_value(&self, indices: &[usize]) -> Vec<f64> {
        let n = indices.len().max(1) as f64;
        match *self {
            Target::Classes { labels, n_classes } => {
                let mut dist = vec![0.0; n_classes];
                for &i in indices {
                    dist[labels[i]] += 1.0;
                }
                dist.iter_mut().for_each(|p| *p /= n);
                dist
            }
            Target::Continuous(y) => vec![indices.iter().map(|&i| y[i]).sum::<f64>() / n],
        }
    }

    fn is_pure(&self, indices: &[usize]) -> bool {
        match *self {
            Target::Classes { labels, .. } => indices.windows(2).all(|w| labels[w[0]] == labels[w[1]]),
            Target::Continuous(y) => indices.windows(2).all(|w| y[w[0]] == y[w[1]]),
        }
    }

    fn max_features(&self, n_features: usize) -> usize {
        match self {
            Target::Classes { .. } => ((n_features as f64).sqrt().floor() as usize).max(1),
            Target::Continuous(_) => n_features,
        }
    }
}

/// Running statistics of one side of a candidate split.
#[derive(Debug, Clone)]
enum SideStats {
    Classes { counts: Vec<f64>, n: f64 },
    Continuous { sum: f64, sum_sq: f64, n: f64 },
}

impl SideStats {
    fn empty(target: &Target<'_>) -> Self {
        match target {
            Target::Classes { n_classes, .. } => SideStats::Classes {
                counts: vec![0.0; *n_classes],
                n: 0.0,
            },
            Target::Continuous(_) => SideStats::Continuous {
                sum: 0.0,
                sum_sq: 0.0,
                n: 0.0,
            },
        }
    }

    fn of(target: &Target<'_>, indices: &[usize]) -> Self {
        let mut stats = Self::empty(target);
        for &i in indices {
            stats.add(target, i, 1.0);
        }
        stats
    }

    fn add(&mut self, target: &Target<'_>, index: usize, weight: f64) {
        match (self, target) {
            (SideStats::Classes { counts, n }, Target::Classes { labels, .. }) => {
                counts[labels[index]] += weight;
                *n += weight;
            }
            (SideStats::Continuous { sum, sum_sq, n }, Target::Continuous(y)) => {
                *sum += weight * y[index];
                *sum_sq += weight * y[index] * y[index];
                *n += weight;
            }
            _ => {}
        }
    }

    /// Node size times impurity (gini or variance).
    fn weighted_impurity(&self) -> f64 {
        match self {
            SideStats::Classes { counts, n } => {
                if *n == 0.0 {
                    return 0.0;
                }
                n - counts.iter().map(|c| c * c).sum::<f64>() / n
            }
            SideStats::Continuous { sum, sum_sq, n } => {
                if *n == 0.0 {
                    return 0.0;
                }
                (sum_sq - sum * sum / n).max(0.0)
            }
        }
    }
}

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        value: Vec<f64>,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone, Copy)]
struct SplitCandidate {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

#[derive(Debug, Clone)]
struct DecisionTree {
    nodes: Vec<Node>,
}

impl DecisionTree {
    fn grow(
        rows: &[Vec<f64>],
        target: Target<'_>,
        indices: Vec<usize>,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> Self {
        let mut tree = Self { nodes: Vec::new() };
        tree.build(rows, target, indices, 0, max_depth, rng);
        tree
    }

    fn build(
        &mut self,
        rows: &[Vec<f64>],
        target: Target<'_>,
        indices: Vec<usize>,
        depth: usize,
        max_depth: usize,
        rng: &mut StdRng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf {
            value: target.leaf_value(&indices),
        });

        if depth >= max_depth || indices.len() < 2 || target.is_pure(&indices) {
            return id;
        }

        let Some(split) = Self::find_split(rows, target, &indices, rng) else {
            return id;
        };

        let (left_idx, right_idx): (Vec<usize>, Vec<usize>) = indices
            .into_iter()
            .partition(|&i| rows[i][split.feature] <= split.threshold);

        let left = self.build(rows, target, left_idx, depth + 1, max_depth, rng);
        let right = self.build(rows, target, right_idx, depth + 1, max_depth, rng);
        self.nodes[id] = Node::Split {
            feature: split.feature,
            threshold: split.threshold,
            left,
            right,
        };
        id
    }

    /// Best split over a random feature order. Inspects `max_features`
    /// features, and keeps going past that only while no valid split exists.
    fn find_split(
        rows: &[Vec<f64>],
        target: Target<'_>,
        indices: &[usize],
        rng: &mut StdRng,
    ) -> Option<SplitCandidate> {
        let n_features = rows.first().map_or(0, Vec::len);
        let max_features = target.max_features(n_features);

        let mut order: Vec<usize> = (0..n_features).collect();
        order.shuffle(rng);

        let total = SideStats::of(&target, indices);
        let mut best: Option<SplitCandidate> = None;

        for (inspected, &feature) in order.iter().enumerate() {
            if inspected >= max_features && best.is_some() {
                break;
            }

            let mut sorted: Vec<(f64, usize)> =
                indices.iter().map(|&i| (rows[i][feature], i)).collect();
            sorted.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut left = SideStats::empty(&target);
            let mut right = total.clone();

            for pos in 0..sorted.len() - 1 {
                let (value, index) = sorted[pos];
                left.add(&target, index, 1.0);
                right.add(&target, index, -1.0);

                let next = sorted[pos + 1].0;
                if value >= next {
                    continue;
                }

                let impurity = left.weighted_impurity() + right.weighted_impurity();
                if best.is_none_or(|b| impurity < b.impurity) {
                    let mid = value + (next - value) / 2.0;
                    let threshold = if mid >= next { value } else { mid };
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        impurity,
                    });
                }
            }
        }

        best
    }

    fn predict(&self, row: &[f64]) -> &[f64] {
        let mut node = 0;
        loop {
            match &self.nodes[node] {
                Node::Leaf { value } => return value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }
}

/// Bagged ensemble of decision trees.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_outputs: usize,
}

impl RandomForest {
    /// Fit a classifier. `labels` are class indices below `n_classes`.
    pub fn fit_classifier(
        rows: &[Vec<f64>],
        labels: &[usize],
        n_classes: usize,
        params: ForestParams,
    ) -> Result<Self> {
        if labels.iter().any(|&l| l >= n_classes) {
            return Err(DoctorError::EvaluationFailed(
                "class label out of range".to_string(),
            ));
        }
        Self::fit(
            rows,
            labels.len(),
            Target::Classes { labels, n_classes },
            n_classes,
            params,
        )
    }

    /// Fit a regressor on continuous targets.
    pub fn fit_regressor(rows: &[Vec<f64>], y: &[f64], params: ForestParams) -> Result<Self> {
        if y.iter().any(|v| !v.is_finite()) {
            return Err(DoctorError::EvaluationFailed(
                "regression target contains non-finite values".to_string(),
            ));
        }
        Self::fit(rows, y.len(), Target::Continuous(y), 1, params)
    }

    fn fit(
        rows: &[Vec<f64>],
        n_targets: usize,
        target: Target<'_>,
        n_outputs: usize,
        params: ForestParams,
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(DoctorError::EvaluationFailed(
                "training split is empty".to_string(),
            ));
        }
        if rows.len() != n_targets {
            return Err(DoctorError::EvaluationFailed(format!(
                "{} feature rows but {} targets",
                rows.len(),
                n_targets
            )));
        }
        if params.n_trees == 0 {
            return Err(DoctorError::EvaluationFailed(
                "forest needs at least one tree".to_string(),
            ));
        }

        let n = rows.len();
        let mut rng = StdRng::seed_from_u64(params.seed);
        let trees = (0..params.n_trees)
            .map(|_| {
                let bootstrap: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                DecisionTree::grow(rows, target, bootstrap, params.max_depth, &mut rng)
            })
            .collect();

        Ok(Self { trees, n_outputs })
    }

    /// Tree outputs averaged across the forest.
    fn average(&self, row: &[f64]) -> Vec<f64> {
        let mut acc = vec![0.0; self.n_outputs];
        for tree in &self.trees {
            for (a, v) in acc.iter_mut().zip(tree.predict(row)) {
                *a += v;
            }
        }
        let n = self.trees.len() as f64;
        acc.iter_mut().for_each(|a| *a /= n);
        acc
    }

    /// Most probable class per row. Ties go to the lowest class index.
    pub fn predict_classes(&self, rows: &[Vec<f64>]) -> Vec<usize> {
        rows.iter()
            .map(|row| {
                let probs = self.average(row);
                probs
                    .iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |(best_i, best_p), (i, &p)| {
                        if p > best_p { (i, p) } else { (best_i, best_p) }
                    })
                    .0
            })
            .collect()
    }

    /// Mean tree prediction per row.
    pub fn predict_values(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|row| self.average(row)[0]).collect()
    }
}
