//! Anomaly classification
//!
//! An isolation forest over the (heart_rate, blood_oxygen) feature space.
//! Points that are isolated with short average path lengths across random trees
//! are flagged as anomalous. The decision threshold is placed so that the
//! configured contamination share of the training data falls on the anomalous
//! side.

use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::types::{Verdict, Vitals};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::{Rng, SeedableRng};
use tracing::info;

/// Number of input features (heart rate, blood oxygen)
pub const FEATURES: usize = 2;

const EULER_GAMMA: f64 = 0.577_215_664_9;

/// Anything that can label a reading as normal or anomalous.
///
/// Implementations are built once and shared read-only between requests.
pub trait AnomalyClassifier: Send + Sync {
    fn predict(&self, vitals: &Vitals) -> Verdict;
}

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    fn grow(samples: &[[f64; FEATURES]], indices: Vec<usize>, max_depth: usize, rng: &mut StdRng) -> Self {
        Self {
            root: build_node(samples, indices, 0, max_depth, rng),
        }
    }

    fn path_length(&self, point: &[f64; FEATURES]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;

        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if point[*feature] <= *threshold { left.as_ref() } else { right.as_ref() };
                    depth += 1.0;
                }
            }
        }
    }
}

fn build_node(
    samples: &[[f64; FEATURES]],
    indices: Vec<usize>,
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if depth >= max_depth || indices.len() <= 1 {
        return Node::Leaf { size: indices.len() };
    }

    // Only features that still vary within the node can split it.
    let candidates: Vec<(usize, f64, f64)> = (0..FEATURES)
        .filter_map(|feature| {
            let (low, high) = indices.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &i| {
                (lo.min(samples[i][feature]), hi.max(samples[i][feature]))
            });
            (high > low).then_some((feature, low, high))
        })
        .collect();

    if candidates.is_empty() {
        return Node::Leaf { size: indices.len() };
    }

    let (feature, low, high) = candidates[rng.gen_range(0..candidates.len())];
    // threshold in [low, high): both children are non-empty.
    let threshold = rng.gen_range(low..high);
    let (left, right): (Vec<usize>, Vec<usize>) = indices
        .into_iter()
        .partition(|&i| samples[i][feature] <= threshold);

    Node::Split {
        feature,
        threshold,
        left: Box::new(build_node(samples, left, depth + 1, max_depth, rng)),
        right: Box::new(build_node(samples, right, depth + 1, max_depth, rng)),
    }
}

/// Average path length of an unsuccessful search in a binary search tree of
/// `n` points, used to normalize isolation depths.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

/// Linear-interpolated percentile of already sorted values
fn percentile(sorted: &[f64], pct: f64) -> f64 {
    let rank = (pct / 100.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// Fitted isolation forest
#[derive(Debug, Clone)]
pub struct IsolationForest {
    trees: Vec<IsolationTree>,
    subsample_size: usize,
    offset: f64,
    training_outlier_fraction: f64,
}

impl IsolationForest {
    /// Fit a forest on `samples` using the tree count, subsample bound,
    /// contamination and seed from `config`.
    pub fn fit(samples: &[[f64; FEATURES]], config: &ModelConfig) -> Result<Self, ModelError> {
        if samples.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }
        if let Some(index) = samples.iter().position(|s| !s.iter().all(|v| v.is_finite())) {
            return Err(ModelError::NonFiniteSample { index });
        }
        if config.n_estimators == 0 {
            return Err(ModelError::InvalidEstimators);
        }
        if !(config.contamination > 0.0 && config.contamination <= 0.5) {
            return Err(ModelError::InvalidContamination(config.contamination));
        }

        let subsample_size = config.max_samples.clamp(1, samples.len());
        let max_depth = (subsample_size.max(2) as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(config.seed);

        let trees = (0..config.n_estimators)
            .map(|_| {
                let indices = index::sample(&mut rng, samples.len(), subsample_size).into_vec();
                IsolationTree::grow(samples, indices, max_depth, &mut rng)
            })
            .collect();

        let mut forest = Self {
            trees,
            subsample_size,
            offset: 0.0,
            training_outlier_fraction: 0.0,
        };

        let mut scores: Vec<f64> = samples.iter().map(|s| forest.score_samples(s)).collect();
        scores.sort_by(f64::total_cmp);
        forest.offset = percentile(&scores, config.contamination * 100.0);

        let flagged = scores.iter().filter(|s| **s < forest.offset).count();
        forest.training_outlier_fraction = flagged as f64 / samples.len() as f64;

        info!(
            trees = forest.trees.len(),
            subsample_size,
            offset = forest.offset,
            training_outlier_fraction = forest.training_outlier_fraction,
            "Anomaly model fitted"
        );

        Ok(forest)
    }

    /// Negated anomaly score in [-1, 0); lower means more anomalous
    pub fn score_samples(&self, point: &[f64; FEATURES]) -> f64 {
        let mean_path = self.trees.iter().map(|t| t.path_length(point)).sum::<f64>() / self.trees.len() as f64;
        -(2f64).powf(-mean_path / average_path_length(self.subsample_size).max(f64::MIN_POSITIVE))
    }

    /// Signed distance to the decision boundary; negative means anomalous
    pub fn decision_function(&self, point: &[f64; FEATURES]) -> f64 {
        self.score_samples(point) - self.offset
    }

    /// Decision threshold on `score_samples`
    pub fn offset(&self) -> f64 {
        self.offset
    }

    pub fn n_estimators(&self) -> usize {
        self.trees.len()
    }

    /// Share of the training set classified as anomalous after fitting
    pub fn training_outlier_fraction(&self) -> f64 {
        self.training_outlier_fraction
    }
}

impl AnomalyClassifier for IsolationForest {
    fn predict(&self, vitals: &Vitals) -> Verdict {
        if self.decision_function(&vitals.features()) < 0.0 {
            Verdict::Anomalous
        } else {
            Verdict::Normal
        }
    }
}
