//! Bagged tree ensembles (random forests).
//!
//! Each tree sees its own bootstrap sample and its own feature sub-sampling
//! stream. Tree seeds are derived from the ensemble seed and the tree index,
//! so a forest is identical no matter how rayon schedules the fits.
//!
//! Classifiers compensate class imbalance with "balanced" weights
//! `n / (k * n_c)` computed over the full training labels; without them the
//! dominant healthy class swallows the minority fault and severity classes.

use std::marker::PhantomData;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::types::{ClassLabel, ProbabilityDistribution};

use super::error::{EngineError, EngineResult};
use super::tree::{DecisionTree, Features, Gini, SquaredError, TreeParams};

/// Ensemble-level settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForestParams {
    pub n_trees: usize,
    pub tree: TreeParams,
    pub seed: u64,
}

/// Seed for tree `index` of an ensemble seeded with `seed`.
fn tree_seed(seed: u64, index: usize) -> u64 {
    seed.wrapping_add((index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Bootstrap multiplicity of each of `n` samples (n draws with replacement).
fn bootstrap_counts(rng: &mut StdRng, n: usize) -> Vec<u32> {
    let mut counts = vec![0u32; n];
    for _ in 0..n {
        counts[rng.gen_range(0..n)] += 1;
    }
    counts
}

fn validate_shapes(x_len: usize, y_len: usize, params: &ForestParams) -> EngineResult<()> {
    if x_len == 0 {
        return Err(EngineError::TrainingData("cannot fit a forest on zero samples".to_string()));
    }
    if x_len != y_len {
        return Err(EngineError::TrainingData(format!(
            "feature rows ({x_len}) and targets ({y_len}) differ in length"
        )));
    }
    if params.n_trees == 0 {
        return Err(EngineError::TrainingData("forest needs at least one tree".to_string()));
    }
    Ok(())
}

/// "Balanced" class weights over `L::ALL`; classes absent from `y` get 0.
pub fn balanced_class_weights<L: ClassLabel>(y: &[L]) -> Vec<f64> {
    let mut counts = vec![0usize; L::ALL.len()];
    for label in y {
        counts[label.index()] += 1;
    }
    let present = counts.iter().filter(|&&c| c > 0).count().max(1);
    let n = y.len() as f64;
    counts
        .iter()
        .map(|&c| if c == 0 { 0.0 } else { n / (present as f64 * c as f64) })
        .collect()
}

/// Random forest classifier over the classes of `L`.
#[derive(Debug, Clone)]
pub struct ForestClassifier<L: ClassLabel> {
    trees: Vec<DecisionTree<Vec<f64>>>,
    _label: PhantomData<L>,
}

impl<L: ClassLabel> ForestClassifier<L> {
    pub fn fit(x: &[Features], y: &[L], params: &ForestParams) -> EngineResult<Self> {
        validate_shapes(x.len(), y.len(), params)?;

        let labels: Vec<usize> = y.iter().map(|l| l.index()).collect();
        let class_weights = balanced_class_weights(y);
        let criterion = Gini {
            labels: &labels,
            n_classes: L::ALL.len(),
        };

        let trees = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(tree_seed(params.seed, t));
                let weights: Vec<f64> = bootstrap_counts(&mut rng, x.len())
                    .into_iter()
                    .zip(&labels)
                    .map(|(count, &label)| f64::from(count) * class_weights[label])
                    .collect();
                DecisionTree::fit(&criterion, x, &weights, &params.tree, &mut rng)
            })
            .collect();

        Ok(Self {
            trees,
            _label: PhantomData,
        })
    }

    /// Per-class vote share in `L::ALL` order. Each tree votes with its
    /// leaf's weighted class proportions.
    pub fn predict_proba(&self, x: &Features) -> Vec<f64> {
        let mut votes = vec![0.0; L::ALL.len()];
        for tree in &self.trees {
            for (v, p) in votes.iter_mut().zip(tree.predict(x)) {
                *v += p;
            }
        }
        let n = self.trees.len() as f64;
        votes.iter_mut().for_each(|v| *v /= n);
        votes
    }

    /// Most probable class plus the full distribution. No decision threshold.
    pub fn predict(&self, x: &Features) -> EngineResult<(L, ProbabilityDistribution<L>)> {
        let dist = ProbabilityDistribution::from_class_scores(&self.predict_proba(x));
        let label = dist.most_probable().ok_or_else(|| {
            EngineError::NumericInstability("classifier produced an empty distribution".to_string())
        })?;
        Ok((label, dist))
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

/// Random forest regressor; the prediction is the mean over trees.
#[derive(Debug, Clone)]
pub struct ForestRegressor {
    trees: Vec<DecisionTree<f64>>,
}

impl ForestRegressor {
    pub fn fit(x: &[Features], y: &[f64], params: &ForestParams) -> EngineResult<Self> {
        validate_shapes(x.len(), y.len(), params)?;
        if let Some(bad) = y.iter().find(|v| !v.is_finite()) {
            return Err(EngineError::TrainingData(format!("regression target {bad} is not finite")));
        }

        let criterion = SquaredError { targets: y };
        let trees = (0..params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = StdRng::seed_from_u64(tree_seed(params.seed, t));
                let weights: Vec<f64> = bootstrap_counts(&mut rng, x.len())
                    .into_iter()
                    .map(f64::from)
                    .collect();
                DecisionTree::fit(&criterion, x, &weights, &params.tree, &mut rng)
            })
            .collect();

        Ok(Self { trees })
    }

    pub fn predict(&self, x: &Features) -> f64 {
        let sum: f64 = self.trees.iter().map(|t| *t.predict(x)).sum();
        sum / self.trees.len() as f64
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}
