//! Weighted CART decision trees.
//!
//! One builder serves both classification (weighted Gini) and regression
//! (weighted squared error) through the [`Criterion`] trait. Sample weights
//! carry bootstrap multiplicity and class balancing; a sample with weight 0
//! is simply not part of the tree.
//!
//! Trees are grown with an explicit work stack, so fully grown trees on
//! large corpora do not recurse.

use rand::rngs::StdRng;
use rand::Rng;

use crate::types::NUM_FEATURES;

pub type Features = [f64; NUM_FEATURES];

/// Two feature values closer than this are treated as equal when placing thresholds.
const FEATURE_THRESHOLD: f64 = 1e-7;

/// Growth limits for a single tree.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TreeParams {
    /// `None` grows until leaves are pure or cannot be split.
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Non-constant features examined per split.
    pub max_features: usize,
}

impl Default for TreeParams {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            max_features: NUM_FEATURES,
        }
    }
}

/// Split quality measure plus leaf summary.
///
/// `cost` is the node impurity multiplied by its total weight, so the cost
/// of a split is simply `cost(left) + cost(right)`.
pub trait Criterion: Sync {
    type Stats: Clone;
    type Output: Clone + Send + Sync;

    fn zero(&self) -> Self::Stats;
    fn push(&self, stats: &mut Self::Stats, sample: usize, weight: f64);
    fn pop(&self, stats: &mut Self::Stats, sample: usize, weight: f64);
    fn cost(&self, stats: &Self::Stats) -> f64;
    fn is_pure(&self, stats: &Self::Stats) -> bool;
    fn leaf(&self, stats: &Self::Stats) -> Self::Output;
}

/// Weighted Gini impurity over class indices `0..n_classes`.
pub struct Gini<'a> {
    pub labels: &'a [usize],
    pub n_classes: usize,
}

#[derive(Debug, Clone)]
pub struct ClassStats {
    weights: Vec<f64>,
    total: f64,
}

impl Criterion for Gini<'_> {
    type Stats = ClassStats;
    /// Weighted class proportions at the leaf.
    type Output = Vec<f64>;

    fn zero(&self) -> ClassStats {
        ClassStats {
            weights: vec![0.0; self.n_classes],
            total: 0.0,
        }
    }

    fn push(&self, stats: &mut ClassStats, sample: usize, weight: f64) {
        stats.weights[self.labels[sample]] += weight;
        stats.total += weight;
    }

    fn pop(&self, stats: &mut ClassStats, sample: usize, weight: f64) {
        stats.weights[self.labels[sample]] -= weight;
        stats.total -= weight;
    }

    fn cost(&self, stats: &ClassStats) -> f64 {
        if stats.total <= 0.0 {
            return 0.0;
        }
        let sq: f64 = stats.weights.iter().map(|w| w * w).sum();
        (stats.total - sq / stats.total).max(0.0)
    }

    fn is_pure(&self, stats: &ClassStats) -> bool {
        stats.weights.iter().filter(|w| **w > 0.0).count() <= 1
    }

    fn leaf(&self, stats: &ClassStats) -> Vec<f64> {
        if stats.total <= 0.0 {
            return vec![1.0 / self.n_classes as f64; self.n_classes];
        }
        stats.weights.iter().map(|w| w.max(0.0) / stats.total).collect()
    }
}

/// Weighted squared error for continuous targets.
pub struct SquaredError<'a> {
    pub targets: &'a [f64],
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MomentStats {
    w: f64,
    wy: f64,
    wy2: f64,
}

impl Criterion for SquaredError<'_> {
    type Stats = MomentStats;
    /// Weighted mean target at the leaf.
    type Output = f64;

    fn zero(&self) -> MomentStats {
        MomentStats::default()
    }

    fn push(&self, stats: &mut MomentStats, sample: usize, weight: f64) {
        let y = self.targets[sample];
        stats.w += weight;
        stats.wy += weight * y;
        stats.wy2 += weight * y * y;
    }

    fn pop(&self, stats: &mut MomentStats, sample: usize, weight: f64) {
        let y = self.targets[sample];
        stats.w -= weight;
        stats.wy -= weight * y;
        stats.wy2 -= weight * y * y;
    }

    fn cost(&self, stats: &MomentStats) -> f64 {
        if stats.w <= 0.0 {
            return 0.0;
        }
        (stats.wy2 - stats.wy * stats.wy / stats.w).max(0.0)
    }

    fn is_pure(&self, stats: &MomentStats) -> bool {
        stats.w <= 0.0 || self.cost(stats) / stats.w <= 1e-12
    }

    fn leaf(&self, stats: &MomentStats) -> f64 {
        if stats.w <= 0.0 {
            0.0
        } else {
            stats.wy / stats.w
        }
    }
}

#[derive(Debug, Clone)]
enum Node<O> {
    Leaf(O),
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

/// A fitted tree. Node 0 is the root.
#[derive(Debug, Clone)]
pub struct DecisionTree<O> {
    nodes: Vec<Node<O>>,
}

struct Pending {
    node: usize,
    samples: Vec<usize>,
    depth: usize,
}

struct BestSplit {
    cost: f64,
    feature: usize,
    threshold: f64,
}

impl<O: Clone + Send + Sync> DecisionTree<O> {
    /// Grow a tree over every sample with positive weight.
    ///
    /// `rng` drives feature sub-sampling only; bootstrap draws happen in the caller.
    pub fn fit<C>(criterion: &C, x: &[Features], weights: &[f64], params: &TreeParams, rng: &mut StdRng) -> Self
    where
        C: Criterion<Output = O>,
    {
        let root_samples: Vec<usize> = (0..x.len()).filter(|&i| weights[i] > 0.0).collect();
        let min_leaf = params.min_samples_leaf.max(1);
        let min_split = params.min_samples_split.max(2).max(2 * min_leaf);

        let mut nodes: Vec<Node<O>> = vec![Node::Leaf(criterion.leaf(&criterion.zero()))];
        let mut stack = vec![Pending {
            node: 0,
            samples: root_samples,
            depth: 0,
        }];

        while let Some(Pending { node, samples, depth }) = stack.pop() {
            let mut stats = criterion.zero();
            for &s in &samples {
                criterion.push(&mut stats, s, weights[s]);
            }

            let depth_exhausted = params.max_depth.is_some_and(|d| depth >= d);
            if depth_exhausted || samples.len() < min_split || criterion.is_pure(&stats) {
                nodes[node] = Node::Leaf(criterion.leaf(&stats));
                continue;
            }

            let Some(best) = find_split(criterion, x, weights, &samples, &stats, params, min_leaf, rng) else {
                nodes[node] = Node::Leaf(criterion.leaf(&stats));
                continue;
            };

            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
                .into_iter()
                .partition(|&s| x[s][best.feature] <= best.threshold);

            let left = nodes.len();
            let right = left + 1;
            let placeholder = criterion.leaf(&stats);
            nodes.push(Node::Leaf(placeholder.clone()));
            nodes.push(Node::Leaf(placeholder));
            nodes[node] = Node::Split {
                feature: best.feature,
                threshold: best.threshold,
                left,
                right,
            };

            stack.push(Pending {
                node: right,
                samples: right_samples,
                depth: depth + 1,
            });
            stack.push(Pending {
                node: left,
                samples: left_samples,
                depth: depth + 1,
            });
        }

        Self { nodes }
    }

    /// Leaf output for one feature vector.
    pub fn predict(&self, x: &Features) -> &O {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf(out) => return out,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| matches!(n, Node::Leaf(_))).count()
    }
}

/// Best split over a random subset of non-constant features.
///
/// Features are visited in shuffled order; constant features do not count
/// toward `max_features`, so a node is only left unsplit when no feature
/// separates it.
#[allow(clippy::too_many_arguments)]
fn find_split<C: Criterion>(
    criterion: &C,
    x: &[Features],
    weights: &[f64],
    samples: &[usize],
    total: &C::Stats,
    params: &TreeParams,
    min_leaf: usize,
    rng: &mut StdRng,
) -> Option<BestSplit> {
    let mut features: [usize; NUM_FEATURES] = std::array::from_fn(|i| i);
    for i in (1..NUM_FEATURES).rev() {
        let j = rng.gen_range(0..=i);
        features.swap(i, j);
    }

    let max_features = params.max_features.clamp(1, NUM_FEATURES);
    let mut visited = 0;
    let mut best: Option<BestSplit> = None;
    let mut order = samples.to_vec();
    let n = order.len();

    for &f in &features {
        if visited >= max_features {
            break;
        }

        order.sort_by(|&a, &b| x[a][f].total_cmp(&x[b][f]));
        if x[order[n - 1]][f] <= x[order[0]][f] + FEATURE_THRESHOLD {
            continue;
        }
        visited += 1;

        let mut left = criterion.zero();
        let mut right = total.clone();
        for i in 0..n - 1 {
            let s = order[i];
            criterion.push(&mut left, s, weights[s]);
            criterion.pop(&mut right, s, weights[s]);

            let left_count = i + 1;
            if left_count < min_leaf || n - left_count < min_leaf {
                continue;
            }
            let lo = x[s][f];
            let hi = x[order[i + 1]][f];
            if hi <= lo + FEATURE_THRESHOLD {
                continue;
            }

            let cost = criterion.cost(&left) + criterion.cost(&right);
            if best.as_ref().map_or(true, |b| cost < b.cost) {
                let mut threshold = lo / 2.0 + hi / 2.0;
                if threshold >= hi || !threshold.is_finite() {
                    threshold = lo;
                }
                best = Some(BestSplit {
                    cost,
                    feature: f,
                    threshold,
                });
            }
        }
    }

    best
}
