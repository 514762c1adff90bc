//! Nearest-neighbor recommendation retrieval.
//!
//! Brute-force Euclidean search over the scaled training corpus. The
//! corpus is at most tens of thousands of 4-D points, so a linear scan per
//! query is cheap and needs no spatial index.

use super::tree::Features;

/// One retrieved training sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Position in the training corpus.
    pub index: usize,
    pub distance: f64,
}

/// Scaled feature vectors of the training corpus, in corpus order.
#[derive(Debug, Clone)]
pub struct NeighborIndex {
    points: Vec<Features>,
}

impl NeighborIndex {
    pub fn fit(points: Vec<Features>) -> Self {
        Self { points }
    }

    /// The `k` closest points, nearest first. Equal distances keep corpus order.
    pub fn query(&self, x: &Features, k: usize) -> Vec<Neighbor> {
        let mut all: Vec<Neighbor> = self
            .points
            .iter()
            .enumerate()
            .map(|(index, p)| Neighbor {
                index,
                distance: euclidean(p, x),
            })
            .collect();
        // sort_by is stable
        all.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        all.truncate(k);
        all
    }
}

fn euclidean(a: &Features, b: &Features) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Most frequent recommendation among the neighbors.
///
/// Ties go to the recommendation encountered first in neighbor order.
pub fn majority_recommendation<'a, F>(neighbors: &[Neighbor], recommendation_of: F) -> Option<&'a str>
where
    F: Fn(usize) -> &'a str,
{
    let mut counts: Vec<(&'a str, usize)> = Vec::new();
    for n in neighbors {
        let rec = recommendation_of(n.index);
        match counts.iter_mut().find(|(r, _)| *r == rec) {
            Some((_, c)) => *c += 1,
            None => counts.push((rec, 1)),
        }
    }

    let mut best: Option<(&'a str, usize)> = None;
    for (rec, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((rec, count));
        }
    }
    best.map(|(rec, _)| rec)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(n: usize) -> NeighborIndex {
        NeighborIndex::fit((0..n).map(|i| [i as f64, 0.0, 0.0, 0.0]).collect())
    }

    #[test]
    fn test_query_returns_nearest_sorted() {
        let index = line(10);
        let hits = index.query(&[6.2, 0.0, 0.0, 0.0], 3);
        let ids: Vec<usize> = hits.iter().map(|n| n.index).collect();
        assert_eq!(ids, vec![6, 7, 5]);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_equal_distances_keep_corpus_order() {
        let index = NeighborIndex::fit(vec![
            [1.0, 0.0, 0.0, 0.0],
            [-1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
        ]);
        let ids: Vec<usize> = index.query(&[0.0; 4], 3).iter().map(|n| n.index).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_k_larger_than_corpus() {
        assert_eq!(line(3).query(&[0.0; 4], 7).len(), 3);
    }

    #[test]
    fn test_majority_vote() {
        let recs = ["a", "b", "b", "c", "b", "a", "a"];
        let neighbors: Vec<Neighbor> = (0..recs.len())
            .map(|index| Neighbor { index, distance: index as f64 })
            .collect();
        // a: 3, b: 3 -> "a" seen first
        assert_eq!(majority_recommendation(&neighbors, |i| recs[i]), Some("a"));

        let recs = ["x", "y", "y"];
        let neighbors: Vec<Neighbor> = (0..3).map(|index| Neighbor { index, distance: 0.0 }).collect();
        assert_eq!(majority_recommendation(&neighbors, |i| recs[i]), Some("y"));
        assert_eq!(majority_recommendation(&[], |i| recs[i]), None);
    }
}
