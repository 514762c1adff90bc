//! Inference output types.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

use super::{ClassLabel, FaultType, Severity};

/// Class probabilities, sorted descending for presentation.
///
/// Equal probabilities keep class declaration order, so the first entry is
/// always the argmax with ties resolved toward the earlier class.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbabilityDistribution<L: ClassLabel> {
    entries: Vec<(L, f64)>,
}

impl<L: ClassLabel> ProbabilityDistribution<L> {
    /// Build from per-class scores indexed by `L::ALL` order.
    pub fn from_class_scores(scores: &[f64]) -> Self {
        let mut entries: Vec<(L, f64)> = L::ALL
            .iter()
            .copied()
            .zip(scores.iter().copied())
            .collect();
        entries.sort_by(|a, b| b.1.total_cmp(&a.1));
        Self { entries }
    }

    /// Most probable class.
    pub fn most_probable(&self) -> Option<L> {
        self.entries.first().map(|(label, _)| *label)
    }

    /// Probability of `label`; 0 for a class absent from the distribution.
    pub fn get(&self, label: L) -> f64 {
        self.entries
            .iter()
            .find(|(l, _)| *l == label)
            .map_or(0.0, |(_, p)| *p)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, p)| p).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (L, f64)> + '_ {
        self.entries.iter().copied()
    }

    /// True when every value is finite, inside [0, 1], and the total is 1 within `tolerance`.
    pub fn is_well_formed(&self, tolerance: f64) -> bool {
        !self.entries.is_empty()
            && self
                .entries
                .iter()
                .all(|(_, p)| p.is_finite() && (0.0..=1.0).contains(p))
            && (self.total() - 1.0).abs() <= tolerance
    }
}

impl<L: ClassLabel> Serialize for ProbabilityDistribution<L> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, p) in &self.entries {
            map.serialize_entry(label.as_str(), p)?;
        }
        map.end()
    }
}

/// Fused output of one inference call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub predicted_fault_type: FaultType,
    pub fault_probabilities: ProbabilityDistribution<FaultType>,
    pub predicted_severity: Severity,
    pub severity_probabilities: ProbabilityDistribution<Severity>,
    /// Ensemble RUL estimate, floored at 0 and rounded to whole hours.
    pub predicted_rul_hours: u32,
    /// Majority recommendation among the nearest training samples.
    pub recommendation: String,
    /// 0-100 rollup of warning/critical probability mass; 0 when healthy.
    pub failure_risk: u8,
    pub anomaly_detected: bool,
    /// P(warning) + P(critical), rounded to 3 decimals.
    pub anomaly_probability: f64,
}
