//! The trained model set and the per-request fusion rules.
//!
//! A [`ModelBundle`] is built in one training phase from one generated
//! corpus and never mutated afterwards. Retraining builds a new bundle.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::config::EngineConfig;
use crate::types::{
    FaultType, PredictionResult, ProbabilityDistribution, SensorReading, Severity, TrainingSample,
};

use super::error::{EngineError, EngineResult};
use super::forest::{ForestClassifier, ForestRegressor};
use super::generator::CorpusGenerator;
use super::retriever::{majority_recommendation, NeighborIndex};
use super::scaler::ScalingParameters;

/// Allowed deviation of a probability total from 1.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

/// Scaler, models, neighbor index and corpus from a single training phase.
#[derive(Debug)]
pub struct ModelBundle {
    scaler: ScalingParameters,
    fault: ForestClassifier<FaultType>,
    severity: ForestClassifier<Severity>,
    rul: ForestRegressor,
    neighbors: NeighborIndex,
    neighbor_count: usize,
    corpus: Vec<TrainingSample>,
    seed: u64,
    trained_at: DateTime<Utc>,
}

/// Summary of a published bundle for health and training responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BundleInfo {
    pub seed: u64,
    pub sample_count: usize,
    pub fault_trees: usize,
    pub severity_trees: usize,
    pub rul_trees: usize,
    pub neighbors: usize,
    pub trained_at: DateTime<Utc>,
}

impl ModelBundle {
    /// Generate a corpus with `seed` and fit every model on it.
    ///
    /// The three forests and the neighbor index are fit in parallel.
    pub fn train(config: &EngineConfig, seed: u64) -> EngineResult<Self> {
        let corpus = CorpusGenerator::from_config(&config.generator)
            .with_seed(seed)
            .generate()?;

        let raw: Vec<[f64; 4]> = corpus.iter().map(TrainingSample::features).collect();
        let scaler = ScalingParameters::fit(&raw)?;
        let scaled = scaler.transform_all(&raw);

        let fault_labels: Vec<FaultType> = corpus.iter().map(|s| s.fault_type).collect();
        let severity_labels: Vec<Severity> = corpus.iter().map(|s| s.severity).collect();
        let rul_targets: Vec<f64> = corpus.iter().map(|s| s.rul_hours).collect();

        let models = &config.models;
        let ((fault, severity), (rul, neighbors)) = rayon::join(
            || {
                rayon::join(
                    || ForestClassifier::fit(&scaled, &fault_labels, &models.fault_params(seed)),
                    || ForestClassifier::fit(&scaled, &severity_labels, &models.severity_params(seed)),
                )
            },
            || {
                rayon::join(
                    || ForestRegressor::fit(&scaled, &rul_targets, &models.rul_params(seed)),
                    || NeighborIndex::fit(scaled.clone()),
                )
            },
        );

        let bundle = Self {
            scaler,
            fault: fault?,
            severity: severity?,
            rul: rul?,
            neighbors,
            neighbor_count: config.retrieval.neighbors,
            corpus,
            seed,
            trained_at: Utc::now(),
        };

        info!(
            seed,
            samples = bundle.corpus.len(),
            fault_trees = bundle.fault.n_trees(),
            severity_trees = bundle.severity.n_trees(),
            rul_trees = bundle.rul.n_trees(),
            "Model bundle trained"
        );
        Ok(bundle)
    }

    /// Run every model on one reading and fuse the outputs.
    pub fn predict(&self, reading: &SensorReading) -> EngineResult<PredictionResult> {
        if let Some((field, value)) = reading.first_non_finite() {
            return Err(EngineError::InvalidInput { field, value });
        }

        let x = self.scaler.transform(&reading.to_features());

        let (predicted_fault_type, fault_probabilities) = self.fault.predict(&x)?;
        check_distribution("fault", &fault_probabilities)?;

        let (predicted_severity, severity_probabilities) = self.severity.predict(&x)?;
        check_distribution("severity", &severity_probabilities)?;

        let rul = self.rul.predict(&x);
        if !rul.is_finite() {
            return Err(EngineError::NumericInstability(format!(
                "RUL regressor returned {rul}"
            )));
        }

        let hits = self.neighbors.query(&x, self.neighbor_count);
        let recommendation = majority_recommendation(&hits, |i| self.corpus[i].recommendation.as_str())
            .ok_or_else(|| {
                EngineError::NumericInstability("no neighbors found for recommendation".to_string())
            })?
            .to_string();

        Ok(PredictionResult {
            predicted_fault_type,
            failure_risk: failure_risk(predicted_severity, &severity_probabilities),
            anomaly_detected: predicted_severity != Severity::Healthy,
            anomaly_probability: anomaly_probability(&severity_probabilities),
            fault_probabilities,
            predicted_severity,
            severity_probabilities,
            predicted_rul_hours: rul.max(0.0).round() as u32,
            recommendation,
        })
    }

    pub fn info(&self) -> BundleInfo {
        BundleInfo {
            seed: self.seed,
            sample_count: self.corpus.len(),
            fault_trees: self.fault.n_trees(),
            severity_trees: self.severity.n_trees(),
            rul_trees: self.rul.n_trees(),
            neighbors: self.neighbor_count,
            trained_at: self.trained_at,
        }
    }

    /// The generated corpus this bundle was fit on.
    pub fn corpus(&self) -> &[TrainingSample] {
        &self.corpus
    }

    pub fn scaler(&self) -> &ScalingParameters {
        &self.scaler
    }
}

fn check_distribution<L: crate::types::ClassLabel>(
    model: &str,
    dist: &ProbabilityDistribution<L>,
) -> EngineResult<()> {
    if dist.is_well_formed(PROBABILITY_TOLERANCE) {
        Ok(())
    } else {
        Err(EngineError::NumericInstability(format!(
            "{model} probabilities are not a valid distribution (total {})",
            dist.total()
        )))
    }
}

// ============================================================================
// Fusion rules
// ============================================================================

/// `round(50 * P(warning) + 100 * P(critical))` clamped to 0..=100, and 0
/// whenever the predicted severity is healthy.
pub fn failure_risk(predicted: Severity, probabilities: &ProbabilityDistribution<Severity>) -> u8 {
    if predicted == Severity::Healthy {
        return 0;
    }
    let risk = 50.0 * probabilities.get(Severity::Warning) + 100.0 * probabilities.get(Severity::Critical);
    risk.round().clamp(0.0, 100.0) as u8
}

/// `P(warning) + P(critical)` rounded to 3 decimals.
pub fn anomaly_probability(probabilities: &ProbabilityDistribution<Severity>) -> f64 {
    let p = probabilities.get(Severity::Warning) + probabilities.get(Severity::Critical);
    (p * 1000.0).round() / 1000.0
}
