//! Engine Property Tests
//!
//! End-to-end properties of training and inference: determinism, label
//! noise bounds, well-formed probabilities, fusion rules and the reference
//! scenarios. A reduced corpus and forest size keep the suite fast; the
//! shared engine is trained once per test binary.

use std::sync::OnceLock;

use pdm_engine::config::EngineConfig;
use pdm_engine::ml_engine::{CorpusGenerator, ModelBundle, PROBABILITY_TOLERANCE};
use pdm_engine::types::ClassLabel;
use pdm_engine::{EngineError, FaultType, InferenceEngine, PredictionResult, SensorReading, Severity};

fn test_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.generator.sample_count = 6000;
    config.models.fault_trees = 40;
    config.models.severity_trees = 40;
    config.models.rul_trees = 40;
    config
}

fn engine() -> &'static InferenceEngine {
    static ENGINE: OnceLock<InferenceEngine> = OnceLock::new();
    ENGINE.get_or_init(|| {
        let engine = InferenceEngine::new(test_config());
        engine.train().expect("training on the test corpus should succeed");
        engine
    })
}

fn canonical_recommendations() -> Vec<&'static str> {
    FaultType::ALL.iter().map(|f| f.recommendation()).collect()
}

/// Invariants every prediction must satisfy, whatever the reading.
fn assert_invariants(result: &PredictionResult) {
    assert!(!result.fault_probabilities.is_empty());
    assert!(result.fault_probabilities.is_well_formed(PROBABILITY_TOLERANCE));
    assert!(result.severity_probabilities.is_well_formed(PROBABILITY_TOLERANCE));
    assert_eq!(
        result.fault_probabilities.most_probable(),
        Some(result.predicted_fault_type)
    );
    assert_eq!(
        result.severity_probabilities.most_probable(),
        Some(result.predicted_severity)
    );
    assert!(result.failure_risk <= 100);
    if result.predicted_severity == Severity::Healthy {
        assert_eq!(result.failure_risk, 0);
        assert!(!result.anomaly_detected);
    } else {
        assert!(result.anomaly_detected);
    }
    assert!((0.0..=1.0).contains(&result.anomaly_probability));
    assert!(result.predicted_rul_hours <= 1000);
    assert!(canonical_recommendations().contains(&result.recommendation.as_str()));
}

fn probe_readings() -> Vec<SensorReading> {
    vec![
        SensorReading::new(40.0, 1.0, 150.0, 2000.0),
        SensorReading::new(92.0, 6.5, 85.0, 3100.0),
        SensorReading::new(55.0, 3.2, 120.0, 2150.0),
        SensorReading::new(75.0, 4.0, 110.0, 2300.0),
        SensorReading::new(0.0, 0.0, 0.0, 0.0),
        SensorReading::new(200.0, 20.0, 500.0, 5000.0),
    ]
}

// ============================================================================
// Corpus properties
// ============================================================================

#[test]
fn corpus_is_deterministic_for_a_seed() {
    let a = CorpusGenerator::new(2000, 1000.0, 42).generate().unwrap();
    let b = CorpusGenerator::new(2000, 1000.0, 42).generate().unwrap();
    assert_eq!(a, b);

    let c = CorpusGenerator::new(2000, 1000.0, 43).generate().unwrap();
    assert_ne!(a, c);
}

#[test]
fn corpus_rul_within_life_and_healthy_labels_consistent() {
    let corpus = CorpusGenerator::new(30_000, 1000.0, 42).generate().unwrap();
    assert!(corpus.iter().all(|s| (0.0..=1000.0).contains(&s.rul_hours)));

    let healthy: Vec<_> = corpus
        .iter()
        .filter(|s| s.fault_type == FaultType::Healthy)
        .collect();
    let consistent = healthy
        .iter()
        .filter(|s| s.severity == Severity::Healthy)
        .count();
    let ratio = consistent as f64 / healthy.len() as f64;
    assert!(ratio >= 0.95, "healthy label consistency {ratio}");
}

// ============================================================================
// Inference properties
// ============================================================================

#[test]
fn predictions_satisfy_invariants() {
    for reading in probe_readings() {
        let result = engine().predict(&reading).unwrap();
        assert_invariants(&result);
    }
}

#[test]
fn extreme_readings_yield_non_negative_rul() {
    let result = engine()
        .predict(&SensorReading::new(200.0, 20.0, 500.0, 5000.0))
        .unwrap();
    assert_invariants(&result);

    let result = engine().predict(&SensorReading::new(0.0, 0.0, 0.0, 0.0)).unwrap();
    assert_invariants(&result);
}

#[test]
fn repeated_predictions_are_identical() {
    let reading = SensorReading::new(68.0, 3.9, 112.0, 2240.0);
    let first = engine().predict(&reading).unwrap();
    let second = engine().predict(&reading).unwrap();
    assert_eq!(first, second);
}

#[test]
fn same_seed_bundles_predict_identically() {
    let mut config = test_config();
    config.generator.sample_count = 2000;
    config.models.fault_trees = 10;
    config.models.severity_trees = 10;
    config.models.rul_trees = 10;

    let a = ModelBundle::train(&config, 42).unwrap();
    let b = ModelBundle::train(&config, 42).unwrap();
    assert_eq!(a.corpus(), b.corpus());
    assert_eq!(a.scaler(), b.scaler());
    for reading in probe_readings() {
        assert_eq!(a.predict(&reading).unwrap(), b.predict(&reading).unwrap());
    }
}

#[test]
fn non_finite_reading_is_rejected() {
    let err = engine()
        .predict(&SensorReading::new(60.0, 3.0, f64::NAN, 2100.0))
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidInput { field: "pressure", .. }));
}

// ============================================================================
// Reference scenarios
// ============================================================================

#[test]
fn scenario_low_stress_reading_is_healthy() {
    let result = engine()
        .predict(&SensorReading::new(40.0, 1.0, 150.0, 2000.0))
        .unwrap();
    assert_eq!(result.predicted_severity, Severity::Healthy);
    assert_eq!(result.failure_risk, 0);
    assert!(!result.anomaly_detected);
}

#[test]
fn scenario_multi_channel_stress_is_flagged() {
    let result = engine()
        .predict(&SensorReading::new(92.0, 6.5, 85.0, 3100.0))
        .unwrap();
    assert!(
        matches!(result.predicted_severity, Severity::Warning | Severity::Critical),
        "got {:?} with {:?}",
        result.predicted_severity,
        result.severity_probabilities
    );
    assert!(result.failure_risk > 0);
    assert!(result.anomaly_detected);
    assert!(canonical_recommendations().contains(&result.recommendation.as_str()));
}

#[test]
fn scenario_retraining_with_new_seed_keeps_invariants() {
    let engine = InferenceEngine::new(test_config());
    let info = engine.train_with_seed(7).unwrap();
    assert_eq!(info.seed, 7);
    assert_eq!(info.sample_count, 6000);

    for reading in probe_readings() {
        assert_invariants(&engine.predict(&reading).unwrap());
    }
}

// ============================================================================
// Training failures
// ============================================================================

#[test]
fn failed_training_publishes_nothing() {
    let mut config = test_config();
    config.generator.sample_count = 0;
    let engine = InferenceEngine::new(config);

    assert!(matches!(engine.train(), Err(EngineError::TrainingData(_))));
    assert!(!engine.is_trained());
    assert!(matches!(engine.current_bundle(), Err(EngineError::Untrained)));
    assert!(matches!(
        engine.predict(&SensorReading::new(50.0, 3.0, 120.0, 2100.0)),
        Err(EngineError::TrainingData(_))
    ));
}
