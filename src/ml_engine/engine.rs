//! Inference orchestrator.
//!
//! Owns the currently published [`ModelBundle`]. Readers load an
//! `Arc` snapshot without locking; a new bundle is swapped in only after a
//! training phase has fully succeeded.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

use arc_swap::ArcSwapOption;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::types::{PredictionResult, SensorReading};

use super::bundle::{BundleInfo, ModelBundle};
use super::error::{EngineError, EngineResult};

pub struct InferenceEngine {
    config: EngineConfig,
    bundle: ArcSwapOption<ModelBundle>,
    /// Serializes training phases, including the lazy first one.
    train_guard: Mutex<()>,
}

impl InferenceEngine {
    /// An untrained engine. Call [`train`](Self::train) or let the first
    /// [`predict`](Self::predict) train lazily.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            bundle: ArcSwapOption::empty(),
            train_guard: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Train with the configured seed and publish the result.
    pub fn train(&self) -> EngineResult<BundleInfo> {
        self.train_with_seed(self.config.generator.seed)
    }

    /// Train with an explicit seed and publish the result.
    ///
    /// On failure the previously published bundle (if any) stays in place.
    pub fn train_with_seed(&self, seed: u64) -> EngineResult<BundleInfo> {
        let _guard = self.train_guard.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.train_locked(seed)?.info())
    }

    fn train_locked(&self, seed: u64) -> EngineResult<Arc<ModelBundle>> {
        let started = Instant::now();
        info!(
            seed,
            samples = self.config.generator.sample_count,
            "Training phase started"
        );

        let bundle = match ModelBundle::train(&self.config, seed) {
            Ok(b) => Arc::new(b),
            Err(e) => {
                warn!(seed, error = %e, "Training phase failed, keeping previous models");
                return Err(e);
            }
        };

        self.bundle.store(Some(Arc::clone(&bundle)));
        info!(
            seed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model bundle published"
        );
        Ok(bundle)
    }

    /// The published bundle, or `Untrained`.
    pub fn current_bundle(&self) -> EngineResult<Arc<ModelBundle>> {
        self.bundle.load_full().ok_or(EngineError::Untrained)
    }

    /// The published bundle, training one first if none exists.
    ///
    /// Concurrent first callers wait on the guard; only one of them trains.
    pub fn ensure_trained(&self) -> EngineResult<Arc<ModelBundle>> {
        if let Some(bundle) = self.bundle.load_full() {
            return Ok(bundle);
        }

        let _guard = self.train_guard.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bundle) = self.bundle.load_full() {
            return Ok(bundle);
        }
        debug!("No model bundle published, training on first use");
        self.train_locked(self.config.generator.seed)
    }

    /// Evaluate one reading against the current bundle.
    pub fn predict(&self, reading: &SensorReading) -> EngineResult<PredictionResult> {
        if let Some((field, value)) = reading.first_non_finite() {
            return Err(EngineError::InvalidInput { field, value });
        }
        self.ensure_trained()?.predict(reading)
    }

    pub fn is_trained(&self) -> bool {
        self.bundle.load().is_some()
    }

    pub fn bundle_info(&self) -> Option<BundleInfo> {
        self.bundle.load_full().map(|b| b.info())
    }
}

impl std::fmt::Debug for InferenceEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceEngine")
            .field("trained", &self.is_trained())
            .field("bundle", &self.bundle_info())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.generator.sample_count = 800;
        config.models.fault_trees = 5;
        config.models.severity_trees = 5;
        config.models.rul_trees = 5;
        config
    }

    #[test]
    fn test_untrained_accessor() {
        let engine = InferenceEngine::new(tiny_config());
        assert!(!engine.is_trained());
        assert!(engine.bundle_info().is_none());
        assert!(matches!(engine.current_bundle(), Err(EngineError::Untrained)));
    }

    #[test]
    fn test_predict_trains_lazily_once() {
        let engine = InferenceEngine::new(tiny_config());
        let reading = SensorReading::new(50.0, 3.0, 125.0, 2050.0);
        engine.predict(&reading).unwrap();
        let first = engine.current_bundle().unwrap();
        engine.predict(&reading).unwrap();
        assert!(Arc::ptr_eq(&first, &engine.current_bundle().unwrap()));
    }

    #[test]
    fn test_concurrent_first_use_trains_once() {
        let engine = InferenceEngine::new(tiny_config());
        let bundles: Vec<Arc<ModelBundle>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8).map(|_| s.spawn(|| engine.ensure_trained())).collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap().unwrap())
                .collect()
        });

        let published = engine.current_bundle().unwrap();
        assert!(bundles.iter().all(|b| Arc::ptr_eq(b, &published)));
    }

    #[test]
    fn test_concurrent_predictions_share_one_bundle() {
        let engine = InferenceEngine::new(tiny_config());
        let reading = SensorReading::new(58.0, 3.4, 121.0, 2120.0);
        let results: Vec<PredictionResult> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..6).map(|_| s.spawn(|| engine.predict(&reading))).collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap().unwrap())
                .collect()
        });

        assert!(results.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(engine.bundle_info().unwrap().seed, 42);
    }

    #[test]
    fn test_invalid_input_does_not_train() {
        let engine = InferenceEngine::new(tiny_config());
        let err = engine
            .predict(&SensorReading::new(f64::INFINITY, 3.0, 125.0, 2050.0))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { field: "temperature", .. }));
        assert!(!engine.is_trained());
    }

    #[test]
    fn test_retrain_swaps_bundle() {
        let engine = InferenceEngine::new(tiny_config());
        assert_eq!(engine.train().unwrap().seed, 42);
        let first = engine.current_bundle().unwrap();
        let info = engine.train_with_seed(7).unwrap();
        assert_eq!(info.seed, 7);
        assert!(!Arc::ptr_eq(&first, &engine.current_bundle().unwrap()));
    }
}
