//! pdm-engine: predictive-maintenance inference
//!
//! Estimates equipment health from four sensor readings (temperature,
//! vibration, pressure, rotational speed).
//!
//! ## Architecture
//!
//! - **ML Engine**: synthetic corpus generation, feature scaling, random
//!   forest classifiers for fault type and severity, a random forest RUL
//!   regressor and a nearest-neighbor recommendation retriever, fused per
//!   reading by the [`InferenceEngine`]
//! - **Monitor**: rolling prediction history and alerts
//! - **API**: Axum HTTP service over the engine and monitor

pub mod api;
pub mod config;
pub mod ml_engine;
pub mod monitor;
pub mod types;

pub use config::EngineConfig;

pub use types::{
    FaultType, PredictionResult, ProbabilityDistribution, SensorReading, Severity, TrainingSample,
};

pub use ml_engine::{BundleInfo, EngineError, EngineResult, InferenceEngine, ModelBundle};

pub use monitor::{Alert, HistoryEntry, MonitorState, PredictionResponse};
