//! Predictive-maintenance ML engine
//!
//! Trains three supervised models on a synthetic corpus and fuses their
//! outputs for each sensor reading.
//!
//! ## Architecture
//! - `generator`: synthetic labeled corpus (latent age/stress simulation)
//! - `scaler`: per-feature standardization shared by every model
//! - `tree`: weighted CART trees (Gini and squared error)
//! - `forest`: bagged ensembles; fault/severity classifiers and RUL regressor
//! - `retriever`: nearest-neighbor majority recommendation
//! - `bundle`: one training phase's models plus the fusion rules
//! - `engine`: publishes bundles atomically and serves predictions

pub mod bundle;
pub mod engine;
pub mod error;
pub mod forest;
pub mod generator;
pub mod retriever;
pub mod scaler;
pub mod tree;

pub use bundle::{BundleInfo, ModelBundle, PROBABILITY_TOLERANCE};
pub use engine::InferenceEngine;
pub use error::{EngineError, EngineResult};
pub use forest::{ForestClassifier, ForestParams, ForestRegressor};
pub use generator::CorpusGenerator;
pub use retriever::{Neighbor, NeighborIndex};
pub use scaler::ScalingParameters;
pub use tree::{DecisionTree, TreeParams};
