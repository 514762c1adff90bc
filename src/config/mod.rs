//! Engine Configuration Module
//!
//! Generator, model, retrieval, server and monitor settings loaded from TOML.
//!
//! ## Loading Order
//!
//! 1. `PDM_CONFIG` environment variable (path to TOML file)
//! 2. `pdm_config.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded config is owned by the [`InferenceEngine`](crate::ml_engine::InferenceEngine);
//! handlers read it through `InferenceEngine::config()`.

mod engine_config;
pub mod validation;

pub use engine_config::*;
