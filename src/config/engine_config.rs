//! Engine Configuration - generator, model and serving settings as TOML values
//!
//! Every struct implements `Default` with the production values, so a
//! missing file or a missing section behaves exactly like the built-in setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

use crate::ml_engine::{ForestParams, TreeParams};

/// Env var naming a TOML config file.
pub const CONFIG_ENV_VAR: &str = "PDM_CONFIG";
/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "pdm_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for an engine deployment.
///
/// Load with `EngineConfig::load()` which searches:
/// 1. `$PDM_CONFIG` env var
/// 2. `./pdm_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Synthetic corpus settings
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// Forest sizes and tree growth limits
    #[serde(default)]
    pub models: ModelConfig,

    /// Nearest-neighbor recommendation lookup
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Prediction history and alert retention
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl EngineConfig {
    /// Load configuration using the standard search order:
    /// 1. `$PDM_CONFIG` environment variable
    /// 2. `./pdm_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {CONFIG_ENV_VAR}, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No {LOCAL_CONFIG_FILE} found, using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    ///
    /// Unknown keys are logged as warnings; out-of-range values fail.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(PathBuf::from("<inline>"), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))
    }

    /// Check every range constraint, collecting all violations.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let g = &self.generator;
        if g.sample_count == 0 {
            errors.push("generator.sample_count must be > 0".to_string());
        }
        if !g.max_life_hours.is_finite() || g.max_life_hours <= 0.0 {
            errors.push(format!(
                "generator.max_life_hours ({}) must be a positive finite number",
                g.max_life_hours
            ));
        }

        let m = &self.models;
        for (name, trees) in [
            ("models.fault_trees", m.fault_trees),
            ("models.severity_trees", m.severity_trees),
            ("models.rul_trees", m.rul_trees),
        ] {
            if trees == 0 {
                errors.push(format!("{name} must be > 0"));
            }
        }
        if m.max_depth == Some(0) {
            errors.push("models.max_depth must be > 0 when set".to_string());
        }
        if m.min_samples_leaf == 0 {
            errors.push("models.min_samples_leaf must be > 0".to_string());
        }
        Self::check_feature_count(m.classifier_max_features, "models.classifier_max_features", &mut errors);
        Self::check_feature_count(m.regressor_max_features, "models.regressor_max_features", &mut errors);

        if self.retrieval.neighbors == 0 {
            errors.push("retrieval.neighbors must be > 0".to_string());
        }

        if self.server.addr.parse::<std::net::SocketAddr>().is_err() {
            errors.push(format!("server.addr '{}' is not a valid socket address", self.server.addr));
        }

        if self.monitor.history_capacity == 0 {
            errors.push("monitor.history_capacity must be > 0".to_string());
        }
        if self.monitor.alert_capacity == 0 {
            errors.push("monitor.alert_capacity must be > 0".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }

    fn check_feature_count(value: usize, name: &str, errors: &mut Vec<String>) {
        let max = crate::types::NUM_FEATURES;
        if value == 0 || value > max {
            errors.push(format!("{name} ({value}) must be in 1..={max}"));
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {1}", .0.display())]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error ({}): {1}", .0.display())]
    Parse(PathBuf, #[source] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Generator
// ============================================================================

/// Synthetic training corpus settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default = "default_sample_count")]
    pub sample_count: usize,

    /// Simulated equipment life; RUL targets fall in `[0, max_life_hours]`.
    #[serde(default = "default_max_life_hours")]
    pub max_life_hours: f64,

    /// Seed for corpus generation and every model fit.
    #[serde(default = "default_seed")]
    pub seed: u64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            sample_count: default_sample_count(),
            max_life_hours: default_max_life_hours(),
            seed: default_seed(),
        }
    }
}

fn default_sample_count() -> usize { 30_000 }
fn default_max_life_hours() -> f64 { 1000.0 }
fn default_seed() -> u64 { 42 }

// ============================================================================
// Models
// ============================================================================

/// Random forest sizes and tree growth limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_classifier_trees")]
    pub fault_trees: usize,

    #[serde(default = "default_classifier_trees")]
    pub severity_trees: usize,

    #[serde(default = "default_rul_trees")]
    pub rul_trees: usize,

    /// Unset grows trees until leaves are pure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,

    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,

    /// Candidate features per split for the two classifiers (sqrt of 4, rounded up).
    #[serde(default = "default_classifier_max_features")]
    pub classifier_max_features: usize,

    #[serde(default = "default_regressor_max_features")]
    pub regressor_max_features: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            fault_trees: default_classifier_trees(),
            severity_trees: default_classifier_trees(),
            rul_trees: default_rul_trees(),
            max_depth: None,
            min_samples_leaf: default_min_samples_leaf(),
            classifier_max_features: default_classifier_max_features(),
            regressor_max_features: default_regressor_max_features(),
        }
    }
}

impl ModelConfig {
    fn tree_params(&self, max_features: usize) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            max_features,
            ..TreeParams::default()
        }
    }

    pub fn fault_params(&self, seed: u64) -> ForestParams {
        ForestParams {
            n_trees: self.fault_trees,
            tree: self.tree_params(self.classifier_max_features),
            seed,
        }
    }

    pub fn severity_params(&self, seed: u64) -> ForestParams {
        ForestParams {
            n_trees: self.severity_trees,
            tree: self.tree_params(self.classifier_max_features),
            seed,
        }
    }

    pub fn rul_params(&self, seed: u64) -> ForestParams {
        ForestParams {
            n_trees: self.rul_trees,
            tree: self.tree_params(self.regressor_max_features),
            seed,
        }
    }
}

fn default_classifier_trees() -> usize { 300 }
fn default_rul_trees() -> usize { 400 }
fn default_min_samples_leaf() -> usize { 1 }
fn default_classifier_max_features() -> usize { 2 }
fn default_regressor_max_features() -> usize { 4 }

// ============================================================================
// Retrieval / Server / Monitor
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Neighbors consulted for the majority recommendation.
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            neighbors: default_neighbors(),
        }
    }
}

fn default_neighbors() -> usize { 7 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address; overridden by `PDM_SERVER_ADDR` and `--addr`.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

fn default_server_addr() -> String { "0.0.0.0:8000".to_string() }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorConfig {
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    #[serde(default = "default_alert_capacity")]
    pub alert_capacity: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            history_capacity: default_history_capacity(),
            alert_capacity: default_alert_capacity(),
        }
    }
}

fn default_history_capacity() -> usize { 1000 }
fn default_alert_capacity() -> usize { 50 }
