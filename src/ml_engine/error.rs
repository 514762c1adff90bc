//! Engine error taxonomy.

use thiserror::Error;

/// Errors raised by training or inference.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// Corpus generation or fitting received degenerate input. The training
    /// phase is aborted and no model bundle is published.
    #[error("Training data error: {0}")]
    TrainingData(String),

    /// No model bundle has been published yet.
    #[error("Engine has not completed a training phase")]
    Untrained,

    /// The reading cannot be evaluated (NaN or infinite field).
    #[error("Invalid sensor reading: {field} = {value}")]
    InvalidInput { field: &'static str, value: f64 },

    /// A model produced NaN/Infinity or a distribution that does not sum to 1.
    #[error("Numeric instability: {0}")]
    NumericInstability(String),
}

pub type EngineResult<T> = Result<T, EngineError>;
