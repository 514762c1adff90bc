//! Shared data structures for the predictive-maintenance engine
//!
//! - `sensor`: raw readings, fault/severity labels, training samples
//! - `prediction`: probability distributions and the fused prediction result

mod prediction;
mod sensor;

pub use prediction::*;
pub use sensor::*;
