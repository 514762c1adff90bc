//! Sensor readings, fault/severity labels and training samples.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of model input features.
pub const NUM_FEATURES: usize = 4;

/// Feature names in model input order.
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = ["temperature", "vibration", "pressure", "rpm"];

/// One raw reading from the four equipment sensors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    /// Temperature (°C)
    pub temperature: f64,
    /// Vibration velocity (mm/s)
    pub vibration: f64,
    /// Pressure (PSI)
    pub pressure: f64,
    /// Rotational speed (RPM)
    pub rpm: f64,
}

impl SensorReading {
    pub fn new(temperature: f64, vibration: f64, pressure: f64, rpm: f64) -> Self {
        Self {
            temperature,
            vibration,
            pressure,
            rpm,
        }
    }

    /// Feature vector in `FEATURE_NAMES` order.
    pub fn to_features(&self) -> [f64; NUM_FEATURES] {
        [self.temperature, self.vibration, self.pressure, self.rpm]
    }

    /// First field holding NaN or an infinity, if any.
    pub fn first_non_finite(&self) -> Option<(&'static str, f64)> {
        FEATURE_NAMES
            .iter()
            .zip(self.to_features())
            .find(|(_, v)| !v.is_finite())
            .map(|(name, v)| (*name, v))
    }
}

/// A categorical model target with a fixed, ordered set of classes.
///
/// `ALL` fixes the class order used for vote vectors, probability output
/// and argmax tie-breaking.
pub trait ClassLabel: Copy + Eq + fmt::Debug + Send + Sync + 'static {
    const ALL: &'static [Self];

    /// Position of this label in `ALL`.
    fn index(self) -> usize;

    /// Lowercase wire name.
    fn as_str(self) -> &'static str;
}

/// Dominant physical failure mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultType {
    Healthy,
    Overheating,
    Imbalance,
    Leakage,
    Overspeed,
    Mixed,
}

impl FaultType {
    /// The five fault modes a faulty sample can be assigned, in draw order.
    pub const FAULT_MODES: [FaultType; 5] = [
        FaultType::Overheating,
        FaultType::Imbalance,
        FaultType::Leakage,
        FaultType::Overspeed,
        FaultType::Mixed,
    ];

    /// Canonical maintenance action recorded against samples of this fault type.
    pub fn recommendation(self) -> &'static str {
        match self {
            FaultType::Healthy => "No action needed. Continue monitoring.",
            FaultType::Overheating => "Inspect cooling path, airflow, and thermal interface.",
            FaultType::Imbalance => "Check alignment/bearings and perform vibration balancing.",
            FaultType::Leakage => "Inspect seals/valves and verify pressure integrity.",
            FaultType::Overspeed => {
                "Verify controller limits and inspect drivetrain load conditions."
            }
            FaultType::Mixed => "Run full inspection: thermal + vibration + pressure subsystems.",
        }
    }

    /// Human-readable root cause: "Normal operation" when healthy, otherwise
    /// the title-cased name with underscores as spaces.
    pub fn root_cause(self) -> String {
        if self == FaultType::Healthy {
            return "Normal operation".to_string();
        }
        title_case(self.as_str())
    }
}

impl ClassLabel for FaultType {
    const ALL: &'static [Self] = &[
        FaultType::Healthy,
        FaultType::Overheating,
        FaultType::Imbalance,
        FaultType::Leakage,
        FaultType::Overspeed,
        FaultType::Mixed,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn as_str(self) -> &'static str {
        match self {
            FaultType::Healthy => "healthy",
            FaultType::Overheating => "overheating",
            FaultType::Imbalance => "imbalance",
            FaultType::Leakage => "leakage",
            FaultType::Overspeed => "overspeed",
            FaultType::Mixed => "mixed",
        }
    }
}

impl fmt::Display for FaultType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Three-level ordinal health label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Healthy,
    Warning,
    Critical,
}

impl Severity {
    /// Capitalized form used for `health_status` in service responses.
    pub fn display_name(self) -> &'static str {
        match self {
            Severity::Healthy => "Healthy",
            Severity::Warning => "Warning",
            Severity::Critical => "Critical",
        }
    }
}

impl ClassLabel for Severity {
    const ALL: &'static [Self] = &[Severity::Healthy, Severity::Warning, Severity::Critical];

    fn index(self) -> usize {
        self as usize
    }

    fn as_str(self) -> &'static str {
        match self {
            Severity::Healthy => "healthy",
            Severity::Warning => "warning",
            Severity::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One labeled sample of the synthetic training corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingSample {
    pub temperature: f64,
    pub vibration: f64,
    pub pressure: f64,
    pub rpm: f64,
    pub fault_type: FaultType,
    pub severity: Severity,
    pub rul_hours: f64,
    pub recommendation: String,
}

impl TrainingSample {
    pub fn features(&self) -> [f64; NUM_FEATURES] {
        [self.temperature, self.vibration, self.pressure, self.rpm]
    }
}

fn title_case(snake: &str) -> String {
    snake
        .split('_')
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_class_order_matches_index() {
        for (i, f) in FaultType::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
        }
        for (i, s) in Severity::ALL.iter().enumerate() {
            assert_eq!(s.index(), i);
        }
    }

    #[test]
    fn test_root_cause_mapping() {
        assert_eq!(FaultType::Healthy.root_cause(), "Normal operation");
        assert_eq!(FaultType::Overheating.root_cause(), "Overheating");
        assert_eq!(title_case("bearing_wear"), "Bearing Wear");
    }

    #[test]
    fn test_first_non_finite() {
        let ok = SensorReading::new(40.0, 1.0, 150.0, 2000.0);
        assert!(ok.first_non_finite().is_none());

        let bad = SensorReading::new(40.0, f64::NAN, 150.0, 2000.0);
        let (field, value) = bad.first_non_finite().unwrap();
        assert_eq!(field, "vibration");
        assert!(value.is_nan());
    }

    #[test]
    fn test_labels_serialize_lowercase() {
        assert_eq!(serde_json::to_string(&FaultType::Overspeed).unwrap(), "\"overspeed\"");
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"critical\"");
    }
}
