//! Synthetic training corpus generator.
//!
//! Simulates latent aging and stress processes per sample and derives both
//! the observed sensor readings and the ground-truth labels from them:
//!
//! ```text
//! age ~ U(0, L)   load ~ U(0.3, 1.2)   ambient ~ U(15, 45)   stress ~ U(0, 1)
//! intensity_k = Beta(2, 5) * stress            (overheat, imbalance, leakage, overspeed)
//! p_fault     = sigmoid(3 * age/L + 2 * stress - 2.2)
//! damage      = 0.6 * age/L + 0.4 * stress     (-> severity)
//! ```
//!
//! Fault perturbations are additive and noisy, so classes overlap in
//! feature space and no single threshold separates them. The latent
//! variables never leave this module; models only see the four readings.

use rand::distributions::{Distribution, Uniform, WeightedIndex};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Normal};
use tracing::debug;

use crate::config::GeneratorConfig;
use crate::types::{FaultType, Severity, TrainingSample, NUM_FEATURES};

use super::error::{EngineError, EngineResult};

/// Damage above which a sample is labeled critical.
pub const CRITICAL_DAMAGE: f64 = 0.72;
/// Damage above which a sample is labeled warning.
pub const WARNING_DAMAGE: f64 = 0.45;
/// Probability that a healthy-fault sample keeps a healthy severity label.
/// The remainder is label noise that blocks a trivial fault -> severity rule.
pub const HEALTHY_SEVERITY_RETENTION: f64 = 0.96;

/// Gaussian sensor noise (std) per feature.
const SENSOR_NOISE_STD: [f64; NUM_FEATURES] = [3.0, 0.5, 6.0, 120.0];

/// Latent fault-driver intensities, each already scaled by stress.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FaultIntensities {
    pub overheat: f64,
    pub imbalance: f64,
    pub leakage: f64,
    pub overspeed: f64,
}

/// Latent state of one simulated machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatentState {
    /// Age as a fraction of max life, in [0, 1].
    pub age_fraction: f64,
    pub load: f64,
    pub ambient: f64,
    pub stress: f64,
    pub intensities: FaultIntensities,
}

/// Deterministic corpus generator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorpusGenerator {
    pub sample_count: usize,
    pub max_life_hours: f64,
    pub seed: u64,
}

impl CorpusGenerator {
    pub fn new(sample_count: usize, max_life_hours: f64, seed: u64) -> Self {
        Self {
            sample_count,
            max_life_hours,
            seed,
        }
    }

    pub fn from_config(config: &GeneratorConfig) -> Self {
        Self::new(config.sample_count, config.max_life_hours, config.seed)
    }

    /// Same settings with a different seed.
    pub fn with_seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    /// Generate the labeled corpus. Identical settings always yield an
    /// identical corpus.
    pub fn generate(&self) -> EngineResult<Vec<TrainingSample>> {
        if self.sample_count == 0 {
            return Err(EngineError::TrainingData(
                "sample_count must be at least 1".to_string(),
            ));
        }
        if !self.max_life_hours.is_finite() || self.max_life_hours <= 0.0 {
            return Err(EngineError::TrainingData(format!(
                "max_life_hours must be a positive finite number, got {}",
                self.max_life_hours
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let samplers = Samplers::new(self.max_life_hours)?;

        let mut samples = Vec::with_capacity(self.sample_count);
        for _ in 0..self.sample_count {
            samples.push(self.generate_one(&mut rng, &samplers)?);
        }

        debug!(
            samples = samples.len(),
            seed = self.seed,
            faulty = samples.iter().filter(|s| s.fault_type != FaultType::Healthy).count(),
            "Synthetic corpus generated"
        );
        Ok(samples)
    }

    fn generate_one(&self, rng: &mut StdRng, s: &Samplers) -> EngineResult<TrainingSample> {
        let age = s.age.sample(rng);
        let rul_hours = (self.max_life_hours - age).clamp(0.0, self.max_life_hours);
        let load = s.load.sample(rng);
        let ambient = s.ambient.sample(rng);
        let stress = s.unit.sample(rng);

        let intensities = FaultIntensities {
            overheat: s.driver.sample(rng) * stress,
            imbalance: s.driver.sample(rng) * stress,
            leakage: s.driver.sample(rng) * stress,
            overspeed: s.driver.sample(rng) * stress,
        };

        let latent = LatentState {
            age_fraction: age / self.max_life_hours,
            load,
            ambient,
            stress,
            intensities,
        };

        let is_faulty = s.unit.sample(rng) < fault_probability(latent.age_fraction, stress);
        let fault_type = if is_faulty {
            draw_fault_mode(rng, &fault_mode_weights(&intensities, stress))?
        } else {
            FaultType::Healthy
        };

        let mut severity = severity_from_damage(damage(latent.age_fraction, stress));
        if fault_type == FaultType::Healthy && s.unit.sample(rng) < HEALTHY_SEVERITY_RETENTION {
            severity = Severity::Healthy;
        }

        let mut noise = [0.0; NUM_FEATURES];
        for (n, dist) in noise.iter_mut().zip(&s.noise) {
            *n = dist.sample(rng);
        }
        let [temperature, vibration, pressure, rpm] = synthesize_readings(&latent, fault_type, noise);

        Ok(TrainingSample {
            temperature,
            vibration,
            pressure,
            rpm,
            fault_type,
            severity,
            rul_hours,
            recommendation: fault_type.recommendation().to_string(),
        })
    }
}

/// Distributions shared by every sample draw.
struct Samplers {
    age: Uniform<f64>,
    load: Uniform<f64>,
    ambient: Uniform<f64>,
    unit: Uniform<f64>,
    driver: Beta<f64>,
    noise: [Normal<f64>; NUM_FEATURES],
}

impl Samplers {
    fn new(max_life_hours: f64) -> EngineResult<Self> {
        let normal = |std: f64| {
            Normal::new(0.0, std)
                .map_err(|e| EngineError::TrainingData(format!("noise distribution: {e}")))
        };
        Ok(Self {
            age: Uniform::new(0.0, max_life_hours),
            load: Uniform::new(0.3, 1.2),
            ambient: Uniform::new(15.0, 45.0),
            unit: Uniform::new(0.0, 1.0),
            driver: Beta::new(2.0, 5.0)
                .map_err(|e| EngineError::TrainingData(format!("driver distribution: {e}")))?,
            noise: [
                normal(SENSOR_NOISE_STD[0])?,
                normal(SENSOR_NOISE_STD[1])?,
                normal(SENSOR_NOISE_STD[2])?,
                normal(SENSOR_NOISE_STD[3])?,
            ],
        })
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Probability that a machine with this age fraction and stress is faulty.
pub fn fault_probability(age_fraction: f64, stress: f64) -> f64 {
    sigmoid(3.0 * age_fraction + 2.0 * stress - 2.2)
}

/// Latent damage score driving the severity label.
pub fn damage(age_fraction: f64, stress: f64) -> f64 {
    0.6 * age_fraction + 0.4 * stress
}

pub fn severity_from_damage(damage: f64) -> Severity {
    if damage > CRITICAL_DAMAGE {
        Severity::Critical
    } else if damage > WARNING_DAMAGE {
        Severity::Warning
    } else {
        Severity::Healthy
    }
}

/// Normalized categorical weights over `FaultType::FAULT_MODES`.
///
/// Each intensity raises the weight of its own mode; stress alone raises
/// the weight of `Mixed`.
pub fn fault_mode_weights(intensities: &FaultIntensities, stress: f64) -> [f64; 5] {
    let raw = [
        0.28 + 0.30 * intensities.overheat,
        0.28 + 0.30 * intensities.imbalance,
        0.22 + 0.25 * intensities.leakage,
        0.12 + 0.20 * intensities.overspeed,
        0.10 + 0.20 * stress,
    ];
    let total: f64 = raw.iter().sum();
    raw.map(|w| w / total)
}

/// One weighted categorical draw over the five fault modes.
pub fn draw_fault_mode<R: Rng + ?Sized>(rng: &mut R, weights: &[f64; 5]) -> EngineResult<FaultType> {
    let index = WeightedIndex::new(weights)
        .map_err(|e| EngineError::TrainingData(format!("fault mode weights {weights:?}: {e}")))?;
    Ok(FaultType::FAULT_MODES[index.sample(rng)])
}

/// Observed readings for a latent state. Baselines are linear in load,
/// ambient and age; faults add overlapping perturbations on top.
pub fn synthesize_readings(
    latent: &LatentState,
    fault_type: FaultType,
    noise: [f64; NUM_FEATURES],
) -> [f64; NUM_FEATURES] {
    let a = latent.age_fraction;
    let i = &latent.intensities;

    let mut temperature =
        40.0 + 12.0 * latent.load + 0.5 * (latent.ambient - 25.0) + 8.0 * a + noise[0];
    let mut vibration = 1.8 + 1.5 * latent.load + 1.8 * a + noise[1];
    let mut pressure = 140.0 - 20.0 * latent.load - 15.0 * a + noise[2];
    let mut rpm = 2100.0 + 250.0 * (latent.load - 0.7) + noise[3];

    match fault_type {
        FaultType::Healthy => {}
        FaultType::Overheating => temperature += 18.0 * i.overheat + 10.0 * a,
        FaultType::Imbalance => vibration += 2.5 * i.imbalance + 1.2 * a,
        FaultType::Leakage => pressure -= 25.0 * i.leakage + 10.0 * a,
        FaultType::Overspeed => rpm += 350.0 * i.overspeed,
        FaultType::Mixed => {
            temperature += 12.0 * i.overheat;
            vibration += 1.8 * i.imbalance;
            pressure -= 18.0 * i.leakage;
            rpm += 220.0 * i.overspeed;
        }
    }

    [temperature, vibration, pressure, rpm]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> CorpusGenerator {
        CorpusGenerator::new(4000, 1000.0, 42)
    }

    #[test]
    fn test_same_seed_same_corpus() {
        let a = small().generate().unwrap();
        let b = small().generate().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_seed_changes_corpus() {
        let a = small().generate().unwrap();
        let b = small().with_seed(7).generate().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rul_within_life() {
        let corpus = small().generate().unwrap();
        assert_eq!(corpus.len(), 4000);
        for s in &corpus {
            assert!((0.0..=1000.0).contains(&s.rul_hours), "rul {} out of range", s.rul_hours);
            assert!(s.features().iter().all(|v| v.is_finite()));
        }
    }

    #[test]
    fn test_healthy_fault_label_noise_is_bounded() {
        let corpus = small().generate().unwrap();
        let healthy: Vec<_> = corpus
            .iter()
            .filter(|s| s.fault_type == FaultType::Healthy)
            .collect();
        assert!(!healthy.is_empty());
        let consistent = healthy
            .iter()
            .filter(|s| s.severity == Severity::Healthy)
            .count();
        let ratio = consistent as f64 / healthy.len() as f64;
        assert!(ratio >= 0.95, "healthy/healthy ratio {ratio}");
        assert!(ratio < 1.0, "label noise should be retained");
    }

    #[test]
    fn test_every_fault_mode_appears() {
        let corpus = small().generate().unwrap();
        for mode in FaultType::FAULT_MODES {
            assert!(
                corpus.iter().any(|s| s.fault_type == mode),
                "{mode} never generated"
            );
        }
    }

    #[test]
    fn test_recommendation_is_canonical() {
        let corpus = small().generate().unwrap();
        for s in &corpus {
            assert_eq!(s.recommendation, s.fault_type.recommendation());
        }
    }

    #[test]
    fn test_severity_thresholds() {
        assert_eq!(severity_from_damage(0.45), Severity::Healthy);
        assert_eq!(severity_from_damage(0.46), Severity::Warning);
        assert_eq!(severity_from_damage(0.72), Severity::Warning);
        assert_eq!(severity_from_damage(0.73), Severity::Critical);
    }

    #[test]
    fn test_fault_probability_rises_with_age_and_stress() {
        assert!(fault_probability(0.9, 0.5) > fault_probability(0.1, 0.5));
        assert!(fault_probability(0.5, 0.9) > fault_probability(0.5, 0.1));
        assert!((fault_probability(0.0, 1.1) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mode_weights_normalized_and_responsive() {
        let calm = fault_mode_weights(&FaultIntensities::default(), 0.0);
        assert!((calm.iter().sum::<f64>() - 1.0).abs() < 1e-12);

        let hot = fault_mode_weights(
            &FaultIntensities {
                overheat: 0.8,
                ..Default::default()
            },
            0.0,
        );
        assert!(hot[0] > calm[0]);

        let stressed = fault_mode_weights(&FaultIntensities::default(), 1.0);
        assert!(stressed[4] > calm[4]);
    }

    #[test]
    fn test_weighted_draw_follows_weights() {
        let mut rng = StdRng::seed_from_u64(3);
        let weights = [0.0, 0.0, 0.75, 0.0, 0.25];
        let n = 20_000;
        let mut leakage = 0usize;
        for _ in 0..n {
            match draw_fault_mode(&mut rng, &weights).unwrap() {
                FaultType::Leakage => leakage += 1,
                FaultType::Mixed => {}
                other => panic!("zero-weight mode drawn: {other}"),
            }
        }
        let share = leakage as f64 / n as f64;
        assert!((share - 0.75).abs() < 0.02, "leakage share {share}");
    }

    #[test]
    fn test_fault_perturbation_direction() {
        let latent = LatentState {
            age_fraction: 0.5,
            load: 0.7,
            ambient: 25.0,
            stress: 1.0,
            intensities: FaultIntensities {
                overheat: 0.5,
                imbalance: 0.5,
                leakage: 0.5,
                overspeed: 0.5,
            },
        };
        let zero = [0.0; NUM_FEATURES];
        let base = synthesize_readings(&latent, FaultType::Healthy, zero);
        assert!(synthesize_readings(&latent, FaultType::Overheating, zero)[0] > base[0]);
        assert!(synthesize_readings(&latent, FaultType::Imbalance, zero)[1] > base[1]);
        assert!(synthesize_readings(&latent, FaultType::Leakage, zero)[2] < base[2]);
        assert!(synthesize_readings(&latent, FaultType::Overspeed, zero)[3] > base[3]);

        let mixed = synthesize_readings(&latent, FaultType::Mixed, zero);
        assert!(mixed[0] > base[0] && mixed[1] > base[1] && mixed[2] < base[2] && mixed[3] > base[3]);
    }

    #[test]
    fn test_rejects_degenerate_settings() {
        assert!(matches!(
            CorpusGenerator::new(0, 1000.0, 1).generate(),
            Err(EngineError::TrainingData(_))
        ));
        assert!(matches!(
            CorpusGenerator::new(10, 0.0, 1).generate(),
            Err(EngineError::TrainingData(_))
        ));
        assert!(matches!(
            CorpusGenerator::new(10, f64::NAN, 1).generate(),
            Err(EngineError::TrainingData(_))
        ));
    }
}
