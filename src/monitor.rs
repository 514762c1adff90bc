//! Bounded in-memory monitoring state: prediction history and alerts.
//!
//! Both collections are rolling windows; once full, the oldest entry is
//! evicted. Nothing here survives a process restart.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::MonitorConfig;
use crate::types::{PredictionResult, SensorReading, Severity};

/// Service-facing view of one prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResponse {
    /// Capitalized severity: "Healthy", "Warning" or "Critical".
    pub health_status: String,
    pub failure_risk: u8,
    pub anomaly_detected: bool,
    pub anomaly_probability: f64,
    pub root_cause: String,
    pub recommendation: String,
    /// Hours.
    pub remaining_useful_life: u32,
    pub timestamp: DateTime<Utc>,
}

impl PredictionResponse {
    pub fn from_result(result: &PredictionResult, timestamp: DateTime<Utc>) -> Self {
        Self {
            health_status: result.predicted_severity.display_name().to_string(),
            failure_risk: result.failure_risk,
            anomaly_detected: result.anomaly_detected,
            anomaly_probability: result.anomaly_probability,
            root_cause: result.predicted_fault_type.root_cause(),
            recommendation: result.recommendation.clone(),
            remaining_useful_life: result.predicted_rul_hours,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub timestamp: DateTime<Utc>,
    pub sensor_data: SensorReading,
    pub prediction: PredictionResponse,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Alert {
    pub id: u64,
    /// "Warning" or "Critical".
    pub severity: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub sensor_data: SensorReading,
}

/// Rolling prediction history and alert list.
#[derive(Debug, Clone)]
pub struct MonitorState {
    history: VecDeque<HistoryEntry>,
    alerts: VecDeque<Alert>,
    history_capacity: usize,
    alert_capacity: usize,
    /// Alert ids are never reused, even after deletes or a reset.
    next_alert_id: u64,
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new(&MonitorConfig::default())
    }
}

impl MonitorState {
    pub fn new(config: &MonitorConfig) -> Self {
        let history_capacity = config.history_capacity.max(1);
        let alert_capacity = config.alert_capacity.max(1);
        Self {
            history: VecDeque::with_capacity(history_capacity),
            alerts: VecDeque::with_capacity(alert_capacity),
            history_capacity,
            alert_capacity,
            next_alert_id: 1,
        }
    }

    /// Record a prediction; raises an alert when severity is warning or
    /// critical. Returns the new alert, if any.
    pub fn record(
        &mut self,
        reading: SensorReading,
        severity: Severity,
        prediction: &PredictionResponse,
    ) -> Option<Alert> {
        if self.history.len() == self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(HistoryEntry {
            timestamp: prediction.timestamp,
            sensor_data: reading,
            prediction: prediction.clone(),
        });

        if severity == Severity::Healthy {
            return None;
        }

        let alert = Alert {
            id: self.next_alert_id,
            severity: severity.display_name().to_string(),
            message: format!(
                "{}: {} - {}",
                prediction.health_status, prediction.root_cause, prediction.recommendation
            ),
            timestamp: prediction.timestamp,
            sensor_data: reading,
        };
        self.next_alert_id += 1;

        if self.alerts.len() == self.alert_capacity {
            self.alerts.pop_front();
        }
        self.alerts.push_back(alert.clone());
        Some(alert)
    }

    /// The last `limit` history entries, oldest first. `0` returns everything.
    pub fn history(&self, limit: usize) -> Vec<HistoryEntry> {
        let skip = if limit == 0 {
            0
        } else {
            self.history.len().saturating_sub(limit)
        };
        self.history.iter().skip(skip).cloned().collect()
    }

    /// Alerts, optionally filtered by severity (case-insensitive).
    pub fn alerts(&self, severity: Option<&str>) -> Vec<Alert> {
        self.alerts
            .iter()
            .filter(|a| severity.map_or(true, |s| a.severity.eq_ignore_ascii_case(s)))
            .cloned()
            .collect()
    }

    /// Remove an alert by id. Returns false when no such alert exists.
    pub fn delete_alert(&mut self, id: u64) -> bool {
        let before = self.alerts.len();
        self.alerts.retain(|a| a.id != id);
        self.alerts.len() != before
    }

    pub fn reset(&mut self) {
        self.history.clear();
        self.alerts.clear();
    }

    pub fn history_count(&self) -> usize {
        self.history.len()
    }

    pub fn alerts_count(&self) -> usize {
        self.alerts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: &str) -> PredictionResponse {
        PredictionResponse {
            health_status: status.to_string(),
            failure_risk: 40,
            anomaly_detected: status != "Healthy",
            anomaly_probability: 0.6,
            root_cause: "Overheating".to_string(),
            recommendation: "Inspect cooling path, airflow, and thermal interface.".to_string(),
            remaining_useful_life: 120,
            timestamp: Utc::now(),
        }
    }

    fn reading() -> SensorReading {
        SensorReading::new(90.0, 5.0, 100.0, 2400.0)
    }

    fn small() -> MonitorState {
        MonitorState::new(&MonitorConfig {
            history_capacity: 3,
            alert_capacity: 2,
        })
    }

    #[test]
    fn test_history_is_capped() {
        let mut state = small();
        for _ in 0..5 {
            state.record(reading(), Severity::Healthy, &response("Healthy"));
        }
        assert_eq!(state.history_count(), 3);
        assert_eq!(state.alerts_count(), 0);
        assert_eq!(state.history(2).len(), 2);
        assert_eq!(state.history(0).len(), 3);
    }

    #[test]
    fn test_alerts_capped_with_increasing_ids() {
        let mut state = small();
        let first = state.record(reading(), Severity::Warning, &response("Warning")).unwrap();
        state.record(reading(), Severity::Critical, &response("Critical"));
        state.record(reading(), Severity::Critical, &response("Critical"));

        let ids: Vec<u64> = state.alerts(None).iter().map(|a| a.id).collect();
        assert_eq!(first.id, 1);
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(
            first.message,
            "Warning: Overheating - Inspect cooling path, airflow, and thermal interface."
        );
    }

    #[test]
    fn test_filter_delete_and_reset() {
        let mut state = small();
        state.record(reading(), Severity::Warning, &response("Warning"));
        state.record(reading(), Severity::Critical, &response("Critical"));

        assert_eq!(state.alerts(Some("critical")).len(), 1);
        assert_eq!(state.alerts(Some("WARNING")).len(), 1);
        assert!(state.alerts(Some("healthy")).is_empty());

        assert!(state.delete_alert(1));
        assert!(!state.delete_alert(1));
        assert_eq!(state.alerts_count(), 1);

        state.reset();
        assert_eq!(state.history_count(), 0);
        assert_eq!(state.alerts_count(), 0);
        let next = state.record(reading(), Severity::Warning, &response("Warning")).unwrap();
        assert_eq!(next.id, 3);
    }
}
