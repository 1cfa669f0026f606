//! Simulated sensor drift
//!
//! Each sensor oscillates around its catalog value on its own phase. Updates
//! are sent as partial upserts (value, plus status when it changes) so
//! clients exercise the field-by-field merge.

use campus_core::{SensorPatch, SensorRecord, SensorStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::state::AppState;

/// Radians advanced per tick
const PHASE_STEP: f64 = 0.15;

struct Baseline {
    id: String,
    sensor_type: String,
    value: f64,
    phase: f64,
    status: SensorStatus,
}

/// Deterministic drift generator
pub struct Simulator {
    baselines: Vec<Baseline>,
    drift: f64,
    tick: u64,
}

impl Simulator {
    pub fn new<'a>(records: impl IntoIterator<Item = &'a SensorRecord>, drift: f64) -> Self {
        let baselines = records
            .into_iter()
            .enumerate()
            .map(|(i, record)| Baseline {
                id: record.id.clone(),
                sensor_type: record.sensor_type.clone(),
                value: record.value,
                phase: i as f64 * 0.9,
                status: record.status,
            })
            .collect();
        Self { baselines, drift, tick: 0 }
    }

    pub fn sensor_count(&self) -> usize {
        self.baselines.len()
    }

    /// Advance one tick and produce the resulting updates
    pub fn step(&mut self) -> Vec<SensorPatch> {
        self.tick += 1;
        let t = self.tick as f64 * PHASE_STEP;
        let drift = self.drift;

        self.baselines
            .iter_mut()
            .map(|baseline| {
                let amplitude = (baseline.value.abs() * drift).max(0.2);
                let raw = baseline.value + amplitude * (t + baseline.phase).sin();
                let value = (raw * 10.0).round() / 10.0;

                let status = status_for(&baseline.sensor_type, value).filter(|s| *s != baseline.status);
                if let Some(status) = status {
                    baseline.status = status;
                }

                SensorPatch {
                    id: baseline.id.clone(),
                    value: Some(value),
                    status,
                    ..Default::default()
                }
            })
            .collect()
    }
}

/// Threshold status for the sensor types the campus uses.
/// `None` for types without thresholds.
pub fn status_for(sensor_type: &str, value: f64) -> Option<SensorStatus> {
    let status = match sensor_type {
        "temperature" => {
            if value >= 30.0 || value < 12.0 {
                SensorStatus::Critical
            } else if value >= 25.0 || value < 17.0 {
                SensorStatus::Warning
            } else {
                SensorStatus::Normal
            }
        }
        "co2" => {
            if value >= 1500.0 {
                SensorStatus::Critical
            } else if value >= 1000.0 {
                SensorStatus::Warning
            } else {
                SensorStatus::Normal
            }
        }
        "humidity" => {
            if !(20.0..=70.0).contains(&value) {
                SensorStatus::Critical
            } else if !(30.0..=60.0).contains(&value) {
                SensorStatus::Warning
            } else {
                SensorStatus::Normal
            }
        }
        _ => return None,
    };
    Some(status)
}

/// Drive the simulator against the shared table until the process exits
pub async fn run(state: Arc<AppState>, config: SimulationConfig) {
    let mut simulator = {
        let table = state.sensors.read().await;
        Simulator::new(table.iter(), config.drift)
    };
    info!(sensors = simulator.sensor_count(), tick_ms = config.tick_ms, "Starting sensor simulation");

    let mut interval = tokio::time::interval(Duration::from_millis(config.tick_ms.max(50)));
    loop {
        interval.tick().await;
        for patch in simulator.step() {
            let id = patch.id.clone();
            if let Err(e) = state.publish(patch).await {
                warn!(sensor = %id, error = %e, "Simulated update rejected");
            }
        }
        debug!(receivers = state.events.receiver_count(), "Simulation tick");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(id: &str, sensor_type: &str, value: f64) -> SensorRecord {
        SensorRecord {
            id: id.to_string(),
            sensor_type: sensor_type.to_string(),
            value,
            unit: String::new(),
            status: SensorStatus::Normal,
            position: None,
            building_id: None,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_step_is_deterministic() {
        let records = vec![record("a", "temperature", 21.0), record("b", "co2", 600.0)];
        let mut first = Simulator::new(&records, 0.08);
        let mut second = Simulator::new(&records, 0.08);
        for _ in 0..5 {
            assert_eq!(first.step(), second.step());
        }
    }

    #[test]
    fn test_drift_stays_within_amplitude() {
        let records = vec![record("a", "temperature", 20.0)];
        let mut sim = Simulator::new(&records, 0.1);
        for _ in 0..100 {
            let patch = sim.step().remove(0);
            let value = patch.value.unwrap();
            assert!((value - 20.0).abs() <= 2.05, "value {} drifted too far", value);
            assert!(patch.sensor_type.is_none());
            assert!(patch.unit.is_none());
        }
    }

    #[test]
    fn test_status_only_sent_on_change() {
        // Large drift pushes temperature across the warning threshold
        let records = vec![record("a", "temperature", 24.0)];
        let mut sim = Simulator::new(&records, 0.2);
        let statuses: Vec<Option<SensorStatus>> = (0..60).map(|_| sim.step().remove(0).status).collect();
        let changes: Vec<SensorStatus> = statuses.iter().flatten().copied().collect();
        assert!(!changes.is_empty());
        assert!(changes.windows(2).all(|w| w[0] != w[1]));
    }

    #[test]
    fn test_status_thresholds() {
        assert_eq!(status_for("temperature", 21.0), Some(SensorStatus::Normal));
        assert_eq!(status_for("temperature", 26.0), Some(SensorStatus::Warning));
        assert_eq!(status_for("temperature", 31.0), Some(SensorStatus::Critical));
        assert_eq!(status_for("co2", 1200.0), Some(SensorStatus::Warning));
        assert_eq!(status_for("humidity", 45.0), Some(SensorStatus::Normal));
        assert_eq!(status_for("humidity", 15.0), Some(SensorStatus::Critical));
        assert_eq!(status_for("occupancy", 12.0), None);
    }
}
