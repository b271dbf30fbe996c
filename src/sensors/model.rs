// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Sensor records and common types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operational state of a simulated sensor.
///
/// States cycle `Startup -> Running -> ShuttingDown -> Down -> Startup`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationalState {
    Startup,
    Running,
    ShuttingDown,
    Down,
}

impl OperationalState {
    /// State entered once the dwell counter runs out
    pub fn next(self) -> Self {
        match self {
            Self::Startup => Self::Running,
            Self::Running => Self::ShuttingDown,
            Self::ShuttingDown => Self::Down,
            Self::Down => Self::Startup,
        }
    }

    /// Status text written to the time-series store
    pub fn status(self) -> &'static str {
        match self {
            Self::Startup => "starting",
            Self::Running => "running",
            Self::ShuttingDown => "shutting_down",
            Self::Down => "down",
        }
    }
}

/// Inclusive tick range a sensor dwells in one state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DwellRange {
    pub min: u32,
    pub max: u32,
}

impl DwellRange {
    pub const fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    /// Range with `min >= 1` and `max >= min`
    pub fn clamped(self) -> Self {
        let min = self.min.max(1);
        Self { min, max: self.max.max(min) }
    }
}

pub const DEFAULT_STARTUP_DWELL: DwellRange = DwellRange::new(3, 6);
pub const DEFAULT_RUNNING_DWELL: DwellRange = DwellRange::new(6, 24);
pub const DEFAULT_SHUTDOWN_DWELL: DwellRange = DwellRange::new(3, 6);
pub const DEFAULT_DOWN_DWELL: DwellRange = DwellRange::new(6, 14);

/// Per-state dwell configuration; missing states keep their defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DwellProfile {
    pub startup: DwellRange,
    pub running: DwellRange,
    pub shutting_down: DwellRange,
    pub down: DwellRange,
}

impl DwellProfile {
    pub fn range(&self, state: OperationalState) -> DwellRange {
        match state {
            OperationalState::Startup => self.startup,
            OperationalState::Running => self.running,
            OperationalState::ShuttingDown => self.shutting_down,
            OperationalState::Down => self.down,
        }
    }
}

impl Default for DwellProfile {
    fn default() -> Self {
        Self {
            startup: DEFAULT_STARTUP_DWELL,
            running: DEFAULT_RUNNING_DWELL,
            shutting_down: DEFAULT_SHUTDOWN_DWELL,
            down: DEFAULT_DOWN_DWELL,
        }
    }
}

/// A simulated sensor.
///
/// Plain mutable record; the fleet advances it under its lock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sensor {
    pub machine_name: String,
    pub sensor_name: String,
    /// Never negative
    pub current_value: f64,
    pub baseline: f64,
    pub drift: f64,
    pub state: OperationalState,
    pub ticks_remaining: u32,
    pub dwell: DwellProfile,
    /// Value approached while down
    pub down_target: f64,
}

impl Sensor {
    pub fn status(&self) -> &'static str {
        self.state.status()
    }

    /// Copy of the value emitted for this tick
    pub fn reading(&self, timestamp: DateTime<Utc>) -> SensorReading {
        SensorReading {
            machine_name: self.machine_name.clone(),
            sensor_name: self.sensor_name.clone(),
            value: self.current_value,
            status: self.status().to_string(),
            timestamp,
        }
    }
}

/// Configuration row describing one sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSpec {
    pub machine: String,
    pub sensor: String,
    pub baseline: f64,
    pub drift: f64,
    /// Spread of the randomized initial value around `baseline * 0.2`
    #[serde(default)]
    pub initial_spread: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub down_target: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dwell: Option<DwellProfile>,
}

impl SensorSpec {
    pub fn new(machine: &str, sensor: &str, baseline: f64, drift: f64, initial_spread: f64) -> Self {
        Self {
            machine: machine.to_string(),
            sensor: sensor.to_string(),
            baseline,
            drift,
            initial_spread,
            down_target: None,
            dwell: None,
        }
    }

    pub fn with_dwell(mut self, dwell: DwellProfile) -> Self {
        self.dwell = Some(dwell);
        self
    }
}

/// A single emitted sensor value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub machine_name: String,
    pub sensor_name: String,
    pub value: f64,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_cycle_order() {
        let mut state = OperationalState::Startup;
        let mut seen = vec![state];
        for _ in 0..4 {
            state = state.next();
            seen.push(state);
        }
        assert_eq!(
            seen,
            vec![
                OperationalState::Startup,
                OperationalState::Running,
                OperationalState::ShuttingDown,
                OperationalState::Down,
                OperationalState::Startup,
            ]
        );
    }

    #[test]
    fn test_dwell_range_clamping() {
        assert_eq!(DwellRange::new(0, 0).clamped(), DwellRange::new(1, 1));
        assert_eq!(DwellRange::new(5, 2).clamped(), DwellRange::new(5, 5));
        assert_eq!(DwellRange::new(3, 6).clamped(), DwellRange::new(3, 6));
    }
}
