// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Typed settings resolved from the raw configuration

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{
    Config, DEFAULT_COMPLETION_LOOKBACK, DEFAULT_COMPLETION_POLL_INTERVAL,
    DEFAULT_COORDINATOR_POLL_INTERVAL, DEFAULT_LISTENER_TIMEOUT, DEFAULT_MACHINE_ITERATIONS,
    DEFAULT_MEASUREMENT, DEFAULT_SAMPLES_REQUIRED, DEFAULT_TICK_INTERVAL, DEFAULT_ZERO_THRESHOLD,
};
use crate::sensors::{default_sensors, SensorSpec};

/// Which completion path marks lots finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStrategy {
    /// Poll recent samples for an all-sensors-down window
    #[default]
    Threshold,
    /// Complete on every full machine rotation
    Cycle,
    /// Run both; the first conditional update wins
    Both,
}

impl CompletionStrategy {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "threshold" => Some(Self::Threshold),
            "cycle" => Some(Self::Cycle),
            "both" => Some(Self::Both),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Threshold => "threshold",
            Self::Cycle => "cycle",
            Self::Both => "both",
        }
    }

    pub fn uses_threshold(self) -> bool {
        matches!(self, Self::Threshold | Self::Both)
    }

    pub fn uses_cycle(self) -> bool {
        matches!(self, Self::Cycle | Self::Both)
    }
}

/// Fully resolved runtime settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub simulation: SimulationSettings,
    pub coordinator: CoordinatorSettings,
    pub completion: CompletionSettings,
    pub database_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SimulationSettings {
    pub tick_interval: Duration,
    pub iterations_per_machine: u32,
    pub measurement: String,
    pub listener_timeout: Duration,
    pub seed: Option<u64>,
    pub sensors: Vec<SensorSpec>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            iterations_per_machine: DEFAULT_MACHINE_ITERATIONS,
            measurement: DEFAULT_MEASUREMENT.to_string(),
            listener_timeout: Duration::from_secs(5),
            seed: None,
            sensors: default_sensors(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CoordinatorSettings {
    pub poll_interval: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionSettings {
    pub strategy: CompletionStrategy,
    pub poll_interval: Duration,
    pub lookback: Duration,
    pub samples_required: usize,
    pub zero_threshold: f64,
    pub measurement: String,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            strategy: CompletionStrategy::default(),
            poll_interval: Duration::from_secs(1),
            lookback: Duration::from_secs(30),
            samples_required: DEFAULT_SAMPLES_REQUIRED as usize,
            zero_threshold: DEFAULT_ZERO_THRESHOLD,
            measurement: DEFAULT_MEASUREMENT.to_string(),
        }
    }
}

impl Config {
    /// Resolve into typed settings. Never fails; bad values fall back to defaults.
    pub fn settings(&self) -> Settings {
        let sim = &self.simulation;
        let sensors = if sim.sensors.is_empty() {
            default_sensors()
        } else {
            sim.sensors.clone()
        };

        let simulation = SimulationSettings {
            tick_interval: duration_or_default(
                "simulation.tick_interval",
                &sim.tick_interval,
                DEFAULT_TICK_INTERVAL,
            ),
            iterations_per_machine: count_or_default(
                "simulation.iterations_per_machine",
                sim.iterations_per_machine,
                DEFAULT_MACHINE_ITERATIONS,
            ),
            measurement: name_or_default("simulation.measurement", &sim.measurement, DEFAULT_MEASUREMENT),
            listener_timeout: duration_or_default(
                "simulation.listener_timeout",
                &sim.listener_timeout,
                DEFAULT_LISTENER_TIMEOUT,
            ),
            seed: sim.seed,
            sensors,
        };

        let coordinator = CoordinatorSettings {
            poll_interval: duration_or_default(
                "coordinator.poll_interval",
                &self.coordinator.poll_interval,
                DEFAULT_COORDINATOR_POLL_INTERVAL,
            ),
        };

        let c = &self.completion;
        let strategy = CompletionStrategy::parse(&c.strategy).unwrap_or_else(|| {
            let fallback = CompletionStrategy::default();
            warn!(
                key = "completion.strategy",
                value = %c.strategy,
                "Invalid value, using default {}",
                fallback.as_str()
            );
            fallback
        });
        let completion = CompletionSettings {
            strategy,
            poll_interval: duration_or_default(
                "completion.poll_interval",
                &c.poll_interval,
                DEFAULT_COMPLETION_POLL_INTERVAL,
            ),
            lookback: duration_or_default("completion.lookback", &c.lookback, DEFAULT_COMPLETION_LOOKBACK),
            samples_required: count_or_default(
                "completion.samples_required",
                c.samples_required,
                DEFAULT_SAMPLES_REQUIRED,
            ) as usize,
            zero_threshold: threshold_or_default(
                "completion.zero_threshold",
                c.zero_threshold,
                DEFAULT_ZERO_THRESHOLD,
            ),
            measurement: name_or_default("completion.measurement", &c.measurement, DEFAULT_MEASUREMENT),
        };

        Settings {
            simulation,
            coordinator,
            completion,
            database_path: self.database.path.clone(),
        }
    }
}

/// Parse a human duration (`"1s"`, `"250ms"`); blank, invalid or zero gives `default`.
pub(crate) fn duration_or_default(key: &str, raw: &str, default: &str) -> Duration {
    let fallback = humantime::parse_duration(default).unwrap_or(Duration::from_secs(1));
    let raw = raw.trim();
    if raw.is_empty() {
        return fallback;
    }
    match humantime::parse_duration(raw) {
        Ok(d) if !d.is_zero() => d,
        Ok(_) => {
            warn!(key, value = raw, "Non-positive duration, using default {}", default);
            fallback
        }
        Err(e) => {
            warn!(key, value = raw, "Invalid duration ({}), using default {}", e, default);
            fallback
        }
    }
}

pub(crate) fn count_or_default(key: &str, raw: i64, default: u32) -> u32 {
    match u32::try_from(raw) {
        Ok(n) if n > 0 => n,
        _ => {
            warn!(key, value = raw, "Non-positive count, using default {}", default);
            default
        }
    }
}

pub(crate) fn threshold_or_default(key: &str, raw: f64, default: f64) -> f64 {
    if raw.is_finite() && raw >= 0.0 {
        raw
    } else {
        warn!(key, value = raw, "Invalid threshold, using default {}", default);
        default
    }
}

fn name_or_default(key: &str, raw: &str, default: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        warn!(key, "Blank name, using default {}", default);
        default.to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve_to_documented_values() {
        let settings = Config::default().settings();
        assert_eq!(settings.simulation.tick_interval, Duration::from_secs(1));
        assert_eq!(settings.simulation.iterations_per_machine, 2);
        assert_eq!(settings.simulation.measurement, "sensor_data");
        assert!(!settings.simulation.sensors.is_empty());
        assert_eq!(settings.coordinator.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.completion.strategy, CompletionStrategy::Threshold);
        assert_eq!(settings.completion.lookback, Duration::from_secs(30));
        assert_eq!(settings.completion.samples_required, 3);
        assert_eq!(settings.completion.zero_threshold, 5.0);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let mut config = Config::default();
        config.simulation.tick_interval = "banana".to_string();
        config.simulation.iterations_per_machine = 0;
        config.simulation.listener_timeout = "0s".to_string();
        config.coordinator.poll_interval = "-5s".to_string();
        config.completion.samples_required = -2;
        config.completion.zero_threshold = -1.0;
        config.completion.strategy = "sometimes".to_string();
        config.completion.measurement = "   ".to_string();

        let settings = config.settings();
        assert_eq!(settings.simulation.tick_interval, Duration::from_secs(1));
        assert_eq!(settings.simulation.iterations_per_machine, 2);
        assert_eq!(settings.simulation.listener_timeout, Duration::from_secs(5));
        assert_eq!(settings.coordinator.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.completion.samples_required, 3);
        assert_eq!(settings.completion.zero_threshold, 5.0);
        assert_eq!(settings.completion.strategy, CompletionStrategy::Threshold);
        assert_eq!(settings.completion.measurement, "sensor_data");
    }

    #[test]
    fn test_valid_values_are_kept() {
        let mut config = Config::default();
        config.simulation.tick_interval = "250ms".to_string();
        config.completion.lookback = "2m".to_string();
        config.completion.zero_threshold = 0.0;
        config.completion.strategy = "Both".to_string();

        let settings = config.settings();
        assert_eq!(settings.simulation.tick_interval, Duration::from_millis(250));
        assert_eq!(settings.completion.lookback, Duration::from_secs(120));
        assert_eq!(settings.completion.zero_threshold, 0.0);
        assert!(settings.completion.strategy.uses_cycle());
        assert!(settings.completion.strategy.uses_threshold());
    }
}
