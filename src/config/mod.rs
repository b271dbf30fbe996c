// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Configuration module
//!
//! [`Config`] is the raw, serializable form read from `config.toml` and the
//! environment. Nothing in it is trusted: [`Config::settings`] resolves it
//! into typed [`Settings`], replacing every unusable value with its default
//! and logging a warning instead of failing. An unreadable file is reported
//! by [`Config::load`] and the binary falls back to [`Config::default`].

mod env;
mod settings;

pub use env::ENV_KEYS;
pub use settings::{
    CompletionSettings, CompletionStrategy, CoordinatorSettings, Settings, SimulationSettings,
};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::sensors::SensorSpec;

pub const DEFAULT_TICK_INTERVAL: &str = "1s";
pub const DEFAULT_MACHINE_ITERATIONS: u32 = 2;
pub const DEFAULT_MEASUREMENT: &str = "sensor_data";
pub const DEFAULT_LISTENER_TIMEOUT: &str = "5s";
pub const DEFAULT_COORDINATOR_POLL_INTERVAL: &str = "5s";
pub const DEFAULT_COMPLETION_POLL_INTERVAL: &str = "1s";
pub const DEFAULT_COMPLETION_LOOKBACK: &str = "30s";
pub const DEFAULT_SAMPLES_REQUIRED: u32 = 3;
pub const DEFAULT_ZERO_THRESHOLD: f64 = 5.0;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Application name
    pub app_name: String,

    /// Log level, used when `RUST_LOG` is unset
    pub log_level: String,

    /// Sensor simulation
    pub simulation: SimulationConfig,

    /// Lot lifecycle coordination
    pub coordinator: CoordinatorConfig,

    /// Threshold completion detection
    pub completion: CompletionConfig,

    /// Database configuration
    pub database: DatabaseConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: crate::NAME.to_string(),
            log_level: "info".to_string(),
            simulation: SimulationConfig::default(),
            coordinator: CoordinatorConfig::default(),
            completion: CompletionConfig::default(),
            database: DatabaseConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        info!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Load or create default configuration
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            let config = Self::default();

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }

            config.save(path)?;
            Ok(config)
        }
    }

    /// Get configuration directory
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|d| d.join("lotline"))
            .unwrap_or_else(|| PathBuf::from("./config"))
    }

    /// Get default configuration path
    pub fn default_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }
}

/// Sensor simulation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Tick interval, e.g. `"1s"` or `"250ms"`
    pub tick_interval: String,

    /// Ticks spent on a machine before the rotation moves on
    pub iterations_per_machine: i64,

    /// Measurement name written to the time-series store
    pub measurement: String,

    /// Upper bound for one cycle listener call
    pub listener_timeout: String,

    /// Fixed random seed; random when absent
    pub seed: Option<u64>,

    /// Simulated sensors; the built-in plant catalogue when empty
    pub sensors: Vec<SensorSpec>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval: DEFAULT_TICK_INTERVAL.to_string(),
            iterations_per_machine: DEFAULT_MACHINE_ITERATIONS as i64,
            measurement: DEFAULT_MEASUREMENT.to_string(),
            listener_timeout: DEFAULT_LISTENER_TIMEOUT.to_string(),
            seed: None,
            sensors: Vec::new(),
        }
    }
}

/// Coordinator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// How often the lot store is asked for active lots
    pub poll_interval: String,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_COORDINATOR_POLL_INTERVAL.to_string(),
        }
    }
}

/// Completion detection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionConfig {
    /// `threshold`, `cycle` or `both`
    pub strategy: String,

    /// Detector poll interval
    pub poll_interval: String,

    /// How far back samples are considered
    pub lookback: String,

    /// Down samples needed per sensor
    pub samples_required: i64,

    /// Largest value still counted as down
    pub zero_threshold: f64,

    /// Measurement queried for samples
    pub measurement: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            strategy: CompletionStrategy::default().as_str().to_string(),
            poll_interval: DEFAULT_COMPLETION_POLL_INTERVAL.to_string(),
            lookback: DEFAULT_COMPLETION_LOOKBACK.to_string(),
            samples_required: DEFAULT_SAMPLES_REQUIRED as i64,
            zero_threshold: DEFAULT_ZERO_THRESHOLD,
            measurement: DEFAULT_MEASUREMENT.to_string(),
        }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database path
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/lotline.db"),
        }
    }
}
