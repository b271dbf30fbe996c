// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Environment variable overrides

use std::path::PathBuf;

use tracing::{debug, warn};

use super::Config;

/// Environment variables consulted by [`Config::apply_env`]
pub const ENV_KEYS: &[&str] = &[
    "SIMULATION_INTERVAL",
    "SIMULATION_MACHINE_ITERATIONS",
    "SIMULATION_SEED",
    "SIMULATION_MEASUREMENT",
    "COORDINATOR_POLL_INTERVAL",
    "COMPLETION_STRATEGY",
    "COMPLETION_POLL_INTERVAL",
    "COMPLETION_LOOKBACK",
    "COMPLETION_SAMPLES_REQUIRED",
    "COMPLETION_ZERO_THRESHOLD",
    "COMPLETION_MEASUREMENT",
    "LOTLINE_DATABASE",
];

impl Config {
    /// Overlay values from the process environment
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Overlay values from `lookup`.
    ///
    /// Text values are taken as-is and validated later by [`Config::settings`].
    /// Numbers that do not parse are ignored with a warning.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        for key in ENV_KEYS {
            let Some(raw) = lookup(key) else {
                continue;
            };
            let raw = raw.trim().to_string();
            if raw.is_empty() {
                continue;
            }
            debug!(key, value = %raw, "Applying environment override");

            match *key {
                "SIMULATION_INTERVAL" => self.simulation.tick_interval = raw,
                "SIMULATION_MACHINE_ITERATIONS" => {
                    if let Some(n) = parse_number(key, &raw) {
                        self.simulation.iterations_per_machine = n;
                    }
                }
                "SIMULATION_SEED" => {
                    if let Some(seed) = parse_number(key, &raw) {
                        self.simulation.seed = Some(seed);
                    }
                }
                "SIMULATION_MEASUREMENT" => self.simulation.measurement = raw,
                "COORDINATOR_POLL_INTERVAL" => self.coordinator.poll_interval = raw,
                "COMPLETION_STRATEGY" => self.completion.strategy = raw,
                "COMPLETION_POLL_INTERVAL" => self.completion.poll_interval = raw,
                "COMPLETION_LOOKBACK" => self.completion.lookback = raw,
                "COMPLETION_SAMPLES_REQUIRED" => {
                    if let Some(n) = parse_number(key, &raw) {
                        self.completion.samples_required = n;
                    }
                }
                "COMPLETION_ZERO_THRESHOLD" => {
                    if let Some(t) = parse_number(key, &raw) {
                        self.completion.zero_threshold = t;
                    }
                }
                "COMPLETION_MEASUREMENT" => self.completion.measurement = raw,
                "LOTLINE_DATABASE" => self.database.path = PathBuf::from(raw),
                _ => {}
            }
        }
    }

    /// Overlay command-line flags, which win over file and environment.
    ///
    /// The strategy is stored verbatim; an unknown name falls back to the
    /// default during [`Config::settings`] like any other bad value.
    pub fn apply_cli_overrides(
        &mut self,
        database: Option<PathBuf>,
        seed: Option<u64>,
        strategy: Option<String>,
    ) {
        if let Some(path) = database {
            self.database.path = path;
        }
        if let Some(seed) = seed {
            self.simulation.seed = Some(seed);
        }
        if let Some(strategy) = strategy {
            self.completion.strategy = strategy;
        }
    }
}

fn parse_number<T>(key: &str, raw: &str) -> Option<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw.parse::<T>() {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, value = raw, "Ignoring unparsable override: {}", e);
            None
        }
    }
}
