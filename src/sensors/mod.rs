// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Sensor module - machine sensor models and the rotating simulation

mod defaults;
mod fleet;
mod model;
pub(crate) mod physics;
mod simulator;

pub use defaults::default_sensors;
pub use fleet::{CycleEvent, SensorFleet, TickOutcome};
pub use model::{
    DwellProfile, DwellRange, OperationalState, Sensor, SensorReading, SensorSpec,
    DEFAULT_DOWN_DWELL, DEFAULT_RUNNING_DWELL, DEFAULT_SHUTDOWN_DWELL, DEFAULT_STARTUP_DWELL,
};
pub use physics::{rng_from_seed, SimRng};
pub use simulator::{CycleListener, Simulator};
