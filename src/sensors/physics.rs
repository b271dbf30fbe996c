// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Operational state machine and value evolution for simulated sensors

use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use super::model::{DwellRange, OperationalState, Sensor, SensorSpec};

/// Seedable random source used by the simulation
pub type SimRng = ChaCha8Rng;

pub const STARTUP_INITIAL_RATIO: f64 = 0.2;
pub const STARTUP_RAMP_COEFFICIENT: f64 = 0.4;
pub const STARTUP_NOISE_SCALE: f64 = 0.05;
pub const REBIND_COEFFICIENT: f64 = 0.1;
pub const RUNNING_BOOST_THRESHOLD: f64 = 0.8;
pub const RUNNING_BOOST_COEFFICIENT: f64 = 0.3;
pub const SHUTDOWN_COEFFICIENT: f64 = 0.35;
pub const SHUTDOWN_NOISE_SCALE: f64 = 0.05;
pub const DOWN_COEFFICIENT: f64 = 0.25;
pub const DOWN_NOISE_SCALE: f64 = 0.1;
/// Below this fraction of baseline a zero-target sensor reads exactly 0
pub const MIN_DOWN_FRACTION: f64 = 0.02;
pub const DEFAULT_DOWN_RATIO: f64 = 0.0;

/// Build a random source, fixed when `seed` is given
pub fn rng_from_seed(seed: Option<u64>) -> SimRng {
    match seed {
        Some(seed) => SimRng::seed_from_u64(seed),
        None => SimRng::from_entropy(),
    }
}

/// Centered uniform noise in [-0.5, 0.5)
fn noise<R: Rng + ?Sized>(rng: &mut R) -> f64 {
    rng.gen::<f64>() - 0.5
}

/// Draw a dwell count uniformly from the clamped range
pub fn random_ticks<R: Rng + ?Sized>(range: DwellRange, rng: &mut R) -> u32 {
    let range = range.clamped();
    rng.gen_range(range.min..=range.max)
}

/// Create a sensor from its configuration with a randomized initial value.
///
/// The sensor still has to enter `Startup` before it is advanced.
pub fn build_sensor<R: Rng + ?Sized>(spec: &SensorSpec, rng: &mut R) -> Sensor {
    let down_target = spec
        .down_target
        .unwrap_or(spec.baseline * DEFAULT_DOWN_RATIO)
        .max(0.0);

    let mut initial = spec.baseline * STARTUP_INITIAL_RATIO + noise(rng) * spec.initial_spread;
    if initial < 0.0 {
        initial = 0.0;
    }
    if spec.baseline > 0.0 && initial > spec.baseline {
        initial = spec.baseline;
    }

    Sensor {
        machine_name: spec.machine.clone(),
        sensor_name: spec.sensor.clone(),
        current_value: initial,
        baseline: spec.baseline,
        drift: spec.drift,
        state: OperationalState::Startup,
        ticks_remaining: 0,
        dwell: spec.dwell.unwrap_or_default(),
        down_target,
    }
}

/// Switch a sensor into `state`, drawing a fresh dwell and nudging the value.
pub fn enter_state<R: Rng + ?Sized>(sensor: &mut Sensor, state: OperationalState, rng: &mut R) {
    sensor.state = state;
    sensor.ticks_remaining = random_ticks(sensor.dwell.range(state), rng);

    match state {
        OperationalState::Startup => {
            if sensor.baseline > 0.0 {
                let base = sensor.baseline * STARTUP_INITIAL_RATIO;
                let value = base + noise(rng) * sensor.drift * STARTUP_NOISE_SCALE;
                sensor.current_value = value.clamp(0.0, sensor.baseline);
            }
        }
        OperationalState::Running => {
            if sensor.baseline > 0.0
                && sensor.current_value < sensor.baseline * RUNNING_BOOST_THRESHOLD
            {
                sensor.current_value +=
                    (sensor.baseline - sensor.current_value) * RUNNING_BOOST_COEFFICIENT;
            }
        }
        OperationalState::ShuttingDown => {}
        OperationalState::Down => {
            if sensor.current_value > sensor.down_target {
                sensor.current_value = sensor.down_target;
            }
        }
    }
}

/// Advance a sensor by one tick and return its new value.
pub fn advance<R: Rng + ?Sized>(sensor: &mut Sensor, rng: &mut R) -> f64 {
    if sensor.ticks_remaining == 0 {
        enter_state(sensor, sensor.state.next(), rng);
    }
    sensor.ticks_remaining = sensor.ticks_remaining.saturating_sub(1);

    match sensor.state {
        OperationalState::Startup => {
            if sensor.baseline > 0.0 {
                sensor.current_value +=
                    (sensor.baseline - sensor.current_value) * STARTUP_RAMP_COEFFICIENT;
            }
            sensor.current_value += noise(rng) * sensor.drift * STARTUP_NOISE_SCALE;
        }
        OperationalState::Running => {
            sensor.current_value += noise(rng) * sensor.drift;
            sensor.current_value += (sensor.baseline - sensor.current_value) * REBIND_COEFFICIENT;
        }
        OperationalState::ShuttingDown => {
            sensor.current_value +=
                (sensor.down_target - sensor.current_value) * SHUTDOWN_COEFFICIENT;
            sensor.current_value += noise(rng) * sensor.drift * SHUTDOWN_NOISE_SCALE;
        }
        OperationalState::Down => {
            sensor.current_value += (sensor.down_target - sensor.current_value) * DOWN_COEFFICIENT;
            sensor.current_value += noise(rng) * sensor.drift * DOWN_NOISE_SCALE;
            if sensor.current_value < sensor.down_target {
                sensor.current_value = sensor.down_target;
            }
            if sensor.down_target == 0.0
                && sensor.baseline > 0.0
                && sensor.current_value < sensor.baseline * MIN_DOWN_FRACTION
            {
                sensor.current_value = 0.0;
            }
        }
    }

    if sensor.current_value < 0.0 {
        sensor.current_value = 0.0;
    }
    sensor.current_value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::model::DwellProfile;

    fn spec() -> SensorSpec {
        SensorSpec::new("Furnace-01", "Temperature", 1200.0, 10.0, 20.0)
    }

    #[test]
    fn test_random_ticks_within_clamped_range() {
        let mut rng = rng_from_seed(Some(7));
        for _ in 0..500 {
            let ticks = random_ticks(DwellRange::new(3, 6), &mut rng);
            assert!((3..=6).contains(&ticks));
        }
        assert_eq!(random_ticks(DwellRange::new(0, 0), &mut rng), 1);
        assert_eq!(random_ticks(DwellRange::new(4, 1), &mut rng), 4);
    }

    #[test]
    fn test_build_sensor_initial_value_is_bounded() {
        let mut rng = rng_from_seed(Some(1));
        for _ in 0..100 {
            let sensor = build_sensor(&SensorSpec::new("UT-01", "Accuracy", 1.0, 0.5, 50.0), &mut rng);
            assert!(sensor.current_value >= 0.0);
            assert!(sensor.current_value <= 1.0);
            assert_eq!(sensor.down_target, 0.0);
        }
    }

    #[test]
    fn test_startup_entry_resets_value_near_startup_ratio() {
        let mut rng = rng_from_seed(Some(3));
        let mut sensor = build_sensor(&spec(), &mut rng);
        sensor.current_value = 1150.0;

        enter_state(&mut sensor, OperationalState::Startup, &mut rng);

        assert_eq!(sensor.state, OperationalState::Startup);
        assert!((sensor.current_value - 240.0).abs() <= 10.0 * STARTUP_NOISE_SCALE);
        assert!((3..=6).contains(&sensor.ticks_remaining));
    }

    #[test]
    fn test_running_entry_boosts_low_values() {
        let mut rng = rng_from_seed(Some(3));
        let mut sensor = build_sensor(&spec(), &mut rng);
        sensor.current_value = 200.0;

        enter_state(&mut sensor, OperationalState::Running, &mut rng);
        assert!((sensor.current_value - 500.0).abs() < 1e-9);

        sensor.current_value = 1100.0;
        enter_state(&mut sensor, OperationalState::Running, &mut rng);
        assert_eq!(sensor.current_value, 1100.0);
    }

    #[test]
    fn test_down_snaps_to_zero_floor() {
        let mut rng = rng_from_seed(Some(11));
        let mut sensor = build_sensor(&spec(), &mut rng);
        sensor.dwell = DwellProfile {
            down: DwellRange::new(50, 50),
            ..DwellProfile::default()
        };
        enter_state(&mut sensor, OperationalState::Down, &mut rng);
        assert_eq!(sensor.current_value, 0.0);

        sensor.current_value = 20.0;
        for _ in 0..10 {
            advance(&mut sensor, &mut rng);
        }
        assert_eq!(sensor.state, OperationalState::Down);
        assert_eq!(sensor.current_value, 0.0);
    }

    #[test]
    fn test_down_never_drops_below_target() {
        let mut rng = rng_from_seed(Some(5));
        let mut sensor = build_sensor(&spec(), &mut rng);
        sensor.down_target = 100.0;
        sensor.dwell.down = DwellRange::new(40, 40);
        enter_state(&mut sensor, OperationalState::Down, &mut rng);

        for _ in 0..30 {
            let value = advance(&mut sensor, &mut rng);
            assert!(value >= 100.0);
        }
    }

    #[test]
    fn test_dwell_counter_drives_transitions() {
        let mut rng = rng_from_seed(Some(9));
        let mut sensor = build_sensor(&spec(), &mut rng);
        let fixed = DwellRange::new(2, 2);
        sensor.dwell = DwellProfile {
            startup: fixed,
            running: fixed,
            shutting_down: fixed,
            down: fixed,
        };
        enter_state(&mut sensor, OperationalState::Startup, &mut rng);

        let mut states = Vec::new();
        for _ in 0..8 {
            advance(&mut sensor, &mut rng);
            states.push(sensor.state);
        }
        assert_eq!(
            states,
            vec![
                OperationalState::Startup,
                OperationalState::Startup,
                OperationalState::Running,
                OperationalState::Running,
                OperationalState::ShuttingDown,
                OperationalState::ShuttingDown,
                OperationalState::Down,
                OperationalState::Down,
            ]
        );
    }

    #[test]
    fn test_value_never_negative_over_long_run() {
        let mut rng = rng_from_seed(Some(42));
        let mut sensor = build_sensor(&SensorSpec::new("CT-01", "FlowRate", 2.0, 50.0, 5.0), &mut rng);
        enter_state(&mut sensor, OperationalState::Startup, &mut rng);
        for _ in 0..5_000 {
            assert!(advance(&mut sensor, &mut rng) >= 0.0);
        }
    }
}
