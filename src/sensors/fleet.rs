// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Sensor fleet - machine rotation over an index-stable sensor arena

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tracing::info;

use super::model::{OperationalState, Sensor, SensorReading, SensorSpec};
use super::physics::{self, SimRng};

/// Emitted when the rotation wraps back to the first machine
#[derive(Debug, Clone, PartialEq)]
pub struct CycleEvent {
    pub completed_at: DateTime<Utc>,
    /// Machine vacated by the wrap
    pub last_machine: String,
}

/// Result of one enabled tick
#[derive(Debug, Clone)]
pub struct TickOutcome {
    pub machine: String,
    pub readings: Vec<SensorReading>,
    pub cycle: Option<CycleEvent>,
}

#[derive(Debug)]
struct MachineGroup {
    name: String,
    members: Vec<usize>,
}

struct FleetState {
    sensors: Vec<Sensor>,
    groups: Vec<MachineGroup>,
    machine_index: usize,
    machine_iteration: u32,
    iterations_per_machine: u32,
    enabled: bool,
    rng: SimRng,
}

impl FleetState {
    /// Every sensor back to `Startup`, rotation back to the first machine
    fn reset(&mut self) {
        let rng = &mut self.rng;
        for sensor in self.sensors.iter_mut() {
            physics::enter_state(sensor, OperationalState::Startup, rng);
        }
        self.machine_index = 0;
        self.machine_iteration = 0;
    }
}

/// Owns every simulated sensor and decides which machine is live.
///
/// Only the current machine's sensors advance on a tick; all others stay
/// frozen. One lock guards the arena and the rotation counters, and it is
/// never held across I/O.
pub struct SensorFleet {
    state: RwLock<FleetState>,
}

impl SensorFleet {
    pub fn new(specs: &[SensorSpec], iterations_per_machine: u32, mut rng: SimRng) -> Self {
        let mut sensors = Vec::with_capacity(specs.len());
        let mut groups: Vec<MachineGroup> = Vec::new();

        for (idx, spec) in specs.iter().enumerate() {
            sensors.push(physics::build_sensor(spec, &mut rng));
            match groups.iter_mut().find(|g| g.name == spec.machine) {
                Some(group) => group.members.push(idx),
                None => groups.push(MachineGroup {
                    name: spec.machine.clone(),
                    members: vec![idx],
                }),
            }
        }

        let mut state = FleetState {
            sensors,
            groups,
            machine_index: 0,
            machine_iteration: 0,
            iterations_per_machine: iterations_per_machine.max(1),
            enabled: false,
            rng,
        };
        state.reset();

        Self {
            state: RwLock::new(state),
        }
    }

    /// Start generating. Re-initializes every sensor and restarts the rotation.
    ///
    /// Returns `false` when already enabled.
    pub fn enable(&self) -> bool {
        let (machines, iterations) = {
            let mut state = self.state.write();
            if state.enabled {
                return false;
            }
            state.reset();
            state.enabled = true;
            (state.groups.len(), state.iterations_per_machine)
        };
        info!(machines, iterations_per_machine = iterations, "Sensor simulation enabled");
        true
    }

    /// Pause generation. Returns `false` when already disabled.
    pub fn disable(&self) -> bool {
        {
            let mut state = self.state.write();
            if !state.enabled {
                return false;
            }
            state.enabled = false;
            state.machine_index = 0;
            state.machine_iteration = 0;
        }
        info!("Sensor simulation disabled");
        true
    }

    pub fn is_enabled(&self) -> bool {
        self.state.read().enabled
    }

    /// Advance the current machine by one tick.
    ///
    /// Returns `None` while disabled or when no sensors are configured.
    pub fn advance(&self, timestamp: DateTime<Utc>) -> Option<TickOutcome> {
        let mut guard = self.state.write();
        let state = &mut *guard;
        if !state.enabled || state.groups.is_empty() {
            return None;
        }

        let group = &state.groups[state.machine_index];
        let machine = group.name.clone();
        let mut readings = Vec::with_capacity(group.members.len());
        for &idx in &group.members {
            let sensor = &mut state.sensors[idx];
            physics::advance(sensor, &mut state.rng);
            readings.push(sensor.reading(timestamp));
        }

        let mut cycle = None;
        state.machine_iteration += 1;
        if state.machine_iteration >= state.iterations_per_machine {
            state.machine_iteration = 0;
            state.machine_index = (state.machine_index + 1) % state.groups.len();
            if state.machine_index == 0 {
                cycle = Some(CycleEvent {
                    completed_at: timestamp,
                    last_machine: machine.clone(),
                });
            }
        }

        Some(TickOutcome {
            machine,
            readings,
            cycle,
        })
    }

    /// Owned copies of every sensor in configuration order
    pub fn snapshot(&self) -> Vec<Sensor> {
        self.state.read().sensors.clone()
    }

    /// Machine names in rotation order
    pub fn machine_order(&self) -> Vec<String> {
        self.state.read().groups.iter().map(|g| g.name.clone()).collect()
    }

    pub fn current_machine(&self) -> Option<String> {
        let state = self.state.read();
        state.groups.get(state.machine_index).map(|g| g.name.clone())
    }

    /// `(machine index, ticks spent on it)`
    pub fn rotation_position(&self) -> (usize, u32) {
        let state = self.state.read();
        (state.machine_index, state.machine_iteration)
    }

    pub fn iterations_per_machine(&self) -> u32 {
        self.state.read().iterations_per_machine
    }

    pub fn sensor_count(&self) -> usize {
        self.state.read().sensors.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::physics::rng_from_seed;
    use chrono::Duration;

    fn specs() -> Vec<SensorSpec> {
        vec![
            SensorSpec::new("Furnace-01", "Temperature", 1200.0, 10.0, 20.0),
            SensorSpec::new("Furnace-01", "Pressure", 100.0, 2.0, 5.0),
            SensorSpec::new("Sawing-01", "BladeSpeed", 200.0, 5.0, 10.0),
            SensorSpec::new("Furnace-01", "Humidity", 40.0, 1.0, 2.0),
            SensorSpec::new("CT-01", "FlowRate", 200.0, 5.0, 10.0),
        ]
    }

    fn fleet(iterations: u32) -> SensorFleet {
        SensorFleet::new(&specs(), iterations, rng_from_seed(Some(42)))
    }

    #[test]
    fn test_machine_order_is_first_seen() {
        let fleet = fleet(2);
        assert_eq!(fleet.machine_order(), vec!["Furnace-01", "Sawing-01", "CT-01"]);
        assert_eq!(fleet.current_machine().as_deref(), Some("Furnace-01"));
    }

    #[test]
    fn test_disabled_fleet_does_not_tick() {
        let fleet = fleet(2);
        let before = fleet.snapshot();
        assert!(fleet.advance(Utc::now()).is_none());
        assert_eq!(fleet.snapshot(), before);
        assert_eq!(fleet.rotation_position(), (0, 0));
    }

    #[test]
    fn test_rotation_completes_one_cycle_after_full_pass() {
        let fleet = fleet(2);
        fleet.enable();
        let start = Utc::now();

        let mut cycles = Vec::new();
        let mut machines = Vec::new();
        for i in 0..6 {
            let outcome = fleet.advance(start + Duration::seconds(i)).unwrap();
            machines.push(outcome.machine.clone());
            if let Some(cycle) = outcome.cycle {
                cycles.push(cycle);
            }
        }

        assert_eq!(
            machines,
            vec!["Furnace-01", "Furnace-01", "Sawing-01", "Sawing-01", "CT-01", "CT-01"]
        );
        assert_eq!(fleet.rotation_position(), (0, 0));
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].last_machine, "CT-01");
        assert_eq!(cycles[0].completed_at, start + Duration::seconds(5));
    }

    #[test]
    fn test_only_current_machine_advances() {
        let fleet = fleet(1);
        fleet.enable();
        let before = fleet.snapshot();

        let outcome = fleet.advance(Utc::now()).unwrap();
        assert_eq!(outcome.readings.len(), 3);
        assert!(outcome.readings.iter().all(|r| r.machine_name == "Furnace-01"));

        let after = fleet.snapshot();
        for (old, new) in before.iter().zip(after.iter()) {
            if old.machine_name != "Furnace-01" {
                assert_eq!(old, new);
            } else {
                assert!(new.ticks_remaining < old.ticks_remaining);
            }
        }
    }

    #[test]
    fn test_reenable_resets_rotation_and_states() {
        let fleet = fleet(2);
        fleet.enable();
        for _ in 0..40 {
            fleet.advance(Utc::now());
        }
        for _ in 0..3 {
            fleet.advance(Utc::now());
        }
        assert_ne!(fleet.rotation_position(), (0, 0));

        assert!(fleet.disable());
        assert!(!fleet.disable());
        assert!(fleet.enable());
        assert!(!fleet.enable());

        assert_eq!(fleet.rotation_position(), (0, 0));
        assert!(fleet
            .snapshot()
            .iter()
            .all(|s| s.state == OperationalState::Startup));
    }

    #[test]
    fn test_state_and_value_invariants_hold() {
        let fleet = fleet(3);
        fleet.enable();
        for _ in 0..2_000 {
            if let Some(outcome) = fleet.advance(Utc::now()) {
                assert!(outcome.readings.iter().all(|r| r.value >= 0.0));
            }
        }
        for sensor in fleet.snapshot() {
            assert!(sensor.current_value >= 0.0);
            assert!(matches!(
                sensor.state,
                OperationalState::Startup
                    | OperationalState::Running
                    | OperationalState::ShuttingDown
                    | OperationalState::Down
            ));
        }
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = fleet(1);
        let b = fleet(1);
        a.enable();
        b.enable();
        let ts = Utc::now();
        for _ in 0..50 {
            let ra = a.advance(ts).unwrap().readings;
            let rb = b.advance(ts).unwrap().readings;
            assert_eq!(ra, rb);
        }
    }

    #[test]
    fn test_empty_fleet_never_ticks() {
        let fleet = SensorFleet::new(&[], 2, rng_from_seed(Some(1)));
        fleet.enable();
        assert!(fleet.advance(Utc::now()).is_none());
        assert_eq!(fleet.current_machine(), None);
    }
}
