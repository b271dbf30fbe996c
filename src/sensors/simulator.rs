// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Sensor simulator - drives the fleet on a timer and publishes readings

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::fleet::{CycleEvent, SensorFleet};
use super::model::Sensor;
use crate::config::SimulationSettings;
use crate::db::{Point, TimeSeriesStore};

/// Observer of completed machine rotations
#[async_trait]
pub trait CycleListener: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str {
        "cycle-listener"
    }

    async fn on_cycle_complete(&self, completed_at: DateTime<Utc>, last_machine: &str) -> Result<()>;
}

/// Periodically advances the fleet and writes the emitted readings
pub struct Simulator {
    fleet: Arc<SensorFleet>,
    store: Arc<dyn TimeSeriesStore>,
    listeners: Vec<Arc<dyn CycleListener>>,
    settings: SimulationSettings,
}

impl Simulator {
    pub fn new(
        fleet: Arc<SensorFleet>,
        store: Arc<dyn TimeSeriesStore>,
        settings: SimulationSettings,
        listeners: Vec<Arc<dyn CycleListener>>,
    ) -> Self {
        Self {
            fleet,
            store,
            listeners,
            settings,
        }
    }

    pub fn fleet(&self) -> &Arc<SensorFleet> {
        &self.fleet
    }

    pub fn interval(&self) -> std::time::Duration {
        self.settings.tick_interval
    }

    /// Owned copies of every sensor
    pub fn snapshot(&self) -> Vec<Sensor> {
        self.fleet.snapshot()
    }

    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!(
            interval = ?self.settings.tick_interval,
            sensors = self.fleet.sensor_count(),
            "Sensor simulator running"
        );

        let period = self.settings.tick_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(Utc::now()).await;
                }
                _ = shutdown.recv() => {
                    info!("Sensor simulator shutting down...");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Run one tick: advance, write, then notify on a completed cycle.
    pub async fn tick(&self, timestamp: DateTime<Utc>) -> Option<CycleEvent> {
        // The fleet lock is released when advance returns.
        let outcome = self.fleet.advance(timestamp)?;

        for reading in &outcome.readings {
            let point = Point::from_reading(&self.settings.measurement, reading);
            if let Err(e) = self.store.write_point(&point).await {
                warn!(machine = %point.machine, sensor = %point.sensor, "Write sensor data failed: {}", e);
                continue;
            }
            debug!(
                machine = %point.machine,
                sensor = %point.sensor,
                status = %point.status,
                value = point.value,
                "Sensor simulated"
            );
        }

        if let Some(cycle) = &outcome.cycle {
            self.notify_cycle_complete(cycle).await;
        }
        outcome.cycle
    }

    async fn notify_cycle_complete(&self, cycle: &CycleEvent) {
        debug!(last_machine = %cycle.last_machine, "Machine rotation cycle complete");

        let listeners = self.listeners.clone();
        for listener in listeners {
            let call = listener.on_cycle_complete(cycle.completed_at, &cycle.last_machine);
            match timeout(self.settings.listener_timeout, call).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    warn!(listener = listener.name(), "Cycle listener failed: {:#}", e);
                }
                Err(_) => {
                    warn!(
                        listener = listener.name(),
                        timeout = ?self.settings.listener_timeout,
                        "Cycle listener timed out"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::db::RecentQuery;
    use crate::sensors::physics::rng_from_seed;
    use crate::sensors::SensorSpec;
    use anyhow::anyhow;
    use parking_lot::Mutex;
    use std::time::Duration;

    struct RecordingListener {
        events: Mutex<Vec<(DateTime<Utc>, String)>>,
    }

    #[async_trait]
    impl CycleListener for RecordingListener {
        async fn on_cycle_complete(&self, completed_at: DateTime<Utc>, last_machine: &str) -> Result<()> {
            self.events.lock().push((completed_at, last_machine.to_string()));
            Ok(())
        }
    }

    struct FailingListener;

    #[async_trait]
    impl CycleListener for FailingListener {
        fn name(&self) -> &str {
            "failing"
        }

        async fn on_cycle_complete(&self, _: DateTime<Utc>, _: &str) -> Result<()> {
            Err(anyhow!("boom"))
        }
    }

    struct StalledListener;

    #[async_trait]
    impl CycleListener for StalledListener {
        async fn on_cycle_complete(&self, _: DateTime<Utc>, _: &str) -> Result<()> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }

    fn settings() -> SimulationSettings {
        SimulationSettings {
            tick_interval: Duration::from_millis(5),
            iterations_per_machine: 2,
            listener_timeout: Duration::from_millis(50),
            ..SimulationSettings::default()
        }
    }

    fn fleet() -> Arc<SensorFleet> {
        let specs = vec![
            SensorSpec::new("Furnace-01", "Temperature", 1200.0, 10.0, 20.0),
            SensorSpec::new("Sawing-01", "BladeSpeed", 200.0, 5.0, 10.0),
            SensorSpec::new("Sawing-01", "Pressure", 80.0, 2.0, 5.0),
            SensorSpec::new("CT-01", "FlowRate", 200.0, 5.0, 10.0),
        ];
        Arc::new(SensorFleet::new(&specs, 2, rng_from_seed(Some(7))))
    }

    #[tokio::test]
    async fn test_tick_writes_points_and_notifies_all_listeners() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let recorder = Arc::new(RecordingListener { events: Mutex::new(Vec::new()) });
        let listeners: Vec<Arc<dyn CycleListener>> = vec![
            Arc::new(FailingListener),
            Arc::new(StalledListener),
            recorder.clone(),
        ];
        let fleet = fleet();
        let sim = Simulator::new(fleet.clone(), db.clone(), settings(), listeners);
        fleet.enable();

        let start = Utc::now();
        let mut cycles = 0;
        for i in 0..6 {
            if sim.tick(start + chrono::Duration::milliseconds(i)).await.is_some() {
                cycles += 1;
            }
        }

        assert_eq!(cycles, 1);
        let events = recorder.events.lock().clone();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].1, "CT-01");

        let query = RecentQuery {
            measurement: "sensor_data".to_string(),
            machine: None,
            sensor: None,
            lookback: Duration::from_secs(60),
            limit: 100,
        };
        let samples = db.query_recent(&query).await.unwrap();
        // two ticks each: 1 + 2 + 1 sensors
        assert_eq!(samples.len(), 8);
        assert!(samples.iter().all(|s| s.value >= 0.0));
    }

    #[tokio::test]
    async fn test_disabled_tick_is_noop() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let sim = Simulator::new(fleet(), db.clone(), settings(), Vec::new());

        assert!(sim.tick(Utc::now()).await.is_none());
        let query = RecentQuery::for_machine("sensor_data", "Furnace-01", Duration::from_secs(60), 10);
        assert!(db.query_recent(&query).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_run_loop_stops_on_shutdown() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let recorder = Arc::new(RecordingListener { events: Mutex::new(Vec::new()) });
        let fleet = fleet();
        fleet.enable();
        let sim = Arc::new(Simulator::new(fleet, db, settings(), vec![recorder.clone() as Arc<dyn CycleListener>]));

        let (tx, rx) = broadcast::channel(1);
        let handle = {
            let sim = sim.clone();
            tokio::spawn(async move { sim.run(rx).await })
        };

        let deadline = Instant::now() + Duration::from_secs(5);
        while recorder.events.lock().is_empty() && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(!recorder.events.lock().is_empty());

        tx.send(()).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(result.is_ok());
    }
}
