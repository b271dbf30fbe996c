// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Engine - wires the stores, the simulator and both completion paths

use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::Coordinator;
use crate::config::{CompletionStrategy, Settings};
use crate::db::Database;
use crate::detection::CompletionDetector;
use crate::sensors::{rng_from_seed, CycleListener, SensorFleet, Simulator};

/// Main LotLine engine
pub struct Engine {
    settings: Settings,
    database: Arc<Database>,
    fleet: Arc<SensorFleet>,
    simulator: Arc<Simulator>,
    coordinator: Arc<Coordinator>,
    detector: Option<Arc<CompletionDetector>>,
    shutdown_tx: broadcast::Sender<()>,
    tasks: Vec<(&'static str, JoinHandle<Result<()>>)>,
    start_time: Option<Instant>,
}

impl Engine {
    /// Open the configured database and build every component
    pub fn new(settings: Settings) -> Result<Self> {
        let database = Arc::new(
            Database::open(&settings.database_path)
                .with_context(|| format!("open database {:?}", settings.database_path))?,
        );
        Ok(Self::with_database(settings, database))
    }

    pub fn with_database(settings: Settings, database: Arc<Database>) -> Self {
        let sim = &settings.simulation;
        let fleet = Arc::new(SensorFleet::new(
            &sim.sensors,
            sim.iterations_per_machine,
            rng_from_seed(sim.seed),
        ));

        let coordinator = Arc::new(Coordinator::new(
            fleet.clone(),
            database.clone(),
            &settings.coordinator,
        ));

        let strategy = settings.completion.strategy;
        let mut listeners: Vec<Arc<dyn CycleListener>> = Vec::new();
        if strategy.uses_cycle() {
            listeners.push(coordinator.clone());
        }

        let simulator = Arc::new(Simulator::new(
            fleet.clone(),
            database.clone(),
            sim.clone(),
            listeners,
        ));

        let detector = strategy.uses_threshold().then(|| {
            Arc::new(CompletionDetector::new(
                database.clone(),
                database.clone(),
                settings.completion.clone(),
            ))
        });

        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            settings,
            database,
            fleet,
            simulator,
            coordinator,
            detector,
            shutdown_tx,
            tasks: Vec::new(),
            start_time: None,
        }
    }

    pub fn strategy(&self) -> CompletionStrategy {
        self.settings.completion.strategy
    }

    pub fn database(&self) -> &Arc<Database> {
        &self.database
    }

    pub fn fleet(&self) -> &Arc<SensorFleet> {
        &self.fleet
    }

    pub fn is_running(&self) -> bool {
        !self.tasks.is_empty()
    }

    /// Spawn the tick, gating and detection loops
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        info!(
            strategy = self.strategy().as_str(),
            sensors = self.fleet.sensor_count(),
            machines = self.fleet.machine_order().len(),
            "Starting LotLine engine..."
        );
        self.start_time = Some(Instant::now());

        let simulator = self.simulator.clone();
        let rx = self.shutdown_tx.subscribe();
        self.tasks
            .push(("simulator", tokio::spawn(async move { simulator.run(rx).await })));

        let coordinator = self.coordinator.clone();
        let rx = self.shutdown_tx.subscribe();
        self.tasks
            .push(("coordinator", tokio::spawn(async move { coordinator.run(rx).await })));

        if let Some(detector) = self.detector.clone() {
            let rx = self.shutdown_tx.subscribe();
            self.tasks
                .push(("detector", tokio::spawn(async move { detector.run(rx).await })));
        }

        info!("LotLine engine started");
    }

    /// Signal every loop and wait for them to exit
    pub async fn stop(&mut self) {
        if !self.is_running() {
            return;
        }
        info!("Stopping LotLine engine...");
        // Err only means every loop already exited
        let _ = self.shutdown_tx.send(());

        for (name, handle) in self.tasks.drain(..) {
            match handle.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(task = name, "Task failed: {:#}", e),
                Err(e) => warn!(task = name, "Task panicked or was cancelled: {}", e),
            }
        }
        self.fleet.disable();
        info!(uptime_secs = self.uptime(), "LotLine engine stopped");
    }

    pub fn uptime(&self) -> u64 {
        self.start_time.map(|t| t.elapsed().as_secs()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CompletionSettings, CoordinatorSettings, SimulationSettings};
    use crate::db::LotStore;
    use crate::lots::{LotStatus, NewLot};
    use crate::sensors::SensorSpec;
    use std::path::PathBuf;
    use std::time::Duration;

    fn settings(strategy: CompletionStrategy) -> Settings {
        Settings {
            simulation: SimulationSettings {
                tick_interval: Duration::from_millis(2),
                iterations_per_machine: 1,
                seed: Some(11),
                sensors: vec![
                    SensorSpec::new("Furnace-01", "Temperature", 1200.0, 10.0, 20.0),
                    SensorSpec::new("CT-01", "FlowRate", 200.0, 5.0, 10.0),
                ],
                ..SimulationSettings::default()
            },
            coordinator: CoordinatorSettings {
                poll_interval: Duration::from_millis(5),
            },
            completion: CompletionSettings {
                strategy,
                poll_interval: Duration::from_millis(5),
                ..CompletionSettings::default()
            },
            database_path: PathBuf::from(":memory:"),
        }
    }

    #[test]
    fn test_strategy_selects_components() {
        let db = Arc::new(Database::open_in_memory().unwrap());

        let threshold = Engine::with_database(settings(CompletionStrategy::Threshold), db.clone());
        assert!(threshold.detector.is_some());

        let cycle = Engine::with_database(settings(CompletionStrategy::Cycle), db.clone());
        assert!(cycle.detector.is_none());

        let both = Engine::with_database(settings(CompletionStrategy::Both), db);
        assert!(both.detector.is_some());
        assert_eq!(both.strategy(), CompletionStrategy::Both);
    }

    #[tokio::test]
    async fn test_cycle_strategy_completes_lot_end_to_end() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let lot = db.create_lot(&NewLot::new("LOT-1", "CT-01")).unwrap();

        let mut engine = Engine::with_database(settings(CompletionStrategy::Cycle), db.clone());
        engine.start();
        assert!(engine.is_running());

        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while db.has_active_lots().await.unwrap() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        engine.stop().await;
        assert!(!engine.is_running());
        assert!(!engine.fleet().is_enabled());
        assert_eq!(db.get_lot(lot.id).unwrap().status, LotStatus::Completed);
    }
}
