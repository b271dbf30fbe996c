// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Lot lifecycle coordinator
//!
//! Turns the sensor fleet on while any lot is processing and off once none
//! are left. When registered as a cycle listener it also completes every
//! processing lot at the end of each full machine rotation.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::CoordinatorSettings;
use crate::db::LotStore;
use crate::lots::LotSummary;
use crate::sensors::{CycleListener, SensorFleet};

pub struct Coordinator {
    fleet: Arc<SensorFleet>,
    lots: Arc<dyn LotStore>,
    poll_interval: Duration,
}

impl Coordinator {
    pub fn new(fleet: Arc<SensorFleet>, lots: Arc<dyn LotStore>, settings: &CoordinatorSettings) -> Self {
        Self {
            fleet,
            lots,
            poll_interval: settings.poll_interval,
        }
    }

    /// Enable the fleet iff a lot is processing. Returns the resulting state.
    pub async fn sync_simulation(&self) -> Result<bool> {
        let active = self
            .lots
            .has_active_lots()
            .await
            .context("check active lots")?;
        if active {
            self.fleet.enable();
        } else {
            self.fleet.disable();
        }
        Ok(active)
    }

    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!(interval = ?self.poll_interval, "Simulation coordinator running");

        if let Err(e) = self.sync_simulation().await {
            warn!("Initial simulation sync failed: {:#}", e);
        }

        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.sync_simulation().await {
                        warn!("Simulation sync failed: {:#}", e);
                    }
                }
                _ = shutdown.recv() => {
                    info!("Simulation coordinator stopped");
                    break;
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl CycleListener for Coordinator {
    fn name(&self) -> &str {
        "coordinator"
    }

    async fn on_cycle_complete(&self, completed_at: DateTime<Utc>, last_machine: &str) -> Result<()> {
        let lots = self
            .lots
            .list_active_lots()
            .await
            .context("list active lots")?;
        if lots.is_empty() {
            return Ok(());
        }

        for lot in &lots {
            let summary = LotSummary::minimal(completed_at, lot.machine_name.clone());
            match self.lots.mark_lot_completed(lot.id, &summary).await {
                Ok(()) => {
                    info!(lot = %lot.lot_number, last_machine, "Lot completed: machine cycle finished");
                }
                Err(e) if e.is_lost_race() => {
                    debug!(lot = %lot.lot_number, "Lot already completed elsewhere");
                }
                Err(e) => {
                    warn!(lot = %lot.lot_number, "Mark lot completed failed: {}", e);
                }
            }
        }

        // Stop now rather than on the next poll
        let remaining = self
            .lots
            .has_active_lots()
            .await
            .context("post-completion active lot check")?;
        if !remaining {
            self.fleet.disable();
        }
        Ok(())
    }
}
