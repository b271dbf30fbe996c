// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Detection module - threshold-based lot completion
//!
//! The detector never looks at the simulator. It polls the lot store for
//! processing lots, reads each lot machine's recent samples from the
//! time-series store, and completes a lot once every sensor of that machine
//! has reported a full window of down samples.

mod window;

pub use window::{evaluate_window, is_down_sample};

use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::CompletionSettings;
use crate::db::{LotStore, RecentQuery, StoreError, TimeSeriesStore};
use crate::lots::{Lot, LotSummary};

/// Samples fetched per sensor window
const QUERY_BATCH_FACTOR: usize = 8;

/// Poll-driven completion detector
pub struct CompletionDetector {
    series: Arc<dyn TimeSeriesStore>,
    lots: Arc<dyn LotStore>,
    settings: CompletionSettings,
}

impl CompletionDetector {
    pub fn new(series: Arc<dyn TimeSeriesStore>, lots: Arc<dyn LotStore>, settings: CompletionSettings) -> Self {
        Self { series, lots, settings }
    }

    pub fn settings(&self) -> &CompletionSettings {
        &self.settings
    }

    pub async fn run(&self, mut shutdown: broadcast::Receiver<()>) -> Result<()> {
        info!(
            interval = ?self.settings.poll_interval,
            lookback = ?self.settings.lookback,
            samples_required = self.settings.samples_required,
            zero_threshold = self.settings.zero_threshold,
            "Lot completion detector running"
        );

        let period = self.settings.poll_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_lots().await;
                }
                _ = shutdown.recv() => {
                    info!("Lot completion detector stopped");
                    break;
                }
            }
        }

        Ok(())
    }

    /// One detection round. Returns how many lots this round completed.
    pub async fn check_lots(&self) -> usize {
        let lots = match self.lots.list_active_lots().await {
            Ok(lots) => lots,
            Err(e) => {
                warn!("List active lots failed: {}", e);
                return 0;
            }
        };
        if lots.is_empty() {
            debug!("No active lots, skipping completion check");
            return 0;
        }

        let mut completed = 0;
        for lot in &lots {
            let summary = match self.evaluate_lot(lot).await {
                Ok(Some(summary)) => summary,
                Ok(None) => {
                    debug!(lot = %lot.lot_number, machine = %lot.machine_name, "Lot not ready for completion");
                    continue;
                }
                Err(e) => {
                    warn!(lot = %lot.lot_number, "Evaluate lot failed: {}", e);
                    continue;
                }
            };

            match self.lots.mark_lot_completed(lot.id, &summary).await {
                Ok(()) => {
                    completed += 1;
                    info!(
                        lot = %lot.lot_number,
                        machine = %lot.machine_name,
                        sensors = summary.sensors.len(),
                        "Lot completed: all sensors down"
                    );
                }
                Err(e) if e.is_lost_race() => {
                    debug!(lot = %lot.lot_number, "Lot already completed elsewhere");
                }
                Err(e) => {
                    warn!(lot = %lot.lot_number, "Mark lot completed failed: {}", e);
                }
            }
        }

        debug!(checked = lots.len(), completed, "Completion check finished");
        completed
    }

    /// Summary for `lot` when its machine has gone idle, `None` otherwise.
    pub async fn evaluate_lot(&self, lot: &Lot) -> Result<Option<LotSummary>, StoreError> {
        let required = self.settings.samples_required.max(1);
        let query = RecentQuery::for_machine(
            &self.settings.measurement,
            &lot.machine_name,
            self.settings.lookback,
            required * QUERY_BATCH_FACTOR,
        );

        let samples = self.series.query_recent(&query).await?;
        if samples.is_empty() {
            return Ok(None);
        }

        Ok(evaluate_window(
            &samples,
            required,
            self.settings.zero_threshold,
            &lot.machine_name,
        ))
    }
}
