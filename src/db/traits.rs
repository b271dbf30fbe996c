// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Storage contracts consumed by the simulation core

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lots::{Lot, LotSummary};
use crate::sensors::SensorReading;

/// Errors surfaced by the stores
#[derive(Debug, Error)]
pub enum StoreError {
    /// Conditional completion touched no row: the lot is gone or no longer
    /// processing. Callers treat this as an already-settled race.
    #[error("lot {lot_id} is not processing")]
    NotProcessing { lot_id: i64 },

    #[error("lot not found")]
    NotFound,

    #[error("lot number is required")]
    LotNumberRequired,

    #[error("lot {0} already exists")]
    LotExists(String),

    #[error("measurement is required")]
    MeasurementRequired,

    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("summary payload: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("stored value is malformed: {0}")]
    Malformed(String),

    #[error("storage task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl StoreError {
    /// Another path already completed the lot
    pub fn is_lost_race(&self) -> bool {
        matches!(self, Self::NotProcessing { .. })
    }
}

/// One time-series point written per sensor per tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub measurement: String,
    pub machine: String,
    pub sensor: String,
    pub status: String,
    pub value: f64,
    pub time: DateTime<Utc>,
}

impl Point {
    pub fn from_reading(measurement: &str, reading: &SensorReading) -> Self {
        Self {
            measurement: measurement.to_string(),
            machine: reading.machine_name.clone(),
            sensor: reading.sensor_name.clone(),
            status: reading.status.clone(),
            value: reading.value,
            time: reading.timestamp,
        }
    }
}

/// A stored reading as returned by [`TimeSeriesStore::query_recent`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time: DateTime<Utc>,
    pub machine: String,
    pub sensor: String,
    pub status: String,
    pub value: f64,
}

/// Filters for a newest-first time-series query
#[derive(Debug, Clone)]
pub struct RecentQuery {
    pub measurement: String,
    pub machine: Option<String>,
    pub sensor: Option<String>,
    pub lookback: Duration,
    pub limit: usize,
}

impl RecentQuery {
    pub fn for_machine(measurement: &str, machine: &str, lookback: Duration, limit: usize) -> Self {
        Self {
            measurement: measurement.to_string(),
            machine: Some(machine.to_string()),
            sensor: None,
            lookback,
            limit,
        }
    }
}

/// Time-series collaborator
#[async_trait]
pub trait TimeSeriesStore: Send + Sync {
    async fn write_point(&self, point: &Point) -> Result<(), StoreError>;

    /// Samples within the lookback window, ordered newest first
    async fn query_recent(&self, query: &RecentQuery) -> Result<Vec<Sample>, StoreError>;
}

/// Lot metadata collaborator
#[async_trait]
pub trait LotStore: Send + Sync {
    /// Lots in `processing`, oldest first
    async fn list_active_lots(&self) -> Result<Vec<Lot>, StoreError>;

    async fn has_active_lots(&self) -> Result<bool, StoreError>;

    /// Atomically move a processing lot to completed and attach `summary`.
    ///
    /// Fails with [`StoreError::NotProcessing`] when no processing row matched.
    async fn mark_lot_completed(&self, lot_id: i64, summary: &LotSummary) -> Result<(), StoreError>;
}
