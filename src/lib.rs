// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! LotLine - Synthetic Plant Telemetry and Lot Completion
//!
//! Simulates the sensors of a rotating set of production machines and
//! decides when a manufacturing lot is finished:
//! - Per-sensor operational state machine with randomized dwell times
//! - Machine rotation that advances one machine per tick
//! - Coordinator gating the simulation on the lots still processing
//! - Poll-based detector completing lots from recent down samples
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        LotLine Engine                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  tick   ┌──────────────┐  cycle  ┌─────────┐  │
//! │  │  Sensor   │ ──────→ │  Simulator   │ ──────→ │ Coord-  │  │
//! │  │  Fleet    │ ←────── │  (readings)  │         │ inator  │  │
//! │  └───────────┘ enable  └──────────────┘         └─────────┘  │
//! │        ↑                      ↓                      ↓       │
//! │        │               ┌──────────────┐         ┌─────────┐  │
//! │        └────────────── │  Time-series │ ──────→ │Completion│ │
//! │                        │    store     │         │ Detector │ │
//! │                        └──────────────┘         └─────────┘  │
//! │                               ↓                      ↓       │
//! │                        ┌─────────────────────────────────┐   │
//! │                        │       SQLite (readings, lots)   │   │
//! │                        └─────────────────────────────────┘   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod core;
pub mod db;
pub mod detection;
pub mod lots;
pub mod sensors;

// Re-exports for convenience
pub use config::{CompletionStrategy, Config, Settings};
pub use core::{Coordinator, Engine};
pub use db::{Database, LotStore, StoreError, TimeSeriesStore};
pub use detection::CompletionDetector;
pub use lots::{Lot, LotStatus, LotSummary, NewLot, ProductData};
pub use sensors::{CycleListener, SensorFleet, SensorSpec, Simulator};

/// LotLine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// LotLine name
pub const NAME: &str = "LotLine";
