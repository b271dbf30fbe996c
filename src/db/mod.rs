// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Database module for persistent storage
//!
//! One SQLite file backs both collaborators: sensor samples live in
//! `readings`, lot metadata in `lots`.

mod lots;
mod readings;
mod traits;

pub use traits::{LotStore, Point, RecentQuery, Sample, StoreError, TimeSeriesStore};

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use tracing::info;

/// Database manager
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open or create database
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        // Create parent directories
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        // Configure SQLite for performance
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA cache_size = -64000;
            PRAGMA temp_store = MEMORY;
            PRAGMA busy_timeout = 5000;
        "#,
        )?;

        let db = Self::from_connection(conn)?;
        info!("Database opened at {:?}", path);
        Ok(db)
    }

    /// Private in-memory database
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        let db = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.create_tables()?;
        Ok(db)
    }

    /// Create database tables
    fn create_tables(&self) -> Result<(), StoreError> {
        let conn = self.conn.lock();

        conn.execute_batch(
            r#"
            -- Time-series samples
            CREATE TABLE IF NOT EXISTS readings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                measurement TEXT NOT NULL,
                machine TEXT NOT NULL,
                sensor TEXT NOT NULL,
                status TEXT NOT NULL,
                value REAL NOT NULL,
                ts_nanos INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_readings_time ON readings(measurement, ts_nanos);
            CREATE INDEX IF NOT EXISTS idx_readings_machine ON readings(measurement, machine, ts_nanos);

            -- Lot metadata
            CREATE TABLE IF NOT EXISTS lots (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                lot_number TEXT NOT NULL UNIQUE,
                machine_name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'processing',
                started_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                completed_at TEXT,
                summary_json TEXT,
                good_product INTEGER,
                defect_product INTEGER,
                conclusion TEXT,
                averages_json TEXT,
                operation_hour REAL
            );

            CREATE INDEX IF NOT EXISTS idx_lots_status ON lots(status, started_at);
        "#,
        )?;

        // Files created before the computed columns existed
        add_missing_column(&conn, "lots", "averages_json", "TEXT")?;
        add_missing_column(&conn, "lots", "operation_hour", "REAL")?;

        Ok(())
    }

    /// Run a blocking SQLite call on tokio's blocking pool.
    ///
    /// Async store methods go through here so a busy database never parks a
    /// runtime worker.
    pub(crate) async fn blocking<T, F>(&self, work: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Database) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.clone();
        tokio::task::spawn_blocking(move || work(&db)).await?
    }
}

fn add_missing_column(conn: &Connection, table: &str, column: &str, decl: &str) -> Result<(), StoreError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt.query_map([], |row| row.get::<_, String>(1))?;
    for name in names {
        if name? == column {
            return Ok(());
        }
    }
    conn.execute_batch(&format!("ALTER TABLE {} ADD COLUMN {} {}", table, column, decl))?;
    info!(table, column, "Added missing column");
    Ok(())
}

/// Fixed-width RFC 3339 so text order matches time order
pub(crate) fn format_time(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_time(raw: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| StoreError::Malformed(format!("timestamp {:?}: {}", raw, e)))
}
