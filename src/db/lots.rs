// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Lot metadata on the `lots` table

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use super::traits::{LotStore, StoreError};
use super::{format_time, parse_time, Database};
use crate::lots::{Lot, LotStatus, LotSummary, NewLot, ProductData, ProductOutcome};

const LOT_COLUMNS: &str = "id, lot_number, machine_name, status, started_at, completed_at, \
     updated_at, summary_json, good_product, defect_product, conclusion, averages_json, operation_hour";

/// Machine name used when neither a machine nor a lot number is usable
const FALLBACK_MACHINE: &str = "auto-machine";

fn normalize_machine_name(lot_number: &str, machine_name: &str) -> String {
    let machine = machine_name.trim();
    if !machine.is_empty() {
        return machine.to_string();
    }
    let lot = lot_number.trim();
    if !lot.is_empty() {
        return lot.to_string();
    }
    FALLBACK_MACHINE.to_string()
}

/// Raw column values; converted outside the rusqlite row callback
struct LotRow {
    id: i64,
    lot_number: String,
    machine_name: String,
    status: String,
    started_at: String,
    completed_at: Option<String>,
    updated_at: String,
    summary_json: Option<String>,
    good_product: Option<i64>,
    defect_product: Option<i64>,
    conclusion: Option<String>,
    averages_json: Option<String>,
    operation_hour: Option<f64>,
}

impl LotRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            lot_number: row.get(1)?,
            machine_name: row.get(2)?,
            status: row.get(3)?,
            started_at: row.get(4)?,
            completed_at: row.get(5)?,
            updated_at: row.get(6)?,
            summary_json: row.get(7)?,
            good_product: row.get(8)?,
            defect_product: row.get(9)?,
            conclusion: row.get(10)?,
            averages_json: row.get(11)?,
            operation_hour: row.get(12)?,
        })
    }

    fn into_lot(self) -> Result<Lot, StoreError> {
        let status = LotStatus::parse(&self.status)
            .ok_or_else(|| StoreError::Malformed(format!("lot status {:?}", self.status)))?;
        let averages = match self.averages_json.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(serde_json::from_str::<BTreeMap<String, f64>>(raw)?),
        };
        Ok(Lot {
            id: self.id,
            lot_number: self.lot_number,
            machine_name: self.machine_name,
            status,
            started_at: parse_time(&self.started_at)?,
            completed_at: self.completed_at.as_deref().map(parse_time).transpose()?,
            updated_at: parse_time(&self.updated_at)?,
            good_product: self.good_product,
            defect_product: self.defect_product,
            conclusion: self.conclusion,
            averages,
            operation_hour: self.operation_hour,
            summary_json: self.summary_json,
        })
    }
}

fn select_lots(conn: &Connection, filter: &str, args: &[&dyn rusqlite::ToSql]) -> Result<Vec<Lot>, StoreError> {
    let sql = format!("SELECT {} FROM lots {}", LOT_COLUMNS, filter);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(args, LotRow::read)?;

    let mut lots = Vec::new();
    for row in rows {
        lots.push(row?.into_lot()?);
    }
    Ok(lots)
}

fn select_one(conn: &Connection, filter: &str, arg: &dyn rusqlite::ToSql) -> Result<Lot, StoreError> {
    let sql = format!("SELECT {} FROM lots {}", LOT_COLUMNS, filter);
    conn.query_row(&sql, &[arg], LotRow::read)
        .optional()?
        .ok_or(StoreError::NotFound)?
        .into_lot()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

impl Database {
    /// Insert a new lot in `processing`.
    pub fn create_lot(&self, input: &NewLot) -> Result<Lot, StoreError> {
        let lot_number = input.lot_number.trim();
        if lot_number.is_empty() {
            return Err(StoreError::LotNumberRequired);
        }
        let machine_name = normalize_machine_name(lot_number, &input.machine_name);
        let now = format_time(Utc::now());

        let conn = self.conn.lock();
        let inserted = conn.execute(
            "INSERT INTO lots (lot_number, machine_name, status, started_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)",
            params![lot_number, machine_name, LotStatus::Processing.as_str(), now],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::LotExists(lot_number.to_string()));
            }
            Err(e) => return Err(e.into()),
        }

        let id = conn.last_insert_rowid();
        info!(lot_id = id, lot_number, machine = %machine_name, "Lot created");
        select_one(&conn, "WHERE id = ?1", &id)
    }

    pub fn get_lot(&self, id: i64) -> Result<Lot, StoreError> {
        let conn = self.conn.lock();
        select_one(&conn, "WHERE id = ?1", &id)
    }

    pub fn get_lot_by_number(&self, lot_number: &str) -> Result<Lot, StoreError> {
        let conn = self.conn.lock();
        select_one(&conn, "WHERE lot_number = ?1", &lot_number.trim())
    }

    /// Every lot, newest first
    pub fn list_lots(&self) -> Result<Vec<Lot>, StoreError> {
        let conn = self.conn.lock();
        select_lots(&conn, "ORDER BY started_at DESC, id DESC", &[])
    }

    /// Attach product counts and a conclusion, creating the lot when missing.
    pub fn record_product_outcome(&self, lot_number: &str, outcome: &ProductOutcome) -> Result<Lot, StoreError> {
        let lot = match self.get_lot_by_number(lot_number) {
            Ok(lot) => lot,
            Err(StoreError::NotFound) => self.create_lot(&NewLot::new(lot_number, ""))?,
            Err(e) => return Err(e),
        };

        let conn = self.conn.lock();
        conn.execute(
            "UPDATE lots SET good_product = ?1, defect_product = ?2, conclusion = ?3, updated_at = ?4
             WHERE id = ?5",
            params![
                outcome.good_product,
                outcome.defect_product,
                outcome.conclusion,
                format_time(Utc::now()),
                lot.id,
            ],
        )?;
        debug!(lot_id = lot.id, "Product outcome recorded");
        select_one(&conn, "WHERE id = ?1", &lot.id)
    }

    pub fn delete_lot_by_number(&self, lot_number: &str) -> Result<(), StoreError> {
        let lot_number = lot_number.trim();
        if lot_number.is_empty() {
            return Err(StoreError::LotNumberRequired);
        }
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM lots WHERE lot_number = ?1", params![lot_number])?;
        if deleted == 0 {
            return Err(StoreError::NotFound);
        }
        info!(lot_number, "Lot deleted");
        Ok(())
    }

    /// Product view of every lot, newest first
    pub fn list_product_data(&self) -> Result<Vec<ProductData>, StoreError> {
        let now = Utc::now();
        self.list_lots()?
            .iter()
            .map(|lot| lot.product_data(now).map_err(StoreError::from))
            .collect()
    }

    /// Completed lots still lacking stored averages or operation hours
    pub fn list_completed_lots_missing_data(&self) -> Result<Vec<Lot>, StoreError> {
        let conn = self.conn.lock();
        select_lots(
            &conn,
            "WHERE status = ?1 AND (averages_json IS NULL OR operation_hour IS NULL)
             ORDER BY started_at ASC, id ASC",
            &[&LotStatus::Completed.as_str()],
        )
    }

    /// Store computed fields. `None` leaves the column unchanged.
    pub fn update_lot_computed_fields(
        &self,
        lot_id: i64,
        operation_hour: Option<f64>,
        averages: Option<&BTreeMap<String, f64>>,
    ) -> Result<(), StoreError> {
        let averages_json = averages.map(serde_json::to_string).transpose()?;
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE lots SET averages_json = COALESCE(?1, averages_json),
                 operation_hour = COALESCE(?2, operation_hour), updated_at = ?3
             WHERE id = ?4",
            params![averages_json, operation_hour, format_time(Utc::now()), lot_id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Fill averages and operation hours of completed lots from `measurement`.
    ///
    /// Averages are the per-sensor means of the lot's machine over
    /// `[started_at, completed_at]`. A lot that fails is logged and skipped.
    /// Returns the lot numbers that were updated.
    pub fn backfill_computed_fields(&self, measurement: &str) -> Result<Vec<String>, StoreError> {
        if measurement.trim().is_empty() {
            return Err(StoreError::MeasurementRequired);
        }

        let mut updated = Vec::new();
        for lot in self.list_completed_lots_missing_data()? {
            let Some(end) = lot.completed_at else {
                continue;
            };
            if end < lot.started_at {
                warn!(lot_number = %lot.lot_number, "Skipping lot with completion before start");
                continue;
            }

            let hours = lot.operation_hours(end);
            let averages = match self.sensor_means(measurement, &lot.machine_name, lot.started_at, end) {
                Ok(averages) => averages,
                Err(e) => {
                    warn!(lot_number = %lot.lot_number, "Averages query failed: {}", e);
                    continue;
                }
            };
            if let Err(e) = self.update_lot_computed_fields(lot.id, Some(hours), Some(&averages)) {
                warn!(lot_number = %lot.lot_number, "Computed field update failed: {}", e);
                continue;
            }
            debug!(lot_number = %lot.lot_number, hours, sensors = averages.len(), "Lot backfilled");
            updated.push(lot.lot_number);
        }

        info!(count = updated.len(), "Backfill finished");
        Ok(updated)
    }

    fn active_lots(&self) -> Result<Vec<Lot>, StoreError> {
        let conn = self.conn.lock();
        select_lots(
            &conn,
            "WHERE status = ?1 ORDER BY started_at ASC, id ASC",
            &[&LotStatus::Processing.as_str()],
        )
    }

    fn any_active_lot(&self) -> Result<bool, StoreError> {
        let conn = self.conn.lock();
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM lots WHERE status = ?1 LIMIT 1",
                params![LotStatus::Processing.as_str()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn complete_lot(&self, lot_id: i64, summary: &LotSummary) -> Result<(), StoreError> {
        let payload = serde_json::to_string(summary)?;
        let conn = self.conn.lock();
        let updated = conn.execute(
            "UPDATE lots SET status = ?1, completed_at = ?2, updated_at = ?3, summary_json = ?4
             WHERE id = ?5 AND status = ?6",
            params![
                LotStatus::Completed.as_str(),
                format_time(summary.completed_at),
                format_time(Utc::now()),
                payload,
                lot_id,
                LotStatus::Processing.as_str(),
            ],
        )?;
        if updated == 0 {
            return Err(StoreError::NotProcessing { lot_id });
        }
        Ok(())
    }
}

#[async_trait]
impl LotStore for Database {
    async fn list_active_lots(&self) -> Result<Vec<Lot>, StoreError> {
        self.blocking(|db| db.active_lots()).await
    }

    async fn has_active_lots(&self) -> Result<bool, StoreError> {
        self.blocking(|db| db.any_active_lot()).await
    }

    async fn mark_lot_completed(&self, lot_id: i64, summary: &LotSummary) -> Result<(), StoreError> {
        let summary = summary.clone();
        self.blocking(move |db| db.complete_lot(lot_id, &summary)).await
    }
}
