// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Time-series storage on the `readings` table

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::params;
use rusqlite::types::Value;

use super::traits::{Point, RecentQuery, Sample, StoreError, TimeSeriesStore};
use super::Database;

/// Used when a query asks for a zero lookback
const FALLBACK_LOOKBACK: Duration = Duration::from_secs(3600);

fn nanos(ts: DateTime<Utc>) -> i64 {
    ts.timestamp_nanos_opt().unwrap_or(i64::MAX)
}

impl Database {
    fn insert_point(&self, point: &Point) -> Result<(), StoreError> {
        if point.measurement.trim().is_empty() {
            return Err(StoreError::MeasurementRequired);
        }
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO readings (measurement, machine, sensor, status, value, ts_nanos)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                point.measurement,
                point.machine,
                point.sensor,
                point.status,
                point.value,
                nanos(point.time),
            ],
        )?;
        Ok(())
    }

    fn select_recent(&self, query: &RecentQuery) -> Result<Vec<Sample>, StoreError> {
        if query.measurement.trim().is_empty() {
            return Err(StoreError::MeasurementRequired);
        }
        let lookback = if query.lookback.is_zero() {
            FALLBACK_LOOKBACK
        } else {
            query.lookback
        };
        let lookback = chrono::Duration::from_std(lookback).unwrap_or_else(|_| chrono::Duration::days(36_500));
        let since = Utc::now()
            .checked_sub_signed(lookback)
            .map(nanos)
            .unwrap_or(i64::MIN);

        let mut sql = String::from(
            "SELECT ts_nanos, machine, sensor, status, value FROM readings
             WHERE measurement = ?1 AND ts_nanos >= ?2",
        );
        let mut args: Vec<Value> = vec![Value::Text(query.measurement.clone()), Value::Integer(since)];
        if let Some(machine) = &query.machine {
            args.push(Value::Text(machine.clone()));
            sql.push_str(&format!(" AND machine = ?{}", args.len()));
        }
        if let Some(sensor) = &query.sensor {
            args.push(Value::Text(sensor.clone()));
            sql.push_str(&format!(" AND sensor = ?{}", args.len()));
        }
        sql.push_str(&format!(" ORDER BY ts_nanos DESC, id DESC LIMIT {}", query.limit));

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(args), |row| {
            let ts: i64 = row.get(0)?;
            Ok(Sample {
                time: Utc.timestamp_nanos(ts),
                machine: row.get(1)?,
                sensor: row.get(2)?,
                status: row.get(3)?,
                value: row.get(4)?,
            })
        })?;

        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Mean value per sensor of one machine between `start` and `end`, inclusive
    pub fn sensor_means(
        &self,
        measurement: &str,
        machine: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<BTreeMap<String, f64>, StoreError> {
        if measurement.trim().is_empty() {
            return Err(StoreError::MeasurementRequired);
        }
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(
            "SELECT sensor, AVG(value) FROM readings
             WHERE measurement = ?1 AND machine = ?2 AND ts_nanos >= ?3 AND ts_nanos <= ?4
             GROUP BY sensor",
        )?;
        let rows = stmt.query_map(params![measurement, machine, nanos(start), nanos(end)], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?))
        })?;

        let mut means = BTreeMap::new();
        for row in rows {
            let (sensor, mean) = row?;
            means.insert(sensor, mean);
        }
        Ok(means)
    }
}

#[async_trait]
impl TimeSeriesStore for Database {
    async fn write_point(&self, point: &Point) -> Result<(), StoreError> {
        let point = point.clone();
        self.blocking(move |db| db.insert_point(&point)).await
    }

    async fn query_recent(&self, query: &RecentQuery) -> Result<Vec<Sample>, StoreError> {
        let query = query.clone();
        self.blocking(move |db| db.select_recent(&query)).await
    }
}
