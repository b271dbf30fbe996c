// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Lot records and the summary captured when a lot completes

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Processing stage of a lot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LotStatus {
    Processing,
    Completed,
}

impl LotStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "processing" => Some(Self::Processing),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

impl std::fmt::Display for LotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A manufacturing batch tracked from creation to completion.
///
/// Owned by the lot store. The coordinator and the completion detector only
/// request the `processing -> completed` transition; they never edit fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub id: i64,
    pub lot_number: String,
    pub machine_name: String,
    pub status: LotStatus,
    pub started_at: DateTime<Utc>,
    /// Set iff `status == Completed`
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub good_product: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defect_product: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    /// Per-sensor means over the processing window, filled by backfill
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub averages: Option<BTreeMap<String, f64>>,
    /// Stored processing hours, filled by backfill
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_hour: Option<f64>,
    /// Raw summary payload as persisted; emitted as a JSON object
    #[serde(
        rename = "summary",
        default,
        skip_serializing_if = "Option::is_none",
        with = "summary_payload"
    )]
    pub summary_json: Option<String>,
}

impl Lot {
    pub fn is_processing(&self) -> bool {
        self.status == LotStatus::Processing
    }

    /// Decode the stored summary payload, if any.
    pub fn summary(&self) -> serde_json::Result<Option<LotSummary>> {
        match self.summary_json.as_deref() {
            None | Some("") => Ok(None),
            Some(raw) => serde_json::from_str(raw).map(Some),
        }
    }

    /// Hours spent in processing, rounded to one decimal.
    ///
    /// Open lots are measured up to `now`.
    pub fn operation_hours(&self, now: DateTime<Utc>) -> f64 {
        let end = self.completed_at.unwrap_or(now);
        if end < self.started_at {
            return 0.0;
        }
        let hours = (end - self.started_at).num_milliseconds() as f64 / 3_600_000.0;
        (hours * 10.0).round() / 10.0
    }

    /// Product-centric view of the lot.
    ///
    /// Values missing on the lot come from the completion summary: averages
    /// from the summary's sensors (keyed by lowercase name), product counts and
    /// the conclusion from the summary's own fields. Operation hours prefer
    /// the stored figure.
    pub fn product_data(&self, now: DateTime<Utc>) -> serde_json::Result<ProductData> {
        let summary = self.summary()?;

        let mut averages = self.averages.clone().unwrap_or_default();
        if averages.is_empty() {
            if let Some(summary) = &summary {
                for sensor in &summary.sensors {
                    let name = sensor.sensor_name.trim();
                    if !name.is_empty() {
                        averages.insert(name.to_lowercase(), sensor.latest_value);
                    }
                }
            }
        }

        let good_product = self
            .good_product
            .or_else(|| summary.as_ref().and_then(|s| s.good_product))
            .unwrap_or(0);
        let defect_product = self
            .defect_product
            .or_else(|| summary.as_ref().and_then(|s| s.defect_product))
            .unwrap_or(0);
        let conclusion = self
            .conclusion
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .or_else(|| summary.as_ref().and_then(|s| s.conclusion.clone()))
            .unwrap_or_default();

        Ok(ProductData {
            lot: self.lot_number.clone(),
            status: self.status,
            active_machine_id: self.machine_name.clone(),
            averages,
            operation_hour: self
                .operation_hour
                .unwrap_or_else(|| self.operation_hours(now)),
            good_product,
            defect_product,
            conclusion,
            updated_at: self.updated_at,
        })
    }
}

/// Lot as reported to product consumers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductData {
    pub lot: String,
    pub status: LotStatus,
    pub active_machine_id: String,
    pub averages: BTreeMap<String, f64>,
    pub operation_hour: f64,
    pub good_product: i64,
    pub defect_product: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub conclusion: String,
    pub updated_at: DateTime<Utc>,
}

/// Stored summary text in and out of JSON as an embedded object
mod summary_payload {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(raw: &Option<String>, serializer: S) -> Result<S::Ok, S::Error> {
        let value = raw.as_deref().map(|raw| {
            // unreadable payloads are passed through as text
            serde_json::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
        });
        value.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Option::<Value>::deserialize(deserializer)? {
            None | Some(Value::Null) => None,
            Some(Value::String(raw)) => Some(raw),
            Some(other) => Some(other.to_string()),
        })
    }
}

/// Input for registering a new lot
#[derive(Debug, Clone, Default)]
pub struct NewLot {
    pub lot_number: String,
    pub machine_name: String,
}

impl NewLot {
    pub fn new(lot_number: impl Into<String>, machine_name: impl Into<String>) -> Self {
        Self {
            lot_number: lot_number.into(),
            machine_name: machine_name.into(),
        }
    }
}

/// Manually reported production figures for a lot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductOutcome {
    pub good_product: Option<i64>,
    pub defect_product: Option<i64>,
    pub conclusion: Option<String>,
}

/// Aggregated sensor context stored once, when a lot completes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotSummary {
    pub completed_at: DateTime<Utc>,
    pub machine_name: String,
    #[serde(default)]
    pub sensors: Vec<SensorSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub good_product: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defect_product: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
}

impl LotSummary {
    /// Summary carrying only the completion time and machine.
    pub fn minimal(completed_at: DateTime<Utc>, machine_name: impl Into<String>) -> Self {
        Self {
            completed_at,
            machine_name: machine_name.into(),
            sensors: Vec::new(),
            good_product: None,
            defect_product: None,
            conclusion: None,
        }
    }
}

/// Latest readings of one sensor at completion time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorSnapshot {
    pub sensor_name: String,
    pub latest_status: String,
    pub latest_value: f64,
    pub average_down: f64,
    pub observed_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn lot(started_at: DateTime<Utc>, completed_at: Option<DateTime<Utc>>) -> Lot {
        Lot {
            id: 1,
            lot_number: "LOT-1".to_string(),
            machine_name: "Furnace-01".to_string(),
            status: if completed_at.is_some() { LotStatus::Completed } else { LotStatus::Processing },
            started_at,
            completed_at,
            updated_at: started_at,
            good_product: None,
            defect_product: None,
            conclusion: None,
            averages: None,
            operation_hour: None,
            summary_json: None,
        }
    }

    #[test]
    fn test_summary_payload_uses_camel_case_keys() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let mut summary = LotSummary::minimal(at, "CT-01");
        summary.sensors.push(SensorSnapshot {
            sensor_name: "FlowRate".to_string(),
            latest_status: "down".to_string(),
            latest_value: 0.0,
            average_down: 0.5,
            observed_count: 3,
        });

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["machineName"], "CT-01");
        assert_eq!(json["sensors"][0]["averageDown"], 0.5);
        assert_eq!(json["sensors"][0]["observedCount"], 3);
        assert!(json.get("goodProduct").is_none());
    }

    #[test]
    fn test_lot_summary_decoding() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let mut record = lot(at, Some(at));
        assert_eq!(record.summary().unwrap(), None);

        let summary = LotSummary::minimal(at, "UT-01");
        record.summary_json = Some(serde_json::to_string(&summary).unwrap());
        assert_eq!(record.summary().unwrap(), Some(summary));

        record.summary_json = Some("{not json".to_string());
        assert!(record.summary().is_err());
    }

    #[test]
    fn test_operation_hours() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let done = lot(start, Some(start + Duration::minutes(96)));
        assert_eq!(done.operation_hours(start), 1.6);

        let open = lot(start, None);
        assert_eq!(open.operation_hours(start + Duration::hours(2)), 2.0);
        assert_eq!(open.operation_hours(start - Duration::hours(1)), 0.0);
    }

    #[test]
    fn test_summary_serializes_as_object() {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let mut record = lot(at, Some(at));
        record.summary_json = Some(serde_json::to_string(&LotSummary::minimal(at, "UT-01")).unwrap());

        let json = serde_json::to_value(&record).unwrap();
        assert!(json["summary"].is_object());
        assert_eq!(json["summary"]["machineName"], "UT-01");
        assert!(json.get("averages").is_none());

        let back: Lot = serde_json::from_value(json).unwrap();
        assert_eq!(back.summary().unwrap(), record.summary().unwrap());

        record.summary_json = None;
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("summary").is_none());
        let back: Lot = serde_json::from_value(json).unwrap();
        assert_eq!(back.summary_json, None);
    }

    #[test]
    fn test_product_data_falls_back_to_summary() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let done = start + Duration::minutes(90);
        let mut record = lot(start, Some(done));

        let mut summary = LotSummary::minimal(done, "Furnace-01");
        summary.good_product = Some(40);
        summary.defect_product = Some(2);
        summary.conclusion = Some("rework".to_string());
        summary.sensors.push(SensorSnapshot {
            sensor_name: " FlowRate ".to_string(),
            latest_status: "down".to_string(),
            latest_value: 0.7,
            average_down: 0.5,
            observed_count: 3,
        });
        record.summary_json = Some(serde_json::to_string(&summary).unwrap());
        record.conclusion = Some("   ".to_string());

        let product = record.product_data(start).unwrap();
        assert_eq!(product.lot, "LOT-1");
        assert_eq!(product.active_machine_id, "Furnace-01");
        assert_eq!(product.averages.get("flowrate"), Some(&0.7));
        assert_eq!(product.operation_hour, 1.5);
        assert_eq!(product.good_product, 40);
        assert_eq!(product.defect_product, 2);
        assert_eq!(product.conclusion, "rework");
    }

    #[test]
    fn test_product_data_prefers_lot_values() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let mut record = lot(start, None);
        record.good_product = Some(10);
        record.conclusion = Some(" ok ".to_string());
        record.averages = Some(BTreeMap::from([("Temperature".to_string(), 21.5)]));
        record.operation_hour = Some(7.25);

        let mut summary = LotSummary::minimal(start, "Furnace-01");
        summary.good_product = Some(99);
        summary.defect_product = Some(4);
        summary.sensors.push(SensorSnapshot {
            sensor_name: "FlowRate".to_string(),
            latest_status: "down".to_string(),
            latest_value: 0.1,
            average_down: 0.1,
            observed_count: 3,
        });
        record.summary_json = Some(serde_json::to_string(&summary).unwrap());

        let product = record.product_data(start + Duration::hours(3)).unwrap();
        assert_eq!(product.averages.len(), 1);
        assert_eq!(product.averages.get("Temperature"), Some(&21.5));
        assert_eq!(product.operation_hour, 7.25);
        assert_eq!(product.good_product, 10);
        // lot has no defect count of its own
        assert_eq!(product.defect_product, 4);
        assert_eq!(product.conclusion, "ok");

        let bare = lot(start, None).product_data(start + Duration::hours(3)).unwrap();
        assert!(bare.averages.is_empty());
        assert_eq!(bare.operation_hour, 3.0);
        assert_eq!((bare.good_product, bare.defect_product), (0, 0));
        assert!(bare.conclusion.is_empty());
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json.get("conclusion").is_none());
        assert_eq!(json["activeMachineId"], "Furnace-01");
    }

    #[test]
    fn test_status_round_trip() {
        for status in [LotStatus::Processing, LotStatus::Completed] {
            assert_eq!(LotStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(LotStatus::parse("archived"), None);
    }
}
