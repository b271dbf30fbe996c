// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/lotline

//! Windowed "all sensors down" rule

use std::collections::BTreeMap;

use crate::db::Sample;
use crate::lots::{LotSummary, SensorSnapshot};

const DOWN_STATUS: &str = "down";

/// A sample counts as down when its status is `down` and its value is at or
/// below `threshold`.
pub fn is_down_sample(sample: &Sample, threshold: f64) -> bool {
    sample.status.eq_ignore_ascii_case(DOWN_STATUS) && sample.value <= threshold
}

/// Decide whether a machine has gone idle.
///
/// `samples` must be newest first. Only the first `samples_required` samples
/// of each sensor are considered. Returns a summary when every sensor has a
/// full window made only of down samples, `None` otherwise.
pub fn evaluate_window(
    samples: &[Sample],
    samples_required: usize,
    threshold: f64,
    machine_name: &str,
) -> Option<LotSummary> {
    let newest = samples.first()?;
    let required = samples_required.max(1);

    let mut windows: BTreeMap<&str, Vec<&Sample>> = BTreeMap::new();
    for sample in samples {
        let window = windows.entry(sample.sensor.as_str()).or_default();
        if window.len() < required {
            window.push(sample);
        }
    }

    let mut summary = LotSummary::minimal(newest.time, machine_name);
    for (name, window) in &windows {
        if window.len() < required || !window.iter().all(|s| is_down_sample(s, threshold)) {
            return None;
        }

        let latest = window[0];
        let average = window.iter().map(|s| s.value).sum::<f64>() / window.len() as f64;
        summary.sensors.push(SensorSnapshot {
            sensor_name: name.to_string(),
            latest_status: latest.status.clone(),
            latest_value: latest.value,
            average_down: average,
            observed_count: window.len(),
        });
    }

    Some(summary)
}
