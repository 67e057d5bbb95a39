// WaterTap Sim - Aggregation reports
// Copyright (c) 2026 WaterTap contributors
//
// Licensed under the MIT License. See LICENSE file for details.

//! Summary reports over persisted readings.
//!
//! A report covers one sensor over one time range: per-field summary
//! statistics (min/max/mean and linear-interpolation quartiles) plus
//! hourly-bucketed per-field means. Successive reports are keyed by the
//! end of the previous one so a range is never processed twice. This
//! module only computes and serializes; storage belongs to the caller.

use crate::reading::Reading;
use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Summary statistics for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldStats {
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    pub q1: f64,
    pub q3: f64,
}

impl FieldStats {
    /// Compute stats over a non-empty sample.
    fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let sum: f64 = sorted.iter().sum();
        Some(Self {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            avg: sum / sorted.len() as f64,
            q1: quantile(&sorted, 0.25),
            q3: quantile(&sorted, 0.75),
        })
    }
}

/// Linear-interpolation quantile over a sorted sample.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = position - lower as f64;
    sorted[lower] + weight * (sorted[upper] - sorted[lower])
}

/// Per-field summary statistics for one report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportStats {
    #[serde(rename = "flowRate")]
    pub flow_rate: FieldStats,
    pub turbidity: FieldStats,
    pub ph: FieldStats,
    pub conductivity: FieldStats,
}

/// Per-field means for one hour of the day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlySample {
    /// Hour label, `"HH:00"`.
    pub hour: String,
    #[serde(rename = "flowRate")]
    pub flow_rate: f64,
    pub turbidity: f64,
    pub ph: f64,
    pub conductivity: f64,
}

/// One report for one sensor over one time range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReport {
    pub sensor_id: u32,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub stats: ReportStats,
    pub samples: Vec<HourlySample>,
}

/// The range the next report should cover: from the previous report's
/// end, or the start of the current day when there is no previous one.
pub fn next_report_range(
    previous_to: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> (DateTime<Utc>, DateTime<Utc>) {
    let from = previous_to.unwrap_or_else(|| {
        now.with_hour(0)
            .and_then(|t| t.with_minute(0))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(now)
    });
    (from, now)
}

/// Build a report over one sensor's readings; `None` when empty.
///
/// Readings for other sensors are ignored, so a mixed slice can be
/// passed directly.
pub fn build_report(
    sensor_id: u32,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    readings: &[Reading],
) -> Option<SensorReport> {
    let own: Vec<&Reading> = readings
        .iter()
        .filter(|r| r.sensor_id == sensor_id)
        .collect();
    if own.is_empty() {
        return None;
    }

    let collect = |f: fn(&Reading) -> f64| -> Vec<f64> { own.iter().map(|r| f(r)).collect() };
    let stats = ReportStats {
        flow_rate: FieldStats::from_values(&collect(|r| r.flow_rate))?,
        turbidity: FieldStats::from_values(&collect(|r| r.turbidity))?,
        ph: FieldStats::from_values(&collect(|r| r.ph))?,
        conductivity: FieldStats::from_values(&collect(|r| r.conductivity))?,
    };

    Some(SensorReport {
        sensor_id,
        from,
        to,
        stats,
        samples: hourly_samples(&own),
    })
}

/// Per-field means bucketed by hour of day, in hour order.
fn hourly_samples(readings: &[&Reading]) -> Vec<HourlySample> {
    let mut buckets: BTreeMap<u32, Vec<&Reading>> = BTreeMap::new();
    for reading in readings {
        buckets
            .entry(reading.timestamp.hour())
            .or_default()
            .push(reading);
    }

    buckets
        .into_iter()
        .map(|(hour, group)| {
            let n = group.len() as f64;
            HourlySample {
                hour: format!("{hour:02}:00"),
                flow_rate: group.iter().map(|r| r.flow_rate).sum::<f64>() / n,
                turbidity: group.iter().map(|r| r.turbidity).sum::<f64>() / n,
                ph: group.iter().map(|r| r.ph).sum::<f64>() / n,
                conductivity: group.iter().map(|r| r.conductivity).sum::<f64>() / n,
            }
        })
        .collect()
}
