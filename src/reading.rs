// WaterTap Sim - Output records
// Copyright (c) 2026 WaterTap contributors
//
// Licensed under the MIT License. See LICENSE file for details.

//! The flat reading record handed to sinks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Measurement name readings are stored under.
pub const MEASUREMENT: &str = "water_sensors";

/// One reading for one sensor at one instant.
///
/// Field values are already clamped and rounded: three decimals for flow
/// and turbidity, two for pH and conductivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Sensor identifier (tag on the wire).
    pub sensor_id: u32,
    /// Timezone-aware instant of the reading.
    pub timestamp: DateTime<Utc>,
    /// Flow rate, non-negative.
    #[serde(rename = "flowRate")]
    pub flow_rate: f64,
    /// Turbidity, non-negative.
    pub turbidity: f64,
    /// pH, clamped to [6.0, 8.5].
    pub ph: f64,
    /// Conductivity in µS/cm.
    pub conductivity: f64,
}
