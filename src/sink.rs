// WaterTap Sim - Reading sinks
// Copyright (c) 2026 WaterTap contributors
//
// Licensed under the MIT License. See LICENSE file for details.

//! Sink abstractions for emitted readings.
//!
//! The driver hands each record to a [`ReadingSink`] one at a time; a
//! write failure is fatal for the run and is never retried here. Two
//! writer-backed sinks cover the wire formats the original deployment
//! stored (line protocol and JSON lines); `MemorySink` captures records
//! for tests and report computation.

use crate::reading::{Reading, MEASUREMENT};
use chrono::{DateTime, Utc};
use std::io::Write;
use thiserror::Error;

/// Sink error types.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("timestamp out of nanosecond range: {0}")]
    TimestampRange(DateTime<Utc>),
}

/// Accepts readings one at a time, or in batches.
pub trait ReadingSink {
    /// Write a single reading.
    fn write(&mut self, reading: &Reading) -> Result<(), SinkError>;

    /// Write a batch; semantics identical to sequential writes.
    fn write_batch(&mut self, readings: &[Reading]) -> Result<(), SinkError> {
        for reading in readings {
            self.write(reading)?;
        }
        Ok(())
    }

    /// Flush any buffered output.
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }
}

/// Renders readings as InfluxDB line protocol, one line per record:
///
/// ```text
/// water_sensors,sensor_id=1 flowRate=0.123,turbidity=0.46,ph=7.2,conductivity=213.41 1767225600000000000
/// ```
pub struct LineProtocolSink<W: Write> {
    writer: W,
    measurement: String,
}

impl<W: Write> LineProtocolSink<W> {
    /// Create a sink writing to `writer` under the default measurement.
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            measurement: MEASUREMENT.to_string(),
        }
    }

    /// Override the measurement name.
    pub fn with_measurement(mut self, measurement: &str) -> Self {
        self.measurement = measurement.to_string();
        self
    }

    /// Consume the sink, returning the inner writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReadingSink for LineProtocolSink<W> {
    fn write(&mut self, reading: &Reading) -> Result<(), SinkError> {
        let nanos = reading
            .timestamp
            .timestamp_nanos_opt()
            .ok_or(SinkError::TimestampRange(reading.timestamp))?;
        writeln!(
            self.writer,
            "{},sensor_id={} flowRate={},turbidity={},ph={},conductivity={} {}",
            self.measurement,
            reading.sensor_id,
            reading.flow_rate,
            reading.turbidity,
            reading.ph,
            reading.conductivity,
            nanos
        )?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Serializes each reading as one JSON object per line.
pub struct JsonLinesSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ReadingSink for JsonLinesSink<W> {
    fn write(&mut self, reading: &Reading) -> Result<(), SinkError> {
        serde_json::to_writer(&mut self.writer, reading)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Collects readings in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    readings: Vec<Reading>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Readings captured so far, in emission order.
    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    /// Consume the sink, returning the captured readings.
    pub fn into_readings(self) -> Vec<Reading> {
        self.readings
    }
}

impl ReadingSink for MemorySink {
    fn write(&mut self, reading: &Reading) -> Result<(), SinkError> {
        self.readings.push(reading.clone());
        Ok(())
    }
}
