// WaterTap Sim - Stochastic water-usage telemetry simulator
// Copyright (c) 2026 WaterTap contributors
//
// Licensed under the MIT License. See LICENSE file for details.

//! # WaterTap Sim
//!
//! Synthesizes realistic multivariate water-usage telemetry (flow rate,
//! turbidity, pH, conductivity) for a configurable number of independent
//! sensors, emitting timestamped readings at a controlled cadence toward
//! a pluggable sink.
//!
//! Each sensor runs three overlapping timed states: short normal usage
//! bursts (sink or fountain draws), a "valve left open" anomaly that
//! overrides normal usage, and a "water turned dirty" anomaly that
//! raises turbidity and depresses pH. Readings are internally
//! consistent: turbidity follows flow, pH follows contamination, and
//! every field stays inside physically sane bounds.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use watertap_sim::{
//!     MemorySink, SimulationConfig, SimulationDriver, Simulator,
//! };
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! // Ten minutes of telemetry for four sensors, one reading per minute.
//! let config = SimulationConfig::new()
//!     .with_sensor_count(4)
//!     .with_interval_secs(60.0)
//!     .with_duration_secs(600.0)
//!     .with_seed(42);
//!
//! let mut driver = SimulationDriver::new(Simulator::new(config)?);
//! let mut sink = MemorySink::new();
//! let summary = driver.run(&mut sink).await?;
//!
//! assert_eq!(summary.records_emitted, 40);
//! # Ok(())
//! # }
//! ```
//!
//! ## Determinism
//!
//! A fixed seed yields a fixed trajectory: profiles, anomaly starts,
//! durations and every noise draw come from one generator consumed in
//! sensor-id order. Two runs with the same seed, sensor count, interval
//! and duration produce byte-identical records.
//!
//! ## Reports
//!
//! The [`report`] module computes the downstream per-sensor summaries
//! (min/max/mean/quartiles and hourly means) the storage layer keeps per
//! run, keyed by the end of the previous report.

pub mod config;
pub mod driver;
pub mod engine;
pub mod reading;
pub mod report;
pub mod scheduler;
pub mod sensor;
pub mod sink;
pub mod synth;

// Re-exports for convenience
pub use config::{
    parse_duration_secs, AnomalyConfig, ConfigError, DirtyWaterParams, OpenValveParams,
    SimulationConfig, Span, TurbiditySpikeParams,
};
pub use driver::{DriverError, DriverHandle, RunSummary, SimulationDriver};
pub use engine::Simulator;
pub use reading::{Reading, MEASUREMENT};
pub use report::{
    build_report, next_report_range, FieldStats, HourlySample, ReportStats, SensorReport,
};
pub use scheduler::AnomalyScheduler;
pub use sensor::{SensorProfile, SensorState, UsageKind};
pub use sink::{JsonLinesSink, LineProtocolSink, MemorySink, ReadingSink, SinkError};
pub use synth::ReadingSynthesizer;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
