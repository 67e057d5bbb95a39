// WaterTap Sim - Simulation configuration
// Copyright (c) 2026 WaterTap contributors
//
// Licensed under the MIT License. See LICENSE file for details.

//! Configuration types for the telemetry simulator.
//!
//! All knobs live here: emission cadence, run bounds, seeding, pacing,
//! and the per-anomaly rate/duration/magnitude parameters. Validation
//! happens once, at simulator construction, so the per-tick arithmetic
//! never sees an out-of-range value.

use chrono::{DateTime, Utc};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lower bound for the global intensity multiplier.
pub const MIN_INTENSITY: f64 = 0.1;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("sensor count must be at least 1")]
    InvalidSensorCount,

    #[error("interval must be positive, got {0}")]
    InvalidInterval(f64),

    #[error("duration must be positive, got {0}")]
    InvalidDuration(f64),

    #[error("pacing must be positive, got {0}")]
    InvalidPacing(f64),

    #[error("malformed duration string: {0:?}")]
    MalformedDuration(String),
}

/// An inclusive numeric window to draw uniform values from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub min: f64,
    pub max: f64,
}

impl Span {
    /// Create a new span.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Draw a uniform value from the window.
    pub fn sample(&self, rng: &mut (impl Rng + ?Sized)) -> f64 {
        if self.max <= self.min {
            return self.min;
        }
        rng.gen_range(self.min..=self.max)
    }

    /// Return the span with min/max swapped if they were inverted.
    fn normalized(self) -> Self {
        if self.max < self.min {
            Self {
                min: self.max,
                max: self.min,
            }
        } else {
            self
        }
    }
}

/// Open-valve anomaly parameters.
///
/// Models a valve left running: a sustained high-flow condition that
/// overrides normal usage while active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenValveParams {
    /// Start probability per hour of elapsed simulated time, in [0, 1].
    pub prob_per_hour: f64,
    /// Duration window in seconds.
    pub duration_s: Span,
    /// Target flow window, scaled by intensity when drawn.
    pub flow: Span,
}

impl Default for OpenValveParams {
    fn default() -> Self {
        Self {
            prob_per_hour: 0.05,
            duration_s: Span::new(300.0, 900.0),
            flow: Span::new(6.0, 10.0),
        }
    }
}

/// Dirty-water anomaly parameters.
///
/// Models a sustained contamination period: elevated turbidity and
/// depressed pH while active.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirtyWaterParams {
    /// Start probability per hour of elapsed simulated time, in [0, 1].
    pub prob_per_hour: f64,
    /// Duration window in seconds.
    pub duration_s: Span,
    /// Extra turbidity magnitude window (raw; intensity applies at sampling).
    pub extra_turbidity: Span,
}

impl Default for DirtyWaterParams {
    fn default() -> Self {
        Self {
            prob_per_hour: 0.03,
            duration_s: Span::new(300.0, 1200.0),
            extra_turbidity: Span::new(1.0, 3.0),
        }
    }
}

/// Turbidity spike parameters (instantaneous, per-sample).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurbiditySpikeParams {
    /// Spike probability per emitted sample, in [0, 1].
    pub prob_per_sample: f64,
    /// Spike magnitude window, scaled by intensity when applied.
    pub magnitude: Span,
}

impl Default for TurbiditySpikeParams {
    fn default() -> Self {
        Self {
            prob_per_sample: 0.01,
            magnitude: Span::new(2.0, 5.0),
        }
    }
}

/// All anomaly knobs, grouped.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnomalyConfig {
    pub open_valve: OpenValveParams,
    pub dirty_water: DirtyWaterParams,
    pub turbidity_spike: TurbiditySpikeParams,
}

impl AnomalyConfig {
    /// All start probabilities forced to zero; magnitudes untouched.
    pub fn quiescent() -> Self {
        let mut config = Self::default();
        config.open_valve.prob_per_hour = 0.0;
        config.dirty_water.prob_per_hour = 0.0;
        config.turbidity_spike.prob_per_sample = 0.0;
        config
    }
}

/// Top-level simulation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of independent sensors, ids 1..=N.
    pub sensor_count: u32,
    /// Seconds of simulated time per tick; also the emission cadence.
    pub interval_secs: f64,
    /// Total simulated duration in seconds; `None` runs unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    /// Random seed; `None` draws one from OS entropy.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Virtual-clock anchor for record timestamps; `None` uses the wall
    /// clock at run start, truncated to whole seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,
    /// Pacing factor: 1.0 emits in real time, larger values compress the
    /// wall-clock wait between records. Timestamps are unaffected.
    pub pacing: f64,
    /// Global multiplier on noise and anomaly magnitudes (not frequencies).
    pub intensity: f64,
    /// Anomaly knobs.
    pub anomalies: AnomalyConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sensor_count: 4,
            interval_secs: 60.0,
            duration_secs: None,
            seed: None,
            start_time: None,
            pacing: 1.0,
            intensity: 1.0,
            anomalies: AnomalyConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Create a configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sensor count.
    pub fn with_sensor_count(mut self, count: u32) -> Self {
        self.sensor_count = count;
        self
    }

    /// Set the emission interval in seconds.
    pub fn with_interval_secs(mut self, secs: f64) -> Self {
        self.interval_secs = secs;
        self
    }

    /// Bound the run to a total simulated duration in seconds.
    pub fn with_duration_secs(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Set the random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Anchor the virtual clock at a fixed instant.
    pub fn with_start_time(mut self, start: DateTime<Utc>) -> Self {
        self.start_time = Some(start);
        self
    }

    /// Set the pacing factor.
    pub fn with_pacing(mut self, pacing: f64) -> Self {
        self.pacing = pacing;
        self
    }

    /// Set the global intensity multiplier.
    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.intensity = intensity;
        self
    }

    /// Replace the anomaly knobs.
    pub fn with_anomalies(mut self, anomalies: AnomalyConfig) -> Self {
        self.anomalies = anomalies;
        self
    }

    /// Validate hard constraints and clamp soft ones.
    ///
    /// Rejects a zero sensor count, a non-positive interval/duration and a
    /// non-positive pacing factor. Probabilities are clamped into [0, 1],
    /// intensity to at least [`MIN_INTENSITY`], and inverted min/max
    /// windows are normalized.
    pub fn validated(mut self) -> Result<Self, ConfigError> {
        if self.sensor_count == 0 {
            return Err(ConfigError::InvalidSensorCount);
        }
        if !(self.interval_secs > 0.0) || !self.interval_secs.is_finite() {
            return Err(ConfigError::InvalidInterval(self.interval_secs));
        }
        if let Some(duration) = self.duration_secs {
            if !(duration > 0.0) || !duration.is_finite() {
                return Err(ConfigError::InvalidDuration(duration));
            }
        }
        if !(self.pacing > 0.0) {
            return Err(ConfigError::InvalidPacing(self.pacing));
        }

        self.intensity = if self.intensity.is_finite() {
            self.intensity.max(MIN_INTENSITY)
        } else {
            1.0
        };

        let anomalies = &mut self.anomalies;
        anomalies.open_valve.prob_per_hour = clamp_probability(anomalies.open_valve.prob_per_hour);
        anomalies.dirty_water.prob_per_hour = clamp_probability(anomalies.dirty_water.prob_per_hour);
        anomalies.turbidity_spike.prob_per_sample =
            clamp_probability(anomalies.turbidity_spike.prob_per_sample);
        anomalies.open_valve.duration_s = anomalies.open_valve.duration_s.normalized();
        anomalies.open_valve.flow = anomalies.open_valve.flow.normalized();
        anomalies.dirty_water.duration_s = anomalies.dirty_water.duration_s.normalized();
        anomalies.dirty_water.extra_turbidity = anomalies.dirty_water.extra_turbidity.normalized();
        anomalies.turbidity_spike.magnitude = anomalies.turbidity_spike.magnitude.normalized();

        Ok(self)
    }
}

fn clamp_probability(p: f64) -> f64 {
    if p.is_finite() {
        p.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Parse a duration string into seconds.
///
/// Accepts a bare number (seconds) or a number with an `s`, `m` or `h`
/// suffix. Fractional values are allowed: `"1.5m"` is 90 seconds.
pub fn parse_duration_secs(input: &str) -> Result<f64, ConfigError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::MalformedDuration(input.to_string()));
    }

    let (number, factor) = match trimmed.chars().last() {
        Some('s') => (&trimmed[..trimmed.len() - 1], 1.0),
        Some('m') => (&trimmed[..trimmed.len() - 1], 60.0),
        Some('h') => (&trimmed[..trimmed.len() - 1], 3600.0),
        _ => (trimmed, 1.0),
    };

    let value: f64 = number
        .parse()
        .map_err(|_| ConfigError::MalformedDuration(input.to_string()))?;

    let secs = value * factor;
    if !(secs > 0.0) || !secs.is_finite() {
        return Err(ConfigError::InvalidDuration(secs));
    }
    Ok(secs)
}
