// WaterTap Sim - Reading synthesis
// Copyright (c) 2026 WaterTap contributors
//
// Licensed under the MIT License. See LICENSE file for details.

//! Turns a sensor's current state into one correlated reading.
//!
//! Flow is driven by whichever timer currently owns the tap (open valve
//! over usage over idle drip). Turbidity follows flow plus the dirty
//! state and rare spikes; pH sits near neutral and dips while the water
//! is dirty; conductivity is stationary noise around the per-sensor
//! baseline. Every field composes all of its additive terms first, then
//! clamps, then rounds once.

use crate::config::TurbiditySpikeParams;
use crate::reading::Reading;
use crate::sensor::{DirtyWaterTimer, OpenValveTimer, SensorProfile, SensorState, UsageTimer};
use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand_distr::Normal;

/// Emitted pH bounds.
pub const PH_MIN: f64 = 6.0;
pub const PH_MAX: f64 = 8.5;

/// Relative standard deviation of flow noise around the open-valve target.
const OPEN_FLOW_STD_FRAC: f64 = 0.06;
/// Relative standard deviation of flow noise around the usage target.
const USAGE_FLOW_STD_FRAC: f64 = 0.10;
/// Idle drip ceiling per unit intensity, and its absolute cap.
const IDLE_FLOW_PER_INTENSITY: f64 = 0.2;
const IDLE_FLOW_CAP: f64 = 1.0;

/// Turbidity model: base level, flow coupling, and noise window.
const TURBIDITY_BASE: f64 = 0.3;
const TURBIDITY_FLOW_COEFF: f64 = 0.12;
const TURBIDITY_NOISE: (f64, f64) = (-0.05, 0.15);

/// pH model: neutral baseline, jitter, contamination drop, rare excursion.
const PH_BASE: f64 = 7.0;
const PH_JITTER: f64 = 0.08;
const PH_DIRTY_DROP: (f64, f64) = (0.2, 0.5);
const PH_EXCURSION_PROB: f64 = 0.005;
const PH_EXCURSION: (f64, f64) = (0.15, 0.35);

/// Conductivity noise half-width around the per-sensor baseline.
const COND_JITTER: f64 = 8.0;

/// Round to a fixed number of decimal places.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Computes the four output fields for one instant.
#[derive(Debug, Clone)]
pub struct ReadingSynthesizer {
    spike: TurbiditySpikeParams,
    intensity: f64,
}

impl ReadingSynthesizer {
    /// Create a synthesizer from validated spike parameters.
    pub fn new(spike: TurbiditySpikeParams, intensity: f64) -> Self {
        Self { spike, intensity }
    }

    /// Synthesize one reading from the current state.
    ///
    /// Reads the state, never mutates it. The only randomness consumed is
    /// the noise draws documented per field, in field order: flow,
    /// turbidity, pH, conductivity.
    pub fn sample(
        &self,
        profile: &SensorProfile,
        state: &SensorState,
        timestamp: DateTime<Utc>,
        rng: &mut (impl Rng + ?Sized),
    ) -> Reading {
        let flow = self.sample_flow(state, rng).max(0.0);
        let turbidity = self.sample_turbidity(flow, state, rng).max(0.0);
        let ph = self.sample_ph(state, rng).clamp(PH_MIN, PH_MAX);
        let conductivity =
            profile.cond_base + rng.gen_range(-COND_JITTER..=COND_JITTER) * self.intensity;

        Reading {
            sensor_id: profile.sensor_id,
            timestamp,
            flow_rate: round_to(flow, 3),
            turbidity: round_to(turbidity, 3),
            ph: round_to(ph, 2),
            conductivity: round_to(conductivity, 2),
        }
    }

    fn sample_flow(&self, state: &SensorState, rng: &mut (impl Rng + ?Sized)) -> f64 {
        match (state.open_valve, state.usage) {
            (OpenValveTimer::Active { flow, .. }, _) => {
                Normal::new(flow, OPEN_FLOW_STD_FRAC * flow * self.intensity)
                    .unwrap()
                    .sample(rng)
            }
            (OpenValveTimer::Idle, UsageTimer::Active { target_flow, .. }) => {
                Normal::new(target_flow, USAGE_FLOW_STD_FRAC * target_flow)
                    .unwrap()
                    .sample(rng)
            }
            (OpenValveTimer::Idle, UsageTimer::Idle) => {
                let ceiling = (IDLE_FLOW_PER_INTENSITY * self.intensity).min(IDLE_FLOW_CAP);
                rng.gen_range(0.0..=ceiling)
            }
        }
    }

    fn sample_turbidity(
        &self,
        flow: f64,
        state: &SensorState,
        rng: &mut (impl Rng + ?Sized),
    ) -> f64 {
        let mut turbidity = TURBIDITY_BASE
            + TURBIDITY_FLOW_COEFF * flow
            + rng.gen_range(TURBIDITY_NOISE.0..=TURBIDITY_NOISE.1) * self.intensity;

        if let DirtyWaterTimer::Active { extra_turbidity, .. } = state.dirty_water {
            turbidity += extra_turbidity * self.intensity;
        }

        if rng.gen::<f64>() < self.spike.prob_per_sample {
            turbidity += self.spike.magnitude.sample(rng) * self.intensity;
        }

        turbidity
    }

    fn sample_ph(&self, state: &SensorState, rng: &mut (impl Rng + ?Sized)) -> f64 {
        let mut ph = PH_BASE + rng.gen_range(-PH_JITTER..=PH_JITTER) * self.intensity;

        // Contamination trends acidic.
        if state.dirty_water.is_active() {
            ph -= rng.gen_range(PH_DIRTY_DROP.0..=PH_DIRTY_DROP.1) * self.intensity;
        }

        if rng.gen::<f64>() < PH_EXCURSION_PROB {
            let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
            ph += sign * rng.gen_range(PH_EXCURSION.0..=PH_EXCURSION.1) * self.intensity;
        }

        ph
    }
}
