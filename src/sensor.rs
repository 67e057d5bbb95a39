// WaterTap Sim - Sensor data model
// Copyright (c) 2026 WaterTap contributors
//
// Licensed under the MIT License. See LICENSE file for details.

//! Per-sensor static profile and mutable state.
//!
//! Each sensor carries three orthogonal timers (usage event, open-valve
//! anomaly, dirty-water anomaly). A timer is either `Idle` or `Active`
//! with its remaining duration and drawn magnitude, so an inactive timer
//! cannot carry stale countdown values.

use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Window the resting conductivity baseline is drawn from, in µS/cm.
pub const COND_BASE_RANGE: (f64, f64) = (180.0, 320.0);

/// Window the expected usage-event rate is drawn from, in events/minute.
pub const USE_RATE_RANGE: (f64, f64) = (0.05, 0.30);

/// Immutable per-sensor baseline, drawn once at simulator construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorProfile {
    /// Sensor identifier, unique within a run (ids start at 1).
    pub sensor_id: u32,
    /// Resting conductivity baseline in µS/cm.
    pub cond_base: f64,
    /// Expected normal-usage events per minute.
    pub use_rate_per_min: f64,
}

impl SensorProfile {
    /// Draw a profile for the given sensor id.
    ///
    /// Consumes exactly two uniform draws: `cond_base` first, then
    /// `use_rate_per_min`.
    pub fn draw(sensor_id: u32, rng: &mut (impl Rng + ?Sized)) -> Self {
        Self {
            sensor_id,
            cond_base: rng.gen_range(COND_BASE_RANGE.0..=COND_BASE_RANGE.1),
            use_rate_per_min: rng.gen_range(USE_RATE_RANGE.0..=USE_RATE_RANGE.1),
        }
    }
}

/// Kind of normal water-draw event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UsageKind {
    /// Longer draw with higher target flow.
    Sink,
    /// Short draw with low target flow.
    Fountain,
}

/// Normal usage-event timer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum UsageTimer {
    #[default]
    Idle,
    Active {
        kind: UsageKind,
        remaining_s: f64,
        target_flow: f64,
    },
}

impl UsageTimer {
    pub fn is_active(&self) -> bool {
        matches!(self, UsageTimer::Active { .. })
    }

    /// Count down an active timer; transitions to `Idle` when the
    /// remaining time crosses zero. No-op while idle.
    pub fn advance(&mut self, dt_seconds: f64) {
        if let UsageTimer::Active { remaining_s, .. } = self {
            *remaining_s -= dt_seconds;
            if *remaining_s <= 0.0 {
                *self = UsageTimer::Idle;
            }
        }
    }
}

/// Open-valve anomaly timer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum OpenValveTimer {
    #[default]
    Idle,
    Active {
        remaining_s: f64,
        /// Target flow while the valve stays open, already intensity-scaled.
        flow: f64,
    },
}

impl OpenValveTimer {
    pub fn is_active(&self) -> bool {
        matches!(self, OpenValveTimer::Active { .. })
    }

    pub fn advance(&mut self, dt_seconds: f64) {
        if let OpenValveTimer::Active { remaining_s, .. } = self {
            *remaining_s -= dt_seconds;
            if *remaining_s <= 0.0 {
                *self = OpenValveTimer::Idle;
            }
        }
    }
}

/// Dirty-water anomaly timer.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum DirtyWaterTimer {
    #[default]
    Idle,
    Active {
        remaining_s: f64,
        /// Raw extra-turbidity magnitude; intensity applies at sampling.
        extra_turbidity: f64,
    },
}

impl DirtyWaterTimer {
    pub fn is_active(&self) -> bool {
        matches!(self, DirtyWaterTimer::Active { .. })
    }

    pub fn advance(&mut self, dt_seconds: f64) {
        if let DirtyWaterTimer::Active { remaining_s, .. } = self {
            *remaining_s -= dt_seconds;
            if *remaining_s <= 0.0 {
                *self = DirtyWaterTimer::Idle;
            }
        }
    }
}

/// Mutable per-sensor state; one instance per sensor for the whole run.
///
/// The three timers overlap freely except that usage starts are gated by
/// the open valve (enforced by the scheduler, not here).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorState {
    pub usage: UsageTimer,
    pub open_valve: OpenValveTimer,
    pub dirty_water: DirtyWaterTimer,
}

impl SensorState {
    /// Fresh state with all timers idle.
    pub fn new() -> Self {
        Self::default()
    }
}
