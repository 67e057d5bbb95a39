// WaterTap Sim - Anomaly scheduling
// Copyright (c) 2026 WaterTap contributors
//
// Licensed under the MIT License. See LICENSE file for details.

//! Per-tick scheduling of the three overlapping temporal states.
//!
//! The transition rule per tick, in fixed order: open-valve anomaly,
//! dirty-water anomaly, then the normal usage event. The usage step is
//! skipped entirely while the open valve is active, so no new usage
//! event can start and an in-progress one is frozen until the valve
//! closes. Draw order is fixed so a given seed always yields the same
//! trajectory.

use crate::config::AnomalyConfig;
use crate::sensor::{
    DirtyWaterTimer, OpenValveTimer, SensorProfile, SensorState, UsageKind, UsageTimer,
};
use rand::prelude::*;

/// Upper bound on any per-tick start probability.
///
/// The linear `rate * dt / unit` form is an approximation of a
/// continuous-time rate process; capping keeps large tick intervals from
/// turning into certainty.
pub const MAX_START_PROBABILITY: f64 = 0.95;

/// Sink usage event: duration window (s) and target flow window.
const SINK_DURATION_S: (f64, f64) = (10.0, 30.0);
const SINK_TARGET_FLOW: (f64, f64) = (4.0, 8.0);

/// Fountain usage event: duration window (s) and target flow window.
const FOUNTAIN_DURATION_S: (f64, f64) = (5.0, 15.0);
const FOUNTAIN_TARGET_FLOW: (f64, f64) = (1.0, 3.0);

/// Per-tick start probability for a rate expressed per `unit_seconds`.
fn start_probability(rate_per_unit: f64, dt_seconds: f64, unit_seconds: f64) -> f64 {
    (rate_per_unit * dt_seconds / unit_seconds).min(MAX_START_PROBABILITY)
}

/// Advances the three per-sensor timers once per tick.
#[derive(Debug, Clone)]
pub struct AnomalyScheduler {
    params: AnomalyConfig,
    intensity: f64,
}

impl AnomalyScheduler {
    /// Create a scheduler from validated anomaly parameters.
    pub fn new(params: AnomalyConfig, intensity: f64) -> Self {
        Self { params, intensity }
    }

    /// Advance all three timers for one sensor by `dt_seconds`.
    ///
    /// Callers should keep `dt_seconds` small relative to an hour for the
    /// per-hour rates to stay meaningful.
    pub fn advance(
        &self,
        profile: &SensorProfile,
        state: &mut SensorState,
        dt_seconds: f64,
        rng: &mut (impl Rng + ?Sized),
    ) {
        self.advance_open_valve(state, dt_seconds, rng);
        self.advance_dirty_water(state, dt_seconds, rng);
        if !state.open_valve.is_active() {
            self.advance_usage(profile, state, dt_seconds, rng);
        }
    }

    fn advance_open_valve(
        &self,
        state: &mut SensorState,
        dt_seconds: f64,
        rng: &mut (impl Rng + ?Sized),
    ) {
        match state.open_valve {
            OpenValveTimer::Idle => {
                let p = start_probability(self.params.open_valve.prob_per_hour, dt_seconds, 3600.0);
                if rng.gen::<f64>() < p {
                    state.open_valve = OpenValveTimer::Active {
                        remaining_s: self.params.open_valve.duration_s.sample(rng),
                        flow: self.params.open_valve.flow.sample(rng) * self.intensity,
                    };
                }
            }
            OpenValveTimer::Active { .. } => state.open_valve.advance(dt_seconds),
        }
    }

    fn advance_dirty_water(
        &self,
        state: &mut SensorState,
        dt_seconds: f64,
        rng: &mut (impl Rng + ?Sized),
    ) {
        match state.dirty_water {
            DirtyWaterTimer::Idle => {
                let p = start_probability(self.params.dirty_water.prob_per_hour, dt_seconds, 3600.0);
                if rng.gen::<f64>() < p {
                    state.dirty_water = DirtyWaterTimer::Active {
                        remaining_s: self.params.dirty_water.duration_s.sample(rng),
                        extra_turbidity: self.params.dirty_water.extra_turbidity.sample(rng),
                    };
                }
            }
            DirtyWaterTimer::Active { .. } => state.dirty_water.advance(dt_seconds),
        }
    }

    fn advance_usage(
        &self,
        profile: &SensorProfile,
        state: &mut SensorState,
        dt_seconds: f64,
        rng: &mut (impl Rng + ?Sized),
    ) {
        match state.usage {
            UsageTimer::Idle => {
                let p = start_probability(profile.use_rate_per_min, dt_seconds, 60.0);
                if rng.gen::<f64>() < p {
                    let kind = if rng.gen_bool(0.5) {
                        UsageKind::Sink
                    } else {
                        UsageKind::Fountain
                    };
                    let (duration, flow) = match kind {
                        UsageKind::Sink => (SINK_DURATION_S, SINK_TARGET_FLOW),
                        UsageKind::Fountain => (FOUNTAIN_DURATION_S, FOUNTAIN_TARGET_FLOW),
                    };
                    state.usage = UsageTimer::Active {
                        kind,
                        remaining_s: rng.gen_range(duration.0..=duration.1),
                        target_flow: rng.gen_range(flow.0..=flow.1),
                    };
                }
            }
            UsageTimer::Active { .. } => state.usage.advance(dt_seconds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnomalyConfig;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn test_rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn test_profile() -> SensorProfile {
        SensorProfile {
            sensor_id: 1,
            cond_base: 220.0,
            use_rate_per_min: 0.1,
        }
    }

    /// Anomaly knobs with start probabilities pinned at the cap.
    fn saturated_anomalies() -> AnomalyConfig {
        let mut config = AnomalyConfig::default();
        config.open_valve.prob_per_hour = 1.0;
        config.dirty_water.prob_per_hour = 1.0;
        config
    }

    #[test]
    fn test_start_probability_caps() {
        assert_eq!(start_probability(1.0, 1_000_000.0, 3600.0), MAX_START_PROBABILITY);
        assert!((start_probability(0.5, 60.0, 3600.0) - 0.5 / 60.0).abs() < 1e-12);
    }

    #[test]
    fn test_zero_probability_never_starts() {
        let mut rng = test_rng();
        let scheduler = AnomalyScheduler::new(AnomalyConfig::quiescent(), 1.0);
        let profile = SensorProfile {
            use_rate_per_min: 0.0,
            ..test_profile()
        };
        let mut state = SensorState::new();

        for _ in 0..1000 {
            scheduler.advance(&profile, &mut state, 60.0, &mut rng);
            assert!(!state.open_valve.is_active());
            assert!(!state.dirty_water.is_active());
            assert!(!state.usage.is_active());
        }
    }

    #[test]
    fn test_saturated_rate_starts_quickly() {
        let mut rng = test_rng();
        // dt of one hour at rate 1.0/h hits the 0.95 cap.
        let scheduler = AnomalyScheduler::new(saturated_anomalies(), 1.0);
        let profile = test_profile();
        let mut state = SensorState::new();

        let mut saw_open = false;
        for _ in 0..50 {
            scheduler.advance(&profile, &mut state, 3600.0, &mut rng);
            saw_open |= state.open_valve.is_active();
        }
        assert!(saw_open);
    }

    #[test]
    fn test_open_valve_magnitudes_within_windows() {
        let mut rng = test_rng();
        let scheduler = AnomalyScheduler::new(saturated_anomalies(), 1.0);
        let profile = test_profile();

        for _ in 0..50 {
            let mut state = SensorState::new();
            scheduler.advance(&profile, &mut state, 3600.0, &mut rng);
            if let OpenValveTimer::Active { remaining_s, flow } = state.open_valve {
                assert!((300.0..=900.0).contains(&remaining_s));
                assert!((6.0..=10.0).contains(&flow));
            }
        }
    }

    #[test]
    fn test_open_valve_flow_scales_with_intensity() {
        // Same seed, doubled intensity: the drawn flow target doubles.
        let flow_at = |intensity: f64| {
            let mut rng = test_rng();
            let scheduler = AnomalyScheduler::new(saturated_anomalies(), intensity);
            let mut state = SensorState::new();
            loop {
                scheduler.advance(&test_profile(), &mut state, 3600.0, &mut rng);
                if let OpenValveTimer::Active { flow, .. } = state.open_valve {
                    return flow;
                }
            }
        };

        let base = flow_at(1.0);
        let doubled = flow_at(2.0);
        assert!((doubled - 2.0 * base).abs() < 1e-9);
    }

    #[test]
    fn test_usage_blocked_while_valve_open() {
        let mut rng = test_rng();
        let scheduler = AnomalyScheduler::new(AnomalyConfig::quiescent(), 1.0);
        // Saturated usage rate: would start every tick if not gated.
        let profile = SensorProfile {
            use_rate_per_min: 1000.0,
            ..test_profile()
        };
        let mut state = SensorState::new();
        state.open_valve = OpenValveTimer::Active {
            remaining_s: 600.0,
            flow: 8.0,
        };

        for _ in 0..9 {
            scheduler.advance(&profile, &mut state, 60.0, &mut rng);
            assert!(state.open_valve.is_active());
            assert!(!state.usage.is_active());
        }

        // Valve closes at the 10th tick; usage becomes startable again.
        scheduler.advance(&profile, &mut state, 60.0, &mut rng);
        assert!(!state.open_valve.is_active());
        let mut started = false;
        for _ in 0..50 {
            if state.usage.is_active() {
                started = true;
                break;
            }
            scheduler.advance(&profile, &mut state, 60.0, &mut rng);
        }
        assert!(started);
    }

    #[test]
    fn test_usage_frozen_while_valve_open() {
        let mut rng = test_rng();
        let scheduler = AnomalyScheduler::new(AnomalyConfig::quiescent(), 1.0);
        let profile = test_profile();
        let mut state = SensorState::new();
        state.usage = UsageTimer::Active {
            kind: UsageKind::Sink,
            remaining_s: 25.0,
            target_flow: 5.0,
        };
        state.open_valve = OpenValveTimer::Active {
            remaining_s: 300.0,
            flow: 8.0,
        };

        scheduler.advance(&profile, &mut state, 60.0, &mut rng);
        assert_eq!(
            state.usage,
            UsageTimer::Active {
                kind: UsageKind::Sink,
                remaining_s: 25.0,
                target_flow: 5.0,
            }
        );
    }

    #[test]
    fn test_open_and_dirty_can_overlap() {
        let mut rng = test_rng();
        let scheduler = AnomalyScheduler::new(saturated_anomalies(), 1.0);
        let profile = test_profile();
        let mut state = SensorState::new();

        let mut overlapped = false;
        for _ in 0..200 {
            scheduler.advance(&profile, &mut state, 3600.0, &mut rng);
            overlapped |= state.open_valve.is_active() && state.dirty_water.is_active();
        }
        assert!(overlapped);
    }

    #[test]
    fn test_usage_kinds_within_windows() {
        let mut rng = test_rng();
        let scheduler = AnomalyScheduler::new(AnomalyConfig::quiescent(), 1.0);
        let profile = SensorProfile {
            use_rate_per_min: 1000.0,
            ..test_profile()
        };

        let mut saw_sink = false;
        let mut saw_fountain = false;
        for _ in 0..100 {
            let mut state = SensorState::new();
            scheduler.advance(&profile, &mut state, 60.0, &mut rng);
            match state.usage {
                UsageTimer::Active {
                    kind: UsageKind::Sink,
                    remaining_s,
                    target_flow,
                } => {
                    saw_sink = true;
                    assert!((10.0..=30.0).contains(&remaining_s));
                    assert!((4.0..=8.0).contains(&target_flow));
                }
                UsageTimer::Active {
                    kind: UsageKind::Fountain,
                    remaining_s,
                    target_flow,
                } => {
                    saw_fountain = true;
                    assert!((5.0..=15.0).contains(&remaining_s));
                    assert!((1.0..=3.0).contains(&target_flow));
                }
                UsageTimer::Idle => {}
            }
        }
        assert!(saw_sink && saw_fountain);
    }

    #[test]
    fn test_deterministic_given_seed() {
        let run = || {
            let mut rng = test_rng();
            let scheduler = AnomalyScheduler::new(saturated_anomalies(), 1.0);
            let profile = test_profile();
            let mut state = SensorState::new();
            let mut trace = Vec::new();
            for _ in 0..100 {
                scheduler.advance(&profile, &mut state, 60.0, &mut rng);
                trace.push(state);
            }
            trace
        };
        assert_eq!(run(), run());
    }
}
