// WaterTap Sim - Simulation engine
// Copyright (c) 2026 WaterTap contributors
//
// Licensed under the MIT License. See LICENSE file for details.

//! The per-run simulator: profiles, states and the single RNG.
//!
//! One `Simulator` owns everything a run needs. All randomness flows
//! through its one seedable generator, consumed in sensor-id order, so a
//! fixed seed reproduces the exact same sequence of readings for the
//! same `(sensor_count, interval, duration)` triple.

use crate::config::{ConfigError, SimulationConfig};
use crate::reading::Reading;
use crate::scheduler::AnomalyScheduler;
use crate::sensor::{SensorProfile, SensorState};
use crate::synth::ReadingSynthesizer;
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// Simulation engine for one run.
#[derive(Debug)]
pub struct Simulator {
    config: SimulationConfig,
    profiles: Vec<SensorProfile>,
    states: Vec<SensorState>,
    scheduler: AnomalyScheduler,
    synthesizer: ReadingSynthesizer,
    rng: StdRng,
}

impl Simulator {
    /// Build a simulator from a configuration.
    ///
    /// Validates and clamps the configuration, then draws one profile per
    /// sensor (ids 1..=N, in order) from the run's generator.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        let config = config.validated()?;

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let profiles: Vec<SensorProfile> = (1..=config.sensor_count)
            .map(|id| SensorProfile::draw(id, &mut rng))
            .collect();
        let states = vec![SensorState::new(); profiles.len()];

        let scheduler = AnomalyScheduler::new(config.anomalies.clone(), config.intensity);
        let synthesizer =
            ReadingSynthesizer::new(config.anomalies.turbidity_spike.clone(), config.intensity);

        Ok(Self {
            config,
            profiles,
            states,
            scheduler,
            synthesizer,
            rng,
        })
    }

    /// The validated configuration in effect.
    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Number of sensors in the run.
    pub fn sensor_count(&self) -> usize {
        self.profiles.len()
    }

    /// Per-sensor profiles, in sensor-id order.
    pub fn profiles(&self) -> &[SensorProfile] {
        &self.profiles
    }

    /// Current state of the sensor at `index` (0-based).
    pub fn state(&self, index: usize) -> &SensorState {
        &self.states[index]
    }

    /// Advance one sensor by a full interval and synthesize its reading.
    ///
    /// `index` is 0-based; the emitted `sensor_id` is `index + 1` via the
    /// profile. Panics if `index` is out of range.
    pub fn tick_sensor(&mut self, index: usize, timestamp: DateTime<Utc>) -> Reading {
        let dt_seconds = self.config.interval_secs;
        let profile = &self.profiles[index];
        let state = &mut self.states[index];

        self.scheduler.advance(profile, state, dt_seconds, &mut self.rng);
        self.synthesizer.sample(profile, state, timestamp, &mut self.rng)
    }
}
