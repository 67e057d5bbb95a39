// WaterTap Sim - End-to-end simulation tests
// Copyright (c) 2026 WaterTap contributors
//
// Licensed under the MIT License. See LICENSE file for details.

//! Full-run properties: determinism, physical bounds, anomaly gating
//! and staggered emission.

use chrono::{DateTime, TimeZone, Utc};
use watertap_sim::{
    AnomalyConfig, MemorySink, Reading, SimulationConfig, SimulationDriver, Simulator,
};

fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap()
}

/// Base config: virtual clock anchored, pacing high enough that every
/// stagger sleep rounds to zero.
fn base_config() -> SimulationConfig {
    SimulationConfig::new()
        .with_start_time(start_time())
        .with_pacing(1e9)
}

async fn run_to_memory(config: SimulationConfig) -> Vec<Reading> {
    let mut driver = SimulationDriver::new(Simulator::new(config).unwrap());
    let mut sink = MemorySink::new();
    driver.run(&mut sink).await.unwrap();
    sink.into_readings()
}

#[tokio::test]
async fn two_runs_with_same_seed_are_byte_identical() {
    let config = || {
        base_config()
            .with_sensor_count(3)
            .with_interval_secs(30.0)
            .with_duration_secs(3600.0)
            .with_seed(1234)
    };

    let first = run_to_memory(config()).await;
    let second = run_to_memory(config()).await;

    assert_eq!(first.len(), 360);
    let a = serde_json::to_string(&first).unwrap();
    let b = serde_json::to_string(&second).unwrap();
    assert_eq!(a, b);
}

#[tokio::test]
async fn all_fields_stay_within_physical_bounds() {
    // High intensity and saturated anomaly rates to stress the clamps.
    let mut anomalies = AnomalyConfig::default();
    anomalies.open_valve.prob_per_hour = 1.0;
    anomalies.dirty_water.prob_per_hour = 1.0;
    anomalies.turbidity_spike.prob_per_sample = 0.2;

    let config = base_config()
        .with_sensor_count(4)
        .with_interval_secs(60.0)
        .with_duration_secs(6.0 * 3600.0)
        .with_seed(99)
        .with_intensity(3.0)
        .with_anomalies(anomalies);

    let readings = run_to_memory(config).await;
    assert_eq!(readings.len(), 4 * 360);
    for reading in &readings {
        assert!(reading.flow_rate >= 0.0, "negative flow: {reading:?}");
        assert!(reading.turbidity >= 0.0, "negative turbidity: {reading:?}");
        assert!(
            (6.0..=8.5).contains(&reading.ph),
            "pH out of range: {reading:?}"
        );
        assert!(reading.conductivity > 0.0);
    }
}

#[tokio::test]
async fn zero_probabilities_yield_a_quiet_run() {
    let config = base_config()
        .with_sensor_count(2)
        .with_interval_secs(60.0)
        .with_duration_secs(12.0 * 3600.0)
        .with_seed(7)
        .with_anomalies(AnomalyConfig::quiescent());

    let mut driver = SimulationDriver::new(Simulator::new(config).unwrap());
    let mut sink = MemorySink::new();

    // With zero start probabilities the anomaly timers can never fire,
    // so the final states must still be idle.
    driver.run(&mut sink).await.unwrap();
    for index in 0..driver.simulator().sensor_count() {
        let state = driver.simulator().state(index);
        assert!(!state.open_valve.is_active());
        assert!(!state.dirty_water.is_active());
    }

    // Usage tops out at flow 8 plus 10% noise; without spikes turbidity
    // stays well under 2. A spike would add at least 2.
    for reading in sink.readings() {
        assert!(reading.turbidity < 2.0, "unexpected spike: {reading:?}");
    }
}

#[tokio::test]
async fn single_sensor_bounded_run_matches_cadence() {
    let config = base_config()
        .with_sensor_count(1)
        .with_interval_secs(60.0)
        .with_duration_secs(600.0)
        .with_seed(42);

    let readings = run_to_memory(config).await;
    assert_eq!(readings.len(), 10);

    for (i, reading) in readings.iter().enumerate() {
        assert_eq!(reading.sensor_id, 1);
        assert_eq!(
            reading.timestamp,
            start_time() + chrono::Duration::seconds(60 * i as i64)
        );
        assert!(reading.flow_rate >= 0.0);
        assert!(reading.turbidity >= 0.0);
        assert!((6.0..=8.5).contains(&reading.ph));
    }
}

#[tokio::test]
async fn three_sensors_stagger_across_the_interval() {
    let config = base_config()
        .with_sensor_count(3)
        .with_interval_secs(30.0)
        .with_duration_secs(30.0)
        .with_seed(5);

    let readings = run_to_memory(config).await;
    assert_eq!(readings.len(), 3);

    let ids: Vec<u32> = readings.iter().map(|r| r.sensor_id).collect();
    assert_eq!(ids, vec![1, 2, 3]);

    for (i, reading) in readings.iter().enumerate() {
        let expected = start_time() + chrono::Duration::seconds(10 * i as i64);
        assert_eq!(reading.timestamp, expected);
    }
}

#[tokio::test]
async fn intensity_never_shrinks_noise_magnitudes() {
    // Same seed, quiescent anomalies: the idle-flow, conductivity and pH
    // noise terms must scale up (or hold) when intensity doubles.
    let run = |intensity: f64| {
        base_config()
            .with_sensor_count(1)
            .with_interval_secs(60.0)
            .with_duration_secs(1800.0)
            .with_seed(11)
            .with_intensity(intensity)
            .with_anomalies(AnomalyConfig::quiescent())
    };

    let base = run_to_memory(run(1.0)).await;
    let scaled = run_to_memory(run(2.0)).await;
    assert_eq!(base.len(), scaled.len());

    // The draw sequence is identical in both runs (intensity only
    // multiplies). Usage-driven flow is not intensity-scaled so those
    // samples match pairwise; idle drip doubles. Either way the scaled
    // run never reads lower.
    for (a, b) in base.iter().zip(scaled.iter()) {
        assert!(b.flow_rate >= a.flow_rate - 1e-3);
    }

    // Dispersion around each run's own mean must not shrink for the
    // purely noise-driven fields.
    let spread = |readings: &[Reading], field: fn(&Reading) -> f64| -> f64 {
        let mean = readings.iter().map(field).sum::<f64>() / readings.len() as f64;
        readings.iter().map(|r| (field(r) - mean).abs()).sum::<f64>() / readings.len() as f64
    };
    assert!(spread(&scaled, |r| r.conductivity) >= spread(&base, |r| r.conductivity) - 1e-3);
    assert!(spread(&scaled, |r| r.ph) >= spread(&base, |r| r.ph) - 1e-3);
}

#[tokio::test]
async fn summary_reports_counts_and_ticks() {
    let config = base_config()
        .with_sensor_count(2)
        .with_interval_secs(15.0)
        .with_duration_secs(150.0)
        .with_seed(3);

    let mut driver = SimulationDriver::new(Simulator::new(config).unwrap());
    let mut sink = MemorySink::new();
    let summary = driver.run(&mut sink).await.unwrap();

    assert_eq!(summary.ticks_completed, 10);
    assert_eq!(summary.records_emitted, 20);
    assert_eq!(sink.len(), 20);
}

#[tokio::test]
async fn report_over_emitted_readings() {
    let config = base_config()
        .with_sensor_count(2)
        .with_interval_secs(60.0)
        .with_duration_secs(4.0 * 3600.0)
        .with_seed(21);

    let readings = run_to_memory(config).await;
    let to = start_time() + chrono::Duration::hours(4);
    let report = watertap_sim::build_report(1, start_time(), to, &readings).unwrap();

    assert_eq!(report.sensor_id, 1);
    assert!(report.stats.ph.min >= 6.0);
    assert!(report.stats.ph.max <= 8.5);
    assert!(report.stats.flow_rate.min >= 0.0);
    assert!(report.stats.flow_rate.q1 <= report.stats.flow_rate.q3);
    // 08:00 through 11:00 inclusive.
    assert_eq!(report.samples.len(), 4);
    assert_eq!(report.samples[0].hour, "08:00");
}
