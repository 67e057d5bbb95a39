// WaterTap Sim - Simulation driver
// Copyright (c) 2026 WaterTap contributors
//
// Licensed under the MIT License. See LICENSE file for details.

//! Drives the simulation over sensors and time.
//!
//! Each full interval the driver walks sensors 1..N in order: advance,
//! sample, emit, then wait `interval / N` so the N readings spread
//! evenly across the interval instead of bursting together. Timestamps
//! come from a virtual clock anchored at the configured start instant,
//! so pacing only affects wall-clock waits, never the emitted data.
//!
//! Cancellation is cooperative: `DriverHandle::stop` lets the in-flight
//! sensor's emission finish, then the loop exits cleanly, flushes the
//! sink and reports a summary. A sink write failure is fatal for the
//! run and is returned as the error.

use crate::engine::Simulator;
use crate::sink::{ReadingSink, SinkError};
use chrono::{DateTime, Timelike, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Notify;
use tracing::{debug, info};

/// Driver error types.
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("sink write failed: {0}")]
    Sink(#[from] SinkError),
}

/// Shared run state, visible through [`DriverHandle`].
#[derive(Debug, Default)]
struct DriverShared {
    running: AtomicBool,
    records_sent: AtomicU64,
    stop: Notify,
}

/// Handle for observing and cancelling a running driver.
#[derive(Debug, Clone)]
pub struct DriverHandle {
    shared: Arc<DriverShared>,
}

impl DriverHandle {
    /// Request a clean stop after the current sensor's emission.
    pub fn stop(&self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.stop.notify_waiters();
    }

    /// Whether the loop is still advancing.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::SeqCst)
    }

    /// Records emitted so far.
    pub fn records_sent(&self) -> u64 {
        self.shared.records_sent.load(Ordering::SeqCst)
    }
}

/// Summary of a completed (or cancelled) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Records handed to the sink.
    pub records_emitted: u64,
    /// Full intervals completed.
    pub ticks_completed: u64,
    /// Wall-clock time spent in the loop.
    pub elapsed: Duration,
}

/// Iterates the simulator over sensors and time, emitting to a sink.
#[derive(Debug)]
pub struct SimulationDriver {
    sim: Simulator,
    shared: Arc<DriverShared>,
}

impl SimulationDriver {
    /// Create a driver around a constructed simulator.
    pub fn new(sim: Simulator) -> Self {
        Self {
            sim,
            shared: Arc::new(DriverShared::default()),
        }
    }

    /// A handle for stopping or observing the run.
    pub fn handle(&self) -> DriverHandle {
        DriverHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// The simulator being driven.
    pub fn simulator(&self) -> &Simulator {
        &self.sim
    }

    /// Run until the duration bound is exhausted or the handle stops us.
    ///
    /// Already-emitted records stay valid on cancellation; the sink is
    /// flushed on every clean exit.
    pub async fn run<S: ReadingSink + ?Sized>(
        &mut self,
        sink: &mut S,
    ) -> Result<RunSummary, DriverError> {
        let interval = self.sim.config().interval_secs;
        let sensor_count = self.sim.sensor_count();
        let pacing = self.sim.config().pacing;
        let slice_secs = interval / sensor_count as f64;
        let max_ticks = self
            .sim
            .config()
            .duration_secs
            .map(|duration| (duration / interval).floor() as u64);
        let start_time = resolve_start_time(self.sim.config().start_time);

        self.shared.running.store(true, Ordering::SeqCst);
        self.shared.records_sent.store(0, Ordering::SeqCst);
        let started = Instant::now();

        info!(
            sensors = sensor_count,
            interval_secs = interval,
            ?max_ticks,
            %start_time,
            "starting simulation"
        );

        let mut ticks: u64 = 0;
        let mut records: u64 = 0;
        'ticks: loop {
            if let Some(max) = max_ticks {
                if ticks >= max {
                    break;
                }
            }
            if !self.shared.running.load(Ordering::SeqCst) {
                break;
            }

            for index in 0..sensor_count {
                let offset_secs = ticks as f64 * interval + index as f64 * slice_secs;
                let timestamp = start_time + chrono::Duration::milliseconds(to_millis(offset_secs));

                let reading = self.sim.tick_sensor(index, timestamp);
                debug!(
                    sensor_id = reading.sensor_id,
                    %timestamp,
                    flow = reading.flow_rate,
                    "emitting reading"
                );
                sink.write(&reading)?;
                records += 1;
                self.shared.records_sent.store(records, Ordering::SeqCst);

                if !self.shared.running.load(Ordering::SeqCst) {
                    break 'ticks;
                }
                self.pause(slice_secs / pacing).await;
            }
            ticks += 1;
        }

        sink.flush()?;
        self.shared.running.store(false, Ordering::SeqCst);

        let summary = RunSummary {
            records_emitted: records,
            ticks_completed: ticks,
            elapsed: started.elapsed(),
        };
        info!(
            records = summary.records_emitted,
            ticks = summary.ticks_completed,
            elapsed_ms = summary.elapsed.as_millis() as u64,
            "simulation stopped"
        );
        Ok(summary)
    }

    /// Sleep for the stagger slice, waking early on a stop request.
    ///
    /// A sub-millisecond slice still yields once so an unpaced run
    /// cannot starve the executor.
    async fn pause(&self, secs: f64) {
        let millis = if secs.is_finite() {
            (secs * 1000.0).round() as u64
        } else {
            0
        };
        if millis == 0 {
            tokio::task::yield_now().await;
            return;
        }
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(millis)) => {}
            _ = self.shared.stop.notified() => {}
        }
    }
}

/// Anchor the virtual clock: configured instant, or now truncated to
/// whole seconds.
fn resolve_start_time(configured: Option<DateTime<Utc>>) -> DateTime<Utc> {
    match configured {
        Some(start) => start,
        None => {
            let now = Utc::now();
            now.with_nanosecond(0).unwrap_or(now)
        }
    }
}

fn to_millis(secs: f64) -> i64 {
    (secs * 1000.0).round() as i64
}
