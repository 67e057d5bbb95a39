// WaterTap Feed - Live telemetry feed
// Copyright (c) 2026 WaterTap contributors
//
// Licensed under the MIT License. See LICENSE file for details.

//! # WaterTap Feed
//!
//! Command-line front end for the WaterTap simulator: emits readings as
//! InfluxDB line protocol or JSON lines, to stdout or a file.
//!
//! ## Usage
//!
//! ```bash
//! # Four sensors, one reading per minute, forever, to stdout
//! watertap-feed
//!
//! # Backfill ten minutes of history for one sensor, reproducibly
//! watertap-feed --sensors 1 --duration 10m --seed 42 --pacing 1e9 \
//!     --start-time 2026-03-01T08:00:00Z --output history.lp
//! ```
//!
//! Every flag can also come from a `WATERTAP_*` environment variable.

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::EnvFilter;
use watertap_sim::{
    parse_duration_secs, JsonLinesSink, LineProtocolSink, ReadingSink, SimulationConfig,
    SimulationDriver, Simulator,
};

/// Output encoding for emitted readings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    /// InfluxDB line protocol.
    Lines,
    /// One JSON object per line.
    Json,
}

/// WaterTap telemetry feed
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of sensors to simulate
    #[arg(long, default_value_t = 4, env = "WATERTAP_SENSORS")]
    sensors: u32,

    /// Seconds between readings for each sensor
    #[arg(long, default_value_t = 60.0, env = "WATERTAP_INTERVAL_SECS")]
    interval: f64,

    /// Total run duration (e.g. "600", "10m", "2h"); omit to run forever
    #[arg(long, env = "WATERTAP_DURATION")]
    duration: Option<String>,

    /// Random seed for a reproducible trajectory
    #[arg(long, env = "WATERTAP_SEED")]
    seed: Option<u64>,

    /// Global intensity multiplier for noise and anomaly magnitudes
    #[arg(long, default_value_t = 1.0, env = "WATERTAP_INTENSITY")]
    intensity: f64,

    /// Open-valve anomaly start probability per hour
    #[arg(long, default_value_t = 0.05, env = "WATERTAP_OPEN_PROB_PER_HOUR")]
    open_prob_per_hour: f64,

    /// Dirty-water anomaly start probability per hour
    #[arg(long, default_value_t = 0.03, env = "WATERTAP_DIRTY_PROB_PER_HOUR")]
    dirty_prob_per_hour: f64,

    /// Turbidity spike probability per reading
    #[arg(long, default_value_t = 0.01, env = "WATERTAP_TURBIDITY_SPIKE_PROB")]
    turbidity_spike_prob: f64,

    /// Pacing factor: 1.0 emits in real time, larger is faster
    #[arg(long, default_value_t = 1.0, env = "WATERTAP_PACING")]
    pacing: f64,

    /// Anchor record timestamps at a fixed RFC 3339 instant
    #[arg(long, env = "WATERTAP_START_TIME")]
    start_time: Option<DateTime<Utc>>,

    /// Output encoding
    #[arg(long, value_enum, default_value = "lines")]
    format: OutputFormat,

    /// Output file; stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> anyhow::Result<(SimulationConfig, OutputFormat, Option<PathBuf>)> {
        let mut config = SimulationConfig::new()
            .with_sensor_count(self.sensors)
            .with_interval_secs(self.interval)
            .with_intensity(self.intensity)
            .with_pacing(self.pacing);

        if let Some(ref duration) = self.duration {
            let secs = parse_duration_secs(duration)
                .with_context(|| format!("invalid --duration {duration:?}"))?;
            config = config.with_duration_secs(secs);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(start) = self.start_time {
            config = config.with_start_time(start);
        }

        config.anomalies.open_valve.prob_per_hour = self.open_prob_per_hour;
        config.anomalies.dirty_water.prob_per_hour = self.dirty_prob_per_hour;
        config.anomalies.turbidity_spike.prob_per_sample = self.turbidity_spike_prob;

        Ok((config, self.format, self.output))
    }
}

fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = match log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };
        EnvFilter::from_default_env().add_directive(level.into())
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn open_sink(
    format: OutputFormat,
    output: Option<PathBuf>,
) -> anyhow::Result<Box<dyn ReadingSink>> {
    let writer: Box<dyn Write> = match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("cannot create output file {}", path.display()))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(io::stdout()),
    };

    Ok(match format {
        OutputFormat::Lines => Box::new(LineProtocolSink::new(writer)),
        OutputFormat::Json => Box::new(JsonLinesSink::new(writer)),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    info!("WaterTap Feed v{}", env!("CARGO_PKG_VERSION"));

    let (config, format, output) = args.into_config()?;
    let simulator = Simulator::new(config).context("invalid configuration")?;
    let mut driver = SimulationDriver::new(simulator);
    let mut sink = open_sink(format, output)?;

    let handle = driver.handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current sensor");
            handle.stop();
        }
    });

    let summary = driver.run(sink.as_mut()).await?;
    info!(
        records = summary.records_emitted,
        ticks = summary.ticks_completed,
        elapsed_secs = summary.elapsed.as_secs_f64(),
        "feed finished"
    );
    Ok(())
}
