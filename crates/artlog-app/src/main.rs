//! `artlog` - host driver for the ART logger pipeline
//!
//! Runs the acquisition loop against host collaborators: a tokio ticker, an
//! optional serial GPS receiver or NMEA replay, simulated analog/CAN/IMU
//! sources and a directory standing in for the SD card.

mod gps_source;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use artlog_core::acquisition::{self, Producers};
use artlog_core::demo::{DemoAccelerometer, DemoSampler, DemoSimulator};
use artlog_core::prelude::*;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "artlog")]
#[command(about = "ART vehicle telemetry logger", long_about = None)]
struct Args {
    /// Logger configuration (JSON); built-in bench setup when omitted
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory that receives the CSV log
    #[arg(long, default_value = "artlog_sessions")]
    output_dir: PathBuf,

    /// Serial port of the GPS receiver
    #[arg(long, value_name = "PORT", conflicts_with = "nmea")]
    gps_port: Option<String>,

    /// GPS receiver baud rate
    #[arg(long, default_value_t = 9600)]
    gps_baud: u32,

    /// Replay an NMEA log, one sentence per tick
    #[arg(long, value_name = "FILE")]
    nmea: Option<PathBuf>,

    /// Simulate the analog, CAN and accelerometer sources
    #[arg(long)]
    demo: bool,

    /// Seed for the simulated sources
    #[arg(long, requires = "demo")]
    seed: Option<u64>,

    /// Stop after this many seconds (0 = until Ctrl-C)
    #[arg(long, value_name = "SECS", default_value_t = 0)]
    duration: u64,

    /// Print the configuration in effect and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => LoggerConfig::load(path)
            .with_context(|| format!("Could not load configuration {}", path.display()))?,
        None => LoggerConfig::default(),
    };

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if !args.demo {
        bail!("no analog sampler is available on this host; run with --demo");
    }

    let tick_period = Duration::from_millis(u64::from(config.tick_period_ms));
    let (producers, inputs) = acquisition::wire(&config);
    let (ticker, clock) = tick_clock(config.tick_period_ms);
    let Producers {
        analog,
        gps,
        can,
        accel,
    } = producers;

    let sim = match args.seed {
        Some(seed) => DemoSimulator::with_seed(seed),
        None => DemoSimulator::new(),
    };
    let can_ids = config.can.iter().map(|ch| ch.message_id).collect();
    let mut sampler = DemoSampler::new(sim, analog)
        .with_can(can, can_ids)
        .with_accel(accel);

    let _gps_reader = match (&args.gps_port, &args.nmea) {
        (Some(port), _) => {
            let port = gps_source::open_port(port, args.gps_baud)?;
            Some(gps_source::spawn_serial_reader(port, gps))
        }
        (None, Some(path)) => {
            let sentences = gps_source::load_nmea(path)?;
            tokio::spawn(gps_source::replay(sentences, tick_period, gps));
            None
        }
        (None, None) => {
            sampler = sampler.with_gps(gps);
            None
        }
    };

    let storage = FileStorage::new(&args.output_dir);
    tracing::info!("Logging to {}", storage.root().display());
    let mut acquisition = Acquisition::new(
        config,
        clock,
        inputs,
        Box::new(sampler),
        Box::new(DemoAccelerometer),
        storage,
    )?;
    let stop = acquisition.stop_handle();

    let ticker_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(tick_period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            interval.tick().await;
            ticker.tick();
        }
    });

    let mut run = tokio::task::spawn_blocking(move || acquisition.run());

    let deadline = async {
        if args.duration > 0 {
            tokio::time::sleep(Duration::from_secs(args.duration)).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    let finished = tokio::select! {
        result = &mut run => Some(result),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted");
            None
        }
        _ = deadline => {
            tracing::info!("Duration reached");
            None
        }
    };
    let result = match finished {
        Some(result) => result,
        None => {
            stop.request_stop();
            run.await
        }
    };
    ticker_task.abort();

    let summaries = result.context("Acquisition task panicked")??;
    for (idx, summary) in summaries.iter().enumerate() {
        println!(
            "session {}: {} rows, {} write failures, {} ticks, ended by {:?} ({})",
            idx + 1,
            summary.rows_written,
            summary.write_failures,
            summary.ticks,
            summary.end,
            summary.file_name
        );
    }

    Ok(())
}
