// src/main.rs

mod config;
mod control;
mod error;
mod event_log;
mod hardware;
mod interval;
mod report;
mod statistics;
mod types;

use anyhow::{Context, Result};
use clap::Parser;
use control::{Clock, PhaseController, RunOutcome, SystemClock, VirtualClock};
use event_log::{EventCode, EventLog, LogSink};
use hardware::ultrasonic::SensorPins;
use hardware::{
    GpioIndicators, Indicators, LoggedIndicators, PinDirection, ProximityDetector,
    SimulatedTraffic, SysfsPin, UltrasonicDetector,
};
use report::{ApproachReport, FileReportSink, ReportSink, RunReport};
use statistics::StatisticsEngine;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use types::{Approach, Config, SensorMode};

/// Adaptive two-approach traffic signal controller
#[derive(Parser)]
#[command(name = "signal-controller")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "SIGNAL_CONFIG", default_value = "config.yaml")]
    config: String,

    /// Run length in minutes (overrides controller.run_duration_secs)
    minutes: Option<u64>,

    /// Event log degree (overrides logging.degree)
    degree: Option<u32>,

    /// Use virtual time so a simulated run finishes immediately
    #[arg(long)]
    virtual_time: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config)?;
    let from_file = loaded.is_some();
    let mut config = loaded.unwrap_or_default();
    config.apply_overrides(cli.minutes, cli.degree);

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("signal_controller={}", config.logging.level)));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("🚦 Adaptive Signal Controller Starting");
    if from_file {
        info!("✓ Configuration loaded from {}", cli.config);
    } else {
        warn!("⚠️  No config at {}, using defaults", cli.config);
    }
    config.validate().context("configuration rejected")?;

    let run_label = chrono::Local::now().format("%F_%I:%M%p").to_string();
    let output_dir = Path::new(&config.report.output_dir);
    let mut events = EventLog::open(output_dir, &run_label, config.logging.degree)
        .context("opening event log")?;
    if let Some(path) = events.path() {
        info!("📝 Event log at {}", path.display());
    }

    events.log(EventCode::RunOpened, "", 0.0);
    events.log(
        EventCode::ConfigValue,
        "run duration (s)",
        config.controller.run_duration_secs as f64,
    );

    let (detector, indicators) = build_hardware(&config, &mut events)?;

    let virtual_time = cli.virtual_time && config.sensor.mode == SensorMode::Simulated;
    if cli.virtual_time && !virtual_time {
        warn!("⚠️  --virtual-time ignored with GPIO hardware");
    }

    let outcome = if virtual_time {
        drive(&config, VirtualClock::new(), detector, indicators, &mut events)?
    } else {
        drive(&config, SystemClock::new(), detector, indicators, &mut events)?
    };

    events.log(EventCode::StageEntered, "statistics", 0.0);
    let engine = StatisticsEngine::new(config.controller.max_phase_secs);
    let approaches: Vec<ApproachReport> = Approach::ALL
        .iter()
        .map(|&approach| ApproachReport::build(outcome.log(approach), &engine))
        .collect();
    events.log(EventCode::StageExited, "statistics", 0.0);

    info!(
        "🏁 {} phases in {:.1}s ({})",
        outcome.phases,
        outcome.elapsed.as_secs_f64(),
        outcome.stop
    );
    for report in &approaches {
        if outcome.log(report.approach).is_empty() {
            warn!("⚠️  {}: no intervals recorded", report.approach);
            continue;
        }
        match &report.statistics {
            Some(s) => info!(
                "📊 {}: {} cars over {} intervals, median {:.3} cps, saved {:.1}s",
                report.approach,
                s.total_cars,
                report.intervals.len(),
                s.median_cps,
                s.time_saved_secs
            ),
            None => info!(
                "📊 {}: {} intervals, no statistics",
                report.approach,
                report.intervals.len()
            ),
        }
    }

    let run_report = RunReport {
        run_label,
        elapsed_secs: outcome.elapsed.as_secs_f64(),
        stop_reason: outcome.stop.to_string(),
        approaches,
    };
    let mut sink = FileReportSink::new(output_dir, config.report.write_json);
    sink.publish(&run_report, &mut events)?;

    events.log(EventCode::RunTerminated, "", 0.0);
    events.flush();
    info!("✓ Done");
    Ok(())
}

type Hardware = (Box<dyn ProximityDetector>, Box<dyn Indicators>);

fn build_hardware(config: &Config, events: &mut dyn LogSink) -> Result<Hardware> {
    match config.sensor.mode {
        SensorMode::Simulated => {
            info!(
                "🎲 Simulated traffic: north {:.2} cps, west {:.2} cps (seed {})",
                config.sensor.simulated.north_rate,
                config.sensor.simulated.west_rate,
                config.sensor.simulated.seed
            );
            let traffic =
                SimulatedTraffic::new(&config.sensor.simulated, config.controller.poll_period());
            Ok((Box::new(traffic), Box::new(LoggedIndicators::new())))
        }
        SensorMode::Gpio => {
            let root = Path::new(&config.gpio.sysfs_root);
            let sensor = |approach: Approach| -> Result<SensorPins<SysfsPin>> {
                let pins = config.gpio.pins(approach);
                Ok(SensorPins {
                    trigger: SysfsPin::open(root, pins.trigger, PinDirection::Output)?,
                    echo: SysfsPin::open(root, pins.echo, PinDirection::Input)?,
                })
            };

            let detector =
                UltrasonicDetector::new(sensor(Approach::North)?, sensor(Approach::West)?, &config.sensor);
            let lamps = GpioIndicators::open(root, config.gpio.north, config.gpio.west)
                .context("opening lamp pins")?;

            for approach in Approach::ALL {
                let pins = config.gpio.pins(approach);
                let (green, red) = lamps.pin_numbers(approach);
                events.log(EventCode::SensorPin, approach.name(), pins.trigger as f64);
                events.log(EventCode::SensorPin, approach.name(), pins.echo as f64);
                events.log(EventCode::RedLampPin, approach.name(), red as f64);
                events.log(EventCode::GreenLampPin, approach.name(), green as f64);
            }
            info!("✓ GPIO sensors and lamps ready under {}", root.display());

            Ok((Box::new(detector), Box::new(lamps)))
        }
    }
}

fn drive<C: Clock>(
    config: &Config,
    clock: C,
    detector: Box<dyn ProximityDetector>,
    indicators: Box<dyn Indicators>,
    events: &mut dyn LogSink,
) -> Result<RunOutcome> {
    let mut controller = PhaseController::new(&config.controller, clock, detector, indicators)?;
    Ok(controller.run(events))
}
