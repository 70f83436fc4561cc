//! valvectl: timed valve sequencer.
//!
//! Hexagonal layout: the sequencer core knows only port traits; this
//! file wires the concrete adapters to it.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  ValveBank        FileCheckpoint   SystemDelay   LogEventSink  │
//! │  (ActuatorPort)   (CheckpointPort) (DelayPort)   (EventSink)   │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              AppService (pure logic)                   │    │
//! │  │  FSM · plan · state registry                           │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  TelemetryReader thread: SerialAnalyzer → InfluxSink, DataLog  │
//! └────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::{error, info, warn};

use valvectl::adapters::analyzer::SerialAnalyzer;
use valvectl::adapters::checkpoint_file::FileCheckpoint;
use valvectl::adapters::data_log::DataLog;
use valvectl::adapters::hardware::ValveBank;
use valvectl::adapters::influx::InfluxSink;
use valvectl::adapters::log_sink::LogEventSink;
use valvectl::adapters::time::{ManualAdvance, SystemDelay, spawn_stdin_advance};
use valvectl::app::commands::{AppCommand, ManualCommand};
use valvectl::app::service::{AppService, Settings};
use valvectl::config::RigConfig;
use valvectl::error::Error;
use valvectl::registry::StateRegistry;
use valvectl::telemetry::TelemetryReader;

#[derive(Parser)]
#[command(version, about = "Timed valve sequencer")]
struct Cli {
    /// Rig configuration file.
    #[arg(default_value = "config.yml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Apply every device's initial state and exit.
    Init,
    /// Apply a single `device,port,state` command and exit.
    Manual {
        #[arg(value_name = "DEVICE,PORT,STATE")]
        step: String,
    },
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    info!("valvectl v{}", env!("CARGO_PKG_VERSION"));

    // ── Configuration ─────────────────────────────────────────
    let cfg = RigConfig::load(&cli.config)
        .map_err(Error::from)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    let rig = cfg
        .validate()
        .map_err(Error::from)
        .with_context(|| format!("validating {}", cli.config.display()))?;

    let command = match cli.command {
        None => AppCommand::RunSequence,
        Some(Command::Init) => AppCommand::InitOnly,
        Some(Command::Manual { step }) => {
            AppCommand::Manual(ManualCommand::parse(&step).map_err(Error::from)?)
        }
    };

    // ── State registry ────────────────────────────────────────
    let registry = Arc::new(match &cfg.states_file {
        Some(path) => StateRegistry::open(path),
        None => StateRegistry::in_memory(),
    });

    // ── Pre-flight (no hardware I/O) ──────────────────────────
    let catalog = rig.catalog.clone();
    let is_sequence = matches!(command, AppCommand::RunSequence);
    let mut store = FileCheckpoint::from_config(cfg.step_file.as_deref());
    let mut sink = LogEventSink::new();
    let mut service = AppService::new(rig, Arc::clone(&registry), command, Settings::from_config(&cfg));
    service
        .prepare(&store, &mut sink)
        .with_context(|| format!("checking {}", cli.config.display()))?;

    // ── Hardware ──────────────────────────────────────────────
    let mut hw = ValveBank::connect(catalog, &cfg.gpio_root)
        .map_err(Error::from)
        .context("connecting devices")?;

    // ── Telemetry (sequence runs only) ────────────────────────
    if cfg.analyzer.enabled && is_sequence {
        let mut reader = TelemetryReader::new(SerialAnalyzer::new(&cfg.analyzer), registry);
        if cfg.influxdb.enabled {
            reader = reader.with_sink(Box::new(InfluxSink::new(cfg.influxdb.clone())));
        }
        if let Some(path) = &cfg.data_file {
            reader = reader.with_sink(Box::new(DataLog::new(path)));
        }
        if let Err(e) = reader.spawn() {
            warn!("Telemetry: could not start reader thread: {e}");
        }
    }

    // ── Manual advance ────────────────────────────────────────
    let advance = Arc::new(ManualAdvance::new());
    if cfg.manual_mode && is_sequence {
        spawn_stdin_advance(Arc::clone(&advance)).context("starting stdin reader")?;
    }

    // ── Run ───────────────────────────────────────────────────
    let mut clock = SystemDelay::new(advance);
    service.run(&mut hw, &mut store, &mut clock, &mut sink)?;

    info!("Sequencer: done after {} pass(es)", service.passes());
    Ok(())
}
