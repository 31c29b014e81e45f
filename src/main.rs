// Copyright (c) 2026 bad-antics
// Licensed under the MIT License. See LICENSE file in the project root.
// https://github.com/bad-antics/pirsnap

//! pirsnap - motion-triggered capture orchestrator
//!
//! Waits for PIR motion while armed, has the camera take a picture and
//! reports it to the server, showing progress on a four-line status display.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::broadcast;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use pirsnap::capture::{CaptureBackend, DeviceLinkBackend, RemoteTriggerBackend, SimulatedCamera};
use pirsnap::display::{DisplaySink, LogDisplay, StatusPresenter};
use pirsnap::sensors::{LogIndicator, SimulatedInputs};
use pirsnap::upload::{HostNetwork, HttpUploader, Network, StaticNetwork};
use pirsnap::{build_info, BackendKind, Clock, Config, Orchestrator, Peripherals, VERSION};

/// pirsnap - motion-triggered capture orchestrator
#[derive(Parser, Debug)]
#[command(name = "pirsnap")]
#[command(author = "bad-antics")]
#[command(version = VERSION)]
#[command(about = "Motion-triggered camera capture and upload")]
struct Args {
    /// Configuration file path (created with defaults if missing)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Enable trace-level logging
    #[arg(long)]
    trace: bool,

    /// Capture path to drive
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Serial device of the camera board
    #[arg(short, long)]
    port: Option<String>,

    /// Base URL of the report server
    #[arg(long)]
    server: Option<String>,

    /// Demo mode with a simulated camera board
    #[arg(long)]
    demo: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    dump_config: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.trace {
        Level::TRACE
    } else if args.debug {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(args.debug)
        .with_line_number(args.debug)
        .with_ansi(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let build = build_info();
    info!(
        "pirsnap v{} ({}/{}, features: {:?})",
        build.version, build.os, build.target, build.features
    );

    // Explicit path, else the default path if present, else compiled-in defaults
    let config_path = args
        .config
        .clone()
        .or_else(|| Some(Config::default_path()).filter(|p| p.exists()));
    let mut config = match &config_path {
        Some(path) => Config::load_or_create(path)?,
        None => Config::default(),
    };

    // Override with command line args
    if args.demo {
        config.demo_mode = true;
    }
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(port) = args.port {
        config.link.port = Some(port);
    }
    if let Some(server) = args.server {
        config.server.base_url = server;
    }
    config.validate()?;

    if args.dump_config {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    match &config_path {
        Some(path) => info!("Configuration loaded from {:?}", path),
        None => info!("Using built-in configuration"),
    }
    info!("Demo mode: {}", config.demo_mode);

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    rt.block_on(run(config))
}

/// Wires the components together and runs the loop until Ctrl+C
async fn run(config: Config) -> Result<()> {
    let clock = Clock::start();

    let network: Arc<dyn Network> = if config.demo_mode {
        Arc::new(StaticNetwork { connected: true })
    } else {
        Arc::new(HostNetwork::new(&config.server.base_url)?)
    };

    let backend: Box<dyn CaptureBackend> = match config.backend {
        BackendKind::RemoteTrigger => Box::new(RemoteTriggerBackend::new(&config.server)?),
        BackendKind::DeviceLink if config.demo_mode => {
            let camera = SimulatedCamera::new(&config.simulator);
            Box::new(DeviceLinkBackend::new(camera, &config.link, clock))
        }
        BackendKind::DeviceLink => open_serial_backend(&config, clock)?,
    };

    let uploader = HttpUploader::new(&config.server, network.clone())?;

    let sink: Option<Box<dyn DisplaySink>> = if config.display.enabled {
        Some(Box::new(LogDisplay::new()))
    } else {
        None
    };

    info!("Host has no PIR or button lines; using simulated inputs");
    let peripherals = Peripherals {
        pins: Box::new(SimulatedInputs::new(&config.simulator, clock)),
        indicator: Box::new(LogIndicator::new()),
    };

    let mut orchestrator = Orchestrator::new(
        &config,
        clock,
        backend,
        Box::new(uploader),
        network,
        StatusPresenter::new(sink),
        peripherals,
    );

    orchestrator.startup().await;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, cleaning up...");
                let _ = shutdown_tx.send(());
            }
            Err(e) => warn!("Could not listen for Ctrl+C: {}", e),
        }
    });

    info!("pirsnap running, press Ctrl+C to shutdown");
    orchestrator.run(shutdown_rx).await;

    info!("pirsnap shutdown complete");
    Ok(())
}

#[cfg(feature = "serial")]
fn open_serial_backend(config: &Config, clock: Clock) -> Result<Box<dyn CaptureBackend>> {
    use pirsnap::capture::SerialLink;

    let port = config
        .link
        .port
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("No serial port configured; pass --port or --demo"))?;
    let link = SerialLink::open(port, config.link.baud_rate)?;
    Ok(Box::new(DeviceLinkBackend::new(link, &config.link, clock)))
}

#[cfg(not(feature = "serial"))]
fn open_serial_backend(_config: &Config, _clock: Clock) -> Result<Box<dyn CaptureBackend>> {
    anyhow::bail!("Serial support not enabled. Build with --features serial or use --demo")
}
