//! Sarathi - onboard coordinator daemon
//!
//! Startup order matters: the operator console is accepted first so every
//! later status message reaches it, then the controller port is opened, the
//! sensor loops and worker threads start, and the main thread becomes the
//! reconnect supervisor until Ctrl-C.

use clap::Parser;
use log::{error, info, warn};
use sarathi::config::Config;
use sarathi::context::Context;
use sarathi::error::{Error, Result};
use sarathi::protocol::OutboundMessage;
use sarathi::sensors::{GpioProximity, IioDistance, spawn_monitors};
use sarathi::services::{CommandCamera, ImageRecClient, PathClient};
use sarathi::shared::SharedState;
use sarathi::threads::{OperatorTasks, ReconnectSupervisor, spawn_threads};
use sarathi::transport::{Link, SerialLink, TcpLink};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "sarathi")]
#[command(about = "Onboard coordinator for a course-running ground robot")]
struct Args {
    /// Configuration file (defaults are used when it does not exist)
    #[arg(short, long, default_value = "sarathi.toml")]
    config: PathBuf,

    /// Log filter, overrides `[logging] level`
    #[arg(long)]
    log_level: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::load_or_default(&args.config)?;
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    info!("Sarathi v{} starting...", env!("CARGO_PKG_VERSION"));
    info!("Using config: {}", args.config.display());

    let shared = Arc::new(SharedState::new());
    let operator = Arc::new(TcpLink::new(config.operator.bind_address.clone()));
    let controller = Arc::new(SerialLink::new(
        config.controller.port.clone(),
        config.controller.baud_rate,
        Duration::from_millis(config.controller.read_timeout_ms),
    ));

    {
        let shared = Arc::clone(&shared);
        let operator = Arc::clone(&operator);
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            shared.signal_shutdown();
            operator.close();
        })
        .map_err(|e| Error::Other(format!("Error setting Ctrl-C handler: {}", e)))?;
    }

    let ctx = Context {
        shared: Arc::clone(&shared),
        controller: controller.clone(),
        operator: operator.clone(),
        vision: Arc::new(ImageRecClient::new(&config.api)?),
        planner: Arc::new(PathClient::new(&config.api)?),
        camera: Arc::new(CommandCamera::new(&config.camera)),
        config: Arc::new(config),
    };

    // Operator first: everything after this is reported to the console.
    operator.bind()?;
    info!("Waiting for operator...");
    operator.connect()?;
    shared.record_link_connected();
    shared.notify(OutboundMessage::info("You are connected to Sarathi!"));
    let tasks = OperatorTasks::spawn(&ctx)?;

    controller.connect()?;
    info!("Controller connected on {}", ctx.config.controller.port);

    if ctx.planner.health() {
        info!("Path planning API is up");
    } else {
        warn!("Path planning API is down");
        shared.notify(OutboundMessage::error("API is down!"));
    }

    let sensors = &ctx.config.sensors;
    let _sensor_handles = spawn_monitors(
        Box::new(IioDistance::new(sensors.distance_path.clone())),
        Box::new(GpioProximity::new(sensors.left_path.clone())),
        Box::new(GpioProximity::new(sensors.right_path.clone())),
        Arc::clone(&shared),
        sensors,
    )?;
    let handles = spawn_threads(&ctx)?;

    shared.notify(OutboundMessage::info("Robot is ready!"));
    shared.notify(OutboundMessage::mode(shared.mode()));
    ctx.signal_controller("ZZ02");
    info!("Sarathi running. Press Ctrl-C to stop.");

    let remaining = ReconnectSupervisor::new(ctx.clone()).run(tasks)?;

    // Shutdown
    info!("Shutting down...");
    if let Some(tasks) = remaining {
        let report = tasks.terminate(&ctx);
        if !report.is_clean() {
            error!("Operator tasks did not stop: {:?}", report);
        }
    }
    for (name, handle) in [("command sequencer", handles.command), ("action dispatcher", handles.actions)] {
        if handle.join().is_err() {
            error!("{} panicked", name);
        }
    }
    // The acknowledgement listener may be parked in a serial read; it ends with the process.
    drop(handles.ack);
    controller.disconnect();
    operator.disconnect();

    info!("Sarathi stopped");
    Ok(())
}
