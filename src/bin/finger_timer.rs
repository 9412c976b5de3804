// src/bin/finger_timer.rs
//! Finger timer running against a simulated camera
//!
//! ```text
//! finger-timer --script 0,0,3 --cycles 200
//! finger-timer --collect --fingers 1
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use finger_timer::collection::{command_channel, CollectionHandle, SettingsUpdate};
use finger_timer::config::{ConfigLoader, OperatingMode};
use finger_timer::hal::simulator::{SimulatedBus, SimulatorConfig, SyntheticCamera};
use finger_timer::hal::{FrameSource, LogAudio, LogDisplay, PolledCamera, SharedCamera};
use finger_timer::logic::DeviceContext;
use finger_timer::utils::{MonotonicTimeProvider, TimeProvider};

/// Polls the simulated capture-done flag stays low for
const SIMULATED_CAPTURE_POLLS: u32 = 2;

type SimulatedCamera = SharedCamera<PolledCamera<SimulatedBus>>;

#[derive(Debug, Parser)]
#[command(name = "finger-timer", version, about = "Gesture-set countdown timer on a simulated camera")]
struct Args {
    /// Extra configuration file layered over the discovered ones
    #[arg(long)]
    config: Option<PathBuf>,

    /// Stop after this many loop iterations
    #[arg(long)]
    cycles: Option<u64>,

    /// Collect labelled training rows instead of running the timer
    #[arg(long)]
    collect: bool,

    /// First label to collect in data-collection mode
    #[arg(long, default_value_t = 0)]
    fingers: u8,

    /// Finger counts the simulated hand shows on successive frames; the last one holds
    #[arg(long, value_delimiter = ',', default_value = "0,0,0,2")]
    script: Vec<u8>,

    /// Simulator noise seed
    #[arg(long, default_value_t = 0x5EED)]
    seed: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut loader = match &args.config {
        Some(path) => {
            let mut paths = ConfigLoader::new().config_paths().to_vec();
            paths.push(path.clone());
            ConfigLoader::with_paths(paths)
        }
        None => ConfigLoader::new(),
    };
    let mut config = loader.load_system_config()?;
    if args.collect {
        config.system.mode = OperatingMode::DataCollection;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.system.log_level)))
        .init();

    let clock: Arc<dyn TimeProvider> = Arc::new(MonotonicTimeProvider::new());
    let synthetic = SyntheticCamera::new(SimulatorConfig {
        seed: args.seed,
        ..SimulatorConfig::default()
    })
    .with_script(args.script.iter().copied());

    let mut polled = PolledCamera::new(
        SimulatedBus::new(synthetic, SIMULATED_CAPTURE_POLLS),
        config.camera.clone(),
        clock.clone(),
    );
    if let Err(err) = polled.initialize() {
        warn!(error = %err, "camera initialization failed");
    }
    let camera = SharedCamera::new(polled);

    let mut device = DeviceContext::from_config(
        config.clone(),
        Box::new(camera.clone()),
        Box::new(LogDisplay),
        Box::new(LogAudio),
        clock,
    )?;

    let collaborator = if config.system.mode == OperatingMode::DataCollection {
        let (handle, commands) = command_channel();
        device = device.with_collection(commands);
        Some(spawn_collaborator(handle, camera.clone(), args.fingers))
    } else {
        None
    };

    device.startup();

    let mut interval = tokio::time::interval(Duration::from_millis(config.system.loop_interval_ms));
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut iterations: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                device.tick();
                iterations += 1;

                if args.cycles.is_some_and(|limit| iterations >= limit) {
                    break;
                }
                if collaborator.as_ref().is_some_and(|worker| worker.is_finished()) {
                    info!("collaborator finished");
                    break;
                }
            }
            _ = &mut shutdown => {
                info!("interrupted");
                break;
            }
        }
    }

    info!(
        iterations,
        state = %device.state(),
        confirmations = device.pipeline().confirmations(),
        failed_cycles = device.failed_cycles(),
        "shutting down"
    );
    Ok(())
}

/// Stands in for the HTTP handlers: configures and starts an auto session,
/// serves still images through the shared camera and exports the rows.
fn spawn_collaborator(handle: CollectionHandle, mut camera: SimulatedCamera, fingers: u8) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        let reply_timeout = Duration::from_secs(2);
        let settings = SettingsUpdate {
            fingers: Some(fingers),
            samples_per_count: Some(3),
            auto_mode: Some(true),
            delay_ms: Some(500),
        };
        if let Err(err) = handle.update_settings(settings).and_then(|_| handle.start()) {
            warn!(error = %err, "could not start collection");
            return;
        }

        loop {
            thread::sleep(Duration::from_secs(1));

            match camera.capture() {
                Ok(frame) => debug!(bytes = frame.len(), "still image served"),
                Err(err) => warn!(error = %err, "still image capture failed"),
            }

            match handle.status(reply_timeout) {
                Ok(status) => {
                    info!(
                        fingers = status.current_fingers,
                        sample = status.current_sample,
                        total = status.total_samples,
                        "collection status"
                    );
                    if !status.is_collecting {
                        break;
                    }
                }
                Err(err) => {
                    warn!(error = %err, "status request failed");
                    return;
                }
            }
        }

        match handle.export_data(reply_timeout) {
            Ok(csv) => info!(rows = csv.lines().count(), "collected data exported"),
            Err(err) => warn!(error = %err, "export failed"),
        }
    })
}
