//! hfp-headset: turns a single-board computer into a Bluetooth hands-free
//! headset.
//!
//! Usage: `hfp-headset [--config <file>] [--debug] [--log-file <file>] [--check]`

mod config;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use headset_audio::{AudioRouteController, AudioServer, PactlServer, VolumeStore};
use headset_core::LedFrame;
use headset_session::{event_queue, CallStateMachine, Orchestrator, SessionEvent};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::Config;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "hfp-headset", version, about = "Bluetooth hands-free headset daemon")]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level.
    #[arg(short, long)]
    debug: bool,

    /// Write logs to this file instead of stderr.
    #[arg(short, long)]
    log_file: Option<PathBuf>,

    /// Report whether BlueZ and the sound server are ready, then exit.
    #[arg(long)]
    check: bool,
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer and must be kept alive.
fn setup_logging(
    args: &Args,
    config: &Config,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let level = if args.debug {
        tracing::Level::DEBUG
    } else {
        config.log_level()?
    };

    let Some(path) = args.log_file.as_ref().or(config.logging.file.as_ref()) else {
        tracing_subscriber::fmt()
            .with_max_level(level)
            .with_target(false)
            .init();
        return Ok(None);
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("opening log file {}", path.display()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_max_level(level)
        .init();

    info!("Logging to: {:?}", path);

    Ok(Some(guard))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = Config::load(args.config.as_deref()).context("loading configuration")?;

    if args.check {
        return check();
    }

    // Setup logging before anything else
    let _guard = setup_logging(&args, &config)?;

    info!("Starting hands-free headset \"{}\"", config.bluetooth.device_name);

    let server = PactlServer::with_program(config.audio.pactl.clone());
    if !server.is_available().await {
        warn!("Sound server is not answering, call audio will not be routed until it is");
    }
    let audio = AudioRouteController::new(server, config.profile_names(), config.retry_policy())
        .with_store(VolumeStore::new(&config.audio.volume_file));

    let (events, queue) = event_queue(config.session.queue_capacity);
    let (leds, led_frames) = watch::channel(LedFrame::default());
    let orchestrator = Orchestrator::new(
        CallStateMachine::new(config.machine()),
        audio,
        leds,
        queue,
        config.orchestrator(),
    );
    let session = tokio::spawn(orchestrator.run());

    let io_tasks = start_io(&config, led_frames, events.clone());
    let bluetooth = start_bluetooth(&config, events.clone()).await?;

    shutdown_signal().await;

    if events.send(SessionEvent::Shutdown).await.is_err() {
        warn!("Session already stopped");
    }
    let machine = session.await.context("session task failed")?;
    info!("Final call state: {}", machine.state());

    bluetooth.abort();
    for task in io_tasks {
        // The LED driver draws its final frame once the orchestrator is gone
        if tokio::time::timeout(Duration::from_secs(1), task).await.is_err() {
            warn!("I/O task did not stop in time");
        }
    }

    info!("Hands-free headset exiting");
    Ok(())
}

/// Print the system setup status.
#[cfg(target_os = "linux")]
fn check() -> Result<()> {
    let status = headset_bluetooth::SystemSetup::check();
    println!("{}", status.summary());
    for issue in &status.issues {
        println!("  - {}", issue.description);
        if let Some(cmd) = &issue.fix_command {
            println!("    Fix: {}", cmd);
        }
    }
    if !status.ready {
        std::process::exit(1);
    }
    Ok(())
}

#[cfg(not(target_os = "linux"))]
fn check() -> Result<()> {
    anyhow::bail!("the hands-free headset only runs on Linux")
}

/// Start the button poller and LED driver.
///
/// Missing or failing GPIO degrades to running without them.
#[cfg(target_os = "linux")]
fn start_io(
    config: &Config,
    led_frames: watch::Receiver<LedFrame>,
    events: mpsc::Sender<SessionEvent>,
) -> Vec<JoinHandle<()>> {
    use headset_core::Button;
    use headset_io::gpio::GpioChip;
    use headset_io::{ButtonPoller, LedDriver};

    let gpio = &config.gpio;
    if !gpio.enabled {
        info!("GPIO disabled, running without buttons and LEDs");
        return Vec::new();
    }

    let mut chip = match GpioChip::open(&gpio.chip) {
        Ok(chip) => chip,
        Err(e) => {
            warn!("{}, running without buttons and LEDs", e);
            return Vec::new();
        }
    };

    let mut poller = ButtonPoller::new(
        config.debounce(),
        Duration::from_millis(gpio.poll_interval_ms),
        gpio.active_low,
    );
    for button in Button::ALL {
        let Some(line) = gpio.button_line(button) else {
            continue;
        };
        match chip.input(button.pin_name(), line) {
            Ok(pin) => poller.add(button, pin),
            Err(e) => warn!("{}, button disabled", e),
        }
    }

    let mut tasks = Vec::new();
    if poller.active_buttons() > 0 {
        tasks.push(tokio::spawn(
            poller.spawn().forward(events, SessionEvent::Button),
        ));
    }

    let mut output = |pin: &'static str, line: Option<u32>| {
        chip.output(pin, line?)
            .map_err(|e| warn!("{}, LED disabled", e))
            .ok()
    };
    let status = output("led_status", gpio.led_status);
    let call = output("led_call", gpio.led_call);
    if status.is_some() || call.is_some() {
        let driver = LedDriver::new(
            status,
            call,
            led_frames,
            Duration::from_millis(gpio.led_tick_ms),
        );
        tasks.push(tokio::spawn(driver.run()));
    }

    tasks
}

#[cfg(not(target_os = "linux"))]
fn start_io(
    _config: &Config,
    _led_frames: watch::Receiver<LedFrame>,
    _events: mpsc::Sender<SessionEvent>,
) -> Vec<JoinHandle<()>> {
    warn!("GPIO is only available on Linux");
    Vec::new()
}

/// Prepare the adapter and accept phones on the Hands-Free profile.
#[cfg(target_os = "linux")]
async fn start_bluetooth(
    config: &Config,
    events: mpsc::Sender<SessionEvent>,
) -> Result<JoinHandle<()>> {
    use headset_bluetooth::{AdapterSettings, BluetoothAdapter, HfpListener, HfpProfileConfig};

    let adapter = BluetoothAdapter::new().await?;
    adapter
        .prepare(&AdapterSettings {
            alias: config.bluetooth.device_name.clone(),
            discoverable: config.bluetooth.discoverable,
            pairable: config.bluetooth.pairable,
        })
        .await?;

    let profile = HfpProfileConfig {
        channel: config.bluetooth.channel,
        hf_features: config.bluetooth.hf_features,
        ..Default::default()
    };
    let listener = HfpListener::register(adapter.session(), &profile)
        .await
        .context("registering the Hands-Free profile")?;

    let send_timeout = config.send_timeout();
    Ok(tokio::spawn(async move {
        // Keep the BlueZ session alive for as long as the profile is served
        let _adapter = adapter;
        listener.run(events, send_timeout).await;
    }))
}

#[cfg(not(target_os = "linux"))]
async fn start_bluetooth(
    _config: &Config,
    _events: mpsc::Sender<SessionEvent>,
) -> Result<JoinHandle<()>> {
    anyhow::bail!("Bluetooth requires BlueZ on Linux")
}

/// Wait for Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("Cannot listen for SIGTERM: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    info!("Shutdown signal received");
}
