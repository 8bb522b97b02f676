//! variometer-daemon: audio variometer for gliding flight
//!
//! Listens to the vertical rate and makes it audible:
//! - Beeps when climbing, faster and higher-pitched with stronger lift
//! - A continuous tone when sinking, lower-pitched with stronger sink
//! - Silence in between
//!
//! Vertical rates arrive on stdin, the on/off toggle over a Unix socket.
//! The tone plays on the default output device; without one the daemon
//! falls back to a headless sink that tracks and traces playback.

mod audio;
mod config;
mod events;
mod ipc;
mod lifecycle;
mod signal;
mod state;

use anyhow::Result;
use tokio::sync::{broadcast, watch};
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::audio::{AudioSink, OutputSink};
use crate::config::{Config, VarioSettings};
use crate::events::FeedbackEvent;
use crate::ipc::Server;
use crate::lifecycle::ShutdownSignal;
use crate::signal::{SignalFeed, SignalListener};
use crate::state::{FeedbackLoop, FeedbackMachine};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout stays free for the host
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info"))
        )
        .with_writer(std::io::stderr)
        .init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "variometer-daemon starting"
    );

    // Load configuration
    let config = Config::load()?;
    config.ensure_dirs()?;
    info!(?config.settings_path, ?config.socket_path, "configuration loaded");

    let settings = VarioSettings::load(&config.settings_path);
    info!(
        lift_threshold = settings.lift_threshold,
        sink_threshold = settings.sink_threshold,
        "settings loaded"
    );

    // Register shutdown handlers before anything long-running starts
    let mut shutdown = ShutdownSignal::new()?;

    // IPC server -> feedback loop (on/off toggle)
    let (enabled_tx, enabled_rx) = watch::channel(config.start_enabled);
    // Signal listener -> feedback loop (latest vertical rate)
    let (signal_tx, signal_rx) = watch::channel(None);
    // Feedback loop -> IPC server (mode reporting)
    let (event_tx, _event_rx) = broadcast::channel::<FeedbackEvent>(64);

    // Open the sink; a missing clip or device is logged here once
    let sink = OutputSink::open(
        &config.data_dir,
        &settings.audio_clip_path,
        settings.base_volume,
        config.headless_audio,
    );
    let audio_backend = sink.backend();

    let machine = FeedbackMachine::new(settings, sink, enabled_rx, event_tx.clone());
    let mut feedback = FeedbackLoop::new(machine, SignalFeed::new(signal_rx), config.frame_interval);

    // Start the signal listener (runs on dedicated thread)
    let signal_listener = SignalListener::new(signal_tx);
    match signal_listener.start() {
        Ok(()) => {
            info!("signal listener started");
        }
        Err(e) => {
            error!(?e, "failed to start signal listener");
            warn!("continuing without signal input - variometer will stay silent");
        }
    }

    let server = Server::new(&config.socket_path, enabled_tx)?;

    let mut feedback_event_rx = event_tx.subscribe();
    let server_for_events = &server;

    info!(
        enabled = config.start_enabled,
        audio = audio_backend,
        audio_ready = feedback.machine().sink().is_ready(),
        signal_input = signal_listener.is_running(),
        "daemon initialized, entering main loop"
    );

    tokio::select! {
        // Tick the feedback state machine every frame
        _ = feedback.run() => {
            info!("feedback loop exited");
        }

        // Run the IPC server (accepts toggle clients)
        result = server.run() => {
            if let Err(e) = result {
                error!(?e, "IPC server error");
            }
        }

        // Keep the IPC server's view of the mode current
        _ = async {
            loop {
                match feedback_event_rx.recv().await {
                    Ok(FeedbackEvent::ModeChanged { to, .. }) => {
                        server_for_events.set_mode(to).await;
                    }
                    Ok(event) => {
                        debug!(%event, "feedback event");
                    }
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "feedback event receiver lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        break;
                    }
                }
            }
        } => {
            info!("feedback event handler exited");
        }

        // Wait for shutdown signal
        signal = shutdown.wait() => {
            info!(signal, "shutdown signal received");
        }
    }

    // Cleanup
    info!("shutting down...");

    feedback.shutdown();
    signal_listener.stop();
    server.shutdown().await;

    info!("variometer-daemon stopped");

    Ok(())
}
