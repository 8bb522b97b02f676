//! Signal listener reading vertical rates from standard input
//!
//! Runs on a dedicated thread so blocking reads never stall the tick loop.
//! Only the latest reading matters, so it is published through a watch
//! channel rather than queued.

use std::io::BufRead;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::reading::parse_line;

/// Reads signal lines from stdin and publishes the latest vertical rate
pub struct SignalListener {
    reading_tx: watch::Sender<Option<f32>>,
    running: Arc<AtomicBool>,
}

impl SignalListener {
    /// Create a new signal listener
    pub fn new(reading_tx: watch::Sender<Option<f32>>) -> Self {
        Self {
            reading_tx,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Start the listener thread
    ///
    /// The thread exits at end of input, or after `stop()` once the next
    /// line arrives.
    pub fn start(&self) -> Result<(), SignalError> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(SignalError::AlreadyRunning);
        }

        let reading_tx = self.reading_tx.clone();
        let running = Arc::clone(&self.running);

        thread::Builder::new()
            .name("signal-listener".to_string())
            .spawn(move || {
                info!("signal listener thread started");

                let stdin = std::io::stdin();
                let lines = stdin.lock().lines();
                pump(lines, &reading_tx, &running);

                running.store(false, Ordering::SeqCst);
                info!("signal listener thread stopped");
            })
            .map_err(|e| {
                self.running.store(false, Ordering::SeqCst);
                SignalError::ThreadSpawn(e.to_string())
            })?;

        Ok(())
    }

    /// Stop the listener
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    /// Check if the listener is currently running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// Errors that can occur in the signal listener
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("signal listener is already running")]
    AlreadyRunning,

    #[error("failed to spawn listener thread: {0}")]
    ThreadSpawn(String),
}

/// Publish readings from `lines` until input ends or `running` clears
///
/// The signal goes unavailable when input ends.
fn pump<I>(lines: I, reading_tx: &watch::Sender<Option<f32>>, running: &AtomicBool)
where
    I: Iterator<Item = std::io::Result<String>>,
{
    for line in lines {
        if !running.load(Ordering::SeqCst) {
            return;
        }

        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!(?e, "failed to read signal input");
                break;
            }
        };

        apply_line(&line, reading_tx);
    }

    info!("signal input ended, marking signal unavailable");
    reading_tx.send_replace(None);
}

/// Publish the reading carried by one line, if any
///
/// Malformed lines leave the previous reading in place.
fn apply_line(line: &str, reading_tx: &watch::Sender<Option<f32>>) {
    match parse_line(line) {
        Ok(Some(reading)) => {
            debug!(?reading, "signal reading");
            reading_tx.send_replace(reading);
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, line, "ignoring signal line"),
    }
}
