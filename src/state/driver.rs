//! Tick harness driving the feedback state machine
//!
//! One tick per frame: read the signal, measure the real time since the
//! previous frame, hand both to the machine.

use std::time::Duration;

use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::info;

use crate::audio::{AudioCommand, AudioSink};
use crate::signal::SignalSource;

use super::FeedbackMachine;

/// Runs a [`FeedbackMachine`] against a signal source at a fixed frame rate
pub struct FeedbackLoop<S, F> {
    machine: FeedbackMachine<S>,
    signal: F,
    frame: Duration,
}

impl<S: AudioSink, F: SignalSource> FeedbackLoop<S, F> {
    pub fn new(machine: FeedbackMachine<S>, signal: F, frame: Duration) -> Self {
        Self {
            machine,
            signal,
            frame,
        }
    }

    /// The driven state machine
    pub fn machine(&self) -> &FeedbackMachine<S> {
        &self.machine
    }

    /// Run one tick with an explicit time delta
    pub fn step(&mut self, dt: f32) -> Vec<AudioCommand> {
        let rate = self.signal.vertical_rate();
        self.machine.tick(rate, dt)
    }

    /// Tick once per frame until the future is dropped
    pub async fn run(&mut self) {
        info!(frame_ms = self.frame.as_millis() as u64, "feedback loop started");

        let mut interval = time::interval(self.frame);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut last = Instant::now();

        loop {
            interval.tick().await;
            let now = Instant::now();
            let dt = now.duration_since(last).as_secs_f32();
            last = now;
            self.step(dt);
        }
    }

    /// Silence the sink when the daemon stops
    pub fn shutdown(&mut self) {
        let mode = self.machine.mode();
        let holding_sink_tone = self.machine.is_holding_sink_tone();
        if !self.machine.silence().is_empty() {
            info!(%mode, holding_sink_tone, "feedback audio stopped");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use tokio::sync::{broadcast, watch};

    use super::*;
    use crate::audio::HeadlessSink;
    use crate::config::VarioSettings;
    use crate::signal::SignalFeed;
    use crate::state::Mode;

    fn create_loop(
        rate: Option<f32>,
    ) -> (FeedbackLoop<HeadlessSink, SignalFeed>, watch::Sender<Option<f32>>) {
        let (signal_tx, signal_rx) = watch::channel(rate);
        let (_enabled_tx, enabled_rx) = watch::channel(true);
        let (event_tx, _) = broadcast::channel(16);
        let sink = HeadlessSink::with_clip(Some(PathBuf::from("tone.wav")), 0.5);
        let machine = FeedbackMachine::new(VarioSettings::default(), sink, enabled_rx, event_tx);
        (
            FeedbackLoop::new(machine, SignalFeed::new(signal_rx), Duration::from_millis(10)),
            signal_tx,
        )
    }

    #[test]
    fn test_step_reads_signal() {
        let (mut feedback, signal_tx) = create_loop(Some(-20.0));
        let commands = feedback.step(0.01);
        assert!(commands.contains(&AudioCommand::Play { looping: true }));
        assert_eq!(feedback.machine().mode(), Mode::Sink);

        // Let the fade-in finish, then drop the signal
        for _ in 0..10 {
            feedback.step(0.01);
        }
        signal_tx.send_replace(None);
        assert_eq!(feedback.step(0.01), vec![AudioCommand::Stop]);
        assert_eq!(feedback.machine().mode(), Mode::Idle);
    }

    #[test]
    fn test_run_ticks_in_real_time() {
        let (mut feedback, _signal_tx) = create_loop(Some(-20.0));

        tokio_test::block_on(async {
            let result = time::timeout(Duration::from_millis(150), feedback.run()).await;
            assert!(result.is_err());
        });

        assert_eq!(feedback.machine().mode(), Mode::Sink);
        assert!(feedback.machine().is_holding_sink_tone());
    }

    #[test]
    fn test_shutdown_silences() {
        let (mut feedback, _signal_tx) = create_loop(Some(9.0));
        feedback.step(0.01);
        assert!(feedback.machine().sink().is_playing());

        feedback.shutdown();
        assert!(!feedback.machine().sink().is_playing());
    }
}
