//! Core feedback state machine
//!
//! Turns one vertical-rate sample per tick into audio sink commands. Every
//! wait of the feedback cycle (beep hold, beep fade, silence gap, fade in,
//! fade out, idle poll) is an explicit [`Phase`] carrying its elapsed time,
//! so the machine suspends between ticks and resumes exactly where it left
//! off. A new mode is only chosen once the current wait has run out.

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};
use tracing::{debug, info, trace};

use crate::audio::{AudioCommand, AudioSink, Fade};
use crate::config::VarioSettings;
use crate::events::FeedbackEvent;

use super::profile::{sink_pitch, LiftProfile};

/// Length of every anti-pop fade, in seconds
pub const FADE_SECS: f32 = 0.05;

/// Wait between checks while disabled or without a signal, in seconds
pub const IDLE_POLL_SECS: f32 = 0.2;

/// Which kind of feedback the last decision chose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Disabled, no signal, or no clip: silent
    #[default]
    Idle,
    /// Climbing: discrete beeps
    Lift,
    /// Sinking: continuous tone
    Sink,
    /// Between the thresholds: silent
    Deadzone,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Idle => write!(f, "Idle"),
            Mode::Lift => write!(f, "Lift"),
            Mode::Sink => write!(f, "Sink"),
            Mode::Deadzone => write!(f, "Deadzone"),
        }
    }
}

/// Where the feedback cycle is suspended
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    /// Waiting one frame; the next tick makes a fresh decision
    NextFrame,
    /// Disabled or unavailable, polling again after [`IDLE_POLL_SECS`]
    Idle { waited: f32 },
    /// Fading the sink tone out before a beep
    PreBeepFade { fade: Fade, beep: LiftProfile },
    /// Beep playing at full volume
    BeepHold { beep: LiftProfile, hold: f32, waited: f32 },
    /// Beep tail fading to zero
    BeepFade { beep: LiftProfile, fade: Fade },
    /// Silence after a beep
    BeepGap { beep: LiftProfile, waited: f32 },
    /// Sink tone ramping up from silence
    SinkFadeIn { fade: Fade },
    /// Sink tone fading out on entering the deadzone
    DeadzoneFade { fade: Fade },
}

/// The feedback state machine
///
/// Owns the audio sink outright. The enable toggle is read only when a new
/// decision is due, so disabling mid-beep lets the episode finish first.
pub struct FeedbackMachine<S> {
    settings: VarioSettings,
    sink: S,
    /// External on/off toggle
    enabled: watch::Receiver<bool>,
    /// Channel for emitting feedback events
    event_tx: broadcast::Sender<FeedbackEvent>,
    phase: Phase,
    mode: Mode,
    /// Whether the continuous sink tone is established
    holding_sink_tone: bool,
    /// Last volume sent to the sink
    volume: f32,
    /// Commands issued during the current tick
    issued: Vec<AudioCommand>,
}

impl<S: AudioSink> FeedbackMachine<S> {
    /// Create a new state machine around an opened sink
    pub fn new(
        settings: VarioSettings,
        sink: S,
        enabled: watch::Receiver<bool>,
        event_tx: broadcast::Sender<FeedbackEvent>,
    ) -> Self {
        let volume = sink.state().volume;
        Self {
            settings,
            sink,
            enabled,
            event_tx,
            phase: Phase::NextFrame,
            mode: Mode::Idle,
            holding_sink_tone: false,
            volume,
            issued: Vec::new(),
        }
    }

    /// Mode chosen by the most recent decision
    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether the continuous sink tone is established
    pub fn is_holding_sink_tone(&self) -> bool {
        self.holding_sink_tone
    }

    /// The owned audio sink
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Advance by `dt` seconds with the current vertical rate
    ///
    /// `None` means the signal is unavailable. Returns the commands sent to
    /// the sink during this tick, in order.
    pub fn tick(&mut self, vertical_rate: Option<f32>, dt: f32) -> Vec<AudioCommand> {
        let dt = if dt.is_finite() { dt.max(0.0) } else { 0.0 };

        if self.resume(dt) {
            self.decide(vertical_rate);
        }

        std::mem::take(&mut self.issued)
    }

    /// Stop any audio right away and forget the current episode
    pub fn silence(&mut self) -> Vec<AudioCommand> {
        if self.sink.is_playing() {
            self.emit(AudioCommand::Stop);
        }
        self.release_sink_tone();
        self.phase = Phase::NextFrame;
        std::mem::take(&mut self.issued)
    }

    /// Let the suspended phase consume `dt`
    ///
    /// Returns true once the cycle is back at the point where a new
    /// decision is made.
    fn resume(&mut self, dt: f32) -> bool {
        match self.phase {
            Phase::NextFrame => true,

            Phase::Idle { waited } => {
                let waited = waited + dt;
                if waited >= IDLE_POLL_SECS {
                    return true;
                }
                self.phase = Phase::Idle { waited };
                false
            }

            Phase::PreBeepFade { mut fade, beep } => {
                if self.step_fade(&mut fade, dt) {
                    self.finish_tone_fade();
                    self.start_beep(beep);
                } else {
                    self.phase = Phase::PreBeepFade { fade, beep };
                }
                false
            }

            Phase::BeepHold { beep, hold, waited } => {
                let waited = waited + dt;
                if waited < hold {
                    self.phase = Phase::BeepHold { beep, hold, waited };
                } else if beep.beep_duration > FADE_SECS {
                    self.phase = Phase::BeepFade {
                        beep,
                        fade: Fade::to_zero(self.volume, FADE_SECS),
                    };
                } else {
                    // Too short to fade: cut the beep off
                    self.end_beep(beep);
                }
                false
            }

            Phase::BeepFade { beep, mut fade } => {
                if self.step_fade(&mut fade, dt) {
                    self.end_beep(beep);
                } else {
                    self.phase = Phase::BeepFade { beep, fade };
                }
                false
            }

            Phase::BeepGap { beep, waited } => {
                let waited = waited + dt;
                if waited >= beep.beep_duration {
                    return true;
                }
                self.phase = Phase::BeepGap { beep, waited };
                false
            }

            Phase::SinkFadeIn { mut fade } => {
                if self.step_fade(&mut fade, dt) {
                    self.holding_sink_tone = true;
                    self.phase = Phase::NextFrame;
                    debug!("sink tone established");
                    self.send_event(FeedbackEvent::SinkToneStarted);
                } else {
                    self.phase = Phase::SinkFadeIn { fade };
                }
                false
            }

            Phase::DeadzoneFade { mut fade } => {
                if self.step_fade(&mut fade, dt) {
                    self.finish_tone_fade();
                    self.phase = Phase::NextFrame;
                } else {
                    self.phase = Phase::DeadzoneFade { fade };
                }
                false
            }
        }
    }

    /// Choose what to do next from the current sample
    fn decide(&mut self, vertical_rate: Option<f32>) {
        let enabled = *self.enabled.borrow();
        let rate = match vertical_rate.filter(|rate| rate.is_finite()) {
            Some(rate) if enabled && self.sink.is_ready() => rate,
            _ => {
                self.go_idle();
                return;
            }
        };

        if rate > self.settings.lift_threshold {
            self.enter_mode(Mode::Lift);
            let beep = LiftProfile::for_rate(&self.settings, rate);
            if self.holding_sink_tone {
                self.phase = Phase::PreBeepFade {
                    fade: Fade::to_zero(self.volume, FADE_SECS),
                    beep,
                };
            } else {
                self.start_beep(beep);
            }
        } else if rate < self.settings.sink_threshold {
            self.enter_mode(Mode::Sink);
            self.set_pitch(sink_pitch(&self.settings, rate));
            if !self.holding_sink_tone || !self.sink.is_playing() {
                self.set_volume(0.0);
                self.emit(AudioCommand::Play { looping: true });
                self.phase = Phase::SinkFadeIn {
                    fade: Fade::up_to(self.settings.base_volume, FADE_SECS),
                };
            } else {
                self.set_volume(self.settings.base_volume);
                self.phase = Phase::NextFrame;
            }
        } else {
            self.enter_mode(Mode::Deadzone);
            if self.sink.is_playing() {
                self.phase = Phase::DeadzoneFade {
                    fade: Fade::to_zero(self.volume, FADE_SECS),
                };
            } else {
                self.release_sink_tone();
                self.phase = Phase::NextFrame;
            }
        }
    }

    /// Silence immediately and wait out one idle poll
    fn go_idle(&mut self) {
        self.enter_mode(Mode::Idle);
        if self.sink.is_playing() {
            self.emit(AudioCommand::Stop);
        }
        self.release_sink_tone();
        self.phase = Phase::Idle { waited: 0.0 };
    }

    /// Play one beep at full volume and hold it
    fn start_beep(&mut self, beep: LiftProfile) {
        self.set_pitch(beep.pitch);
        self.set_volume(self.settings.base_volume);
        self.emit(AudioCommand::Play { looping: false });

        let hold = if beep.beep_duration > FADE_SECS {
            beep.beep_duration - FADE_SECS
        } else {
            beep.beep_duration
        };
        self.phase = Phase::BeepHold { beep, hold, waited: 0.0 };
        debug!(t = beep.t, hold, "beep started");

        self.send_event(FeedbackEvent::BeepStarted {
            pitch: beep.pitch,
            duration_ms: (beep.beep_duration * 1000.0).round() as u64,
        });
    }

    /// Stop the beep and start the silence gap
    fn end_beep(&mut self, beep: LiftProfile) {
        self.emit(AudioCommand::Stop);
        self.phase = Phase::BeepGap { beep, waited: 0.0 };
    }

    /// Stop the faded-out tone and leave the sink ready at base volume
    fn finish_tone_fade(&mut self) {
        self.emit(AudioCommand::Stop);
        self.set_volume(self.settings.base_volume);
        self.release_sink_tone();
    }

    /// Forget the established sink tone, announcing it if there was one
    fn release_sink_tone(&mut self) {
        if std::mem::take(&mut self.holding_sink_tone) {
            self.send_event(FeedbackEvent::SinkToneStopped);
        }
    }

    /// Advance a fade and apply its level; true when it has finished
    fn step_fade(&mut self, fade: &mut Fade, dt: f32) -> bool {
        let level = fade.advance(dt);
        self.set_volume(level);
        fade.is_complete()
    }

    fn set_volume(&mut self, volume: f32) {
        self.emit(AudioCommand::SetVolume { volume });
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.emit(AudioCommand::SetPitch { pitch });
    }

    fn emit(&mut self, command: AudioCommand) {
        trace!(%command, "audio command");
        if let AudioCommand::SetVolume { volume } = command {
            self.volume = volume;
        }
        command.apply(&mut self.sink);
        self.issued.push(command);
    }

    /// Record a mode decision, logging and broadcasting changes
    fn enter_mode(&mut self, mode: Mode) {
        if mode == self.mode {
            return;
        }

        info!(from = %self.mode, to = %mode, "mode transition");
        let event = FeedbackEvent::ModeChanged {
            from: self.mode,
            to: mode,
        };
        self.mode = mode;
        self.send_event(event);
    }

    fn send_event(&self, event: FeedbackEvent) {
        debug!(%event, "emitting feedback event");
        let _ = self.event_tx.send(event);
    }
}
