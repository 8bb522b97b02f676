//! Events emitted by the feedback state machine
//!
//! Broadcast to the rest of the daemon so the IPC server can report the
//! current feedback mode.

use serde::{Deserialize, Serialize};

use crate::state::Mode;

/// Events emitted when the feedback loop changes what it is doing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedbackEvent {
    /// A mode decision differed from the previous one
    ModeChanged { from: Mode, to: Mode },

    /// A beep episode started in lift
    BeepStarted {
        /// Playback pitch of the beep
        pitch: f32,
        /// Beep length (and following gap) in milliseconds
        duration_ms: u64,
    },

    /// The continuous sink tone finished fading in
    SinkToneStarted,

    /// The continuous sink tone was faded out and stopped
    SinkToneStopped,
}

impl std::fmt::Display for FeedbackEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FeedbackEvent::ModeChanged { from, to } => write!(f, "MODE_CHANGED ({} -> {})", from, to),
            FeedbackEvent::BeepStarted { pitch, duration_ms } => {
                write!(f, "BEEP_STARTED (pitch {:.2}, {}ms)", pitch, duration_ms)
            }
            FeedbackEvent::SinkToneStarted => write!(f, "SINK_TONE_STARTED"),
            FeedbackEvent::SinkToneStopped => write!(f, "SINK_TONE_STOPPED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = FeedbackEvent::ModeChanged {
            from: Mode::Deadzone,
            to: Mode::Lift,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("mode_changed"));
        assert!(json.contains("\"to\":\"lift\""));
    }

    #[test]
    fn test_event_deserialization() {
        let json = r#"{"type":"sink_tone_started"}"#;
        let event: FeedbackEvent = serde_json::from_str(json).unwrap();
        assert!(matches!(event, FeedbackEvent::SinkToneStarted));
    }

    #[test]
    fn test_event_display() {
        let event = FeedbackEvent::BeepStarted {
            pitch: 1.25,
            duration_ms: 225,
        };
        assert_eq!(event.to_string(), "BEEP_STARTED (pitch 1.25, 225ms)");
    }
}
