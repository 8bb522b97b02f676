//! Audio output handle driven by the feedback state machine
//!
//! The daemon does not open an audio device itself; [`HeadlessSink`]
//! resolves the tone clip, tracks the playback parameters a device-backed
//! sink would receive, and traces every command.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::trace;

/// Clip file extensions accepted for the tone asset
const CLIP_EXTENSIONS: [&str; 2] = ["wav", "ogg"];

/// Playback controls the state machine needs from an audio output
pub trait AudioSink {
    /// Whether the clip loaded and the sink can play at all
    fn is_ready(&self) -> bool;

    /// Start playback from the beginning of the clip
    fn play(&mut self, looping: bool);

    /// Stop playback
    fn stop(&mut self);

    /// Set output volume in `[0, 1]`
    fn set_volume(&mut self, volume: f32);

    /// Set playback pitch multiplier (> 0)
    fn set_pitch(&mut self, pitch: f32);

    /// Whether the clip is currently playing
    fn is_playing(&self) -> bool;

    /// Snapshot of the current playback parameters
    fn state(&self) -> AudioSinkState;
}

/// Current playback parameters of a sink
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AudioSinkState {
    pub volume: f32,
    pub pitch: f32,
    pub looping: bool,
    pub playing: bool,
}

impl Default for AudioSinkState {
    fn default() -> Self {
        Self {
            volume: 1.0,
            pitch: 1.0,
            looping: false,
            playing: false,
        }
    }
}

/// A single command issued to an [`AudioSink`]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AudioCommand {
    /// Start the clip, looping or one-shot
    Play { looping: bool },
    /// Stop the clip
    Stop,
    /// Change volume
    SetVolume { volume: f32 },
    /// Change pitch
    SetPitch { pitch: f32 },
}

impl AudioCommand {
    /// Forward this command to a sink
    pub fn apply<S: AudioSink + ?Sized>(self, sink: &mut S) {
        match self {
            AudioCommand::Play { looping } => sink.play(looping),
            AudioCommand::Stop => sink.stop(),
            AudioCommand::SetVolume { volume } => sink.set_volume(volume),
            AudioCommand::SetPitch { pitch } => sink.set_pitch(pitch),
        }
    }
}

impl std::fmt::Display for AudioCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AudioCommand::Play { looping: true } => write!(f, "PLAY (loop)"),
            AudioCommand::Play { looping: false } => write!(f, "PLAY (once)"),
            AudioCommand::Stop => write!(f, "STOP"),
            AudioCommand::SetVolume { volume } => write!(f, "VOLUME {:.3}", volume),
            AudioCommand::SetPitch { pitch } => write!(f, "PITCH {:.3}", pitch),
        }
    }
}

/// Errors opening the tone asset or the output device
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("audio clip not found at {}, ensure a .wav or .ogg file exists", .path.display())]
    ClipNotFound { path: PathBuf },

    #[cfg(feature = "device-audio")]
    #[error("failed to read audio clip {}", .path.display())]
    ClipRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "device-audio")]
    #[error("failed to decode audio clip {}: {source}", .path.display())]
    ClipDecode {
        path: PathBuf,
        #[source]
        source: rodio::decoder::DecoderError,
    },

    #[cfg(feature = "device-audio")]
    #[error("no audio output device: {0}")]
    NoDevice(#[from] rodio::StreamError),

    #[cfg(feature = "device-audio")]
    #[error("failed to open audio output: {0}")]
    Output(#[from] rodio::PlayError),
}

/// Resolve a clip identifier (no extension) under `base` to an existing file
pub fn resolve_clip(base: &Path, clip_id: &str) -> Result<PathBuf, SinkError> {
    let stem = base.join(clip_id);
    CLIP_EXTENSIONS
        .iter()
        .map(|ext| stem.with_extension(ext))
        .find(|candidate| candidate.is_file())
        .ok_or(SinkError::ClipNotFound { path: stem })
}

/// Sink that records playback state without a device behind it
#[derive(Debug)]
pub struct HeadlessSink {
    clip: Option<PathBuf>,
    state: AudioSinkState,
}

impl HeadlessSink {
    /// Create a sink around an already-resolved clip (or none)
    pub fn with_clip(clip: Option<PathBuf>, volume: f32) -> Self {
        Self {
            clip,
            state: AudioSinkState {
                volume,
                ..AudioSinkState::default()
            },
        }
    }
}

impl AudioSink for HeadlessSink {
    fn is_ready(&self) -> bool {
        self.clip.is_some()
    }

    fn play(&mut self, looping: bool) {
        self.state.looping = looping;
        self.state.playing = self.clip.is_some();
        trace!(looping, volume = self.state.volume, pitch = self.state.pitch, "play");
    }

    fn stop(&mut self) {
        self.state.playing = false;
        trace!("stop");
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.volume = volume.clamp(0.0, 1.0);
        trace!(volume = self.state.volume, "volume");
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.state.pitch = pitch;
        trace!(pitch, "pitch");
    }

    fn is_playing(&self) -> bool {
        self.state.playing
    }

    fn state(&self) -> AudioSinkState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_serialization() {
        let json = serde_json::to_string(&AudioCommand::Play { looping: true }).unwrap();
        assert!(json.contains("\"play\""));
        assert!(json.contains("\"looping\":true"));
    }

    #[test]
    fn test_commands_drive_sink_state() {
        let mut sink = HeadlessSink::with_clip(Some(PathBuf::from("tone.wav")), 0.5);
        AudioCommand::SetPitch { pitch: 1.25 }.apply(&mut sink);
        AudioCommand::Play { looping: false }.apply(&mut sink);

        let state = sink.state();
        assert!(state.playing);
        assert!(!state.looping);
        assert_eq!(state.pitch, 1.25);
        assert_eq!(state.volume, 0.5);

        AudioCommand::Stop.apply(&mut sink);
        assert!(!sink.is_playing());
    }

    #[test]
    fn test_sink_without_clip_never_plays() {
        let mut sink = HeadlessSink::with_clip(None, 0.5);
        assert!(!sink.is_ready());
        sink.play(true);
        assert!(!sink.is_playing());
    }

    #[test]
    fn test_missing_clip_is_reported() {
        let err = resolve_clip(Path::new("/nonexistent"), "Variometer/Sounds/tone").unwrap_err();
        assert!(err.to_string().contains("Variometer/Sounds/tone"));
    }

    #[test]
    fn test_resolve_clip_finds_ogg() {
        let dir = std::env::temp_dir().join(format!("variometer-clip-{}", std::process::id()));
        std::fs::create_dir_all(dir.join("Sounds")).unwrap();
        std::fs::write(dir.join("Sounds").join("tone.ogg"), b"OggS").unwrap();

        let path = resolve_clip(&dir, "Sounds/tone").unwrap();
        assert_eq!(path.extension().and_then(|e| e.to_str()), Some("ogg"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
