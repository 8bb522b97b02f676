//! Sink backed by the default audio output device

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use rodio::decoder::DecoderError;
use rodio::{Decoder, OutputStream, Sink, Source};
use tracing::{trace, warn};

use super::sink::{AudioSink, AudioSinkState, SinkError};

type ClipDecoder = Decoder<Cursor<Arc<[u8]>>>;

/// Plays the tone clip through rodio
///
/// The clip is read into memory once and decoded afresh for every `play`.
/// Pitch maps to playback speed, like a resampled one-shot.
pub struct DeviceSink {
    // Dropping the stream closes the device
    _stream: OutputStream,
    sink: Sink,
    clip: Arc<[u8]>,
    state: AudioSinkState,
}

impl DeviceSink {
    /// Load the clip at `path` and open the default output device
    pub fn open(path: &Path, volume: f32) -> Result<Self, SinkError> {
        let bytes = std::fs::read(path).map_err(|source| SinkError::ClipRead {
            path: path.to_owned(),
            source,
        })?;
        let clip: Arc<[u8]> = bytes.into();
        decode(&clip).map_err(|source| SinkError::ClipDecode {
            path: path.to_owned(),
            source,
        })?;

        let (stream, handle) = OutputStream::try_default()?;
        let sink = Sink::try_new(&handle)?;

        let volume = volume.clamp(0.0, 1.0);
        sink.set_volume(volume);

        Ok(Self {
            _stream: stream,
            sink,
            clip,
            state: AudioSinkState {
                volume,
                ..AudioSinkState::default()
            },
        })
    }
}

fn decode(clip: &Arc<[u8]>) -> Result<ClipDecoder, DecoderError> {
    Decoder::new(Cursor::new(Arc::clone(clip)))
}

impl AudioSink for DeviceSink {
    fn is_ready(&self) -> bool {
        true
    }

    fn play(&mut self, looping: bool) {
        self.sink.stop();
        match decode(&self.clip) {
            Ok(source) if looping => self.sink.append(source.repeat_infinite()),
            Ok(source) => self.sink.append(source),
            Err(e) => {
                warn!(error = %e, "failed to decode audio clip");
                self.state.playing = false;
                return;
            }
        }
        self.state.looping = looping;
        self.state.playing = true;
        trace!(looping, volume = self.state.volume, pitch = self.state.pitch, "play");
    }

    fn stop(&mut self) {
        self.sink.stop();
        self.state.playing = false;
        trace!("stop");
    }

    fn set_volume(&mut self, volume: f32) {
        self.state.volume = volume.clamp(0.0, 1.0);
        self.sink.set_volume(self.state.volume);
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.state.pitch = pitch;
        self.sink.set_speed(pitch);
    }

    fn is_playing(&self) -> bool {
        // A one-shot beep ends on its own once the clip runs out
        self.state.playing && !self.sink.empty()
    }

    fn state(&self) -> AudioSinkState {
        AudioSinkState {
            playing: self.is_playing(),
            ..self.state
        }
    }
}
