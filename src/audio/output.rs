//! Output selection: the audio device when possible, headless otherwise

use std::path::Path;

use tracing::{error, info, warn};

#[cfg(feature = "device-audio")]
use super::device::DeviceSink;
use super::sink::{resolve_clip, AudioSink, AudioSinkState, HeadlessSink};

/// The sink the daemon drives
pub enum OutputSink {
    #[cfg(feature = "device-audio")]
    Device(DeviceSink),
    Headless(HeadlessSink),
}

impl OutputSink {
    /// Open the clip `clip_id` under `base` on the best available output
    ///
    /// Each fallback is logged once here. Without a clip the sink stays
    /// unready and the state machine idles instead of failing every tick.
    pub fn open(base: &Path, clip_id: &str, volume: f32, headless: bool) -> Self {
        let clip = match resolve_clip(base, clip_id) {
            Ok(path) => path,
            Err(e) => {
                error!(error = %e, "variometer will stay silent");
                return Self::Headless(HeadlessSink::with_clip(None, volume));
            }
        };

        if headless {
            info!(?clip, "headless audio requested, tracking playback only");
            return Self::Headless(HeadlessSink::with_clip(Some(clip), volume));
        }

        Self::open_device(clip, volume)
    }

    #[cfg(feature = "device-audio")]
    fn open_device(clip: std::path::PathBuf, volume: f32) -> Self {
        match DeviceSink::open(&clip, volume) {
            Ok(sink) => {
                info!(?clip, "audio output opened");
                Self::Device(sink)
            }
            Err(e) => {
                warn!(error = %e, "no audio output, tracking playback only");
                Self::Headless(HeadlessSink::with_clip(Some(clip), volume))
            }
        }
    }

    #[cfg(not(feature = "device-audio"))]
    fn open_device(clip: std::path::PathBuf, volume: f32) -> Self {
        warn!(?clip, "built without device-audio, tracking playback only");
        Self::Headless(HeadlessSink::with_clip(Some(clip), volume))
    }

    /// Short name of the active backend, for logs
    pub fn backend(&self) -> &'static str {
        match self {
            #[cfg(feature = "device-audio")]
            OutputSink::Device(_) => "device",
            OutputSink::Headless(_) => "headless",
        }
    }

    fn inner(&self) -> &dyn AudioSink {
        match self {
            #[cfg(feature = "device-audio")]
            OutputSink::Device(sink) => sink,
            OutputSink::Headless(sink) => sink,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn AudioSink {
        match self {
            #[cfg(feature = "device-audio")]
            OutputSink::Device(sink) => sink,
            OutputSink::Headless(sink) => sink,
        }
    }
}

impl AudioSink for OutputSink {
    fn is_ready(&self) -> bool {
        self.inner().is_ready()
    }

    fn play(&mut self, looping: bool) {
        self.inner_mut().play(looping);
    }

    fn stop(&mut self) {
        self.inner_mut().stop();
    }

    fn set_volume(&mut self, volume: f32) {
        self.inner_mut().set_volume(volume);
    }

    fn set_pitch(&mut self, pitch: f32) {
        self.inner_mut().set_pitch(pitch);
    }

    fn is_playing(&self) -> bool {
        self.inner().is_playing()
    }

    fn state(&self) -> AudioSinkState {
        self.inner().state()
    }
}
