//! Feedback thresholds and audio parameters
//!
//! Read once at startup from the `[VARIOMETER_SETTINGS]` table of a TOML
//! file. Every key is optional and parsed on its own: a malformed value is
//! logged and the default kept, so a bad file never stops the daemon.

use std::path::Path;

use tracing::{debug, info, warn};

/// Name of the table holding the settings
pub const SETTINGS_TABLE: &str = "VARIOMETER_SETTINGS";

/// Immutable parameter bundle consumed by the feedback state machine
#[derive(Debug, Clone, PartialEq)]
pub struct VarioSettings {
    /// Climb rate (m/s) where beeping starts
    pub lift_threshold: f32,
    /// Climb rate (m/s) of maximum effect
    pub lift_max: f32,
    /// Pitch multiplier at `lift_max`
    pub lift_max_pitch: f32,
    /// Beep speed multiplier at `lift_max`
    pub lift_max_beep_rate: f32,
    /// Vertical rate (m/s, negative) where the sink tone starts
    pub sink_threshold: f32,
    /// Vertical rate (m/s, negative) of maximum effect
    pub sink_max: f32,
    /// Pitch multiplier at `sink_max`
    pub sink_min_pitch: f32,
    /// Playback volume in `[0, 1]`
    pub base_volume: f32,
    /// Asset identifier of the tone clip, without extension
    pub audio_clip_path: String,
}

impl Default for VarioSettings {
    fn default() -> Self {
        Self {
            lift_threshold: 5.0,
            lift_max: 15.0,
            lift_max_pitch: 1.5,
            lift_max_beep_rate: 2.0,
            sink_threshold: -5.0,
            sink_max: -15.0,
            sink_min_pitch: 0.5,
            base_volume: 0.5,
            audio_clip_path: "Variometer/Sounds/tone".to_string(),
        }
    }
}

impl VarioSettings {
    /// Load settings from a TOML file, falling back to defaults
    ///
    /// A missing or unparsable file is not an error: the defaults apply and
    /// the reason is logged.
    pub fn load(path: &Path) -> Self {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(?path, "no settings file, using defaults");
                return Self::default();
            }
            Err(e) => {
                warn!(?path, ?e, "failed to read settings file, using defaults");
                return Self::default();
            }
        };

        match text.parse::<toml::Table>() {
            Ok(table) => Self::from_document(&table),
            Err(e) => {
                warn!(?path, error = %e, "settings file is not valid TOML, using defaults");
                Self::default()
            }
        }
    }

    /// Extract the settings table from a parsed document
    pub fn from_document(doc: &toml::Table) -> Self {
        match doc.get(SETTINGS_TABLE) {
            Some(toml::Value::Table(block)) => Self::from_table(block),
            Some(other) => {
                warn!(found = other.type_str(), "{SETTINGS_TABLE} is not a table, using defaults");
                Self::default()
            }
            None => {
                info!("no {SETTINGS_TABLE} block, using defaults");
                Self::default()
            }
        }
    }

    /// Build settings from an untyped key/value block
    pub fn from_table(block: &toml::Table) -> Self {
        let mut settings = Self::default();

        for (key, value) in block {
            let slot = match key.as_str() {
                "liftThreshold" => &mut settings.lift_threshold,
                "liftMax" => &mut settings.lift_max,
                "liftMaxPitch" => &mut settings.lift_max_pitch,
                "liftMaxBeepRate" => &mut settings.lift_max_beep_rate,
                "sinkThreshold" => &mut settings.sink_threshold,
                "sinkMax" => &mut settings.sink_max,
                "sinkMinPitch" => &mut settings.sink_min_pitch,
                "baseVolume" => &mut settings.base_volume,
                "audioClipPath" => {
                    match value.as_str() {
                        Some(path) if !path.trim().is_empty() => {
                            settings.audio_clip_path = path.trim().to_string();
                        }
                        _ => warn!(key = key.as_str(), "expected a non-empty string, keeping default"),
                    }
                    continue;
                }
                _ => {
                    debug!(key = key.as_str(), "ignoring unknown setting");
                    continue;
                }
            };

            match number(value) {
                Some(v) => *slot = v,
                None => warn!(key = key.as_str(), value = %value, "malformed number, keeping default"),
            }
        }

        settings.validated()
    }

    /// Enforce the threshold ordering and parameter ranges
    ///
    /// Lift needs `lift_max > lift_threshold >= 0`, sink needs
    /// `sink_max < sink_threshold <= 0`. A group that breaks its ordering
    /// reverts to the defaults as a whole.
    pub fn validated(mut self) -> Self {
        let defaults = Self::default();

        if !(self.lift_threshold >= 0.0 && self.lift_max > self.lift_threshold) {
            warn!(
                lift_threshold = self.lift_threshold,
                lift_max = self.lift_max,
                "lift thresholds out of order, using defaults"
            );
            self.lift_threshold = defaults.lift_threshold;
            self.lift_max = defaults.lift_max;
        }

        if !(self.sink_threshold <= 0.0 && self.sink_max < self.sink_threshold) {
            warn!(
                sink_threshold = self.sink_threshold,
                sink_max = self.sink_max,
                "sink thresholds out of order, using defaults"
            );
            self.sink_threshold = defaults.sink_threshold;
            self.sink_max = defaults.sink_max;
        }

        for (name, value, default) in [
            ("liftMaxPitch", &mut self.lift_max_pitch, defaults.lift_max_pitch),
            ("liftMaxBeepRate", &mut self.lift_max_beep_rate, defaults.lift_max_beep_rate),
            ("sinkMinPitch", &mut self.sink_min_pitch, defaults.sink_min_pitch),
        ] {
            if !(value.is_finite() && *value > 0.0) {
                warn!(key = name, value = *value, "must be positive, using default");
                *value = default;
            }
        }

        if !self.base_volume.is_finite() {
            self.base_volume = defaults.base_volume;
        }
        self.base_volume = self.base_volume.clamp(0.0, 1.0);

        self
    }
}

/// Read a float from a TOML float, integer, or numeric string
fn number(value: &toml::Value) -> Option<f32> {
    let v = match value {
        toml::Value::Float(f) => *f as f32,
        toml::Value::Integer(i) => *i as f32,
        toml::Value::String(s) => s.trim().parse::<f32>().ok()?,
        _ => return None,
    };
    v.is_finite().then_some(v)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(doc: &str) -> VarioSettings {
        VarioSettings::from_document(&doc.parse::<toml::Table>().unwrap())
    }

    #[test]
    fn test_missing_block_uses_defaults() {
        assert_eq!(parse("[OTHER]\nx = 1\n"), VarioSettings::default());
    }

    #[test]
    fn test_recognized_keys() {
        let settings = parse(
            r#"
            [VARIOMETER_SETTINGS]
            liftThreshold = 2
            liftMax = 8.5
            liftMaxPitch = "1.8"
            sinkThreshold = -3.0
            sinkMax = -10
            baseVolume = 0.75
            audioClipPath = "Vario/Sounds/beep"
            "#,
        );
        assert_eq!(settings.lift_threshold, 2.0);
        assert_eq!(settings.lift_max, 8.5);
        assert_eq!(settings.lift_max_pitch, 1.8);
        assert_eq!(settings.lift_max_beep_rate, 2.0);
        assert_eq!(settings.sink_threshold, -3.0);
        assert_eq!(settings.sink_max, -10.0);
        assert_eq!(settings.base_volume, 0.75);
        assert_eq!(settings.audio_clip_path, "Vario/Sounds/beep");
    }

    #[test]
    fn test_malformed_value_keeps_default() {
        let settings = parse(
            r#"
            [VARIOMETER_SETTINGS]
            liftMax = "fast"
            sinkMinPitch = true
            liftMaxPitch = 1.2
            "#,
        );
        assert_eq!(settings.lift_max, 15.0);
        assert_eq!(settings.sink_min_pitch, 0.5);
        assert_eq!(settings.lift_max_pitch, 1.2);
    }

    #[test]
    fn test_out_of_order_group_reverts() {
        let settings = parse(
            r#"
            [VARIOMETER_SETTINGS]
            liftThreshold = 10
            liftMax = 4
            sinkThreshold = -2
            sinkMax = -6
            "#,
        );
        assert_eq!(settings.lift_threshold, 5.0);
        assert_eq!(settings.lift_max, 15.0);
        assert_eq!(settings.sink_threshold, -2.0);
        assert_eq!(settings.sink_max, -6.0);
    }

    #[test]
    fn test_positive_sink_threshold_rejected() {
        let settings = parse("[VARIOMETER_SETTINGS]\nsinkThreshold = 1.0\nsinkMax = -4\n");
        assert_eq!(settings.sink_threshold, -5.0);
        assert_eq!(settings.sink_max, -15.0);
    }

    #[test]
    fn test_volume_clamped_and_rates_positive() {
        let settings = parse("[VARIOMETER_SETTINGS]\nbaseVolume = 3\nliftMaxBeepRate = 0\n");
        assert_eq!(settings.base_volume, 1.0);
        assert_eq!(settings.lift_max_beep_rate, 2.0);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let settings = VarioSettings::load(Path::new("/nonexistent/variometer/settings.toml"));
        assert_eq!(settings, VarioSettings::default());
    }
}
