//! Configuration loading and management
//!
//! Two layers: [`Config`] holds daemon paths and harness knobs taken from
//! the environment, [`VarioSettings`] holds the feedback thresholds read
//! once from the settings file.

mod settings;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub use settings::VarioSettings;

/// Default frame interval for the tick harness (~60 Hz)
const DEFAULT_FRAME_MS: u64 = 16;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory for runtime data and sound assets
    pub data_dir: PathBuf,

    /// Path to the TOML file holding the `[VARIOMETER_SETTINGS]` table
    pub settings_path: PathBuf,

    /// Path to the Unix domain socket for the toggle IPC
    pub socket_path: PathBuf,

    /// Time between feedback ticks
    pub frame_interval: Duration,

    /// Whether feedback starts enabled
    pub start_enabled: bool,

    /// Skip the audio device and only track playback
    pub headless_audio: bool,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        Ok(Self::from_lookup(&home, |key| std::env::var(key).ok()))
    }

    /// Build the configuration from a home directory and a variable lookup
    fn from_lookup(home: &str, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let data_dir = PathBuf::from(home)
            .join(".local")
            .join("share")
            .join("variometer");

        let settings_path = lookup("VARIOMETER_SETTINGS")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("settings.toml"));

        let socket_path = lookup("VARIOMETER_SOCKET")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("variometer.sock"));

        let frame_ms = lookup("VARIOMETER_FRAME_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
            .unwrap_or(DEFAULT_FRAME_MS);

        let start_enabled = lookup("VARIOMETER_ENABLED").is_some_and(|v| is_truthy(&v));
        let headless_audio = lookup("VARIOMETER_HEADLESS").is_some_and(|v| is_truthy(&v));

        Self {
            data_dir,
            settings_path,
            socket_path,
            frame_interval: Duration::from_millis(frame_ms),
            start_enabled,
            headless_audio,
        }
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("failed to create {}", self.data_dir.display()))?;
        Ok(())
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "on" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::from_lookup("/home/pilot", |_| None);
        assert_eq!(
            config.data_dir,
            PathBuf::from("/home/pilot/.local/share/variometer")
        );
        assert!(config.settings_path.ends_with("settings.toml"));
        assert!(config.socket_path.ends_with("variometer.sock"));
        assert_eq!(config.frame_interval, Duration::from_millis(16));
        assert!(!config.start_enabled);
        assert!(!config.headless_audio);
    }

    #[test]
    fn test_config_overrides() {
        let config = Config::from_lookup("/home/pilot", |key| match key {
            "VARIOMETER_SETTINGS" => Some("/etc/vario.toml".to_string()),
            "VARIOMETER_FRAME_MS" => Some("20".to_string()),
            "VARIOMETER_ENABLED" => Some("on".to_string()),
            "VARIOMETER_HEADLESS" => Some("1".to_string()),
            _ => None,
        });
        assert_eq!(config.settings_path, PathBuf::from("/etc/vario.toml"));
        assert_eq!(config.frame_interval, Duration::from_millis(20));
        assert!(config.start_enabled);
        assert!(config.headless_audio);
    }

    #[test]
    fn test_bad_frame_interval_falls_back() {
        let config = Config::from_lookup("/home/pilot", |key| match key {
            "VARIOMETER_FRAME_MS" => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(config.frame_interval, Duration::from_millis(DEFAULT_FRAME_MS));
    }
}
