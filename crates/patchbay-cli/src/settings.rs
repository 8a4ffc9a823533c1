//! Session settings: TOML file plus command-line overrides.
//!
//! ```toml
//! sample_rate = 48000
//! frame_size = 512
//! quantum = 64
//! fade_in_ms = 250
//! gain_db = -6.0
//! single_sample = true
//! ```

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use patchbay_core::math::db_to_linear;
use patchbay_io::EngineConfig;
use serde::Deserialize;

/// Engine and backend settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Backend buffer size in frames.
    pub frame_size: usize,
    /// Graph quantum in samples.
    pub quantum: usize,
    /// Fade-in length in milliseconds.
    pub fade_in_ms: u64,
    /// Output gain in decibels.
    pub gain_db: f32,
    /// Sample-major evaluation.
    pub single_sample: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            frame_size: 512,
            quantum: 64,
            fade_in_ms: 0,
            gain_db: 0.0,
            single_sample: true,
        }
    }
}

impl Settings {
    /// Loads settings from a TOML file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading settings from {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }

    /// Engine construction options.
    pub fn engine_config(&self) -> EngineConfig {
        let config = EngineConfig::default()
            .with_fade_in(Duration::from_millis(self.fade_in_ms))
            .with_gain(db_to_linear(self.gain_db));
        if self.single_sample {
            config
        } else {
            config.with_single_sample_disabled()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let settings: Settings = toml::from_str("quantum = 32\ngain_db = -6.0").unwrap();
        assert_eq!(settings.quantum, 32);
        assert_eq!(settings.sample_rate, 48000);
        assert!(settings.single_sample);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(toml::from_str::<Settings>("quantm = 32").is_err());
    }

    #[test]
    fn engine_config_follows_settings() {
        let settings = Settings {
            fade_in_ms: 250,
            gain_db: 0.0,
            single_sample: false,
            ..Settings::default()
        };
        let config = settings.engine_config();
        assert_eq!(config.fade_in(), Duration::from_millis(250));
        assert_eq!(config.gain(), 1.0);
        assert!(!config.single_sample());
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        std::fs::write(&path, "sample_rate = 44100\n").unwrap();
        assert_eq!(Settings::load(&path).unwrap().sample_rate, 44100);
        assert!(Settings::load(&dir.path().join("missing.toml")).is_err());
    }
}
