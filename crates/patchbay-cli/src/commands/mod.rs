//! CLI command implementations.

pub mod devices;
pub mod play;
pub mod render;
pub mod session;
pub mod stream;
pub mod units;

use std::path::PathBuf;

use clap::Args;

use crate::settings::Settings;

/// Engine options shared by every session command.
#[derive(Args, Debug, Default)]
pub struct SessionArgs {
    /// Settings file (TOML); flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Sample rate in Hz
    #[arg(long)]
    sample_rate: Option<u32>,

    /// Backend buffer size in frames
    #[arg(long)]
    frame_size: Option<usize>,

    /// Graph quantum in samples
    #[arg(long)]
    quantum: Option<usize>,

    /// Fade-in length in milliseconds
    #[arg(long)]
    fade_in_ms: Option<u64>,

    /// Output gain in dB
    #[arg(long, allow_hyphen_values = true)]
    gain_db: Option<f32>,

    /// Evaluate unit by unit instead of sample by sample
    #[arg(long)]
    single_sample_disabled: bool,

    /// Also write the output to a raw stereo f32 file
    #[arg(long, value_name = "FILE")]
    pub record: Option<PathBuf>,
}

impl SessionArgs {
    /// Settings file values with flag overrides applied.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = match &self.config {
            Some(path) => Settings::load(path)?,
            None => Settings::default(),
        };
        if let Some(v) = self.sample_rate {
            settings.sample_rate = v;
        }
        if let Some(v) = self.frame_size {
            settings.frame_size = v;
        }
        if let Some(v) = self.quantum {
            settings.quantum = v;
        }
        if let Some(v) = self.fade_in_ms {
            settings.fade_in_ms = v;
        }
        if let Some(v) = self.gain_db {
            settings.gain_db = v;
        }
        if self.single_sample_disabled {
            settings.single_sample = false;
        }
        Ok(settings)
    }
}
