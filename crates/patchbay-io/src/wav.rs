//! Offline render to a WAV file.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use hound::{SampleFormat, WavSpec, WavWriter};

use crate::Result;
use crate::backend::{Backend, Callback, channel_buffers};

/// Pull-style backend rendering a fixed number of frames to a 32-bit float
/// stereo WAV file.
///
/// `start` returns once `frames` frames are written or after
/// [`stop`](Backend::stop); the file is finalized either way.
#[derive(Debug)]
pub struct WavBackend {
    path: PathBuf,
    sample_rate: u32,
    frame_size: usize,
    frames: u64,
    stopped: AtomicBool,
}

impl WavBackend {
    /// Renders `frames` frames to `path`.
    pub fn new(path: impl AsRef<Path>, sample_rate: u32, frame_size: usize, frames: u64) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            sample_rate,
            frame_size,
            frames,
            stopped: AtomicBool::new(false),
        }
    }

    /// Renders `duration_secs` seconds.
    pub fn for_duration(
        path: impl AsRef<Path>,
        sample_rate: u32,
        frame_size: usize,
        duration_secs: f64,
    ) -> Self {
        let frames = (duration_secs.max(0.0) * f64::from(sample_rate)).round() as u64;
        Self::new(path, sample_rate, frame_size, frames)
    }

    /// Output path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Backend for WavBackend {
    fn start(&self, mut callback: Callback) -> Result<()> {
        let spec = WavSpec {
            channels: 2,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: SampleFormat::Float,
        };
        let mut writer = WavWriter::create(&self.path, spec)?;
        let mut outputs = channel_buffers(2, self.frame_size);
        let mut written = 0u64;

        while written < self.frames && !self.stopped.load(Ordering::Acquire) {
            let n = (self.frames - written).min(self.frame_size as u64) as usize;
            for buf in &mut outputs {
                buf.resize(n, 0.0);
            }
            callback(&[], &mut outputs);
            for (l, r) in outputs[0].iter().zip(&outputs[1]) {
                writer.write_sample(*l)?;
                writer.write_sample(*r)?;
            }
            written += n as u64;
        }

        writer.finalize()?;
        tracing::info!(path = %self.path.display(), frames = written, "wav render finished");
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.stopped.store(true, Ordering::Release);
        Ok(())
    }

    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
