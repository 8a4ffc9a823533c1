//! Pull-style backend streaming raw stereo `f32` to any writer.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::Result;
use crate::backend::{Backend, Callback, channel_buffers, interleave_stereo_le};

/// Renders buffers back to back and writes them as interleaved
/// little-endian `f32`.
///
/// `start` loops on the calling thread until [`stop`](Backend::stop) is
/// called or a write fails. Pacing is left to the consumer; piped to
/// `aplay -f FLOAT_LE -c 2` it runs at the consumer's rate.
pub struct WriterBackend<W> {
    writer: Mutex<W>,
    sample_rate: u32,
    frame_size: usize,
    stopped: AtomicBool,
}

impl<W: Write + Send> WriterBackend<W> {
    /// Streams to `writer`.
    pub fn new(writer: W, sample_rate: u32, frame_size: usize) -> Self {
        Self {
            writer: Mutex::new(writer),
            sample_rate,
            frame_size,
            stopped: AtomicBool::new(false),
        }
    }

    /// Returns the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

impl<W: Write + Send> Backend for WriterBackend<W> {
    fn start(&self, mut callback: Callback) -> Result<()> {
        let mut writer = self.writer.lock();
        let mut outputs = channel_buffers(2, self.frame_size);
        let mut bytes = Vec::with_capacity(self.frame_size * 2 * size_of::<f32>());
        tracing::info!(
            sample_rate = self.sample_rate,
            frame_size = self.frame_size,
            "writer backend started"
        );

        while !self.stopped.load(Ordering::Acquire) {
            callback(&[], &mut outputs);
            bytes.clear();
            interleave_stereo_le(&outputs, &mut bytes);
            writer.write_all(&bytes)?;
        }
        writer.flush()?;
        tracing::info!("writer backend stopped");
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
