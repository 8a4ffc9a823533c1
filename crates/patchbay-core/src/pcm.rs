//! Raw PCM writer.
//!
//! [`PcmWriter`] buffers `f64` samples and writes them as headerless
//! little-endian IEEE-754 bytes, one chunk per full buffer.

use std::io::{self, Write};

/// Buffered little-endian `f64` sample writer.
#[derive(Debug)]
pub struct PcmWriter<W: Write> {
    inner: W,
    buf: Vec<u8>,
    capacity: usize,
}

impl<W: Write> PcmWriter<W> {
    /// Wraps `inner`, flushing every `samples` samples.
    pub fn new(inner: W, samples: usize) -> Self {
        let capacity = samples.max(1) * size_of::<f64>();
        Self {
            inner,
            buf: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Queues one sample, writing the buffer out once it is full.
    pub fn write_sample(&mut self, sample: f64) -> io::Result<()> {
        self.buf.extend_from_slice(&sample.to_le_bytes());
        if self.buf.len() >= self.capacity {
            self.flush()?;
        }
        Ok(())
    }

    /// Writes out pending samples and flushes the inner writer.
    pub fn flush(&mut self) -> io::Result<()> {
        if !self.buf.is_empty() {
            self.inner.write_all(&self.buf)?;
            self.buf.clear();
        }
        self.inner.flush()
    }

    /// Discards pending samples.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Number of samples waiting to be written.
    pub fn pending(&self) -> usize {
        self.buf.len() / size_of::<f64>()
    }

    /// Mutable access to the wrapped writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.inner
    }

    /// Returns the wrapped writer. Pending samples are dropped.
    pub fn into_inner(self) -> W {
        self.inner
    }
}
