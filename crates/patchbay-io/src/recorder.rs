//! Backend decorator that tees the rendered output into a byte sink.

use std::io::Write;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::Result;
use crate::backend::{Backend, Callback, interleave_stereo_le};

/// Forwards to an inner backend and records its stereo output.
///
/// The recording is raw interleaved little-endian `f32`, `L, R, L, R, ...`,
/// with mono output duplicated to both channels. Write failures are logged
/// once per session and never interrupt playback.
pub struct Recorder<W> {
    inner: Box<dyn Backend>,
    sink: Arc<Mutex<W>>,
}

impl<W: Write + Send + 'static> Recorder<W> {
    /// Records everything `inner` plays into `sink`.
    pub fn new(inner: impl Backend + 'static, sink: W) -> Self {
        Self {
            inner: Box::new(inner),
            sink: Arc::new(Mutex::new(sink)),
        }
    }

    /// Runs `f` on the sink.
    pub fn with_writer<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut self.sink.lock())
    }

    /// Returns the sink, unless a session is still running.
    pub fn into_writer(self) -> Option<W> {
        Arc::try_unwrap(self.sink).ok().map(Mutex::into_inner)
    }
}

impl<W: Write + Send + 'static> Backend for Recorder<W> {
    fn start(&self, mut callback: Callback) -> Result<()> {
        let sink = Arc::clone(&self.sink);
        let mut bytes = Vec::new();
        let mut failed = false;

        let result = self.inner.start(Box::new(move |input: &[f32], outputs: &mut [Vec<f32>]| {
            callback(input, outputs);
            bytes.clear();
            interleave_stereo_le(outputs, &mut bytes);
            if bytes.is_empty() {
                return;
            }
            if let Err(e) = sink.lock().write_all(&bytes)
                && !failed
            {
                tracing::warn!(error = %e, "recorder write failed");
                failed = true;
            }
        }));

        if let Err(e) = self.sink.lock().flush() {
            tracing::warn!(error = %e, "recorder flush failed");
        }
        result
    }

    fn stop(&self) -> Result<()> {
        self.inner.stop()
    }

    fn frame_size(&self) -> usize {
        self.inner.frame_size()
    }

    fn sample_rate(&self) -> u32 {
        self.inner.sample_rate()
    }
}

impl<W> std::fmt::Debug for Recorder<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("frame_size", &self.inner.frame_size())
            .field("sample_rate", &self.inner.sample_rate())
            .finish_non_exhaustive()
    }
}
