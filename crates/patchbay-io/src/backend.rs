//! Pluggable audio backend abstraction.
//!
//! A [`Backend`] is the boundary between the engine and whatever consumes
//! its audio: a sound card, a byte stream, a file. The engine hands
//! [`Backend::start`] a [`Callback`]; the backend invokes it once per buffer
//! until [`Backend::stop`] is called or it hits an unrecoverable condition,
//! and only then returns.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────┐
//! │              Engine              │
//! └──────────────┬───────────────────┘
//!                │ start(callback) / stop()
//!                ▼
//! ┌──────────────────────────────────┐
//! │          Backend trait           │
//! └──────────────┬───────────────────┘
//!        ┌───────┼──────────┬──────────────┐
//!        ▼       ▼          ▼              ▼
//!   CpalBackend  Writer   WavBackend   Recorder<W>
//!   (push)       (pull)   (pull)       (decorator)
//! ```
//!
//! Push-style backends (cpal) call the callback from a driver thread while
//! `start` parks the caller. Pull-style backends loop on the calling thread.
//! Either way `start` blocks for the whole session, and `stop` must make it
//! return promptly, even if `stop` arrives before `start`.
//!
//! The trait is object-safe so backends can be chosen at runtime.

use std::sync::Arc;

use crate::Result;

/// Per-buffer render callback.
///
/// Receives the backend's mono input (may be empty) and one buffer per output
/// channel, all `frame_size` long. Runs on the audio thread.
pub type Callback = Box<dyn FnMut(&[f32], &mut [Vec<f32>]) + Send>;

/// Destination for rendered audio.
pub trait Backend: Send + Sync {
    /// Runs `callback` once per buffer until stopped. Blocks.
    fn start(&self, callback: Callback) -> Result<()>;

    /// Makes a blocked [`start`](Self::start) return.
    fn stop(&self) -> Result<()>;

    /// Frames per callback.
    fn frame_size(&self) -> usize;

    /// Sample rate in Hz.
    fn sample_rate(&self) -> u32;
}

impl<B: Backend + ?Sized> Backend for Arc<B> {
    fn start(&self, callback: Callback) -> Result<()> {
        (**self).start(callback)
    }

    fn stop(&self) -> Result<()> {
        (**self).stop()
    }

    fn frame_size(&self) -> usize {
        (**self).frame_size()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }
}

impl<B: Backend + ?Sized> Backend for Box<B> {
    fn start(&self, callback: Callback) -> Result<()> {
        (**self).start(callback)
    }

    fn stop(&self) -> Result<()> {
        (**self).stop()
    }

    fn frame_size(&self) -> usize {
        (**self).frame_size()
    }

    fn sample_rate(&self) -> u32 {
        (**self).sample_rate()
    }
}

/// Output buffers for `channels` channels of `frames` frames.
pub fn channel_buffers(channels: usize, frames: usize) -> Vec<Vec<f32>> {
    vec![vec![0.0; frames]; channels]
}

/// Appends the first two channels as interleaved little-endian `f32`.
///
/// A single channel is written to both sides; no channels writes nothing.
pub fn interleave_stereo_le(outputs: &[Vec<f32>], bytes: &mut Vec<u8>) {
    let (left, right) = match outputs {
        [] => return,
        [mono] => (mono, mono),
        [left, right, ..] => (left, right),
    };
    bytes.reserve(left.len() * 2 * size_of::<f32>());
    for (l, r) in left.iter().zip(right) {
        bytes.extend_from_slice(&l.to_le_bytes());
        bytes.extend_from_slice(&r.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaves_left_then_right() {
        let mut bytes = Vec::new();
        interleave_stereo_le(&[vec![1.0], vec![-1.0]], &mut bytes);
        assert_eq!(bytes, [0x00, 0x00, 0x80, 0x3F, 0x00, 0x00, 0x80, 0xBF]);
    }

    #[test]
    fn mono_is_duplicated() {
        let mut bytes = Vec::new();
        interleave_stereo_le(&[vec![0.5, 0.25]], &mut bytes);
        let mut expected = Vec::new();
        for v in [0.5f32, 0.5, 0.25, 0.25] {
            expected.extend_from_slice(&v.to_le_bytes());
        }
        assert_eq!(bytes, expected);
    }

    #[test]
    fn no_channels_writes_nothing() {
        let mut bytes = Vec::new();
        interleave_stereo_le(&[], &mut bytes);
        assert!(bytes.is_empty());
    }
}
