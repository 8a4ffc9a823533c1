//! Engine, control plane and audio backends for patchbay.
//!
//! This crate provides:
//!
//! - **Engine**: [`Engine`] owns a [`Graph`](patchbay_core::Graph), renders it
//!   through a [`Backend`] one quantum at a time, and applies control
//!   [`Message`]s between buffers
//! - **Backends**: [`WriterBackend`] (raw stream to any writer, e.g. stdout),
//!   [`WavBackend`] (offline render), `CpalBackend` (sound card, feature
//!   `cpal-backend`)
//! - **Recording**: [`Recorder`] tees any backend's output into a raw `f32`
//!   stream
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use patchbay_core::Registry;
//! use patchbay_io::{Command, Engine, EngineConfig, Message, WriterBackend};
//!
//! let backend = WriterBackend::new(std::io::stdout(), 48_000, 512);
//! let engine = Arc::new(Engine::new(backend, 64, EngineConfig::default())?);
//! let runner = std::thread::spawn({
//!     let engine = Arc::clone(&engine);
//!     move || engine.run()
//! });
//!
//! let registry = Registry::new(48_000, 64);
//! let (msg, reply) = Message::new(Command::Mount(registry.build("low-gen", "lfo", Default::default())?));
//! engine.send_message(msg)?;
//! reply.wait();
//!
//! engine.stop()?;
//! runner.join().unwrap();
//! ```

pub mod backend;
mod baseline;
#[cfg(feature = "cpal-backend")]
pub mod cpal_backend;
mod engine;
pub mod message;
mod recorder;
mod wav;
mod writer;

pub use backend::{Backend, Callback};
pub use baseline::{INPUT_UNIT, OUTPUT_UNIT};
#[cfg(feature = "cpal-backend")]
pub use cpal_backend::{CpalBackend, CpalConfig};
pub use engine::{
    ERROR_QUEUE_CAPACITY, Engine, EngineConfig, EngineError, MESSAGE_QUEUE_CAPACITY,
};
pub use message::{Command, Message, Reply, ReplyData, ReplySlot};
pub use recorder::Recorder;
pub use wav::WavBackend;
pub use writer::WriterBackend;

/// Error types for backend operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// WAV file read/write error.
    #[error("WAV file error: {0}")]
    Wav(#[from] hound::Error),

    /// Audio stream setup or runtime error.
    #[error("Audio stream error: {0}")]
    Stream(String),

    /// No audio device available on the system.
    #[error("No audio device available")]
    NoDevice,

    /// The requested audio device was not found.
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result type for backend operations.
pub type Result<T> = std::result::Result<T, Error>;
