//! Sound-card output through [cpal](https://crates.io/crates/cpal).
//!
//! [`CpalBackend`] is push-style: cpal's driver thread calls the engine
//! callback for every hardware buffer while [`Backend::start`] parks the
//! calling thread until [`Backend::stop`] or a stream error. The stream
//! handle never leaves the thread that called `start`, since cpal streams
//! are not `Send` on every platform.
//!
//! Input is silent; the engine's `input` unit reads zeros.

use std::sync::atomic::{AtomicBool, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{Receiver, Sender, bounded};

use crate::backend::{Backend, Callback, channel_buffers};
use crate::{Error, Result};

/// Stream parameters for [`CpalBackend`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpalConfig {
    /// Requested sample rate in Hz.
    pub sample_rate: u32,
    /// Requested buffer size in frames.
    pub frame_size: usize,
    /// Number of output channels.
    pub channels: u16,
    /// Case-insensitive substring of the device name; `None` for the default.
    pub device: Option<String>,
}

impl Default for CpalConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            frame_size: 512,
            channels: 2,
            device: None,
        }
    }
}

enum Signal {
    Stop,
    Failed(String),
}

/// cpal-based output backend.
pub struct CpalBackend {
    config: CpalConfig,
    stopped: AtomicBool,
    signal_tx: Sender<Signal>,
    signal_rx: Receiver<Signal>,
}

impl CpalBackend {
    /// Creates a backend; the device is opened by [`Backend::start`].
    pub fn new(config: CpalConfig) -> Self {
        let (signal_tx, signal_rx) = bounded(1);
        Self {
            config,
            stopped: AtomicBool::new(false),
            signal_tx,
            signal_rx,
        }
    }

    /// Stream parameters.
    pub fn config(&self) -> &CpalConfig {
        &self.config
    }
}

/// Find a cpal output device by name, or return the default.
fn find_output_device(host: &cpal::Host, name: Option<&str>) -> Result<cpal::Device> {
    match name {
        Some(search) => {
            let search_lower = search.to_lowercase();
            let devices = host
                .output_devices()
                .map_err(|e| Error::Stream(e.to_string()))?;

            for device in devices {
                if let Ok(dev_name) = device_name(&device)
                    && dev_name.to_lowercase().contains(search_lower.as_str())
                {
                    return Ok(device);
                }
            }
            Err(Error::DeviceNotFound(format!(
                "no output device matching '{}'",
                search
            )))
        }
        None => host.default_output_device().ok_or(Error::NoDevice),
    }
}

fn device_name(device: &cpal::Device) -> std::result::Result<String, cpal::DeviceNameError> {
    device.description().map(|d| d.name().to_string())
}

/// Names of the host's output devices.
pub fn output_device_names() -> Result<Vec<String>> {
    let devices = cpal::default_host()
        .output_devices()
        .map_err(|e| Error::Stream(e.to_string()))?;
    Ok(devices.filter_map(|d| device_name(&d).ok()).collect())
}

impl Backend for CpalBackend {
    fn start(&self, mut callback: Callback) -> Result<()> {
        if self.stopped.load(Ordering::Acquire) {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = find_output_device(&host, self.config.device.as_deref())?;
        let channels = usize::from(self.config.channels.max(1));
        let stream_config = cpal::StreamConfig {
            channels: self.config.channels,
            sample_rate: self.config.sample_rate,
            buffer_size: cpal::BufferSize::Fixed(self.config.frame_size as u32),
        };

        let mut outputs = channel_buffers(channels, self.config.frame_size);
        let errors = self.signal_tx.clone();
        let stream = device
            .build_output_stream(
                &stream_config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let frames = data.len() / channels;
                    for buf in &mut outputs {
                        buf.resize(frames, 0.0);
                    }
                    callback(&[], &mut outputs);
                    for (f, frame) in data.chunks_exact_mut(channels).enumerate() {
                        for (sample, buf) in frame.iter_mut().zip(&outputs) {
                            *sample = buf[f];
                        }
                    }
                },
                move |err| {
                    let _ = errors.try_send(Signal::Failed(err.to_string()));
                },
                None,
            )
            .map_err(|e| Error::Stream(e.to_string()))?;

        stream.play().map_err(|e| Error::Stream(e.to_string()))?;
        tracing::info!(
            host = host.id().name(),
            channels = self.config.channels,
            sample_rate = self.config.sample_rate,
            frame_size = self.config.frame_size,
            "output stream started"
        );

        let result = match self.signal_rx.recv() {
            Ok(Signal::Failed(msg)) => Err(Error::Stream(msg)),
            Ok(Signal::Stop) | Err(_) => Ok(()),
        };
        drop(stream);
        tracing::info!("output stream closed");
        result
    }

    fn stop(&self) -> Result<()> {
        self.stopped.store(true, Ordering::Release);
        let _ = self.signal_tx.try_send(Signal::Stop);
        Ok(())
    }

    fn frame_size(&self) -> usize {
        self.config.frame_size
    }

    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }
}
