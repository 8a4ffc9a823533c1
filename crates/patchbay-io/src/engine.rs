//! The real-time engine: graph ownership, message application and rendering.
//!
//! ```text
//!  control threads                      audio thread (backend callback)
//!  ───────────────                      ──────────────────────────────
//!  send_message ──► message queue ──►   drain + apply, reply
//!                                       for each quantum in the buffer:
//!                                         backend input → `input` unit
//!                                         evaluate graph
//!                                         `output` unit → fade × gain → buffer
//!  errors()     ◄── error queue   ◄──   cleanup / start failures
//! ```
//!
//! The graph lives behind a mutex that only the callback locks while it is
//! running, so the lock is uncontended in steady state. [`Engine::stop`]
//! takes the same lock to wait out an in-flight buffer.
//!
//! Every message gets exactly one reply. Once the engine stops or its backend
//! returns, the queue is closed and whatever is still in it is answered with
//! [`GraphError::Discarded`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, SendTimeoutError, Sender, TrySendError, bounded};
use parking_lot::{Mutex, RwLock};
use patchbay_core::{Graph, GraphError, UnitError, UnitId};
use thiserror::Error;

use crate::backend::{Backend, Callback};
use crate::baseline::{self, Taps};
use crate::message::{Command, Message, Reply, ReplyData, Responder};

/// Inbound message queue depth.
pub const MESSAGE_QUEUE_CAPACITY: usize = 1024;

/// Outbound error queue depth. Errors beyond this are logged and dropped,
/// except a backend start failure, which evicts the oldest queued error.
pub const ERROR_QUEUE_CAPACITY: usize = 64;

/// How long `send_message` waits on a full queue before rechecking whether
/// the engine still accepts messages.
const SEND_RETRY: Duration = Duration::from_millis(10);

/// Engine errors.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid backend or configuration.
    #[error("cannot construct engine: {0}")]
    Construction(String),
    /// The backend failed to start or aborted.
    #[error("backend failed: {0}")]
    BackendStart(#[source] crate::Error),
    /// A removed unit failed to release its resources.
    #[error("unit '{unit}' failed to close: {source}")]
    Cleanup {
        /// The removed unit.
        unit: UnitId,
        /// Why closing failed.
        #[source]
        source: UnitError,
    },
    /// `run` was called while already running.
    #[error("engine is already running")]
    AlreadyRunning,
    /// The engine has been stopped, or its backend has returned.
    #[error("engine is not accepting messages")]
    NotAccepting,
}

/// Engine construction options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    fade_in: Duration,
    gain: f32,
    single_sample: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fade_in: Duration::ZERO,
            gain: 1.0,
            single_sample: true,
        }
    }
}

impl EngineConfig {
    /// Ramps output from silence to full level over `fade_in`.
    #[must_use]
    pub fn with_fade_in(mut self, fade_in: Duration) -> Self {
        self.fade_in = fade_in;
        self
    }

    /// Linear output gain.
    #[must_use]
    pub fn with_gain(mut self, gain: f32) -> Self {
        self.gain = gain;
        self
    }

    /// Evaluates unit-major instead of sample-major.
    #[must_use]
    pub fn with_single_sample_disabled(mut self) -> Self {
        self.single_sample = false;
        self
    }

    /// Fade-in duration.
    pub fn fade_in(&self) -> Duration {
        self.fade_in
    }

    /// Linear output gain.
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Whether sample-major evaluation is used.
    pub fn single_sample(&self) -> bool {
        self.single_sample
    }
}

/// Owns a graph and renders it through a backend.
pub struct Engine {
    backend: Box<dyn Backend>,
    quantum: usize,
    realtime: Arc<Mutex<Realtime>>,
    messages_tx: Sender<Message>,
    messages_rx: Receiver<Message>,
    errors_tx: Sender<EngineError>,
    errors_rx: Receiver<EngineError>,
    size: Arc<AtomicUsize>,
    /// Held for reading while enqueueing, for writing while closing the queue.
    accepting: RwLock<bool>,
    running: AtomicBool,
    stopped: Arc<AtomicBool>,
}

impl Engine {
    /// Builds an engine rendering quanta of `quantum` samples through
    /// `backend`, with the permanent `input` and `output` units mounted.
    pub fn new(
        backend: impl Backend + 'static,
        quantum: usize,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        if quantum == 0 {
            return Err(EngineError::Construction("quantum must be non-zero".into()));
        }
        if backend.frame_size() == 0 {
            return Err(EngineError::Construction(
                "backend frame size must be non-zero".into(),
            ));
        }
        let sample_rate = backend.sample_rate();
        if sample_rate == 0 {
            return Err(EngineError::Construction(
                "backend sample rate must be non-zero".into(),
            ));
        }
        if !config.gain.is_finite() || config.gain < 0.0 {
            return Err(EngineError::Construction(format!(
                "gain must be finite and non-negative, got {}",
                config.gain
            )));
        }

        let mut graph = Graph::new(quantum);
        let (units, taps) = baseline::build(quantum);
        for unit in units {
            graph
                .mount_permanent(unit)
                .map_err(|e| EngineError::Construction(e.to_string()))?;
        }
        let size = Arc::new(AtomicUsize::new(graph.size()));

        let fade = Fade::new(config.fade_in, sample_rate, quantum);
        tracing::debug!(
            quantum,
            sample_rate,
            frame_size = backend.frame_size(),
            fade_quanta = fade.total,
            gain = config.gain,
            single_sample = config.single_sample,
            "engine created"
        );

        let (messages_tx, messages_rx) = bounded(MESSAGE_QUEUE_CAPACITY);
        let (errors_tx, errors_rx) = bounded(ERROR_QUEUE_CAPACITY);
        let realtime = Realtime {
            graph,
            taps,
            quantum,
            gain: config.gain,
            fade,
            single_sample: config.single_sample,
        };

        Ok(Self {
            backend: Box::new(backend),
            quantum,
            realtime: Arc::new(Mutex::new(realtime)),
            messages_tx,
            messages_rx,
            errors_tx,
            errors_rx,
            size,
            accepting: RwLock::new(true),
            running: AtomicBool::new(false),
            stopped: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Starts the backend and blocks until it returns.
    ///
    /// Failures are reported on [`errors`](Self::errors), not returned. When
    /// the backend returns the engine stops accepting messages, and those
    /// still queued are answered with [`GraphError::Discarded`].
    pub fn run(&self) {
        if self.running.swap(true, Ordering::AcqRel) {
            report(&self.errors_tx, EngineError::AlreadyRunning);
            return;
        }

        tracing::info!(
            sample_rate = self.backend.sample_rate(),
            frame_size = self.backend.frame_size(),
            "engine running"
        );
        if let Err(e) = self.backend.start(self.callback()) {
            tracing::error!(error = %e, "backend failed to start");
            self.report_evicting(EngineError::BackendStart(e));
        }
        self.close_queue();
        self.running.store(false, Ordering::Release);
        tracing::info!("engine finished");
    }

    fn callback(&self) -> Callback {
        let realtime = Arc::clone(&self.realtime);
        let messages = self.messages_rx.clone();
        let errors = self.errors_tx.clone();
        let size = Arc::clone(&self.size);
        let stopped = Arc::clone(&self.stopped);

        Box::new(move |input: &[f32], outputs: &mut [Vec<f32>]| {
            let mut rt = realtime.lock();
            if stopped.load(Ordering::Acquire) {
                for buf in outputs.iter_mut() {
                    buf.fill(0.0);
                }
                return;
            }
            for msg in messages.try_iter() {
                rt.apply(msg, &errors);
                size.store(rt.graph.size(), Ordering::Release);
            }
            rt.render(input, outputs);
        })
    }

    /// Stops accepting messages, waits for the in-flight buffer, then stops
    /// the backend and returns its result.
    ///
    /// Messages still queued are answered with [`GraphError::Discarded`].
    pub fn stop(&self) -> crate::Result<()> {
        *self.accepting.write() = false;
        {
            let _rt = self.realtime.lock();
            self.stopped.store(true, Ordering::Release);
        }
        self.close_queue();
        tracing::info!("stopping backend");
        self.backend.stop()
    }

    /// Refuses new messages and answers the queued ones.
    ///
    /// Senders hold the read side of `accepting` across the enqueue, so once
    /// the write side has been taken nothing can land behind the drain.
    fn close_queue(&self) {
        *self.accepting.write() = false;
        let mut discarded = 0usize;
        for msg in self.messages_rx.try_iter() {
            let (command, responder) = msg.into_parts();
            respond(responder, command.name(), Err(GraphError::Discarded));
            discarded += 1;
        }
        if discarded > 0 {
            tracing::debug!(discarded, "answered queued messages after shutdown");
        }
    }

    /// Queues a message for the next buffer.
    ///
    /// Waits while the queue is full. Fails with
    /// [`EngineError::NotAccepting`] once the engine has stopped or its
    /// backend has returned.
    pub fn send_message(&self, mut msg: Message) -> Result<(), EngineError> {
        loop {
            let accepting = self.accepting.read();
            if !*accepting {
                return Err(EngineError::NotAccepting);
            }
            match self.messages_tx.send_timeout(msg, SEND_RETRY) {
                Ok(()) => return Ok(()),
                Err(SendTimeoutError::Timeout(back)) => msg = back,
                Err(SendTimeoutError::Disconnected(_)) => return Err(EngineError::NotAccepting),
            }
        }
    }

    /// Queues an error that must not be lost, evicting the oldest queued
    /// errors if the queue is full.
    fn report_evicting(&self, mut error: EngineError) {
        loop {
            match self.errors_tx.try_send(error) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(back)) => {
                    if let Ok(evicted) = self.errors_rx.try_recv() {
                        tracing::warn!(error = %evicted, "error queue full, evicting oldest");
                    }
                    error = back;
                }
            }
        }
    }

    /// Asynchronous error stream.
    pub fn errors(&self) -> Receiver<EngineError> {
        self.errors_rx.clone()
    }

    /// Mounted unit count, baseline included, as of the last applied message.
    pub fn graph_size(&self) -> usize {
        self.size.load(Ordering::Acquire)
    }

    /// Quantum length in samples.
    pub fn quantum(&self) -> usize {
        self.quantum
    }

    /// Backend sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.backend.sample_rate()
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("quantum", &self.quantum)
            .field("sample_rate", &self.backend.sample_rate())
            .field("graph_size", &self.graph_size())
            .field("accepting", &*self.accepting.read())
            .finish_non_exhaustive()
    }
}

fn report(errors: &Sender<EngineError>, error: EngineError) {
    match errors.try_send(error) {
        Ok(()) => {}
        Err(TrySendError::Full(e)) => tracing::warn!(error = %e, "error queue full, dropping"),
        Err(TrySendError::Disconnected(_)) => {}
    }
}

/// Linear fade-in counted in quanta.
#[derive(Debug, Clone, Copy)]
struct Fade {
    total: u64,
    elapsed: u64,
}

impl Fade {
    fn new(duration: Duration, sample_rate: u32, quantum: usize) -> Self {
        let samples = duration.as_secs_f64() * f64::from(sample_rate);
        let total = (samples / quantum as f64).ceil() as u64;
        Self { total, elapsed: 0 }
    }

    /// Level for the next quantum.
    fn next(&mut self) -> f32 {
        if self.elapsed >= self.total {
            return 1.0;
        }
        let level = self.elapsed as f32 / self.total as f32;
        self.elapsed += 1;
        level
    }
}

/// State touched only by the audio thread.
struct Realtime {
    graph: Graph,
    taps: Taps,
    quantum: usize,
    gain: f32,
    fade: Fade,
    single_sample: bool,
}

impl Realtime {
    fn apply(&mut self, msg: Message, errors: &Sender<EngineError>) {
        let (command, responder) = msg.into_parts();
        let name = command.name();
        let reply = match command {
            Command::Mount(unit) => self.graph.mount(unit).map(|()| None),
            Command::Unmount(id) => self.graph.unmount(id.as_str()).map(|mut unit| {
                close(&mut unit, errors);
                Some(ReplyData::Unit(Box::new(unit)))
            }),
            Command::Clear => {
                let mut units = self.graph.clear();
                for unit in &mut units {
                    close(unit, errors);
                }
                Ok(Some(ReplyData::Units(units)))
            }
            Command::Patch {
                unit,
                input,
                source,
            } => self
                .graph
                .patch(unit.as_str(), &input, &source)
                .map(|()| None),
            Command::SetProp { unit, prop, value } => self
                .graph
                .set_prop(unit.as_str(), &prop, value)
                .map(|()| None),
        };
        respond(responder, name, reply);
    }

    fn render(&mut self, input: &[f32], outputs: &mut [Vec<f32>]) {
        let frames = outputs.iter().map(Vec::len).max().unwrap_or(0);
        let mut offset = 0;
        while offset < frames {
            let n = (frames - offset).min(self.quantum);

            for i in 0..n {
                let sample = input.get(offset + i).copied().unwrap_or(0.0);
                self.taps.input.write(i, f64::from(sample));
            }
            if self.single_sample {
                self.graph.evaluate(n);
            } else {
                self.graph.evaluate_frame(n);
            }

            let level = self.fade.next() * self.gain;
            for (buf, tap) in outputs.iter_mut().zip([&self.taps.left, &self.taps.right]) {
                let end = (offset + n).min(buf.len());
                let Some(span) = buf.get_mut(offset..end) else {
                    continue;
                };
                for (i, out) in span.iter_mut().enumerate() {
                    *out = tap.read(i) as f32 * level;
                }
            }
            offset += n;
        }
        for buf in outputs.iter_mut().skip(2) {
            buf.fill(0.0);
        }
    }
}

fn close(unit: &mut patchbay_core::Unit, errors: &Sender<EngineError>) {
    if let Err(source) = unit.close() {
        tracing::warn!(unit = %unit.id(), error = %source, "unit failed to close");
        report(
            errors,
            EngineError::Cleanup {
                unit: unit.id().clone(),
                source,
            },
        );
    }
}

fn respond(
    responder: Responder,
    command: &'static str,
    result: Result<Option<ReplyData>, patchbay_core::GraphError>,
) {
    let reply = match result {
        Ok(Some(data)) => Reply::with_data(data),
        Ok(None) => Reply::ok(),
        Err(e) => {
            tracing::debug!(command, error = %e, "command refused");
            Reply::failed(e)
        }
    };
    responder.send(reply);
}
