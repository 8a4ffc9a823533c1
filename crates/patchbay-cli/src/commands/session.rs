//! Runs one engine session: demo patch, playback, shutdown.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use anyhow::{Context, anyhow};
use crossbeam_channel::{bounded, select};
use patchbay_core::Registry;
use patchbay_io::{Backend, Engine, EngineError, Recorder};

use crate::patch::{self, Demo};
use crate::settings::Settings;

/// When a session ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Until {
    /// Ctrl+C, or the backend giving up.
    Interrupted,
    /// The backend returning on its own.
    Finished,
}

/// Runs the demo patch through `backend`, optionally recording to `record`.
pub fn run(
    backend: impl Backend + 'static,
    settings: &Settings,
    record: Option<&Path>,
    until: Until,
) -> anyhow::Result<()> {
    match record {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("creating recording {}", path.display()))?;
            tracing::info!(path = %path.display(), "recording output");
            session(Recorder::new(backend, BufWriter::new(file)), settings, until)
        }
        None => session(backend, settings, until),
    }
}

fn session(backend: impl Backend + 'static, settings: &Settings, until: Until) -> anyhow::Result<()> {
    let engine = Engine::new(backend, settings.quantum, settings.engine_config())
        .context("creating engine")?;
    let engine = Arc::new(engine);

    let errors = engine.errors();
    let logger = thread::Builder::new()
        .name("engine-errors".into())
        .spawn(move || {
            let mut fatal = None;
            for err in errors {
                tracing::error!(error = %err, "engine error");
                if fatal.is_none() && matches!(err, EngineError::BackendStart(_)) {
                    fatal = Some(err);
                }
            }
            fatal
        })?;

    let registry = Registry::new(settings.sample_rate, settings.quantum);
    let slots = patch::send(&engine, patch::commands(&registry, &Demo::default())?)?;

    let (done_tx, done_rx) = bounded::<()>(1);
    let runner = thread::Builder::new().name("engine".into()).spawn({
        let engine = Arc::clone(&engine);
        move || {
            engine.run();
            let _ = done_tx.send(());
        }
    })?;

    let mounted = patch::confirm(slots);
    if mounted.is_ok() {
        match until {
            Until::Interrupted => {
                let (interrupt_tx, interrupt_rx) = bounded::<()>(1);
                ctrlc::set_handler(move || {
                    let _ = interrupt_tx.try_send(());
                })?;
                tracing::info!("press Ctrl+C to stop");
                select! {
                    recv(interrupt_rx) -> _ => tracing::info!("interrupted"),
                    recv(done_rx) -> _ => {}
                }
            }
            Until::Finished => {
                let _ = done_rx.recv();
            }
        }
    }

    let stopped = engine.stop();
    runner
        .join()
        .map_err(|_| anyhow!("engine thread panicked"))?;
    drop(engine);
    let fatal = logger
        .join()
        .map_err(|_| anyhow!("error logger panicked"))?;

    if let Some(err) = fatal {
        return Err(err).context("audio backend failed");
    }
    mounted?;
    stopped.context("stopping backend")?;
    tracing::info!("session finished");
    Ok(())
}
