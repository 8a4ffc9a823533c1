//! The demo patch mounted by every session.
//!
//! ```text
//! input ───────────┐
//!                  ├─ mix (sum) ─── tremolo (adjust) ──► output left/right
//! tone (gen) ──────┘                  ▲ gain
//! lfo (low-gen) ─── depth (unipolar) ─┘
//! ```
//!
//! Everything goes over the control plane: the commands are queued before
//! the engine runs and confirmed once it has applied them.

use anyhow::{Context, bail};
use patchbay_core::{Registry, Source, UnitId};
use patchbay_io::{Command, Engine, INPUT_UNIT, Message, OUTPUT_UNIT, ReplySlot};
use serde_json::Value;

/// Demo patch parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Demo {
    /// Carrier frequency in Hz.
    pub tone_hz: f64,
    /// Tremolo rate in Hz.
    pub rate_hz: f64,
    /// Carrier amplitude.
    pub level: f64,
}

impl Default for Demo {
    fn default() -> Self {
        Self {
            tone_hz: 220.0,
            rate_hz: 4.0,
            level: 0.25,
        }
    }
}

fn wire(unit: &str, input: &str, source: Source) -> Command {
    Command::Patch {
        unit: unit.into(),
        input: input.into(),
        source,
    }
}

fn out(unit: &str, output: &str) -> Source {
    Source::Out {
        unit: UnitId::from(unit),
        output: output.into(),
    }
}

/// Commands building the demo patch.
pub fn commands(registry: &Registry, demo: &Demo) -> anyhow::Result<Vec<Command>> {
    let mut commands = Vec::new();
    for (kind, id) in [
        ("gen", "tone"),
        ("sum", "mix"),
        ("low-gen", "lfo"),
        ("unipolar", "depth"),
        ("adjust", "tremolo"),
    ] {
        let unit = registry
            .build(kind, id, Value::Null)
            .with_context(|| format!("building {kind} unit '{id}'"))?;
        commands.push(Command::Mount(unit));
    }

    commands.extend([
        wire("tone", "freq", Source::Value(demo.tone_hz)),
        wire("tone", "amp", Source::Value(demo.level)),
        wire("mix", "x", out(INPUT_UNIT, "out")),
        wire("mix", "y", out("tone", "sine")),
        wire("lfo", "freq", Source::Value(demo.rate_hz)),
        wire("depth", "x", out("lfo", "sine")),
        wire("tremolo", "in", out("mix", "out")),
        wire("tremolo", "gain", out("depth", "out")),
        wire(OUTPUT_UNIT, "left", out("tremolo", "out")),
        wire(OUTPUT_UNIT, "right", out("tremolo", "out")),
    ]);
    Ok(commands)
}

/// Queues `commands` on `engine`.
pub fn send(engine: &Engine, commands: Vec<Command>) -> anyhow::Result<Vec<(String, ReplySlot)>> {
    commands
        .into_iter()
        .map(|command| {
            let label = describe(&command);
            let (msg, slot) = Message::new(command);
            engine.send_message(msg).with_context(|| format!("sending {label}"))?;
            Ok((label, slot))
        })
        .collect()
}

/// Waits for every reply and fails on the first refused command.
pub fn confirm(slots: Vec<(String, ReplySlot)>) -> anyhow::Result<()> {
    for (label, slot) in slots {
        let Some(reply) = slot.wait() else {
            bail!("engine dropped {label} without replying");
        };
        if let Some(e) = reply.error {
            return Err(e).with_context(|| format!("applying {label}"));
        }
    }
    tracing::info!("demo patch mounted");
    Ok(())
}

fn describe(command: &Command) -> String {
    match command {
        Command::Mount(unit) => format!("mount {} ({})", unit.id(), unit.type_name()),
        Command::Unmount(id) => format!("unmount {id}"),
        Command::Clear => "clear".to_owned(),
        Command::Patch { unit, input, .. } => format!("patch {unit}.{input}"),
        Command::SetProp { unit, prop, .. } => format!("set {unit}.{prop}"),
    }
}

#[cfg(test)]
mod tests {
    use patchbay_core::GraphError;
    use patchbay_io::{EngineConfig, WavBackend};

    use super::*;

    #[test]
    fn demo_renders_audible_tremolo() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("demo.wav");
        let (sample_rate, quantum) = (8000, 64);
        let backend = WavBackend::new(&path, sample_rate, 256, 4000);
        let engine = Engine::new(backend, quantum, EngineConfig::default()).unwrap();

        let registry = Registry::new(sample_rate, quantum);
        let slots = send(&engine, commands(&registry, &Demo::default()).unwrap()).unwrap();
        engine.run();
        confirm(slots).unwrap();
        assert_eq!(engine.graph_size(), 7);

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
        let peak = samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.1, "peak {peak}");
        assert!(peak <= 0.25 + 1e-6, "peak {peak}");
        assert!(samples.chunks(2).all(|frame| frame[0] == frame[1]));
    }

    #[test]
    fn refused_command_names_itself() {
        let dir = tempfile::tempdir().unwrap();
        let backend = WavBackend::new(dir.path().join("x.wav"), 8000, 64, 64);
        let engine = Engine::new(backend, 64, EngineConfig::default()).unwrap();
        let slots = send(&engine, vec![wire("ghost", "x", Source::Value(1.0))]).unwrap();
        engine.run();
        let err = confirm(slots).unwrap_err();
        assert!(format!("{err:#}").contains("applying patch ghost.x"), "{err:#}");
    }

    #[test]
    fn stopped_engine_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let backend = WavBackend::new(dir.path().join("x.wav"), 8000, 64, 64);
        let engine = Engine::new(backend, 64, EngineConfig::default()).unwrap();
        let slots = send(&engine, vec![Command::Clear]).unwrap();
        engine.stop().unwrap();
        let err = confirm(slots).unwrap_err();
        assert!(err.to_string().contains("applying clear"), "{err}");
        assert!(matches!(
            err.downcast_ref::<GraphError>(),
            Some(GraphError::Discarded)
        ));
    }
}
