//! Engine behaviour against a scripted backend.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::bounded;
use parking_lot::Mutex;
use patchbay_core::{
    GraphError, Io, Out, Processor, PropValue, Registry, Source, Unit, UnitError, UnitId,
};
use patchbay_io::{
    Backend, Callback, Command, Engine, EngineConfig, EngineError, Error, Message, Recorder,
    ReplyData, Result, WavBackend,
};
use serde_json::{Value, json};

const Q: usize = 4;
const SAMPLE_RATE: u32 = 8;

type StartFn = Box<dyn Fn(Callback) -> Result<()> + Send + Sync>;
type StopFn = Box<dyn Fn() -> Result<()> + Send + Sync>;

/// Backend whose start and stop are scripted by each test.
struct Fake {
    start: StartFn,
    stop: StopFn,
    frame_size: usize,
}

impl Fake {
    fn new(frame_size: usize, start: StartFn) -> Self {
        Self {
            start,
            stop: Box::new(|| Ok(())),
            frame_size,
        }
    }

    /// Calls the callback `buffers` times with three output channels and
    /// keeps every rendered buffer in `sink`.
    fn buffers(frame_size: usize, buffers: usize, sink: Arc<Rendered>) -> Self {
        Self::new(
            frame_size,
            Box::new(move |mut callback: Callback| {
                let mut outputs = vec![vec![9.0; frame_size]; 3];
                for _ in 0..buffers {
                    callback(&[], &mut outputs);
                    sink.push(outputs.clone());
                }
                Ok(())
            }),
        )
    }
}

impl Backend for Fake {
    fn start(&self, callback: Callback) -> Result<()> {
        (self.start)(callback)
    }

    fn stop(&self) -> Result<()> {
        (self.stop)()
    }

    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }
}

/// Rendered buffers, one entry per callback.
#[derive(Default)]
struct Rendered(Mutex<Vec<Vec<Vec<f32>>>>);

impl Rendered {
    fn push(&self, outputs: Vec<Vec<f32>>) {
        self.0.lock().push(outputs);
    }

    fn take(&self) -> Vec<Vec<Vec<f32>>> {
        std::mem::take(&mut *self.0.lock())
    }
}

fn registry() -> Registry {
    Registry::new(SAMPLE_RATE, Q)
}

fn send(engine: &Engine, command: Command) -> patchbay_io::ReplySlot {
    let (msg, slot) = Message::new(command);
    engine.send_message(msg).unwrap();
    slot
}

fn out(unit: &str, output: &str) -> Source {
    Source::Out {
        unit: unit.into(),
        output: output.into(),
    }
}

#[test]
fn stop_returns_backend_result() {
    let mut fake = Fake::new(Q, Box::new(|_| Ok(())));
    fake.stop = Box::new(|| Err(Error::Stream("exploded".into())));
    let engine = Engine::new(fake, Q, EngineConfig::default()).unwrap();

    let err = engine.stop().unwrap_err();
    assert!(matches!(&err, Error::Stream(msg) if msg == "exploded"));
}

#[test]
fn start_error_is_reported_once() {
    let fake = Fake::new(Q, Box::new(|_| Err(Error::NoDevice)));
    let engine = Engine::new(fake, Q, EngineConfig::default()).unwrap();
    let errors = engine.errors();

    engine.run();
    assert!(matches!(
        errors.try_recv(),
        Ok(EngineError::BackendStart(Error::NoDevice))
    ));
    assert!(errors.try_recv().is_err());
    assert!(engine.stop().is_ok());
}

#[test]
fn mount_is_replied_within_first_callback() {
    let (slot_tx, slot_rx) = bounded(1);
    let replied_early = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&replied_early);
    let fake = Fake::new(
        2 * Q,
        Box::new(move |mut callback: Callback| {
            let slot: patchbay_io::ReplySlot = slot_rx.recv().unwrap();
            let mut outputs = vec![vec![0.0; 2 * Q]; 2];
            callback(&[], &mut outputs);
            flag.store(slot.try_recv().is_some(), Ordering::SeqCst);
            callback(&[], &mut outputs);
            Ok(())
        }),
    );
    let engine = Engine::new(fake, Q, EngineConfig::default()).unwrap();

    let unit = registry().build("adjust", "a", Value::Null).unwrap();
    slot_tx.send(send(&engine, Command::Mount(unit))).unwrap();
    engine.run();

    assert!(replied_early.load(Ordering::SeqCst));
    assert_eq!(engine.graph_size(), 3);
}

#[test]
fn mount_unmount_clear_change_size() {
    let fake = Fake::buffers(Q, 1, Arc::default());
    let engine = Engine::new(fake, Q, EngineConfig::default()).unwrap();
    assert_eq!(engine.graph_size(), 2);

    let reg = registry();
    let a = send(&engine, Command::Mount(reg.build("adjust", "a", Value::Null).unwrap()));
    let b = send(&engine, Command::Mount(reg.build("toggle", "b", Value::Null).unwrap()));
    let c = send(&engine, Command::Mount(reg.build("noop", "c", Value::Null).unwrap()));
    let gone = send(&engine, Command::Unmount("b".into()));
    engine.run();

    for slot in [a, b, c] {
        assert!(slot.wait().unwrap().is_ok());
    }
    match gone.wait().unwrap().data {
        Some(ReplyData::Unit(unit)) => assert_eq!(unit.id().as_str(), "b"),
        other => panic!("unexpected reply data: {other:?}"),
    }
    assert_eq!(engine.graph_size(), 4);
}

#[test]
fn clear_returns_removed_units() {
    let fake = Fake::buffers(Q, 1, Arc::default());
    let engine = Engine::new(fake, Q, EngineConfig::default()).unwrap();
    let reg = registry();
    for id in ["x", "y"] {
        send(&engine, Command::Mount(reg.build("noop", id, Value::Null).unwrap()));
    }
    let cleared = send(&engine, Command::Clear);
    engine.run();

    let Some(ReplyData::Units(units)) = cleared.wait().unwrap().data else {
        panic!("clear should return units");
    };
    let ids: Vec<&str> = units.iter().map(|u| u.id().as_str()).collect();
    assert_eq!(ids, ["x", "y"]);
    assert_eq!(engine.graph_size(), 2);
}

#[test]
fn invalid_commands_reply_with_error() {
    let fake = Fake::buffers(Q, 1, Arc::default());
    let engine = Engine::new(fake, Q, EngineConfig::default()).unwrap();
    let reg = registry();

    let ghost = send(&engine, Command::Unmount("ghost".into()));
    let baseline = send(&engine, Command::Unmount(UnitId::new(patchbay_io::OUTPUT_UNIT)));
    let first = send(&engine, Command::Mount(reg.build("noop", "n", Value::Null).unwrap()));
    let dup = send(&engine, Command::Mount(reg.build("noop", "n", Value::Null).unwrap()));
    let port = send(
        &engine,
        Command::Patch {
            unit: "n".into(),
            input: "nope".into(),
            source: Source::Value(1.0),
        },
    );
    let prop = send(
        &engine,
        Command::SetProp {
            unit: "n".into(),
            prop: "serie".into(),
            value: PropValue::Number(1.0),
        },
    );
    engine.run();

    for slot in [ghost, baseline, dup, port, prop] {
        let reply = slot.wait().unwrap();
        assert!(reply.error.is_some());
        assert!(reply.data.is_none());
    }
    assert!(first.wait().unwrap().is_ok());
    assert_eq!(engine.graph_size(), 3);
}

#[test]
fn renders_output_unit_with_gain() {
    let rendered = Arc::new(Rendered::default());
    let fake = Fake::buffers(2 * Q + 1, 1, Arc::clone(&rendered));
    let config = EngineConfig::default().with_gain(0.5);
    let engine = Engine::new(fake, Q, config).unwrap();

    send(&engine, Command::Mount(registry().build("adjust", "a", Value::Null).unwrap()));
    send(
        &engine,
        Command::Patch {
            unit: "a".into(),
            input: "offset".into(),
            source: Source::Value(0.5),
        },
    );
    send(
        &engine,
        Command::Patch {
            unit: patchbay_io::OUTPUT_UNIT.into(),
            input: "left".into(),
            source: out("a", "out"),
        },
    );
    engine.run();

    let buffers = rendered.take();
    let outputs = &buffers[0];
    // The trailing partial quantum is rendered too.
    assert_eq!(outputs[0], vec![0.25; 2 * Q + 1]);
    assert_eq!(outputs[1], vec![0.0; 2 * Q + 1]);
    assert_eq!(outputs[2], vec![0.0; 2 * Q + 1]);
}

fn constant_left(engine: &Engine, value: f64) {
    send(engine, Command::Mount(registry().build("adjust", "k", Value::Null).unwrap()));
    send(
        engine,
        Command::Patch {
            unit: "k".into(),
            input: "offset".into(),
            source: Source::Value(value),
        },
    );
    send(
        engine,
        Command::Patch {
            unit: patchbay_io::OUTPUT_UNIT.into(),
            input: "left".into(),
            source: out("k", "out"),
        },
    );
}

#[test]
fn fade_in_ramps_per_quantum() {
    let rendered = Arc::new(Rendered::default());
    let fake = Fake::buffers(3 * Q, 1, Arc::clone(&rendered));
    // One second at 8 Hz is two quanta of four samples.
    let config = EngineConfig::default().with_fade_in(Duration::from_secs(1));
    let engine = Engine::new(fake, Q, config).unwrap();
    constant_left(&engine, 1.0);
    engine.run();

    let left = &rendered.take()[0][0];
    let expected: Vec<f32> = [0.0, 0.5, 1.0]
        .iter()
        .flat_map(|&level| [level; Q])
        .collect();
    assert_eq!(left, &expected);
}

#[test]
fn strategies_render_identically() {
    let render = |config: EngineConfig| {
        let rendered = Arc::new(Rendered::default());
        let fake = Fake::buffers(4 * Q, 3, Arc::clone(&rendered));
        let engine = Engine::new(fake, Q, config).unwrap();
        let reg = Registry::new(SAMPLE_RATE, Q);
        send(
            &engine,
            Command::Mount(reg.build("low-gen", "lfo", json!({})).unwrap()),
        );
        send(&engine, Command::Mount(reg.build("follow", "env", Value::Null).unwrap()));
        send(
            &engine,
            Command::Patch {
                unit: "env".into(),
                input: "in".into(),
                source: out("lfo", "triangle"),
            },
        );
        for (input, source) in [("left", out("env", "out")), ("right", out("lfo", "saw"))] {
            send(
                &engine,
                Command::Patch {
                    unit: patchbay_io::OUTPUT_UNIT.into(),
                    input: input.into(),
                    source,
                },
            );
        }
        engine.run();
        rendered.take()
    };

    let sample_major = render(EngineConfig::default());
    let unit_major = render(EngineConfig::default().with_single_sample_disabled());
    assert_eq!(sample_major, unit_major);
}

#[test]
fn stop_refuses_messages_and_silences_output() {
    let rendered = Arc::new(Rendered::default());
    let fake = Fake::buffers(Q, 1, Arc::clone(&rendered));
    let engine = Engine::new(fake, Q, EngineConfig::default()).unwrap();
    constant_left(&engine, 1.0);
    let (msg, queued) = Message::new(Command::Clear);
    engine.send_message(msg).unwrap();

    engine.stop().unwrap();
    let reply = queued.wait().unwrap();
    assert!(matches!(reply.error, Some(GraphError::Discarded)));
    assert!(reply.data.is_none());
    let (msg, _slot) = Message::new(Command::Clear);
    assert!(matches!(
        engine.send_message(msg),
        Err(EngineError::NotAccepting)
    ));

    engine.run();
    assert_eq!(rendered.take()[0][0], vec![0.0; Q]);
}

#[test]
fn second_run_is_refused() {
    let (started_tx, started_rx) = bounded(1);
    let (stop_tx, stop_rx) = bounded::<()>(1);
    let mut fake = Fake::new(
        Q,
        Box::new(move |_| {
            started_tx.send(()).unwrap();
            stop_rx.recv().unwrap();
            Ok(())
        }),
    );
    fake.stop = Box::new(move || {
        stop_tx.send(()).unwrap();
        Ok(())
    });
    let engine = Arc::new(Engine::new(fake, Q, EngineConfig::default()).unwrap());
    let errors = engine.errors();

    let runner = thread::spawn({
        let engine = Arc::clone(&engine);
        move || engine.run()
    });
    started_rx.recv().unwrap();
    engine.run();
    assert!(matches!(errors.try_recv(), Ok(EngineError::AlreadyRunning)));

    engine.stop().unwrap();
    runner.join().unwrap();
}

#[test]
fn construction_is_validated() {
    let fake = || Fake::new(Q, Box::new(|_| Ok(())));
    assert!(matches!(
        Engine::new(fake(), 0, EngineConfig::default()),
        Err(EngineError::Construction(_))
    ));
    assert!(matches!(
        Engine::new(Fake::new(0, Box::new(|_| Ok(()))), Q, EngineConfig::default()),
        Err(EngineError::Construction(_))
    ));
    for gain in [f32::NAN, f32::INFINITY, -1.0] {
        assert!(matches!(
            Engine::new(fake(), Q, EngineConfig::default().with_gain(gain)),
            Err(EngineError::Construction(_))
        ));
    }
}

struct Stubborn {
    out: Out,
}

impl Processor for Stubborn {
    fn process_sample(&mut self, i: usize) {
        self.out.write(i, 0.0);
    }

    fn close(&mut self) -> std::result::Result<(), UnitError> {
        Err(UnitError::Io(std::io::Error::other("device busy")))
    }
}

#[test]
fn close_failure_goes_to_error_channel() {
    let fake = Fake::buffers(Q, 1, Arc::default());
    let engine = Engine::new(fake, Q, EngineConfig::default()).unwrap();
    let errors = engine.errors();

    let mut io = Io::new("stubborn", "s", Q);
    let out = io.new_out("out");
    send(&engine, Command::Mount(Unit::new(io, Stubborn { out })));
    let gone = send(&engine, Command::Unmount("s".into()));
    engine.run();

    assert!(gone.wait().unwrap().is_ok());
    match errors.try_recv() {
        Ok(EngineError::Cleanup { unit, .. }) => assert_eq!(unit.as_str(), "s"),
        other => panic!("expected cleanup error, got {other:?}"),
    }
}

#[test]
fn recorder_tees_engine_output() {
    let fake = Fake::buffers(Q, 2, Arc::default());
    let recorder = Arc::new(Recorder::new(fake, Vec::new()));
    let engine = Engine::new(Arc::clone(&recorder), Q, EngineConfig::default()).unwrap();
    constant_left(&engine, 1.0);
    engine.run();
    drop(engine);

    let bytes = Arc::try_unwrap(recorder).unwrap().into_writer().unwrap();
    assert_eq!(bytes.len(), 2 * Q * 2 * 4);
    assert_eq!(&bytes[..8], &[0x00, 0x00, 0x80, 0x3F, 0x00, 0x00, 0x00, 0x00]);
}

#[test]
fn wav_render_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("render.wav");
    let engine = Engine::new(
        WavBackend::new(&path, SAMPLE_RATE, 3, 10),
        Q,
        EngineConfig::default(),
    )
    .unwrap();
    constant_left(&engine, -0.5);
    engine.run();
    assert!(engine.errors().try_recv().is_err());

    let mut reader = hound::WavReader::open(&path).unwrap();
    let samples: Vec<f32> = reader.samples::<f32>().map(|s| s.unwrap()).collect();
    assert_eq!(samples.len(), 20);
    assert!(samples.chunks(2).all(|frame| frame == [-0.5, 0.0]));
}

#[test]
fn failed_start_answers_queued_messages() {
    let fake = Fake::new(Q, Box::new(|_| Err(Error::Stream("busy".into()))));
    let engine = Engine::new(fake, Q, EngineConfig::default()).unwrap();
    let pending = send(&engine, Command::Clear);
    engine.run();

    let reply = pending.wait_timeout(Duration::from_secs(5)).unwrap();
    assert!(matches!(reply.error, Some(GraphError::Discarded)));
    assert_eq!(engine.graph_size(), 2);
}

#[test]
fn finished_engine_refuses_messages() {
    let fake = Fake::new(Q, Box::new(|_| Err(Error::NoDevice)));
    let engine = Engine::new(fake, Q, EngineConfig::default()).unwrap();
    engine.run();

    let (msg, slot) = Message::new(Command::Clear);
    assert!(matches!(
        engine.send_message(msg),
        Err(EngineError::NotAccepting)
    ));
    // The refused message was dropped with its reply sender.
    assert!(slot.wait_timeout(Duration::from_secs(1)).is_none());
}

#[test]
fn every_message_is_answered_across_stop() {
    let (started_tx, started_rx) = bounded(1);
    let (stop_tx, stop_rx) = bounded::<()>(1);
    let mut fake = Fake::new(
        Q,
        Box::new(move |mut callback: Callback| {
            let mut outputs = vec![vec![0.0; Q]; 2];
            callback(&[], &mut outputs);
            started_tx.send(()).unwrap();
            while stop_rx.try_recv().is_err() {
                callback(&[], &mut outputs);
                thread::yield_now();
            }
            Ok(())
        }),
    );
    fake.stop = Box::new(move || {
        let _ = stop_tx.send(());
        Ok(())
    });
    let engine = Arc::new(Engine::new(fake, Q, EngineConfig::default()).unwrap());
    let runner = thread::spawn({
        let engine = Arc::clone(&engine);
        move || engine.run()
    });
    started_rx.recv().unwrap();

    let sender = thread::spawn({
        let engine = Arc::clone(&engine);
        move || {
            let mut slots = Vec::new();
            for _ in 0..2000 {
                let (msg, slot) = Message::new(Command::Unmount("ghost".into()));
                if engine.send_message(msg).is_err() {
                    break;
                }
                slots.push(slot);
            }
            slots
        }
    });
    thread::sleep(Duration::from_millis(5));
    engine.stop().unwrap();
    runner.join().unwrap();

    for slot in sender.join().unwrap() {
        let reply = slot.wait_timeout(Duration::from_secs(5)).unwrap();
        assert!(matches!(
            reply.error,
            Some(GraphError::NotFound(_) | GraphError::Discarded)
        ));
    }
}

#[test]
fn start_failure_survives_a_full_error_queue() {
    let fake = Fake::new(
        Q,
        Box::new(|mut callback: Callback| {
            let mut outputs = vec![vec![0.0; Q]; 2];
            callback(&[], &mut outputs);
            Err(Error::Stream("device lost".into()))
        }),
    );
    let engine = Engine::new(fake, Q, EngineConfig::default()).unwrap();
    let errors = engine.errors();

    let stubborn = patchbay_io::ERROR_QUEUE_CAPACITY + 6;
    for n in 0..stubborn {
        let mut io = Io::new("stubborn", format!("s{n}"), Q);
        let out = io.new_out("out");
        send(&engine, Command::Mount(Unit::new(io, Stubborn { out })));
    }
    send(&engine, Command::Clear);
    engine.run();

    let received: Vec<EngineError> = errors.try_iter().collect();
    assert_eq!(received.len(), patchbay_io::ERROR_QUEUE_CAPACITY);
    let starts = received
        .iter()
        .filter(|e| matches!(e, EngineError::BackendStart(_)))
        .count();
    assert_eq!(starts, 1);
    assert!(matches!(
        received.last(),
        Some(EngineError::BackendStart(Error::Stream(_)))
    ));
}
