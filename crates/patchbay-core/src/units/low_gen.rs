//! Oscillators with four independently scheduled taps.
//!
//! `low-gen` runs at control rate: each tap samples its controls at the first
//! index of the quantum and holds the resulting value, writing it one index
//! at a time like any other processor so back-edges stay one quantum stale.
//! `gen` recomputes every sample and defaults to 440 Hz. Either way a tap
//! whose output has no readers is skipped entirely.

use std::f64::consts::{PI, TAU};

use crate::error::UnitError;
use crate::math::is_trig;
use crate::port::{In, Out};
use crate::unit::{Capabilities, Io, OutputProcessor, Processor, Unit};

use super::Config;

#[derive(Clone)]
struct Controls {
    freq: In,
    amp: In,
    pulse_width: In,
    offset: In,
    sync: In,
}

#[derive(Clone, Copy)]
enum Shape {
    Sine,
    Triangle,
    Pulse,
    Saw,
}

impl Shape {
    fn value(self, phase: f64, pulse_width: f64) -> f64 {
        match self {
            Self::Sine => phase.sin(),
            Self::Triangle if phase < PI => -1.0 + 2.0 / PI * phase,
            Self::Triangle => 3.0 - 2.0 / PI * phase,
            Self::Pulse if phase < PI * pulse_width.abs() => 1.0,
            Self::Pulse => -1.0,
            Self::Saw => 2.0 * phase / TAU - 1.0,
        }
    }
}

pub(super) fn build(io: Io, config: &Config) -> Result<Unit, UnitError> {
    Ok(taps(io, config, 1.0, true))
}

pub(super) fn build_audio(io: Io, config: &Config) -> Result<Unit, UnitError> {
    Ok(taps(io, config, 440.0, false))
}

fn taps(mut io: Io, config: &Config, freq: f64, hold: bool) -> Unit {
    let controls = Controls {
        freq: io.new_in("freq", freq),
        amp: io.new_in("amp", 1.0),
        pulse_width: io.new_in("pulse-width", 1.0),
        offset: io.new_in("offset", 0.0),
        sync: io.new_in("sync", -1.0),
    };
    let step = TAU / f64::from(config.sample_rate().max(1));
    for (name, shape) in [
        ("sine", Shape::Sine),
        ("triangle", Shape::Triangle),
        ("pulse", Shape::Pulse),
        ("saw", Shape::Saw),
    ] {
        let tap = Tap {
            controls: controls.clone(),
            shape,
            out: io.new_out(name),
            phase: 0.0,
            step,
            increment: 0.0,
            held: 0.0,
            last_sync: 0.0,
            hold,
        };
        io.expose_output_processor(tap);
    }
    Unit::from_io(io)
}

struct Tap {
    controls: Controls,
    shape: Shape,
    out: Out,
    phase: f64,
    /// Phase increment per sample per Hz.
    step: f64,
    /// Phase increment per sample, as of the last sampled `freq`.
    increment: f64,
    held: f64,
    last_sync: f64,
    /// Sample controls once per quantum.
    hold: bool,
}

impl Tap {
    /// Samples the controls at index `i` and computes the current value.
    fn sample(&mut self, i: usize) -> f64 {
        let c = &self.controls;
        let sync = c.sync.read(i);
        if is_trig(self.last_sync, sync) {
            self.phase = 0.0;
        }
        self.last_sync = sync;

        self.increment = c.freq.read(i) * self.step;
        let v = self.shape.value(self.phase, c.pulse_width.read(i));
        c.amp.read(i) * v + c.offset.read(i)
    }
}

impl Processor for Tap {
    fn process_sample(&mut self, i: usize) {
        if i == 0 || !self.hold {
            self.held = self.sample(i);
        }
        self.out.write(i, self.held);
        self.phase = (self.phase + self.increment).rem_euclid(TAU);
    }

    fn is_processable(&self) -> bool {
        self.out.external_neighbor_count() > 0
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            frame: false,
            conditional: true,
            closes: false,
        }
    }
}

impl OutputProcessor for Tap {
    fn out(&self) -> &Out {
        &self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{Graph, Source};
    use crate::units::Registry;

    #[test]
    fn shapes_at_known_phases() {
        assert_eq!(Shape::Saw.value(0.0, 1.0), -1.0);
        assert_eq!(Shape::Triangle.value(0.0, 1.0), -1.0);
        assert_eq!(Shape::Triangle.value(PI, 1.0), 1.0);
        assert_eq!(Shape::Pulse.value(0.5, 1.0), 1.0);
        assert_eq!(Shape::Pulse.value(PI + 0.1, 1.0), -1.0);
        assert_eq!(Shape::Sine.value(0.0, 1.0), 0.0);
    }

    #[test]
    fn only_read_taps_run() {
        let registry = Registry::new(64, 16);
        let mut graph = Graph::new(16);
        graph.mount(registry.build("low-gen", "lfo", serde_json::Value::Null).unwrap()).unwrap();
        graph.mount(registry.build("noop", "probe", serde_json::Value::Null).unwrap()).unwrap();
        graph
            .patch(
                "probe",
                "x",
                &Source::Out {
                    unit: "lfo".into(),
                    output: "saw".into(),
                },
            )
            .unwrap();

        graph.evaluate(16);
        graph.evaluate(16);
        let lfo = graph.unit("lfo").unwrap();
        let saw = lfo.output("saw").unwrap();
        // 1 Hz at 64 Hz: a quarter turn per quantum.
        assert!((saw.read(0) + 0.5).abs() < 1e-9);
        assert_eq!(saw.read(15), saw.read(0));
        assert_eq!(lfo.output("sine").unwrap().read(0), 0.0);
        assert_eq!(lfo.output("sine").unwrap().external_neighbor_count(), 0);
    }

    #[test]
    fn audio_rate_taps_advance_per_sample() {
        let registry = Registry::new(8, 4);
        let mut graph = Graph::new(4);
        graph.mount(registry.build("gen", "osc", serde_json::Value::Null).unwrap()).unwrap();
        graph.mount(registry.build("noop", "probe", serde_json::Value::Null).unwrap()).unwrap();
        graph.patch("osc", "freq", &Source::Value(2.0)).unwrap();
        graph
            .patch(
                "probe",
                "x",
                &Source::Out {
                    unit: "osc".into(),
                    output: "saw".into(),
                },
            )
            .unwrap();

        graph.evaluate(4);
        let saw = graph.unit("osc").unwrap().output("saw").unwrap().clone();
        // 2 Hz at 8 Hz: a quarter turn per sample.
        let close = |expected: [f64; 4]| {
            for (i, e) in expected.into_iter().enumerate() {
                assert!((saw.read(i) - e).abs() < 1e-9, "sample {i}: {}", saw.read(i));
            }
        };
        close([-1.0, -0.5, 0.0, 0.5]);

        graph.evaluate_frame(4);
        close([-1.0, -0.5, 0.0, 0.5]);
    }

    #[test]
    fn held_taps_feed_earlier_units_a_quantum_late() {
        let run = |unit_major: bool| {
            let registry = Registry::new(8, 4);
            let mut graph = Graph::new(4);
            graph.mount(registry.build("noop", "probe", serde_json::Value::Null).unwrap()).unwrap();
            graph.mount(registry.build("low-gen", "lfo", serde_json::Value::Null).unwrap()).unwrap();
            graph.patch("lfo", "freq", &Source::Value(1.0)).unwrap();
            graph
                .patch(
                    "probe",
                    "x",
                    &Source::Out {
                        unit: "lfo".into(),
                        output: "saw".into(),
                    },
                )
                .unwrap();

            let out = graph.unit("probe").unwrap().output("out").unwrap().clone();
            let mut seen = Vec::new();
            for _ in 0..3 {
                if unit_major {
                    graph.evaluate_frame(4);
                } else {
                    graph.evaluate(4);
                }
                seen.extend((0..4).map(|i| out.read(i).to_bits()));
            }
            seen
        };

        let sample_major = run(false);
        assert_eq!(sample_major, run(true));
        // The first quantum sees the zeroed buffer, the second the held -1.
        assert!(sample_major[..4].iter().all(|&b| f64::from_bits(b) == 0.0));
        assert!(sample_major[4..8].iter().all(|&b| f64::from_bits(b) == -1.0));
        assert_eq!(sample_major[8], sample_major[11]);
    }
}
