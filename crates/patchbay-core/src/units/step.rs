//! Trigger sequencer.
//!
//! The `serie` property is a pattern string. Each `advance` trigger moves to
//! the next character and a `reset` trigger returns to the first. On a `1`
//! the unit passes `in` through; on anything else it outputs `-1`. A single
//! space is skipped, which lets patterns be grouped visually.

use crate::error::UnitError;
use crate::math::{GATE_LOW, is_trig};
use crate::port::{In, Out};
use crate::unit::{Io, Processor, Prop, PropValue, Unit};

use super::Config;

const STEP_ON: u8 = b'1';

fn text_only(value: &PropValue) -> Result<(), String> {
    match value {
        PropValue::Text(_) => Ok(()),
        _ => Err("expected a string".into()),
    }
}

pub(super) fn build(mut io: Io, _: &Config) -> Result<Unit, UnitError> {
    let step = Step {
        input: io.new_in("in", 1.0),
        advance: io.new_in("advance", -1.0),
        reset: io.new_in("reset", -1.0),
        serie: io.new_prop(Prop::with_validator(
            "serie",
            PropValue::Text(String::new()),
            text_only,
        )),
        out: io.new_out("out"),
        target: 0,
        last_advance: 0.0,
        last_reset: 0.0,
    };
    Ok(Unit::new(io, step))
}

struct Step {
    input: In,
    advance: In,
    reset: In,
    serie: Prop,
    out: Out,
    target: usize,
    last_advance: f64,
    last_reset: f64,
}

impl Processor for Step {
    fn process_sample(&mut self, i: usize) {
        let advance = self.advance.read(i);
        if is_trig(self.last_advance, advance) {
            self.target += 1;
        }
        self.last_advance = advance;

        let reset = self.reset.read(i);
        if is_trig(self.last_reset, reset) {
            self.target = 0;
        }
        self.last_reset = reset;

        let input = &self.input;
        let target = &mut self.target;
        let out = self.serie.with(|value| {
            let PropValue::Text(pattern) = value else {
                return GATE_LOW;
            };
            let pattern = pattern.as_bytes();
            if pattern.is_empty() {
                return GATE_LOW;
            }
            // The pattern may have shrunk since the last sample.
            *target %= pattern.len();
            match pattern[*target] {
                b' ' => {
                    *target = (*target + 1) % pattern.len();
                    GATE_LOW
                }
                STEP_ON => input.read(i),
                _ => GATE_LOW,
            }
        });
        self.out.write(i, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::units::Registry;

    #[test]
    fn follows_pattern() {
        let mut unit = Registry::new(48_000, 1)
            .build("step", "s", serde_json::Value::Null)
            .unwrap();
        unit.set_prop("serie", "1 01".into()).unwrap();
        assert!(unit.set_prop("serie", PropValue::Number(1.0)).is_err());
        unit.input("in").unwrap().set_default(0.5);
        let advance = unit.input("advance").unwrap().clone();
        let out = unit.output("out").unwrap().clone();

        let mut seen = Vec::new();
        for a in [-1.0, 1.0, -1.0, 1.0, -1.0, 1.0] {
            advance.set_default(a);
            unit.processor_mut(0).process_sample(0);
            seen.push(out.read(0));
        }
        // '1', the space is skipped, '0', '1' held, then wrap to '1'.
        assert_eq!(seen, [0.5, -1.0, -1.0, 0.5, 0.5, 0.5]);
    }
}
