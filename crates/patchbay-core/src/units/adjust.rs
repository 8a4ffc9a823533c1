//! Gain and offset: `out = in * gain + offset`.

use crate::error::UnitError;
use crate::port::{In, Out};
use crate::unit::{Io, Processor, Unit};

use super::Config;

pub(super) fn build(mut io: Io, _: &Config) -> Result<Unit, UnitError> {
    let adjust = Adjust {
        input: io.new_in("in", 0.0),
        gain: io.new_in("gain", 1.0),
        offset: io.new_in("offset", 0.0),
        out: io.new_out("out"),
    };
    Ok(Unit::new(io, adjust))
}

struct Adjust {
    input: In,
    gain: In,
    offset: In,
    out: Out,
}

impl Processor for Adjust {
    fn process_sample(&mut self, i: usize) {
        let v = self.input.read(i) * self.gain.read(i) + self.offset.read(i);
        self.out.write(i, v);
    }
}
