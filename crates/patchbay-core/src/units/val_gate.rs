//! Sign to gate: negative values (including `-0.0`) give `-1`, others `1`.

use crate::error::UnitError;
use crate::math::gate;
use crate::port::{In, Out};
use crate::unit::{Io, Processor, Unit};

use super::Config;

pub(super) fn build(mut io: Io, _: &Config) -> Result<Unit, UnitError> {
    let input = io.new_in("in", 0.0);
    let out = io.new_out("out");
    Ok(Unit::new(io, ValGate { input, out }))
}

struct ValGate {
    input: In,
    out: Out,
}

impl Processor for ValGate {
    fn process_sample(&mut self, i: usize) {
        let v = self.input.read(i);
        self.out.write(i, gate(!v.is_sign_negative()));
    }
}
