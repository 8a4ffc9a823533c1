//! Flip-flop: each trigger flips the output between `1` and `-1`.
//!
//! The output rests at `0` until the first trigger.

use crate::error::UnitError;
use crate::math::is_trig;
use crate::port::{In, Out};
use crate::unit::{Io, Processor, Unit};

use super::Config;

pub(super) fn build(mut io: Io, _: &Config) -> Result<Unit, UnitError> {
    let toggle = Toggle {
        trigger: io.new_in("trigger", -1.0),
        out: io.new_out("out"),
        value: 0.0,
        last: 0.0,
    };
    Ok(Unit::new(io, toggle))
}

struct Toggle {
    trigger: In,
    out: Out,
    value: f64,
    last: f64,
}

impl Processor for Toggle {
    fn process_sample(&mut self, i: usize) {
        let trig = self.trigger.read(i);
        if is_trig(self.last, trig) {
            self.value = if self.value > 0.0 { -1.0 } else { 1.0 };
        }
        self.last = trig;
        self.out.write(i, self.value);
    }
}
