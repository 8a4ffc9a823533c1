//! Cross-feed: each channel picks up `amount` of the other, with `amount`
//! clamped to `[0, 1]`.

use crate::error::UnitError;
use crate::port::{In, Out};
use crate::unit::{Io, Processor, Unit};

use super::Config;

pub(super) fn build(mut io: Io, _: &Config) -> Result<Unit, UnitError> {
    let xfeed = Xfeed {
        a: io.new_in("a", 0.0),
        b: io.new_in("b", 0.0),
        amount: io.new_in("amount", 0.0),
        a_out: io.new_out("a"),
        b_out: io.new_out("b"),
    };
    Ok(Unit::new(io, xfeed))
}

struct Xfeed {
    a: In,
    b: In,
    amount: In,
    a_out: Out,
    b_out: Out,
}

impl Processor for Xfeed {
    fn process_sample(&mut self, i: usize) {
        let (a, b) = (self.a.read(i), self.b.read(i));
        let amount = self.amount.read(i).clamp(0.0, 1.0);
        self.a_out.write(i, a + amount * b);
        self.b_out.write(i, b + amount * a);
    }
}
