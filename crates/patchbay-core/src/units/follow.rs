//! Envelope follower unit.

use crate::envelope::Follow;
use crate::error::UnitError;
use crate::port::{In, Out};
use crate::unit::{Io, Processor, Unit};

use super::Config;

pub(super) fn build(mut io: Io, _: &Config) -> Result<Unit, UnitError> {
    let follow = FollowUnit {
        input: io.new_in("in", 0.0),
        rise: io.new_in("rise", 10.0),
        fall: io.new_in("fall", 200.0),
        out: io.new_out("out"),
        env: Follow::new(10.0, 200.0),
    };
    Ok(Unit::new(io, follow))
}

struct FollowUnit {
    input: In,
    rise: In,
    fall: In,
    out: Out,
    env: Follow,
}

impl Processor for FollowUnit {
    fn process_sample(&mut self, i: usize) {
        self.env.set_times(self.rise.read(i), self.fall.read(i));
        let v = self.env.tick(self.input.read(i));
        self.out.write(i, v);
    }
}
