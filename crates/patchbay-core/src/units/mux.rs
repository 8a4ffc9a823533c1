//! N-way selector: `out = inputs[clamp(select, 0, size - 1)]`.

use serde::Deserialize;

use crate::error::UnitError;
use crate::port::{In, Out};
use crate::unit::{Io, Processor, Unit};

use super::Config;

#[derive(Deserialize)]
#[serde(default)]
struct MuxConfig {
    size: usize,
}

impl Default for MuxConfig {
    fn default() -> Self {
        Self { size: 2 }
    }
}

pub(super) fn build(mut io: Io, config: &Config) -> Result<Unit, UnitError> {
    let MuxConfig { size } = config.decode()?;
    let size = size.max(1);
    let mux = Mux {
        select: io.new_in("select", 1.0),
        inputs: (0..size).map(|i| io.new_in(i.to_string(), 0.0)).collect(),
        out: io.new_out("out"),
    };
    Ok(Unit::new(io, mux))
}

struct Mux {
    select: In,
    inputs: Vec<In>,
    out: Out,
}

impl Processor for Mux {
    fn process_sample(&mut self, i: usize) {
        let last = (self.inputs.len() - 1) as f64;
        let idx = self.select.read(i).clamp(0.0, last) as usize;
        self.out.write(i, self.inputs[idx].read(i));
    }
}
