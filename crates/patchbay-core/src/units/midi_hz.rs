//! MIDI note number to frequency in Hz.

use std::sync::Arc;

use crate::error::UnitError;
use crate::pitch::PitchTable;
use crate::port::{In, Out};
use crate::unit::{Capabilities, Io, Processor, Unit};

use super::Config;

pub(super) fn build(mut io: Io, config: &Config) -> Result<Unit, UnitError> {
    let midi_hz = MidiHz {
        note: io.new_in("in", 69.0),
        out: io.new_out("out"),
        table: Arc::clone(config.pitches()),
    };
    Ok(Unit::new(io, midi_hz))
}

struct MidiHz {
    note: In,
    out: Out,
    table: Arc<PitchTable>,
}

impl Processor for MidiHz {
    fn process_sample(&mut self, i: usize) {
        self.out.write(i, self.table.hz(self.note.read(i)));
    }

    fn process_frame(&mut self, n: usize) {
        let table = &*self.table;
        for i in 0..n {
            self.out.write(i, table.hz(self.note.read(i)));
        }
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::FRAME
    }
}
