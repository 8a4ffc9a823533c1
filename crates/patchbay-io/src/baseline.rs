//! The permanent units every engine graph starts with.
//!
//! `input` exposes the backend's input as its `out` port; `output` is the
//! sink whose `left` and `right` inputs the engine reads after each quantum.
//! Neither has a processor: the engine writes and reads their ports around
//! evaluation.

use patchbay_core::{In, Io, Out, Unit};

/// Id of the unit carrying backend input.
pub const INPUT_UNIT: &str = "input";

/// Id of the sink unit feeding the backend.
pub const OUTPUT_UNIT: &str = "output";

/// Ports the engine drives directly.
pub(crate) struct Taps {
    pub input: Out,
    pub left: In,
    pub right: In,
}

/// Builds the baseline units and the engine's handles on their ports.
pub(crate) fn build(quantum: usize) -> ([Unit; 2], Taps) {
    let mut io = Io::new("input", INPUT_UNIT, quantum);
    let input = io.new_out("out");
    let source = Unit::from_io(io);

    let mut io = Io::new("output", OUTPUT_UNIT, quantum);
    let left = io.new_in("left", 0.0);
    let right = io.new_in("right", 0.0);
    let sink = Unit::from_io(io);

    ([source, sink], Taps { input, left, right })
}
