//! MIDI note to frequency table.
//!
//! Built once per [`Registry`](crate::units::Registry) and shared with the
//! units that need it through an `Arc`.

/// Number of MIDI notes.
pub const NOTE_COUNT: usize = 128;

/// Equal-tempered frequencies for MIDI notes 0..128, A4 (note 69) at 440 Hz.
#[derive(Debug, Clone)]
pub struct PitchTable {
    hz: [f64; NOTE_COUNT],
}

impl PitchTable {
    /// Builds the table for a given A4 reference.
    pub fn new(a4: f64) -> Self {
        let mut hz = [0.0; NOTE_COUNT];
        for (note, slot) in hz.iter_mut().enumerate() {
            *slot = a4 * 2f64.powf((note as f64 - 69.0) / 12.0);
        }
        Self { hz }
    }

    /// Frequency of the nearest note, clamped to the MIDI range.
    pub fn hz(&self, note: f64) -> f64 {
        let idx = note.round().clamp(0.0, (NOTE_COUNT - 1) as f64) as usize;
        self.hz[idx]
    }
}

impl Default for PitchTable {
    fn default() -> Self {
        Self::new(440.0)
    }
}
