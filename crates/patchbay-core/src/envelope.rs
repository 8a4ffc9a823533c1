//! Envelope follower for tracking signal amplitude.
//!
//! Rise and fall are expressed in samples: each step closes 99% of the gap
//! to the rectified input over `rise` samples when the input is above the
//! envelope and over `fall` samples when it is below.

/// Rectifying envelope follower with separate rise and fall times.
///
/// ```rust
/// use patchbay_core::Follow;
///
/// let mut env = Follow::new(1.0, 2.0);
/// assert_eq!(env.tick(0.0), 0.0);
/// assert!((env.tick(0.5) - 0.495).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Follow {
    envelope: f64,
    rise: f64,
    fall: f64,
}

impl Follow {
    /// Creates a follower resting at zero.
    pub fn new(rise: f64, fall: f64) -> Self {
        Self {
            envelope: 0.0,
            rise,
            fall,
        }
    }

    /// Updates rise and fall without touching the current envelope.
    pub fn set_times(&mut self, rise: f64, fall: f64) {
        self.rise = rise;
        self.fall = fall;
    }

    /// Current envelope level.
    pub fn level(&self) -> f64 {
        self.envelope
    }

    /// Feeds one sample and returns the new envelope.
    pub fn tick(&mut self, input: f64) -> f64 {
        let input = input.abs();
        if input == self.envelope {
            return self.envelope;
        }
        let time = if input > self.envelope {
            self.rise
        } else {
            self.fall
        };
        let coeff = 0.01f64.powf(time.recip());
        self.envelope = coeff * (self.envelope - input) + input;
        self.envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_sequence() {
        let mut env = Follow::new(1.0, 2.0);
        let inputs = [0.5, 0.0, -0.5, 0.0, 0.0, 0.0];
        let expected = [
            0.495,
            0.0495,
            0.495495,
            0.0495495,
            0.004_954_95,
            0.000_495_495,
        ];
        for (input, want) in inputs.into_iter().zip(expected) {
            let got = env.tick(input);
            assert!((got - want).abs() < 1e-12, "expected {want}, got {got}");
        }
    }

    #[test]
    fn rectifies_negative_input() {
        let mut a = Follow::new(10.0, 200.0);
        let mut b = Follow::new(10.0, 200.0);
        for _ in 0..32 {
            assert_eq!(a.tick(-0.3), b.tick(0.3));
        }
    }

    #[test]
    fn steady_input_holds() {
        let mut env = Follow::new(1.0, 1.0);
        let first = env.tick(0.25);
        assert_eq!(env.tick(first), first);
    }
}
