//! Small numeric helpers shared by the unit library.
//!
//! # Gates and triggers
//!
//! Logic-valued signals are bipolar: `1.0` is high, `-1.0` is low, and
//! anything above zero counts as high when read. A trigger fires on the
//! sample where a signal crosses from `<= 0` to `> 0` (see [`is_trig`]).
//!
//! # Level conversions
//!
//! - [`db_to_linear`] - decibels to linear gain

/// High gate value.
pub const GATE_HIGH: f64 = 1.0;
/// Low gate value.
pub const GATE_LOW: f64 = -1.0;

/// Convert decibels to linear gain.
///
/// ```rust
/// use patchbay_core::math::db_to_linear;
///
/// assert!((db_to_linear(0.0) - 1.0).abs() < 1e-6);
/// assert!((db_to_linear(-6.02) - 0.5).abs() < 0.01);
/// ```
#[inline]
pub fn db_to_linear(db: f32) -> f32 {
    10f32.powf(db / 20.0)
}

/// Whether a signal going from `last` to `current` is a rising trigger.
#[inline]
pub fn is_trig(last: f64, current: f64) -> bool {
    last <= 0.0 && current > 0.0
}

/// Bipolar gate value for a boolean.
#[inline]
pub fn gate(high: bool) -> f64 {
    if high { GATE_HIGH } else { GATE_LOW }
}

/// Whether a bipolar logic signal reads as high.
#[inline]
pub fn is_high(v: f64) -> bool {
    v > 0.0
}

/// Linear interpolation between `a` and `b`.
#[inline]
pub fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn triggers_only_on_rising_edge() {
        assert!(is_trig(-1.0, 1.0));
        assert!(is_trig(0.0, 0.1));
        assert!(!is_trig(1.0, 1.0));
        assert!(!is_trig(-1.0, 0.0));
        assert!(!is_trig(0.5, -1.0));
    }

    #[test]
    fn lerp_endpoints() {
        assert_eq!(lerp(2.0, 4.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 4.0, 1.0), 4.0);
        assert_eq!(lerp(2.0, 4.0, 0.5), 3.0);
    }

    #[test]
    fn gate_values() {
        assert_eq!(gate(true), 1.0);
        assert_eq!(gate(false), -1.0);
        assert!(is_high(0.01));
        assert!(!is_high(0.0));
    }
}
