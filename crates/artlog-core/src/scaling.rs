//! Scaling engine
//!
//! Converts raw digitized samples into calibrated fixed-point values.
//!
//! A processed value is `round(multiplier * precision) * (raw - min_bit) + offset`.
//! The integer result carries `precision` implied decimal steps; the floating
//! value is the same quantity divided back down by `precision`.

use serde::{Deserialize, Serialize};

/// Calibration constants for an analog channel or a CAN sub-signal
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Engineering units per raw count
    pub multiplier: f32,

    /// Decimal scale of the fixed-point result (1, 10, 100, 1000...)
    pub precision: u16,

    /// Raw count that corresponds to zero
    pub min_bit: u16,

    /// Fixed offset, already expressed in precision steps
    pub offset: i32,
}

impl Calibration {
    /// Create a calibration
    pub fn new(multiplier: f32, precision: u16, min_bit: u16, offset: i32) -> Self {
        Self {
            multiplier,
            precision,
            min_bit,
            offset,
        }
    }

    /// Integer gain applied per raw count: `round(multiplier * precision)`
    pub fn gain(&self) -> i32 {
        (f64::from(self.multiplier) * f64::from(self.precision)).round() as i32
    }

    /// Scale a raw sample with these constants
    pub fn scale(&self, raw: u16) -> ScaledValue {
        scale(raw, self.multiplier, self.precision, self.min_bit, self.offset)
    }
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            multiplier: 1.0,
            precision: 1,
            min_bit: 0,
            offset: 0,
        }
    }
}

/// A processed sample in both representations
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ScaledValue {
    /// Signed fixed-point value (what gets logged)
    pub fixed: i32,
    /// `fixed / precision`
    pub value: f64,
}

/// Scale a raw sample.
///
/// `raw < min_bit` is not an error: the subtraction is signed and the result is
/// simply negative. Nothing is clamped; integer overflow wraps.
pub fn scale(raw: u16, multiplier: f32, precision: u16, min_bit: u16, offset: i32) -> ScaledValue {
    let gain = (f64::from(multiplier) * f64::from(precision)).round() as i32;
    let counts = i32::from(raw) - i32::from(min_bit);
    let fixed = gain.wrapping_mul(counts).wrapping_add(offset);

    let value = if precision == 0 {
        f64::from(fixed)
    } else {
        f64::from(fixed) / f64::from(precision)
    };

    ScaledValue { fixed, value }
}
