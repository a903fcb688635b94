//! Analog channel descriptor

use serde::Serialize;

use crate::scaling::{Calibration, ScaledValue};

/// One analog input slot
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnalogChannel {
    /// Column name written in the CSV header
    pub name: String,

    /// Whether the channel is sampled and logged
    pub enabled: bool,

    /// Whether this channel drives the logging trigger
    pub is_trigger: bool,

    /// Calibration constants
    pub calibration: Calibration,

    /// Last raw count taken from the sampler buffer
    pub raw: u16,

    /// Last processed value
    pub processed: ScaledValue,
}

impl AnalogChannel {
    /// Create an enabled channel
    pub fn new(name: impl Into<String>, calibration: Calibration) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            calibration,
            ..Self::default()
        }
    }

    /// Latch a raw sample and recompute the processed value
    pub fn process(&mut self, raw: u16) {
        self.raw = raw;
        self.processed = self.calibration.scale(raw);
    }

    /// Processed fixed-point value
    pub fn fixed(&self) -> i32 {
        self.processed.fixed
    }

    /// Decimal scale of [`fixed`](Self::fixed)
    pub fn precision(&self) -> u16 {
        self.calibration.precision
    }
}
