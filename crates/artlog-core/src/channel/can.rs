//! CAN channel descriptor

use serde::Serialize;

use super::SIGNALS_PER_FRAME;
use crate::scaling::{Calibration, ScaledValue};

/// One 16-bit signal inside a CAN message
#[derive(Debug, Clone, Default, Serialize)]
pub struct CanSignal {
    /// Column name written in the CSV header
    pub name: String,

    /// Whether this signal drives the logging trigger
    pub is_trigger: bool,

    /// Calibration constants
    pub calibration: Calibration,

    /// Last decoded raw value
    pub raw: u16,

    /// Last processed value
    pub processed: ScaledValue,
}

impl CanSignal {
    /// Create a signal
    pub fn new(name: impl Into<String>, calibration: Calibration) -> Self {
        Self {
            name: name.into(),
            calibration,
            ..Self::default()
        }
    }

    /// Recompute the processed value from the current raw value
    pub fn process(&mut self) {
        self.processed = self.calibration.scale(self.raw);
    }
}

/// One CAN message slot with its four sub-signals
#[derive(Debug, Clone, Default, Serialize)]
pub struct CanChannel {
    /// Message identifier this slot is registered for
    pub message_id: u32,

    /// Acceptance mask applied to both IDs before comparing
    pub id_mask: u32,

    /// Whether the slot is registered, decoded and logged
    pub enabled: bool,

    /// Sub-signals, in payload order
    pub signals: [CanSignal; SIGNALS_PER_FRAME],
}

impl CanChannel {
    /// Create an enabled slot
    pub fn new(message_id: u32, id_mask: u32, signals: [CanSignal; SIGNALS_PER_FRAME]) -> Self {
        Self {
            message_id,
            id_mask,
            enabled: true,
            signals,
        }
    }

    /// Store freshly decoded raw values
    pub fn load_raw(&mut self, raw: [u16; SIGNALS_PER_FRAME]) {
        for (signal, value) in self.signals.iter_mut().zip(raw) {
            signal.raw = value;
        }
    }

    /// Current raw values of all signals
    pub fn raw(&self) -> [u16; SIGNALS_PER_FRAME] {
        std::array::from_fn(|i| self.signals[i].raw)
    }

    /// Rescale every signal from its current raw value
    pub fn process(&mut self) {
        for signal in &mut self.signals {
            signal.process();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_all_signals() {
        let mut ch = CanChannel::new(0x100, 0xFFFFF, Default::default());
        ch.signals[2].calibration = Calibration::new(0.5, 10, 0, 0);
        ch.load_raw([1, 2, 300, 4]);
        ch.process();

        assert_eq!(ch.raw(), [1, 2, 300, 4]);
        assert_eq!(ch.signals[0].processed.fixed, 1);
        assert_eq!(ch.signals[2].processed.fixed, 1500);
        assert_eq!(ch.signals[2].processed.value, 150.0);
    }
}
