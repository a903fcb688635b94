//! Owned channel tables

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{
    AnalogChannel, CanChannel, CanSignal, ANALOG_CHANNEL_COUNT, CAN_CHANNEL_COUNT,
    SIGNALS_PER_FRAME,
};
use crate::config::LoggerConfig;

/// Reference to the signal that drives the logging trigger.
///
/// Resolved against the registry on every tick rather than holding a pointer
/// into a channel's processed value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerRef {
    /// Analog channel by index
    Analog(usize),
    /// CAN channel sub-signal
    Can {
        /// Slot index
        channel: usize,
        /// Sub-signal index
        signal: usize,
    },
}

impl fmt::Display for TriggerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerRef::Analog(idx) => write!(f, "analog[{idx}]"),
            TriggerRef::Can { channel, signal } => write!(f, "can[{channel}].{signal}"),
        }
    }
}

/// All analog and CAN channels of the logger
#[derive(Debug, Clone)]
pub struct ChannelRegistry {
    analog: [AnalogChannel; ANALOG_CHANNEL_COUNT],
    can: [CanChannel; CAN_CHANNEL_COUNT],
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelRegistry {
    /// Create a registry with every slot disabled
    pub fn new() -> Self {
        Self {
            analog: std::array::from_fn(|idx| AnalogChannel {
                name: default_analog_name(idx),
                ..AnalogChannel::default()
            }),
            can: std::array::from_fn(|idx| CanChannel {
                signals: std::array::from_fn(|sig| CanSignal {
                    name: default_can_name(idx, sig),
                    ..CanSignal::default()
                }),
                ..CanChannel::default()
            }),
        }
    }

    /// Build the registry wiring described by a (validated) configuration
    pub fn from_config(config: &LoggerConfig) -> Self {
        let mut registry = Self::new();

        for entry in &config.analog {
            let Some(channel) = registry.analog.get_mut(entry.index) else {
                continue;
            };
            if !entry.name.is_empty() {
                channel.name = entry.name.clone();
            }
            channel.enabled = true;
            channel.is_trigger = entry.trigger;
            channel.calibration = entry.calibration;
        }

        for entry in &config.can {
            let Some(channel) = registry.can.get_mut(entry.index) else {
                continue;
            };
            channel.message_id = entry.message_id;
            channel.id_mask = entry.id_mask;
            channel.enabled = true;

            for (slot, signal) in channel.signals.iter_mut().zip(&entry.signals) {
                if !signal.name.is_empty() {
                    slot.name = signal.name.clone();
                }
                slot.is_trigger = signal.trigger;
                slot.calibration = signal.calibration;
            }
        }

        registry
    }

    /// Analog channel by index
    pub fn analog(&self, idx: usize) -> Option<&AnalogChannel> {
        self.analog.get(idx)
    }

    /// Mutable analog channel by index
    pub fn analog_mut(&mut self, idx: usize) -> Option<&mut AnalogChannel> {
        self.analog.get_mut(idx)
    }

    /// CAN channel by index
    pub fn can(&self, idx: usize) -> Option<&CanChannel> {
        self.can.get(idx)
    }

    /// Mutable CAN channel by index
    pub fn can_mut(&mut self, idx: usize) -> Option<&mut CanChannel> {
        self.can.get_mut(idx)
    }

    /// Enabled analog channels with their indices, in index order
    pub fn enabled_analog(&self) -> impl Iterator<Item = (usize, &AnalogChannel)> {
        self.analog.iter().enumerate().filter(|(_, ch)| ch.enabled)
    }

    /// Enabled CAN channels with their indices, in index order
    pub fn enabled_can(&self) -> impl Iterator<Item = (usize, &CanChannel)> {
        self.can.iter().enumerate().filter(|(_, ch)| ch.enabled)
    }

    /// Scale every enabled analog channel from the sampler buffer
    pub fn scale_analog(&mut self, raw: &[u16; ANALOG_CHANNEL_COUNT]) {
        for (channel, &value) in self.analog.iter_mut().zip(raw) {
            if channel.enabled {
                channel.process(value);
            }
        }
    }

    /// Rescale all four signals of every enabled CAN channel
    pub fn scale_can(&mut self) {
        for channel in self.can.iter_mut().filter(|ch| ch.enabled) {
            channel.process();
        }
    }

    /// Pick the trigger signal.
    ///
    /// Analog channels are scanned before CAN channels and the last enabled
    /// signal with its trigger flag set wins. Overridden candidates are
    /// reported as warnings.
    pub fn select_trigger(&self) -> Option<TriggerRef> {
        let analog = self
            .enabled_analog()
            .filter(|(_, ch)| ch.is_trigger)
            .map(|(idx, _)| TriggerRef::Analog(idx));

        let can = self.enabled_can().flat_map(|(channel, ch)| {
            ch.signals
                .iter()
                .enumerate()
                .filter(|(_, sig)| sig.is_trigger)
                .map(move |(signal, _)| TriggerRef::Can { channel, signal })
        });

        let mut selected = None;
        for candidate in analog.chain(can) {
            if let Some(previous) = selected.replace(candidate) {
                tracing::warn!("Trigger {previous} overridden by {candidate}");
            }
        }
        selected
    }

    /// Current processed value of a trigger, if its channel is enabled
    pub fn trigger_value(&self, trigger: TriggerRef) -> Option<i32> {
        match trigger {
            TriggerRef::Analog(idx) => self
                .analog(idx)
                .filter(|ch| ch.enabled)
                .map(|ch| ch.processed.fixed),
            TriggerRef::Can { channel, signal } => self
                .can(channel)
                .filter(|ch| ch.enabled)
                .and_then(|ch| ch.signals.get(signal))
                .map(|sig| sig.processed.fixed),
        }
    }

    /// Precision of a trigger's fixed-point value
    pub fn trigger_precision(&self, trigger: TriggerRef) -> Option<u16> {
        match trigger {
            TriggerRef::Analog(idx) => self.analog(idx).map(|ch| ch.calibration.precision),
            TriggerRef::Can { channel, signal } => self
                .can(channel)
                .and_then(|ch| ch.signals.get(signal))
                .map(|sig| sig.calibration.precision),
        }
    }

    /// Number of enabled analog channels
    pub fn enabled_analog_count(&self) -> usize {
        self.enabled_analog().count()
    }

    /// Number of enabled CAN channels
    pub fn enabled_can_count(&self) -> usize {
        self.enabled_can().count()
    }
}

fn default_analog_name(idx: usize) -> String {
    format!("AIN{}", idx + 1)
}

fn default_can_name(idx: usize, signal: usize) -> String {
    debug_assert!(signal < SIGNALS_PER_FRAME);
    format!("CAN{}_{}", idx + 1, signal + 1)
}
