//! Per-session log record

use serde::Serialize;

use crate::acquisition::AcquisitionError;
use crate::channel::{ChannelRegistry, TriggerRef};
use crate::config::{ConfigError, LoggerConfig};

/// Elapsed logging time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Timestamp {
    /// Whole seconds
    pub seconds: u32,
    /// Milliseconds past `seconds`, a multiple of the tick period
    pub subseconds: u16,
}

impl Timestamp {
    /// Create a timestamp
    pub fn new(seconds: u32, subseconds: u16) -> Self {
        Self {
            seconds,
            subseconds,
        }
    }

    /// Advance by one tick of `step_ms`, carrying into seconds at 1000 ms
    pub fn advance(&mut self, step_ms: u16) {
        if u32::from(self.subseconds) + u32::from(step_ms) < 1000 {
            self.subseconds += step_ms;
        } else {
            self.subseconds = 0;
            self.seconds = self.seconds.wrapping_add(1);
        }
    }

    /// Pack into one word for atomic storage
    pub fn pack(self) -> u64 {
        (u64::from(self.seconds) << 16) | u64::from(self.subseconds)
    }

    /// Inverse of [`Timestamp::pack`]
    pub fn unpack(word: u64) -> Self {
        Self {
            seconds: (word >> 16) as u32,
            subseconds: (word & 0xFFFF) as u16,
        }
    }
}

/// Session-scoped record: trigger binding, threshold and destination
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    /// Elapsed time of the current row
    pub timestamp: Timestamp,
    /// Signal the state machine compares against the threshold
    pub trigger: TriggerRef,
    /// Configured threshold in engineering units
    pub threshold: i32,
    /// Threshold in the trigger's fixed-point units
    pub threshold_value: i32,
    /// Destination file name
    pub file_name: String,
}

impl LogRecord {
    /// Bind the trigger and compute the comparison value.
    ///
    /// Fails when no enabled channel carries a trigger flag.
    pub fn bind(config: &LoggerConfig, registry: &ChannelRegistry) -> Result<Self, AcquisitionError> {
        let trigger = registry.select_trigger().ok_or(AcquisitionError::NoTrigger)?;
        let precision = registry.trigger_precision(trigger).unwrap_or(1);

        let threshold_value = config
            .threshold
            .checked_mul(i32::from(precision))
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "threshold".to_string(),
                message: format!("{} x precision {precision} overflows", config.threshold),
            })?;

        tracing::info!(
            %trigger,
            threshold = config.threshold,
            threshold_value,
            "Trigger bound"
        );

        Ok(Self {
            timestamp: Timestamp::default(),
            trigger,
            threshold: config.threshold,
            threshold_value,
            file_name: config.file_name.clone(),
        })
    }

    /// Current trigger value, zero if the bound channel is gone
    pub fn trigger_value(&self, registry: &ChannelRegistry) -> i32 {
        registry.trigger_value(self.trigger).unwrap_or_default()
    }
}
