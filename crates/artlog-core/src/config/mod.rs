//! Logger configuration
//!
//! Channel wiring, calibration and session settings, stored as JSON.
//! Everything here is read once during setup; nothing is reconfigured while
//! the sampling loop runs.

mod error;

pub use error::ConfigError;

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::channel::{ANALOG_CHANNEL_COUNT, CAN_CHANNEL_COUNT, SIGNALS_PER_FRAME};
use crate::scaling::Calibration;

/// Tag of the only sentence type the fix tracker accepts
pub const DEFAULT_SENTENCE_TAG: &str = "$GPRMC";

/// Validity flag of an active fix
pub const DEFAULT_VALID_FLAG: &str = "A";

/// Acceptance mask used when a CAN channel does not specify one
pub const DEFAULT_CAN_ID_MASK: u32 = 0xFFFFF;

/// Top-level logger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Sampling tick period in milliseconds (must divide 1000)
    pub tick_period_ms: u16,

    /// Trigger threshold, in engineering units of the trigger signal
    pub threshold: i32,

    /// Destination CSV file name
    pub file_name: String,

    /// GPS sentence settings
    pub gps: GpsSettings,

    /// Accelerometer settings
    pub accelerometer: AccelerometerSettings,

    /// Enabled analog channels
    pub analog: Vec<AnalogChannelConfig>,

    /// Enabled CAN channels
    pub can: Vec<CanChannelConfig>,
}

/// GPS sentence acceptance settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GpsSettings {
    /// Sentence tag that carries a usable fix
    pub expected_tag: String,

    /// Validity field value of an active fix
    pub valid_flag: String,
}

impl Default for GpsSettings {
    fn default() -> Self {
        Self {
            expected_tag: DEFAULT_SENTENCE_TAG.to_string(),
            valid_flag: DEFAULT_VALID_FLAG.to_string(),
        }
    }
}

/// Accelerometer transaction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AccelerometerSettings {
    /// Upper bound on a single sensor transaction
    pub transaction_timeout_ms: u64,

    /// What to do when a transaction reports an error while sampling
    pub recovery: RecoveryPolicy,
}

impl Default for AccelerometerSettings {
    fn default() -> Self {
        Self {
            transaction_timeout_ms: 500,
            recovery: RecoveryPolicy::Disabled,
        }
    }
}

/// Sensor recovery strategy after a transaction error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RecoveryPolicy {
    /// Report and keep using the last readings
    #[default]
    Disabled,
    /// Reset the sensor and rerun its initialization sequence
    Restart {
        /// Restarts allowed per session
        max_attempts: u32,
    },
}

/// An enabled analog channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalogChannelConfig {
    /// Slot index (0..16)
    pub index: usize,

    /// Column name; `AIN<n>` when empty
    #[serde(default)]
    pub name: String,

    /// Calibration constants
    #[serde(flatten)]
    pub calibration: Calibration,

    /// Use this channel as the logging trigger
    #[serde(default)]
    pub trigger: bool,
}

/// An enabled CAN message slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanChannelConfig {
    /// Slot index (0..16)
    pub index: usize,

    /// Message identifier
    pub message_id: u32,

    /// Acceptance mask
    #[serde(default = "default_id_mask")]
    pub id_mask: u32,

    /// Up to four signals in payload order; missing ones use identity calibration
    #[serde(default)]
    pub signals: Vec<CanSignalConfig>,
}

/// One signal of a CAN slot
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CanSignalConfig {
    /// Column name; `CAN<n>_<m>` when empty
    #[serde(default)]
    pub name: String,

    /// Calibration constants
    #[serde(flatten)]
    pub calibration: Calibration,

    /// Use this signal as the logging trigger
    #[serde(default)]
    pub trigger: bool,
}

fn default_id_mask() -> u32 {
    DEFAULT_CAN_ID_MASK
}

impl Default for LoggerConfig {
    /// Bench setup: analog input 1 enabled as the trigger, threshold 300
    fn default() -> Self {
        Self {
            tick_period_ms: 10,
            threshold: 300,
            file_name: "artlog.csv".to_string(),
            gps: GpsSettings::default(),
            accelerometer: AccelerometerSettings::default(),
            analog: vec![AnalogChannelConfig {
                index: 0,
                name: "AIN1".to_string(),
                calibration: Calibration::default(),
                trigger: true,
            }],
            can: Vec::new(),
        }
    }
}

impl LoggerConfig {
    /// Load and validate a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a configuration from JSON text
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: LoggerConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }

    /// Check the wiring against the fixed channel capacity
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_period_ms == 0 || 1000 % self.tick_period_ms != 0 {
            return Err(ConfigError::InvalidValue {
                field: "tick_period_ms".to_string(),
                message: format!("{} does not divide one second", self.tick_period_ms),
            });
        }

        if self.file_name.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "file_name".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let mut seen = HashSet::new();
        for ch in &self.analog {
            if ch.index >= ANALOG_CHANNEL_COUNT {
                return Err(ConfigError::IndexOutOfRange {
                    kind: "Analog",
                    index: ch.index,
                    limit: ANALOG_CHANNEL_COUNT,
                });
            }
            if !seen.insert(ch.index) {
                return Err(ConfigError::DuplicateIndex {
                    kind: "Analog",
                    index: ch.index,
                });
            }
            check_precision(&format!("analog[{}].precision", ch.index), &ch.calibration)?;
        }

        seen.clear();
        for ch in &self.can {
            if ch.index >= CAN_CHANNEL_COUNT {
                return Err(ConfigError::IndexOutOfRange {
                    kind: "CAN",
                    index: ch.index,
                    limit: CAN_CHANNEL_COUNT,
                });
            }
            if !seen.insert(ch.index) {
                return Err(ConfigError::DuplicateIndex {
                    kind: "CAN",
                    index: ch.index,
                });
            }
            if ch.signals.len() > SIGNALS_PER_FRAME {
                return Err(ConfigError::TooManySignals {
                    index: ch.index,
                    count: ch.signals.len(),
                });
            }
            for (sig, signal) in ch.signals.iter().enumerate() {
                check_precision(
                    &format!("can[{}].signals[{sig}].precision", ch.index),
                    &signal.calibration,
                )?;
            }
        }

        Ok(())
    }
}

fn check_precision(field: &str, calibration: &Calibration) -> Result<(), ConfigError> {
    if calibration.precision == 0 {
        return Err(ConfigError::InvalidValue {
            field: field.to_string(),
            message: "precision must be at least 1".to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = LoggerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.threshold, 300);
        assert!(config.analog[0].trigger);
    }

    #[test]
    fn test_parse_minimal() {
        let config = LoggerConfig::from_json(
            r#"{
                "threshold": 50,
                "analog": [
                    { "index": 3, "name": "Oil", "multiplier": 0.5, "precision": 100, "trigger": true }
                ],
                "can": [
                    { "index": 0, "message_id": 512, "signals": [ { "name": "RPM" } ] }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(config.tick_period_ms, 10);
        assert_eq!(config.analog[0].calibration.precision, 100);
        assert_eq!(config.analog[0].calibration.min_bit, 0);
        assert_eq!(config.can[0].id_mask, DEFAULT_CAN_ID_MASK);
        assert_eq!(config.can[0].signals[0].calibration, Calibration::default());
        assert_eq!(config.accelerometer.recovery, RecoveryPolicy::Disabled);
    }

    #[test]
    fn test_recovery_policy_json() {
        let config = LoggerConfig::from_json(
            r#"{ "accelerometer": { "recovery": { "mode": "restart", "max_attempts": 3 } } }"#,
        )
        .unwrap();
        assert_eq!(
            config.accelerometer.recovery,
            RecoveryPolicy::Restart { max_attempts: 3 }
        );
    }

    #[test]
    fn test_rejects_bad_wiring() {
        let err = LoggerConfig::from_json(r#"{ "analog": [ { "index": 16 } ] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::IndexOutOfRange { index: 16, .. }));

        let err = LoggerConfig::from_json(r#"{ "analog": [ { "index": 1 }, { "index": 1 } ] }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateIndex { index: 1, .. }));

        let err = LoggerConfig::from_json(
            r#"{ "can": [ { "index": 0, "message_id": 1, "signals": [{}, {}, {}, {}, {}] } ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::TooManySignals { count: 5, .. }));

        let err = LoggerConfig::from_json(r#"{ "analog": [ { "index": 0, "precision": 0 } ] }"#)
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));

        let err = LoggerConfig::from_json(r#"{ "tick_period_ms": 7 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
