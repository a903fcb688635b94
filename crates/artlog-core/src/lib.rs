//! # ART Logger Core Library
//!
//! Acquisition and logging pipeline for the ART vehicle telemetry logger.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - A fixed 16 analog + 16 CAN channel registry with calibration
//! - The fixed-point scaling engine
//! - `$GPRMC` sentence parsing with hold-last-good fix tracking
//! - CAN frame matching and big-endian signal decoding
//! - The threshold-driven logging state machine
//! - Fixed-point CSV serialization onto a pluggable storage backend
//!
//! ## Example
//!
//! ```rust,ignore
//! use artlog_core::prelude::*;
//!
//! let config = LoggerConfig::load("logger.json")?;
//! let (sources, inputs) = acquisition::wire(&config);
//! let (ticker, clock) = tick_clock(config.tick_period_ms);
//!
//! let mut acquisition = Acquisition::new(config, clock, inputs, sampler, accel, storage);
//! let summaries = acquisition.run()?;
//! ```

pub mod acquisition;
pub mod can;
pub mod channel;
pub mod config;
pub mod datalog;
pub mod demo;
pub mod gps;
pub mod latch;
pub mod scaling;
pub mod session;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::acquisition::{
        self, tick_clock, Accelerometer, AccelerometerDriver, Acquisition, AcquisitionError,
        AnalogSampler, SampleInputs, SessionEnd, SessionSummary, StopHandle, TickClock, Ticker,
    };
    pub use crate::can::{CanBus, CanFrame, CanMailbox};
    pub use crate::channel::{AnalogChannel, CanChannel, ChannelRegistry, TriggerRef};
    pub use crate::config::{LoggerConfig, RecoveryPolicy};
    pub use crate::datalog::{DataLogger, FileStorage, MemoryStorage, Storage, StorageError};
    pub use crate::gps::{FixTracker, GpsFix, SentenceFramer};
    pub use crate::scaling::{Calibration, ScaledValue};
    pub use crate::session::{LogRecord, LoggerState, StateMachine, Timestamp, Transition};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
