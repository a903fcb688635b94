//! Acquisition Scheduler
//!
//! Wires the data sources to the sampling loop and runs logging sessions.
//!
//! ## Architecture
//!
//! ```text
//! Ticker ──► TickClock ─┐
//! sampler ─► latch ─────┤
//! GPS ─────► latch ─────┼──► Acquisition ──► DataLogger ──► Storage
//! CAN ─────► mailbox ───┤
//! accel ───► latch ─────┘
//! ```

mod accel;
mod clock;
mod error;
mod scheduler;
mod sources;

pub use accel::{to_milli_g, Accelerometer, AccelerometerDriver, InitStep, TransactionFlags, STANDARD_GRAVITY};
pub use clock::{tick_clock, TickClock, Ticker};
pub use error::AcquisitionError;
pub use scheduler::{Acquisition, SessionEnd, SessionSummary, TickReport};
pub use sources::{wire, AnalogBuffer, AnalogSampler, Producers, SampleInputs, StopHandle};
