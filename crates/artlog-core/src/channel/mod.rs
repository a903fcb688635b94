//! Channel Registry
//!
//! Fixed-capacity, index-addressed tables of analog and CAN channels.
//!
//! Wiring (enabled flags, names, calibration) is established once from the
//! logger configuration before sampling starts and is not changed afterwards.
//! Disabled slots are skipped by scaling, trigger selection and serialization.

mod analog;
mod can;
mod registry;

pub use analog::AnalogChannel;
pub use can::{CanChannel, CanSignal};
pub use registry::{ChannelRegistry, TriggerRef};

/// Number of analog input slots
pub const ANALOG_CHANNEL_COUNT: usize = 16;

/// Number of CAN message slots
pub const CAN_CHANNEL_COUNT: usize = 16;

/// 16-bit sub-signals carried by one CAN message slot
pub const SIGNALS_PER_FRAME: usize = 4;
