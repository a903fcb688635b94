//! Producer wiring
//!
//! Every data source publishes into its own latch. [`wire`] creates the
//! producer halves handed to the sources and the [`SampleInputs`] consumed by
//! the sampling loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::can::{mailbox, CanBus, CanMailbox};
use crate::channel::{ChannelRegistry, ANALOG_CHANNEL_COUNT};
use crate::config::LoggerConfig;
use crate::latch::{latch, LatchReader, LatchWriter};

/// Raw sampler buffer, one slot per analog channel
pub type AnalogBuffer = [u16; ANALOG_CHANNEL_COUNT];

/// Analog sampler collaborator.
///
/// A conversion started by [`start_conversion`](Self::start_conversion)
/// publishes its 16-slot buffer into the analog latch when it completes.
pub trait AnalogSampler: Send {
    /// Enable the sampler before a session
    fn start(&mut self) {}

    /// Start one conversion of all channels
    fn start_conversion(&mut self);

    /// Disable the sampler after a session
    fn stop(&mut self) {}
}

/// Producer halves, one per data source
pub struct Producers {
    /// Analog conversion results
    pub analog: LatchWriter<AnalogBuffer>,
    /// Complete GPS sentences
    pub gps: LatchWriter<String>,
    /// CAN reception
    pub can: CanBus,
    /// Accelerometer readings in m/s²
    pub accel: LatchWriter<[f32; 3]>,
}

/// Consumer halves owned by the sampling loop
pub struct SampleInputs {
    pub(super) analog: LatchReader<AnalogBuffer>,
    pub(super) gps: LatchReader<String>,
    pub(super) can: CanMailbox,
    pub(super) accel: LatchReader<[f32; 3]>,
}

/// Create the latches for every source described by `config`
pub fn wire(config: &LoggerConfig) -> (Producers, SampleInputs) {
    let registry = ChannelRegistry::from_config(config);
    let (analog_tx, analog_rx) = latch([0; ANALOG_CHANNEL_COUNT]);
    let (gps_tx, gps_rx) = latch(String::new());
    let (can_bus, can_mailbox) = mailbox(&registry);
    let (accel_tx, accel_rx) = latch([0.0; 3]);

    (
        Producers {
            analog: analog_tx,
            gps: gps_tx,
            can: can_bus,
            accel: accel_tx,
        },
        SampleInputs {
            analog: analog_rx,
            gps: gps_rx,
            can: can_mailbox,
            accel: accel_rx,
        },
    )
}

/// Requests an explicit end of logging
#[derive(Debug, Clone, Default)]
pub struct StopHandle {
    requested: Arc<AtomicBool>,
}

impl StopHandle {
    /// New handle, no stop requested
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to stop on its next tick
    pub fn request_stop(&self) {
        if !self.requested.swap(true, Ordering::AcqRel) {
            tracing::info!("Stop requested");
        }
    }

    /// Whether a stop has been requested
    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::Acquire)
    }
}
