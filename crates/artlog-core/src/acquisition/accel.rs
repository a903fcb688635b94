//! Accelerometer sampling
//!
//! The transport driver runs transactions asynchronously and reports their
//! completion through [`TransactionFlags`]. Data-ready readings arrive in m/s²
//! through a latch; the sampling loop converts them to milli-g.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use super::AcquisitionError;
use crate::config::{AccelerometerSettings, RecoveryPolicy};
use crate::latch::LatchReader;

/// Standard gravity used for the milli-g conversion
pub const STANDARD_GRAVITY: f32 = 9.81;

/// Convert m/s² to milli-g, truncating toward zero
pub fn to_milli_g(accel: f32) -> i16 {
    ((accel / STANDARD_GRAVITY) * 1000.0) as i16
}

#[derive(Debug, Default)]
struct FlagState {
    done: AtomicBool,
    error: AtomicU8,
}

/// Completion flags shared between the driver and the sampling loop
#[derive(Debug, Clone, Default)]
pub struct TransactionFlags {
    state: Arc<FlagState>,
}

impl TransactionFlags {
    /// New flags, nothing pending
    pub fn new() -> Self {
        Self::default()
    }

    /// Driver side: a transaction finished with `status` (0 = success)
    pub fn complete(&self, status: u8) {
        if status != 0 {
            self.state.error.store(status, Ordering::Release);
        } else {
            self.state.done.store(true, Ordering::Release);
        }
    }

    /// Clear the completion mark before starting a transaction
    pub fn arm(&self) {
        self.state.done.store(false, Ordering::Release);
    }

    /// Pending error status, if any
    pub fn error_status(&self) -> Option<u8> {
        match self.state.error.load(Ordering::Acquire) {
            0 => None,
            status => Some(status),
        }
    }

    /// Clear a reported error
    pub fn clear_error(&self) {
        self.state.error.store(0, Ordering::Release);
    }

    /// Wait until the armed transaction completes or fails, at most `timeout`
    pub fn wait(&self, timeout: Duration) -> Result<(), AcquisitionError> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(status) = self.error_status() {
                return Err(AcquisitionError::TransactionFailed(status));
            }
            if self.state.done.load(Ordering::Acquire) {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AcquisitionError::TransactionTimeout(timeout));
            }
            thread::yield_now();
        }
    }
}

/// Configuration transactions issued at startup, in order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitStep {
    /// Wake the device and reset its registers
    Init,
    /// Low-pass filter bandwidth and full-scale range
    Configure,
    /// Data-ready interrupt pin setup
    EnableDataReady,
}

impl InitStep {
    /// All steps in issue order
    pub const SEQUENCE: [InitStep; 3] = [InitStep::Init, InitStep::Configure, InitStep::EnableDataReady];
}

/// Accelerometer transport collaborator
pub trait AccelerometerDriver: Send {
    /// Start an initialization transaction; signal completion on `flags`
    fn begin(&mut self, step: InitStep, flags: &TransactionFlags);

    /// Reset the device before re-initializing it
    fn reset(&mut self) {}
}

/// Accelerometer as seen by the sampling loop
pub struct Accelerometer {
    driver: Box<dyn AccelerometerDriver>,
    flags: TransactionFlags,
    readings: LatchReader<[f32; 3]>,
    last: [i16; 3],
    timeout: Duration,
    recovery: RecoveryPolicy,
}

impl Accelerometer {
    /// Bind a driver to the readings latch it publishes into
    pub fn new(
        driver: Box<dyn AccelerometerDriver>,
        readings: LatchReader<[f32; 3]>,
        settings: &AccelerometerSettings,
    ) -> Self {
        Self {
            driver,
            flags: TransactionFlags::new(),
            readings,
            last: [0; 3],
            timeout: Duration::from_millis(settings.transaction_timeout_ms),
            recovery: settings.recovery,
        }
    }

    /// Run the three configuration transactions
    pub fn initialize(&mut self) -> Result<(), AcquisitionError> {
        self.flags.clear_error();
        for step in InitStep::SEQUENCE {
            self.flags.arm();
            self.driver.begin(step, &self.flags);
            self.flags.wait(self.timeout).inspect_err(|e| {
                tracing::error!(?step, "Accelerometer init failed: {e}");
            })?;
            tracing::trace!(?step, "Accelerometer init step complete");
        }
        tracing::debug!("Accelerometer initialized");
        Ok(())
    }

    /// Latest reading in milli-g.
    ///
    /// Holds the previous reading when no new data arrived. A pending
    /// transaction error is reported and handled per the recovery policy.
    pub fn sample(&mut self) -> [i16; 3] {
        if let Some(reading) = self.readings.take() {
            self.last = reading.map(to_milli_g);
        }
        tracing::debug!(
            x = self.last[0],
            y = self.last[1],
            z = self.last[2],
            "Accel (milli-g)"
        );

        if let Some(status) = self.flags.error_status() {
            tracing::error!("Accelerometer transaction error {status:#04x}");
            self.recover();
        }
        self.last
    }

    /// Transaction flags handed to the driver
    pub fn flags(&self) -> &TransactionFlags {
        &self.flags
    }

    fn recover(&mut self) {
        let RecoveryPolicy::Restart { max_attempts } = self.recovery else {
            return;
        };
        for attempt in 1..=max_attempts {
            tracing::warn!(attempt, "Restarting accelerometer");
            self.driver.reset();
            match self.initialize() {
                Ok(()) => return,
                Err(e) => tracing::warn!(attempt, "Accelerometer restart failed: {e}"),
            }
        }
        tracing::error!("Accelerometer recovery gave up after {max_attempts} attempts");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::latch::latch;
    use std::sync::Mutex;

    /// Driver that completes steps immediately with scripted statuses
    struct Scripted {
        statuses: Arc<Mutex<Vec<u8>>>,
        resets: Arc<AtomicU8>,
    }

    impl AccelerometerDriver for Scripted {
        fn begin(&mut self, _step: InitStep, flags: &TransactionFlags) {
            let mut statuses = self.statuses.lock().unwrap();
            if !statuses.is_empty() {
                flags.complete(statuses.remove(0));
            }
        }

        fn reset(&mut self) {
            self.resets.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn settings(recovery: RecoveryPolicy) -> AccelerometerSettings {
        AccelerometerSettings {
            transaction_timeout_ms: 20,
            recovery,
        }
    }

    #[test]
    fn test_milli_g() {
        assert_eq!(to_milli_g(9.81), 1000);
        assert_eq!(to_milli_g(-19.62), -2000);
        assert_eq!(to_milli_g(0.0), 0);
    }

    #[test]
    fn test_init_sequence() {
        let (_tx, rx) = latch([0.0f32; 3]);
        let statuses = Arc::new(Mutex::new(vec![0, 0, 0]));
        let driver = Scripted {
            statuses: Arc::clone(&statuses),
            resets: Arc::default(),
        };
        let mut accel = Accelerometer::new(Box::new(driver), rx, &settings(RecoveryPolicy::Disabled));
        accel.initialize().unwrap();
        assert!(statuses.lock().unwrap().is_empty());
    }

    #[test]
    fn test_init_timeout_is_fatal() {
        let (_tx, rx) = latch([0.0f32; 3]);
        let driver = Scripted {
            statuses: Arc::new(Mutex::new(vec![0])),
            resets: Arc::default(),
        };
        let mut accel = Accelerometer::new(Box::new(driver), rx, &settings(RecoveryPolicy::Disabled));
        let err = accel.initialize().unwrap_err();
        assert!(matches!(err, AcquisitionError::TransactionTimeout(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_sample_holds_and_converts() {
        let (tx, rx) = latch([0.0f32; 3]);
        let driver = Scripted {
            statuses: Arc::default(),
            resets: Arc::default(),
        };
        let mut accel = Accelerometer::new(Box::new(driver), rx, &settings(RecoveryPolicy::Disabled));

        tx.publish([9.81, -9.81, 19.62]);
        assert_eq!(accel.sample(), [1000, -1000, 2000]);
        assert_eq!(accel.sample(), [1000, -1000, 2000]);
    }

    #[test]
    fn test_error_triggers_restart() {
        let (_tx, rx) = latch([0.0f32; 3]);
        let resets = Arc::new(AtomicU8::new(0));
        let driver = Scripted {
            statuses: Arc::new(Mutex::new(vec![0, 0, 0])),
            resets: Arc::clone(&resets),
        };
        let mut accel = Accelerometer::new(
            Box::new(driver),
            rx,
            &settings(RecoveryPolicy::Restart { max_attempts: 2 }),
        );

        accel.flags().complete(7);
        accel.sample();
        assert_eq!(resets.load(Ordering::SeqCst), 1);
        assert_eq!(accel.flags().error_status(), None);
    }

    #[test]
    fn test_error_without_recovery_keeps_running() {
        let (_tx, rx) = latch([0.0f32; 3]);
        let resets = Arc::new(AtomicU8::new(0));
        let driver = Scripted {
            statuses: Arc::default(),
            resets: Arc::clone(&resets),
        };
        let mut accel = Accelerometer::new(Box::new(driver), rx, &settings(RecoveryPolicy::Disabled));
        accel.flags().complete(3);
        assert_eq!(accel.sample(), [0, 0, 0]);
        assert_eq!(resets.load(Ordering::SeqCst), 0);
        assert_eq!(accel.flags().error_status(), Some(3));
    }
}
