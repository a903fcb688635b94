//! Sampling loop
//!
//! One iteration per observed tick: start a conversion, pull whatever the
//! producers latched since the last tick, scale, evaluate the state machine
//! and append a row while logging. Sessions repeat until a stop request or
//! the clock source closes.

use std::thread;
use std::time::Duration;

use serde::Serialize;

use super::{
    Accelerometer, AccelerometerDriver, AcquisitionError, AnalogBuffer, AnalogSampler,
    SampleInputs, StopHandle, TickClock,
};
use crate::can::CanMailbox;
use crate::channel::{ChannelRegistry, ANALOG_CHANNEL_COUNT};
use crate::config::LoggerConfig;
use crate::datalog::{header_line, row_line, DataLogger, Storage};
use crate::gps::FixTracker;
use crate::latch::LatchReader;
use crate::session::{LogRecord, LoggerState, StateMachine, Transition};

/// Sleep between polls when no tick is pending
const IDLE_BACKOFF: Duration = Duration::from_micros(250);

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionEnd {
    /// Trigger dropped below the exit level; the driver starts a new session
    Threshold,
    /// Explicit stop request
    Stopped,
    /// Tick source shut down
    SourceClosed,
}

/// Statistics of one finished session
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    /// Destination file
    pub file_name: String,
    /// Rows appended
    pub rows_written: u64,
    /// Failed writes
    pub write_failures: u64,
    /// Ticks processed
    pub ticks: u64,
    /// End reason
    pub end: SessionEnd,
}

/// Outcome of one processed tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Processed trigger value
    pub trigger: i32,
    /// State machine decision
    pub transition: Transition,
    /// State after the decision
    pub state: LoggerState,
    /// Whether a CAN bus error was pending
    pub bus_error: bool,
}

/// The acquisition pipeline
pub struct Acquisition<S> {
    config: LoggerConfig,
    registry: ChannelRegistry,
    machine: StateMachine,
    tracker: FixTracker,
    analog: LatchReader<AnalogBuffer>,
    analog_raw: AnalogBuffer,
    gps: LatchReader<String>,
    can: CanMailbox,
    accel: Accelerometer,
    sampler: Box<dyn AnalogSampler>,
    clock: TickClock,
    logger: DataLogger<S>,
    stop: StopHandle,
}

impl<S: Storage> Acquisition<S> {
    /// Assemble the pipeline from a configuration and its collaborators
    pub fn new(
        config: LoggerConfig,
        clock: TickClock,
        inputs: SampleInputs,
        sampler: Box<dyn AnalogSampler>,
        accel_driver: Box<dyn AccelerometerDriver>,
        storage: S,
    ) -> Result<Self, AcquisitionError> {
        config.validate()?;

        let registry = ChannelRegistry::from_config(&config);
        let tracker = FixTracker::new(&config.gps);
        let accel = Accelerometer::new(accel_driver, inputs.accel, &config.accelerometer);

        tracing::info!(
            analog = registry.enabled_analog_count(),
            can = registry.enabled_can_count(),
            tick_ms = config.tick_period_ms,
            "Acquisition configured"
        );

        Ok(Self {
            config,
            registry,
            machine: StateMachine::new(),
            tracker,
            analog: inputs.analog,
            analog_raw: [0; ANALOG_CHANNEL_COUNT],
            gps: inputs.gps,
            can: inputs.can,
            accel,
            sampler,
            clock,
            logger: DataLogger::new(storage),
            stop: StopHandle::new(),
        })
    }

    /// Prepare a session: bind the trigger, zero the elapsed time, bring up
    /// the peripherals and open the log file.
    ///
    /// Accelerometer timeouts and mount/open failures are fatal.
    pub fn setup(&mut self) -> Result<LogRecord, AcquisitionError> {
        let mut record = LogRecord::bind(&self.config, &self.registry)?;
        self.clock.reset_elapsed();
        record.timestamp = self.clock.elapsed();

        if let Err(e) = self.accel.initialize() {
            if e.is_fatal() {
                return Err(e);
            }
            tracing::warn!("Continuing without a configured accelerometer: {e}");
        }

        self.logger
            .open(&record.file_name, &header_line(&self.registry))?;

        self.machine.reset();
        self.sampler.start();
        Ok(record)
    }

    /// Process one tick
    pub fn step(&mut self, record: &mut LogRecord) -> TickReport {
        record.timestamp = self.clock.elapsed();
        self.sampler.start_conversion();

        if let Some(sentence) = self.gps.take() {
            self.tracker.update(&sentence);
        }

        if let Some(raw) = self.analog.take() {
            self.analog_raw = raw;
        }
        self.registry.scale_analog(&self.analog_raw);

        self.can.drain_into(&mut self.registry);
        self.registry.scale_can();

        let accel = self.accel.sample();
        let trigger = record.trigger_value(&self.registry);

        let transition = if self.stop.is_requested() {
            self.machine.stop()
        } else {
            self.machine.evaluate(trigger, record.threshold_value)
        };

        let state = self.machine.state();
        match transition {
            Transition::Idle => tracing::debug!(trigger, "{}", state.label()),
            Transition::Log { entered } => {
                if entered {
                    tracing::info!(trigger, "{}", state.label());
                    self.clock.set_logging(true);
                } else {
                    tracing::debug!(trigger, "{}", state.label());
                }
                let row = row_line(record, self.tracker.current(), accel, &self.registry);
                self.logger.append(&row);
            }
            Transition::Exit | Transition::Stop => {
                tracing::info!(trigger, "{}", state.label());
                self.clock.set_logging(false);
            }
            Transition::Hold => {}
        }

        TickReport {
            trigger,
            transition,
            state,
            bus_error: self.can.bus_error(),
        }
    }

    /// Stop the peripherals and close the log file
    pub fn teardown(&mut self) {
        self.sampler.stop();
        self.logger.close();
        self.clock.set_logging(false);
    }

    /// Run one session until the trigger exit, a stop request or clock closure
    pub fn run_session(&mut self) -> Result<SessionSummary, AcquisitionError> {
        let mut record = self.setup()?;
        let mut ticks = 0u64;

        let end = loop {
            // Closure must be observed before polling so no final tick is lost.
            let closed = self.clock.is_closed();
            if !self.clock.poll() {
                if closed {
                    tracing::info!("Tick source closed");
                    break SessionEnd::SourceClosed;
                }
                thread::sleep(IDLE_BACKOFF);
                continue;
            }

            ticks += 1;
            match self.step(&mut record).transition {
                Transition::Exit => break SessionEnd::Threshold,
                Transition::Stop => break SessionEnd::Stopped,
                _ => {}
            }
        };

        let summary = SessionSummary {
            file_name: record.file_name.clone(),
            rows_written: self.logger.rows_written(),
            write_failures: self.logger.write_failures(),
            ticks,
            end,
        };
        self.teardown();

        tracing::info!(
            rows = summary.rows_written,
            failures = summary.write_failures,
            ticks = summary.ticks,
            end = ?summary.end,
            "Session finished"
        );
        Ok(summary)
    }

    /// Run sessions back to back until one ends for a reason other than
    /// the threshold exit
    pub fn run(&mut self) -> Result<Vec<SessionSummary>, AcquisitionError> {
        let mut summaries = Vec::new();
        loop {
            let summary = self.run_session()?;
            let end = summary.end;
            summaries.push(summary);
            if end != SessionEnd::Threshold {
                return Ok(summaries);
            }
        }
    }

    /// Handle for requesting an explicit stop
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Channel registry with the latest processed values
    pub fn registry(&self) -> &ChannelRegistry {
        &self.registry
    }

    /// Current logger state
    pub fn state(&self) -> LoggerState {
        self.machine.state()
    }

    /// Active configuration
    pub fn config(&self) -> &LoggerConfig {
        &self.config
    }

    /// Session log writer
    pub fn logger(&self) -> &DataLogger<S> {
        &self.logger
    }

    /// Consume the pipeline, returning the storage backend
    pub fn into_storage(self) -> S {
        self.logger.into_storage()
    }
}
