//! End-to-end tests of the sampling loop against in-memory storage

use std::collections::VecDeque;
use std::thread;
use std::time::Duration;

use artlog_core::acquisition::{self, AnalogBuffer, Producers, TickReport};
use artlog_core::config::{AnalogChannelConfig, CanChannelConfig, CanSignalConfig};
use artlog_core::demo::DemoAccelerometer;
use artlog_core::latch::LatchWriter;
use artlog_core::prelude::*;
use pretty_assertions::assert_eq;

/// Publishes the next scripted trigger value on every conversion
struct ScriptedSampler {
    out: LatchWriter<AnalogBuffer>,
    script: VecDeque<u16>,
    last: u16,
}

impl ScriptedSampler {
    fn new(out: LatchWriter<AnalogBuffer>, script: &[u16]) -> Self {
        Self {
            out,
            script: script.iter().copied().collect(),
            last: 0,
        }
    }
}

impl AnalogSampler for ScriptedSampler {
    fn start_conversion(&mut self) {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        let mut buffer = [0u16; 16];
        buffer[0] = self.last;
        buffer[2] = 512;
        self.out.publish(buffer);
    }
}

fn config() -> LoggerConfig {
    let wheel = |name: &str| CanSignalConfig {
        name: name.to_string(),
        ..CanSignalConfig::default()
    };
    LoggerConfig {
        analog: vec![
            AnalogChannelConfig {
                index: 0,
                name: "RPM".to_string(),
                calibration: Calibration::default(),
                trigger: true,
            },
            AnalogChannelConfig {
                index: 2,
                name: "TPS".to_string(),
                calibration: Calibration::new(0.5, 100, 12, -7),
                trigger: false,
            },
        ],
        can: vec![CanChannelConfig {
            index: 0,
            message_id: 0x100,
            id_mask: 0xFFFFF,
            signals: vec![
                wheel("WHEEL_FL"),
                wheel("WHEEL_FR"),
                wheel("WHEEL_RL"),
                wheel("WHEEL_RR"),
            ],
        }],
        ..LoggerConfig::default()
    }
}

struct Rig {
    acquisition: Acquisition<MemoryStorage>,
    ticker: Ticker,
    gps: LatchWriter<String>,
    can: CanBus,
    accel: LatchWriter<[f32; 3]>,
    storage: MemoryStorage,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("artlog_core=debug")
        .with_test_writer()
        .try_init();
}

fn rig(config: LoggerConfig, script: &[u16]) -> Rig {
    init_tracing();
    let (producers, inputs) = acquisition::wire(&config);
    let (ticker, clock) = tick_clock(config.tick_period_ms);
    let Producers {
        analog,
        gps,
        can,
        accel,
    } = producers;
    let storage = MemoryStorage::new();
    let acquisition = Acquisition::new(
        config,
        clock,
        inputs,
        Box::new(ScriptedSampler::new(analog, script)),
        Box::new(DemoAccelerometer),
        storage.clone(),
    )
    .unwrap();

    Rig {
        acquisition,
        ticker,
        gps,
        can,
        accel,
        storage,
    }
}

#[test]
fn test_threshold_session_rows() {
    let mut rig = rig(config(), &[100, 350, 900, 250, 850]);
    let mut record = rig.acquisition.setup().unwrap();
    assert_eq!(record.threshold_value, 300);

    let mut step = |rig: &mut Rig| -> TickReport {
        rig.ticker.tick();
        rig.acquisition.step(&mut record)
    };

    let first = step(&mut rig);
    assert_eq!(first.state, LoggerState::NotLogging);

    rig.gps.publish(
        "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A".to_string(),
    );
    rig.accel.publish([9.81, 0.0, -9.81]);
    let second = step(&mut rig);
    assert_eq!(second.transition, Transition::Log { entered: true });

    rig.gps.publish("$GPRMC,123520,V,0000.000,N,00000.000,E,000.0,,230394,,".to_string());
    rig.can
        .deliver(CanFrame::new(0x100, &[0x00, 0x0A, 0xFF, 0xFF, 0x00, 0x00, 0x80, 0x00]));
    let third = step(&mut rig);
    assert_eq!(third.transition, Transition::Log { entered: false });

    let fourth = step(&mut rig);
    assert_eq!(fourth.transition, Transition::Exit);

    let fifth = step(&mut rig);
    assert_eq!(fifth.transition, Transition::Log { entered: true });

    let states: Vec<_> = [first, second, third, fourth, fifth]
        .iter()
        .map(|r| r.state)
        .collect();
    assert_eq!(
        states,
        vec![
            LoggerState::NotLogging,
            LoggerState::Logging,
            LoggerState::Logging,
            LoggerState::NotLogging,
            LoggerState::Logging,
        ]
    );

    rig.acquisition.teardown();
    assert_eq!(rig.acquisition.logger().rows_written(), 3);

    let expected = concat!(
        "Time,Latitude,Longitude,GPS Speed(knots),ACC_X(G),ACC_Y(G),ACC_Z(G),",
        "RPM,TPS,WHEEL_FL,WHEEL_FR,WHEEL_RL,WHEEL_RR,\n",
        "0.000,4807.038,1131.000,022.4,1.000,0.000,-1.000,",
        "350.000,249.093,0.000,0.000,0.000,0.000,\n",
        "0.010,4807.038,1131.000,022.4,1.000,0.000,-1.000,",
        "900.000,249.093,10.000,65535.000,0.000,32768.000,\n",
        "0.020,4807.038,1131.000,022.4,1.000,0.000,-1.000,",
        "850.000,249.093,10.000,65535.000,0.000,32768.000,\n",
    );
    assert_eq!(rig.storage.contents("artlog.csv"), expected);
}

#[test]
fn test_disabled_channels_never_logged() {
    let mut config = config();
    config.can.clear();
    let mut rig = rig(config, &[500]);
    let mut record = rig.acquisition.setup().unwrap();

    // frame for an unregistered ID is ignored
    assert_eq!(rig.can.deliver(CanFrame::new(0x100, &[1; 8])), None);
    rig.ticker.tick();
    rig.acquisition.step(&mut record);
    rig.acquisition.teardown();

    let text = rig.storage.contents("artlog.csv");
    let mut lines = text.lines();
    assert_eq!(
        lines.next(),
        Some("Time,Latitude,Longitude,GPS Speed(knots),ACC_X(G),ACC_Y(G),ACC_Z(G),RPM,TPS,")
    );
    assert_eq!(lines.next(), Some("0.000,,,,0.000,0.000,0.000,500.000,249.093,"));
    assert_eq!(lines.next(), None);
}

#[test]
fn test_can_trigger_uses_signal_precision() {
    let mut config = config();
    config.analog[0].trigger = false;
    config.threshold = 2;
    config.can[0].signals[1].trigger = true;
    config.can[0].signals[1].calibration = Calibration::new(0.01, 100, 0, 0);

    let mut rig = rig(config, &[0]);
    let mut record = rig.acquisition.setup().unwrap();
    assert_eq!(record.trigger, TriggerRef::Can { channel: 0, signal: 1 });
    assert_eq!(record.threshold_value, 200);

    rig.can.deliver(CanFrame::new(0x100, &[0, 0, 0x01, 0x2C]));
    rig.ticker.tick();
    let report = rig.acquisition.step(&mut record);
    assert_eq!(report.trigger, 300);
    assert_eq!(report.state, LoggerState::Logging);
}

#[test]
fn test_no_trigger_is_a_setup_error() {
    let mut config = config();
    config.analog[0].trigger = false;
    let mut rig = rig(config, &[]);
    let err = rig.acquisition.setup().unwrap_err();
    assert!(matches!(err, AcquisitionError::NoTrigger));
    assert!(err.is_fatal());
}

#[test]
fn test_mount_failure_aborts_setup() {
    init_tracing();
    let config = config();
    let (producers, inputs) = acquisition::wire(&config);
    let (_ticker, clock) = tick_clock(config.tick_period_ms);
    let mut acquisition = Acquisition::new(
        config,
        clock,
        inputs,
        Box::new(ScriptedSampler::new(producers.analog, &[])),
        Box::new(DemoAccelerometer),
        MemoryStorage::unmountable(),
    )
    .unwrap();

    let err = acquisition.run_session().unwrap_err();
    assert!(matches!(err, AcquisitionError::Storage(_)));
}

#[test]
fn test_write_failures_do_not_stop_logging() {
    let mut rig = rig(config(), &[400, 400, 400]);
    let mut record = rig.acquisition.setup().unwrap();

    rig.storage.set_fail_writes(true);
    rig.ticker.tick();
    rig.acquisition.step(&mut record);
    rig.storage.set_fail_writes(false);
    rig.ticker.tick();
    let report = rig.acquisition.step(&mut record);

    assert_eq!(report.state, LoggerState::Logging);
    assert_eq!(rig.acquisition.logger().rows_written(), 1);
    assert_eq!(rig.acquisition.logger().write_failures(), 1);
}

#[test]
fn test_source_closed_processes_pending_tick() {
    let rig = rig(config(), &[100]);
    let Rig {
        mut acquisition,
        ticker,
        storage,
        ..
    } = rig;

    ticker.tick();
    ticker.tick();
    drop(ticker);

    let summary = acquisition.run_session().unwrap();
    assert_eq!(summary.end, SessionEnd::SourceClosed);
    assert_eq!(summary.ticks, 1);
    assert_eq!(summary.rows_written, 0);
    assert!(!storage.is_open());
}

#[test]
fn test_stop_request_ends_driver() {
    let mut rig = rig(config(), &[400]);
    let stop = rig.acquisition.stop_handle();
    stop.request_stop();
    rig.ticker.tick();

    let summaries = rig.acquisition.run().unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].end, SessionEnd::Stopped);
    assert_eq!(rig.acquisition.state(), LoggerState::StopLogging);
    assert_eq!(rig.storage.open_count(), 1);
}

#[test]
fn test_threshold_exit_restarts_session() {
    let rig = rig(config(), &[100, 400, 100]);
    let Rig {
        mut acquisition,
        ticker,
        storage,
        ..
    } = rig;

    let clock_thread = thread::spawn(move || {
        for _ in 0..200 {
            ticker.tick();
            thread::sleep(Duration::from_millis(1));
        }
    });

    let summaries = acquisition.run().unwrap();
    clock_thread.join().unwrap();

    assert!(summaries.len() >= 2);
    assert_eq!(summaries[0].end, SessionEnd::Threshold);
    assert_eq!(summaries[0].ticks, 3);
    assert_eq!(summaries[0].rows_written, 1);
    assert_eq!(summaries.last().unwrap().end, SessionEnd::SourceClosed);
    assert_eq!(storage.open_count(), summaries.len());

    // each session re-emits the header
    let text = storage.contents("artlog.csv");
    assert_eq!(text.matches("Time,").count(), summaries.len());
}

#[test]
fn test_each_session_restarts_elapsed_time() {
    let rig = rig(config(), &[400, 400, 100, 400]);
    let Rig {
        mut acquisition,
        ticker,
        storage,
        ..
    } = rig;

    let clock_thread = thread::spawn(move || {
        for _ in 0..100 {
            ticker.tick();
            thread::sleep(Duration::from_millis(1));
        }
    });

    let summaries = acquisition.run().unwrap();
    clock_thread.join().unwrap();

    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[0].end, SessionEnd::Threshold);
    assert_eq!(summaries[1].end, SessionEnd::SourceClosed);
    assert!(summaries[1].rows_written >= 1);

    let text = storage.contents("artlog.csv");
    let sessions: Vec<&str> = text.split("Time,").skip(1).collect();
    assert_eq!(sessions.len(), 2);
    for session in sessions {
        let first_row = session.lines().nth(1).unwrap();
        assert!(first_row.starts_with("0.000,"), "{first_row}");
    }
}
