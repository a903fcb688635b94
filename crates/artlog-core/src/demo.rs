//! Demo Mode - Simulated logger peripherals
//!
//! Generates sensor data for running the pipeline without hardware.
//! Simulates a vehicle that sits idle, then drives a run: the engine signal on
//! analog slot 0 ramps well above the default threshold, holds, and falls back.
//! GPS, CAN and accelerometer sources follow the same run profile.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::acquisition::{
    AccelerometerDriver, AnalogBuffer, AnalogSampler, InitStep, TransactionFlags,
    STANDARD_GRAVITY,
};
use crate::can::{CanBus, CanFrame};
use crate::channel::ANALOG_CHANNEL_COUNT;
use crate::latch::LatchWriter;

/// Idle level of the engine signal (raw counts)
const IDLE_RAW: f64 = 100.0;

/// Ticks between GPS sentences (1 Hz at 10 ms ticks)
const GPS_INTERVAL_TICKS: u64 = 100;

/// One tick's worth of simulated data
#[derive(Debug, Clone)]
pub struct DemoSample {
    /// Analog buffer
    pub analog: AnalogBuffer,
    /// Sentence due this tick
    pub gps: Option<String>,
    /// Accelerometer reading in m/s²
    pub accel: [f32; 3],
    /// Payload words shared by all simulated CAN messages
    pub can_words: [u16; 4],
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum RunState {
    /// Parked, engine at idle
    Idle,
    /// Accelerating, engine signal rising
    RampUp { start: u64 },
    /// Cruising at peak
    Hold { start: u64, until: u64 },
    /// Slowing down
    RampDown { start: u64 },
}

/// Simulated vehicle driving the demo peripherals
pub struct DemoSimulator {
    rng: StdRng,
    state: RunState,
    next_run_at: u64,
    peak_raw: f64,
    engine_raw: f64,
    latitude_min: f64,
    longitude_min: f64,
    speed_knots: f64,
    can_words: [u16; 4],
}

impl Default for DemoSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoSimulator {
    /// Simulator seeded from the OS
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_entropy())
    }

    /// Reproducible simulator
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(mut rng: StdRng) -> Self {
        let first_run = rng.gen_range(150..300);
        Self {
            rng,
            state: RunState::Idle,
            next_run_at: first_run,
            peak_raw: 0.0,
            engine_raw: IDLE_RAW,
            // 48 07.038 N, 011 31.000 E
            latitude_min: 48.0 * 60.0 + 7.038,
            longitude_min: 11.0 * 60.0 + 31.0,
            speed_knots: 0.0,
            can_words: [0; 4],
        }
    }

    /// Whether the simulated vehicle is on a run
    pub fn is_running(&self) -> bool {
        !matches!(self.state, RunState::Idle)
    }

    /// Advance to `tick` and generate its data
    pub fn update(&mut self, tick: u64) -> DemoSample {
        self.update_run_state(tick);
        self.engine_raw = self.engine_target(tick) + self.rng.gen_range(-8.0..8.0);
        let engine = self.engine_raw.clamp(0.0, 4095.0);

        let mut analog = [0u16; ANALOG_CHANNEL_COUNT];
        analog[0] = engine as u16;
        let t = tick as f64 / 100.0;
        for (slot, value) in analog.iter_mut().enumerate().skip(1) {
            let phase = slot as f64 * 0.7;
            let level = 2048.0 + 900.0 * (t * 0.2 + phase).sin() + self.rng.gen_range(-20.0..20.0);
            *value = level.clamp(0.0, 4095.0) as u16;
        }

        self.speed_knots = ((engine - IDLE_RAW) / 40.0).max(0.0);
        let minutes_per_tick = self.speed_knots / 3600.0 / 100.0;
        self.latitude_min += minutes_per_tick * 0.6;
        self.longitude_min += minutes_per_tick * 0.8;

        let gps = (tick % GPS_INTERVAL_TICKS == 0).then(|| self.rmc_sentence(tick));

        for word in &mut self.can_words {
            let step: i32 = self.rng.gen_range(-40..=40);
            *word = (i32::from(*word) + step).clamp(0, i32::from(u16::MAX)) as u16;
        }

        let longitudinal: f32 = if self.is_running() { self.rng.gen_range(-3.0..3.0) } else { 0.0 };
        let accel = [
            longitudinal + self.rng.gen_range(-0.05..0.05),
            self.rng.gen_range(-0.5..0.5),
            STANDARD_GRAVITY + self.rng.gen_range(-0.1..0.1),
        ];

        DemoSample {
            analog,
            gps,
            accel,
            can_words: self.can_words,
        }
    }

    fn update_run_state(&mut self, tick: u64) {
        const RAMP_TICKS: u64 = 50;

        match self.state {
            RunState::Idle => {
                if tick >= self.next_run_at {
                    self.peak_raw = self.rng.gen_range(1500.0..3000.0);
                    self.state = RunState::RampUp { start: tick };
                }
            }
            RunState::RampUp { start } => {
                if tick >= start + RAMP_TICKS {
                    let until = tick + self.rng.gen_range(200..500);
                    self.state = RunState::Hold { start: tick, until };
                }
            }
            RunState::Hold { until, .. } => {
                if tick >= until {
                    self.state = RunState::RampDown { start: tick };
                }
            }
            RunState::RampDown { start } => {
                if tick >= start + RAMP_TICKS {
                    self.state = RunState::Idle;
                    self.next_run_at = tick + self.rng.gen_range(150..300);
                }
            }
        }
    }

    fn engine_target(&self, tick: u64) -> f64 {
        const RAMP_TICKS: f64 = 50.0;

        match self.state {
            RunState::Idle => IDLE_RAW,
            RunState::RampUp { start } => {
                let progress = ((tick - start) as f64 / RAMP_TICKS).min(1.0);
                IDLE_RAW + (self.peak_raw - IDLE_RAW) * progress
            }
            RunState::Hold { start, .. } => {
                self.peak_raw + 100.0 * ((tick - start) as f64 / 25.0).sin()
            }
            RunState::RampDown { start } => {
                let progress = ((tick - start) as f64 / RAMP_TICKS).min(1.0);
                self.peak_raw + (IDLE_RAW - self.peak_raw) * progress
            }
        }
    }

    fn rmc_sentence(&mut self, tick: u64) -> String {
        let validity = if self.rng.gen_bool(0.1) { 'V' } else { 'A' };
        let secs = tick / 100;
        let time = format!("{:02}{:02}{:02}", 12 + secs / 3600 % 12, secs / 60 % 60, secs % 60);
        let lat = format!(
            "{:02}{:07.4}",
            (self.latitude_min / 60.0) as u32,
            self.latitude_min % 60.0
        );
        let lon = format!(
            "{:03}{:07.4}",
            (self.longitude_min / 60.0) as u32,
            self.longitude_min % 60.0
        );
        let body = format!(
            "GPRMC,{time},{validity},{lat},N,{lon},E,{:05.1},084.4,160526,003.1,W",
            self.speed_knots
        );
        format!("${body}*{:02X}", nmea_checksum(&body))
    }
}

/// XOR of every byte between `$` and `*`
pub fn nmea_checksum(body: &str) -> u8 {
    body.bytes().fold(0, |acc, b| acc ^ b)
}

/// Analog sampler that also feeds the other demo sources.
///
/// Each conversion advances the simulator by one tick and publishes every
/// source it was given.
pub struct DemoSampler {
    sim: DemoSimulator,
    tick: u64,
    analog: LatchWriter<AnalogBuffer>,
    gps: Option<LatchWriter<String>>,
    can: Option<(CanBus, Vec<u32>)>,
    accel: Option<LatchWriter<[f32; 3]>>,
}

impl DemoSampler {
    /// Sampler publishing analog buffers only
    pub fn new(sim: DemoSimulator, analog: LatchWriter<AnalogBuffer>) -> Self {
        Self {
            sim,
            tick: 0,
            analog,
            gps: None,
            can: None,
            accel: None,
        }
    }

    /// Also publish GPS sentences
    pub fn with_gps(mut self, gps: LatchWriter<String>) -> Self {
        self.gps = Some(gps);
        self
    }

    /// Also deliver frames for each of `message_ids`
    pub fn with_can(mut self, bus: CanBus, message_ids: Vec<u32>) -> Self {
        self.can = Some((bus, message_ids));
        self
    }

    /// Also publish accelerometer readings
    pub fn with_accel(mut self, accel: LatchWriter<[f32; 3]>) -> Self {
        self.accel = Some(accel);
        self
    }
}

impl AnalogSampler for DemoSampler {
    fn start_conversion(&mut self) {
        let sample = self.sim.update(self.tick);
        self.tick += 1;

        self.analog.publish(sample.analog);

        if let (Some(gps), Some(sentence)) = (&self.gps, sample.gps) {
            gps.publish(sentence);
        }

        if let Some((bus, ids)) = &self.can {
            let mut payload = [0u8; 8];
            for (chunk, word) in payload.chunks_exact_mut(2).zip(sample.can_words) {
                chunk.copy_from_slice(&word.to_be_bytes());
            }
            for &id in ids {
                bus.deliver(CanFrame::new(id, &payload));
            }
        }

        if let Some(accel) = &self.accel {
            accel.publish(sample.accel);
        }
    }

    fn stop(&mut self) {
        tracing::debug!(tick = self.tick, "Demo sampler stopped");
    }
}

/// Accelerometer driver whose transactions complete immediately
#[derive(Debug, Default)]
pub struct DemoAccelerometer;

impl AccelerometerDriver for DemoAccelerometer {
    fn begin(&mut self, step: InitStep, flags: &TransactionFlags) {
        tracing::trace!(?step, "Demo accelerometer transaction");
        flags.complete(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::GpsFix;
    use crate::latch::latch;

    #[test]
    fn test_simulator_is_reproducible() {
        let mut a = DemoSimulator::with_seed(7);
        let mut b = DemoSimulator::with_seed(7);
        for tick in 0..500 {
            let (sa, sb) = (a.update(tick), b.update(tick));
            assert_eq!(sa.analog, sb.analog);
            assert_eq!(sa.gps, sb.gps);
        }
    }

    #[test]
    fn test_run_crosses_threshold_and_returns() {
        let mut sim = DemoSimulator::with_seed(1);
        let engine: Vec<u16> = (0..2000).map(|tick| sim.update(tick).analog[0]).collect();

        // first run starts no earlier than tick 150
        assert!(engine[..150].iter().all(|&v| v < 300));
        let first_high = engine.iter().position(|&v| v > 1000).unwrap();
        assert!(engine[first_high..].iter().any(|&v| v < 300));
    }

    #[test]
    fn test_gps_sentences_parse() {
        let mut sim = DemoSimulator::with_seed(3);
        let sentence = sim.update(0).gps.unwrap();
        let fix = GpsFix::parse(&sentence);
        assert_eq!(fix.tag, "$GPRMC");
        assert_eq!(fix.latitude, "4807.0380");
        assert_eq!(fix.lon_hemisphere, "E");
        assert!(sim.update(1).gps.is_none());
    }

    #[test]
    fn test_checksum() {
        assert_eq!(
            nmea_checksum("GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W"),
            0x6A
        );
    }

    #[test]
    fn test_sampler_publishes() {
        let (tx, mut rx) = latch([0u16; ANALOG_CHANNEL_COUNT]);
        let (gps_tx, mut gps_rx) = latch(String::new());
        let mut sampler = DemoSampler::new(DemoSimulator::with_seed(5), tx).with_gps(gps_tx);

        sampler.start_conversion();
        assert!(rx.take().is_some());
        assert!(gps_rx.take().unwrap().starts_with("$GPRMC"));

        sampler.start_conversion();
        assert!(rx.take().is_some());
        assert!(gps_rx.take().is_none());
    }
}
