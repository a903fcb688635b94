//! Tick clock
//!
//! The [`Ticker`] half is driven by a periodic source and is the only writer
//! of the tick counter and elapsed-time accumulator. The [`TickClock`] half is
//! owned by the sampling loop, which polls it for new ticks.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crate::session::Timestamp;

#[derive(Debug)]
struct ClockShared {
    step_ms: u16,
    ticks: AtomicU32,
    elapsed: AtomicU64,
    logging: AtomicBool,
    closed: AtomicBool,
}

/// Create a clock advancing `step_ms` per tick
pub fn tick_clock(step_ms: u16) -> (Ticker, TickClock) {
    let shared = Arc::new(ClockShared {
        step_ms,
        ticks: AtomicU32::new(0),
        elapsed: AtomicU64::new(Timestamp::default().pack()),
        logging: AtomicBool::new(false),
        closed: AtomicBool::new(false),
    });
    (
        Ticker {
            shared: Arc::clone(&shared),
        },
        TickClock {
            shared,
            last_seen: 0,
        },
    )
}

/// Writer half of the clock; dropping it closes the clock
#[derive(Debug)]
pub struct Ticker {
    shared: Arc<ClockShared>,
}

impl Ticker {
    /// Advance one tick.
    ///
    /// Elapsed time moves only while the loop reports that it is logging.
    pub fn tick(&self) {
        let shared = &self.shared;
        if shared.logging.load(Ordering::Acquire) {
            let mut elapsed = Timestamp::unpack(shared.elapsed.load(Ordering::Relaxed));
            elapsed.advance(shared.step_ms);
            shared.elapsed.store(elapsed.pack(), Ordering::Relaxed);
        }
        shared.ticks.fetch_add(1, Ordering::Release);
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.shared.closed.store(true, Ordering::Release);
    }
}

/// Reader half of the clock
#[derive(Debug)]
pub struct TickClock {
    shared: Arc<ClockShared>,
    last_seen: u32,
}

impl TickClock {
    /// Whether the counter moved since the last poll.
    ///
    /// Ticks that arrive between polls are coalesced into one.
    pub fn poll(&mut self) -> bool {
        let now = self.shared.ticks.load(Ordering::Acquire);
        if now != self.last_seen {
            self.last_seen = now;
            true
        } else {
            false
        }
    }

    /// Raw tick counter
    pub fn ticks(&self) -> u32 {
        self.shared.ticks.load(Ordering::Acquire)
    }

    /// Elapsed logging time
    pub fn elapsed(&self) -> Timestamp {
        Timestamp::unpack(self.shared.elapsed.load(Ordering::Acquire))
    }

    /// Tell the clock whether elapsed time should advance
    pub fn set_logging(&self, logging: bool) {
        self.shared.logging.store(logging, Ordering::Release);
    }

    /// Stop elapsed time and zero it for a new session.
    ///
    /// The ticker only writes elapsed time while logging, so clearing the
    /// flag first leaves this store as the last write.
    pub fn reset_elapsed(&self) {
        self.shared.logging.store(false, Ordering::Release);
        self.shared
            .elapsed
            .store(Timestamp::default().pack(), Ordering::Release);
    }

    /// Whether the ticker has been dropped
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }
}
