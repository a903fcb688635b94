//! Single-writer / single-reader data latches
//!
//! Producers (sampler completion, CAN reception, GPS line reception, sensor
//! data-ready) only publish the newest raw data and mark it ready. The sampling
//! loop is the only reader and clears the ready mark when it takes the value.
//! Neither half is `Clone`, so a latch always has exactly one writer and one reader.

use tokio::sync::watch;

/// Create a latch holding `initial` (not marked ready)
pub fn latch<T>(initial: T) -> (LatchWriter<T>, LatchReader<T>) {
    let (tx, rx) = watch::channel(initial);
    (LatchWriter { tx }, LatchReader { rx })
}

/// Producer half of a latch
#[derive(Debug)]
pub struct LatchWriter<T> {
    tx: watch::Sender<T>,
}

impl<T> LatchWriter<T> {
    /// Replace the latched value and mark it ready
    pub fn publish(&self, value: T) {
        self.tx.send_replace(value);
    }

    /// Whether the reader has gone away
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Consumer half of a latch
#[derive(Debug)]
pub struct LatchReader<T> {
    rx: watch::Receiver<T>,
}

impl<T: Clone> LatchReader<T> {
    /// Take the value if it was published since the last take, clearing the mark
    pub fn take(&mut self) -> Option<T> {
        let value = self.rx.borrow_and_update();
        if value.has_changed() {
            Some(value.clone())
        } else {
            None
        }
    }

    /// Latest value, ready or not, without clearing the mark
    pub fn latest(&self) -> T {
        self.rx.borrow().clone()
    }

    /// Whether an unread value is waiting
    pub fn is_ready(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}
