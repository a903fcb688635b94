//! GPS Fix Tracking
//!
//! Frames NMEA sentences out of the receiver byte stream, tokenizes the
//! recommended-minimum sentence and keeps the last known-good position when a
//! fix is void or another sentence type arrives.

mod framer;
mod sentence;
mod tracker;

pub use framer::{SentenceFramer, MAX_SENTENCE_LEN};
pub use sentence::{GpsFix, FIELD_COUNT};
pub use tracker::{FixStatus, FixTracker};
