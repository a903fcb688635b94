//! Logging Session
//!
//! The state machine that turns trigger readings into logging decisions and
//! the per-session record that carries the trigger binding and elapsed time.

mod record;
mod state;

pub use record::{LogRecord, Timestamp};
pub use state::{LoggerState, StateMachine, Transition};
