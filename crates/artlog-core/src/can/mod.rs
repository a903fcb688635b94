//! CAN Frame Decoder
//!
//! Matches received frames to registered channel slots and unpacks their
//! payloads into big-endian 16-bit raw signals.

mod frame;
mod mailbox;

pub use frame::{decode_payload, CanFrame, MAX_PAYLOAD};
pub use mailbox::{mailbox, CanBus, CanMailbox};
