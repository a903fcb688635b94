//! CAN frame payload decoding

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};

use crate::channel::SIGNALS_PER_FRAME;

/// Maximum classic CAN payload
pub const MAX_PAYLOAD: usize = 8;

/// A received CAN data frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CanFrame {
    /// Message identifier
    pub id: u32,
    /// Payload bytes (only the first `len` are meaningful)
    pub data: [u8; MAX_PAYLOAD],
    /// Payload length
    pub len: u8,
}

impl CanFrame {
    /// Create a frame; payload beyond 8 bytes is dropped
    pub fn new(id: u32, payload: &[u8]) -> Self {
        let len = payload.len().min(MAX_PAYLOAD);
        let mut data = [0u8; MAX_PAYLOAD];
        data[..len].copy_from_slice(&payload[..len]);
        Self {
            id,
            data,
            len: len as u8,
        }
    }

    /// Meaningful payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.len).min(MAX_PAYLOAD)]
    }

    /// Decode the payload on top of `previous` raw values
    pub fn decode(&self, previous: [u16; SIGNALS_PER_FRAME]) -> [u16; SIGNALS_PER_FRAME] {
        let mut raw = previous;
        decode_payload(self.payload(), &mut raw);
        raw
    }
}

/// Unpack big-endian 16-bit words: `raw[i] = (byte[2i] << 8) | byte[2i + 1]`.
///
/// Only complete byte pairs are decoded; signals past the end of a short
/// payload keep their values. Returns the number of signals written.
pub fn decode_payload(payload: &[u8], raw: &mut [u16; SIGNALS_PER_FRAME]) -> usize {
    let mut decoded = 0;
    for (slot, pair) in raw.iter_mut().zip(payload.chunks_exact(2)) {
        *slot = BigEndian::read_u16(pair);
        decoded += 1;
    }
    decoded
}
