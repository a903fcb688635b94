//! Byte-stream sentence framing
//!
//! Accumulates UART bytes from a `$` start marker up to the line feed that
//! ends the sentence.

/// Longest sentence accepted, terminator excluded
pub const MAX_SENTENCE_LEN: usize = 100;

/// Assembles sentences from a receive byte stream
#[derive(Debug, Default)]
pub struct SentenceFramer {
    buffer: Vec<u8>,
    in_sentence: bool,
    dropped: u64,
}

impl SentenceFramer {
    /// Create an idle framer
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(MAX_SENTENCE_LEN),
            ..Self::default()
        }
    }

    /// Feed one byte; returns a sentence when its terminator arrives.
    ///
    /// Bytes outside a sentence are ignored and carriage returns are stripped.
    /// A `$` in the middle of a sentence restarts framing.
    pub fn push_byte(&mut self, byte: u8) -> Option<String> {
        match byte {
            b'$' => {
                if self.in_sentence && !self.buffer.is_empty() {
                    self.discard("restarted");
                }
                self.buffer.clear();
                self.buffer.push(byte);
                self.in_sentence = true;
                None
            }
            _ if !self.in_sentence => None,
            b'\n' => {
                self.in_sentence = false;
                let line = String::from_utf8_lossy(&self.buffer).into_owned();
                self.buffer.clear();
                Some(line)
            }
            b'\r' => None,
            _ => {
                if self.buffer.len() >= MAX_SENTENCE_LEN {
                    self.discard("overflow");
                    self.in_sentence = false;
                    self.buffer.clear();
                    return None;
                }
                self.buffer.push(byte);
                None
            }
        }
    }

    /// Feed a chunk of bytes, collecting every completed sentence
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<String> {
        bytes.iter().filter_map(|&b| self.push_byte(b)).collect()
    }

    /// Sentences thrown away so far
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn discard(&mut self, reason: &str) {
        self.dropped += 1;
        tracing::debug!(reason, len = self.buffer.len(), "Discarding partial GPS sentence");
    }
}
