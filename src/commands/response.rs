//! Response tokens and the bounded response writer.
//!
//! Every reply starts with one of these tokens; handlers append their
//! payload after it. The writer is capped at the frame payload limit, so an
//! oversized response surfaces as an overflow flag instead of a truncated
//! message.

use core::fmt;

use heapless::Vec;

use crate::config::protocol::FRAME_DATA_MAX_SIZE;

pub const PWM_ON: &str = "PWM_ON";
pub const PWM_OFF: &str = "PWM_OFF";
pub const FREQ_CHANGED: &str = "FREQ_CHANGED";
pub const DUTY_CYCLES_CHANGED: &str = "DUTY_CYCLES_CHANGED";
pub const STATUS_RESP: &str = "STATUS_RESP";

pub const UNKNOWN_COMMAND: &str = "UNKNOWN_COMMAND";
pub const INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
pub const INVALID_FREQUENCY: &str = "INVALID_FREQUENCY";
pub const INVALID_DUTY_CYCLE: &str = "INVALID_DUTY_CYCLE";

/// Response payload under construction.
///
/// Sized to the maximum frame payload. Writing past the end sets a sticky
/// overflow flag and the partial content must not be sent.
pub struct ResponseBuffer {
    data: Vec<u8, FRAME_DATA_MAX_SIZE>,
    overflowed: bool,
}

impl ResponseBuffer {
    pub const fn new() -> Self {
        Self {
            data: Vec::new(),
            overflowed: false,
        }
    }

    /// Append raw bytes, typically to echo a request token verbatim.
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.data.extend_from_slice(bytes).is_err() {
            self.overflowed = true;
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// True once any write has been rejected for capacity.
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.overflowed = false;
    }

    /// Consume the buffer, yielding the payload for the response frame.
    pub fn into_data(self) -> Vec<u8, FRAME_DATA_MAX_SIZE> {
        self.data
    }
}

impl fmt::Write for ResponseBuffer {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        if self.data.extend_from_slice(s.as_bytes()).is_err() {
            self.overflowed = true;
            return Err(fmt::Error);
        }
        Ok(())
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    #[test]
    fn formats_tokens_and_values() {
        let mut out = ResponseBuffer::new();

        write!(out, "{} {}", FREQ_CHANGED, 100u32).unwrap();
        assert_eq!(out.as_slice(), b"FREQ_CHANGED 100");
        assert!(!out.overflowed());
    }

    #[test]
    fn echoes_raw_bytes() {
        let mut out = ResponseBuffer::new();
        out.write_bytes(b"050");
        assert_eq!(out.as_slice(), b"050");
    }

    #[test]
    fn overflow_is_sticky() {
        let mut out = ResponseBuffer::new();
        let big = [b'x'; FRAME_DATA_MAX_SIZE];
        out.write_bytes(&big);
        assert!(!out.overflowed());

        out.write_bytes(b"y");
        assert!(out.overflowed());

        out.clear();
        assert!(!out.overflowed());
        assert!(out.is_empty());
    }
}
