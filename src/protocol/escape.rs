//! Byte escaping for the frame body.
//!
//! The frame delimiters and the escape marker itself must never appear raw
//! between `BEGIN_FRAME_BYTE` and `END_FRAME_BYTE`; each is replaced by
//! `{ESCAPE_BYTE, code}` on the wire. A raw delimiter inside the body means
//! the connection dropped bytes.

use crate::config::protocol::{BEGIN_FRAME_BYTE, END_FRAME_BYTE, ESCAPE_BYTE};
use crate::protocol::frame::DeserializeError;

/// Escaped byte on the left, escape code on the right. The encoded sequence
/// is `{ESCAPE_BYTE, code}`.
pub const ESCAPE_TABLE: [(u8, u8); 3] = [
    (ESCAPE_BYTE, 0x41),
    (BEGIN_FRAME_BYTE, 0x42),
    (END_FRAME_BYTE, 0x43),
];

/// Returns the escape code for `byte`, or `None` when it can travel raw.
pub fn escape_code(byte: u8) -> Option<u8> {
    ESCAPE_TABLE
        .iter()
        .find_map(|&(raw, code)| (raw == byte).then_some(code))
}

/// Decode one byte from the front of `window`.
///
/// Returns the number of encoded bytes consumed (1 or 2) and the decoded
/// byte. `window` only needs to hold the bytes that are actually available;
/// a lone trailing escape marker is an `UnexpectedEOF`.
pub fn decode_byte(window: &[u8]) -> Result<(usize, u8), DeserializeError> {
    let Some(&first) = window.first() else {
        return Err(DeserializeError::UnexpectedEOF);
    };

    if first == ESCAPE_BYTE {
        let Some(&code) = window.get(1) else {
            return Err(DeserializeError::UnexpectedEOF);
        };

        ESCAPE_TABLE
            .iter()
            .find_map(|&(raw, c)| (c == code).then_some((2, raw)))
            .ok_or(DeserializeError::InvalidEscapeSequence)
    } else if first == BEGIN_FRAME_BYTE || first == END_FRAME_BYTE {
        // Delimiters are always escaped inside the body. Hitting one raw
        // means bytes were lost upstream.
        Err(DeserializeError::InvalidByte)
    } else {
        Ok((1, first))
    }
}
