//! Frame type and wire codec.
//!
//! # Wire format
//!
//! ```text
//! ( [ escaped( SENDER RECEIVER DATA_LEN DATA CRC32 ) ] )
//! ```
//!
//! - `(` - `BEGIN_FRAME_BYTE`, 1 byte
//! - `SENDER` - sender id, 1 byte
//! - `RECEIVER` - intended receiver id, 1 byte
//! - `DATA_LEN` - `DATA` length, u16 big endian
//! - `DATA` - payload, `DATA_LEN` bytes
//! - `CRC32` - checksum of the SENDER, RECEIVER, DATA_LEN and DATA fields,
//!   u32 big endian
//! - `)` - `END_FRAME_BYTE`, 1 byte
//!
//! Everything between the delimiters travels escaped (see
//! [`escape`](crate::protocol::escape)).
//!
//! # CRC
//!
//! CRC-32/MPEG-2 (polynomial 0x04C11DB7, initial 0xFFFFFFFF, no reflection,
//! no final XOR) over the hashed region zero-padded to a 4 byte multiple.
//! The padding is a computation convenience and never transmitted.

use crc::{Crc, CRC_32_MPEG_2};
use heapless::Vec;

use crate::buffer::RingBuffer;
use crate::config::protocol::{
    BEGIN_FRAME_BYTE, END_FRAME_BYTE, ESCAPE_BYTE, FRAME_DATA_MAX_SIZE, FRAME_MIN_SIZE,
};
use crate::protocol::escape::{decode_byte, escape_code};

const CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_MPEG_2);

/// Capacity for the decoded interior of a frame: everything between the
/// delimiters, after un-escaping.
const DECODED_MAX_SIZE: usize = crate::config::protocol::FRAME_MAX_SIZE - 2;

/// Errors produced while serializing a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerializeError {
    /// The payload would not fit `FRAME_DATA_MAX_SIZE`.
    FrameTooLong,
    /// The destination buffer ran out of capacity mid-write. Partial output
    /// is undefined and must be discarded.
    BufferTooSmall,
}

/// Errors produced while deserializing a [`Frame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeserializeError {
    /// The data ended before the next field could be read.
    UnexpectedEOF,
    /// The data does not start with `BEGIN_FRAME_BYTE`.
    InvalidStartByte,
    /// The data does not end with `END_FRAME_BYTE`.
    InvalidEndByte,
    /// The declared payload length exceeds `FRAME_DATA_MAX_SIZE`.
    DataTooBig,
    /// An escape marker was followed by an unknown code. Bytes were probably
    /// dropped by the underlying connection.
    InvalidEscapeSequence,
    /// A raw delimiter byte appeared inside the frame body. Bytes were
    /// probably dropped by the underlying connection.
    InvalidByte,
    /// Bytes remained after all fields were read. Internal consistency
    /// fault, should never occur on well-formed input.
    ExpectedEOF,
    /// All fields parsed but the checksum disagrees. The frame is
    /// structurally sound and its payload corrupted.
    CRC32MissMatch { received: u32, calculated: u32 },
}

/// The protocol's atomic message unit.
///
/// A `Frame` is a value type: whichever scope constructed or decoded it owns
/// it outright.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub sender: u8,
    pub receiver: u8,
    pub data: Vec<u8, FRAME_DATA_MAX_SIZE>,
}

impl Frame {
    /// Create a frame with an empty payload.
    pub const fn new(sender: u8, receiver: u8) -> Self {
        Self {
            sender,
            receiver,
            data: Vec::new(),
        }
    }

    /// Create a frame carrying a copy of `payload`.
    pub fn with_payload(sender: u8, receiver: u8, payload: &[u8]) -> Result<Self, SerializeError> {
        let data = Vec::from_slice(payload).map_err(|_| SerializeError::FrameTooLong)?;
        Ok(Self {
            sender,
            receiver,
            data,
        })
    }

    /// Serialized size before escaping, delimiters included.
    pub fn serialized_len(&self) -> usize {
        self.data.len() + FRAME_MIN_SIZE
    }

    /// CRC-32/MPEG-2 over sender, receiver, big-endian length and payload,
    /// zero-padded to a 4 byte multiple.
    pub fn crc32(&self) -> u32 {
        let mut digest = CRC32.digest();
        digest.update(&[self.sender, self.receiver]);
        digest.update(&(self.data.len() as u16).to_be_bytes());
        digest.update(&self.data);

        let hashed = 4 + self.data.len();
        digest.update(&[0u8; 3][..hashed.next_multiple_of(4) - hashed]);

        digest.finalize()
    }

    /// Serialize this frame, escaped and delimited, into `out`.
    ///
    /// On `BufferTooSmall` the contents of `out` are undefined and must be
    /// discarded.
    pub fn serialize_into<const CAP: usize>(
        &self,
        out: &mut Vec<u8, CAP>,
    ) -> Result<(), SerializeError> {
        out.push(BEGIN_FRAME_BYTE)
            .map_err(|_| SerializeError::BufferTooSmall)?;

        push_escaped(out, self.sender)?;
        push_escaped(out, self.receiver)?;
        for byte in (self.data.len() as u16).to_be_bytes() {
            push_escaped(out, byte)?;
        }
        for &byte in self.data.iter() {
            push_escaped(out, byte)?;
        }
        for byte in self.crc32().to_be_bytes() {
            push_escaped(out, byte)?;
        }

        out.push(END_FRAME_BYTE)
            .map_err(|_| SerializeError::BufferTooSmall)?;
        Ok(())
    }

    /// Deserialize a frame from a linear byte span holding exactly one
    /// encoded frame.
    pub fn deserialize(encoded: &[u8]) -> Result<Self, DeserializeError> {
        if encoded.len() < FRAME_MIN_SIZE {
            return Err(DeserializeError::UnexpectedEOF);
        }
        if encoded.first() != Some(&BEGIN_FRAME_BYTE) {
            return Err(DeserializeError::InvalidStartByte);
        }
        if encoded.last() != Some(&END_FRAME_BYTE) {
            return Err(DeserializeError::InvalidEndByte);
        }

        let mut decoded: Vec<u8, DECODED_MAX_SIZE> = Vec::new();
        let mut rest = &encoded[1..encoded.len() - 1];
        while !rest.is_empty() {
            let (read, byte) = decode_byte(rest)?;
            decoded
                .push(byte)
                .map_err(|_| DeserializeError::DataTooBig)?;
            rest = &rest[read..];
        }

        Self::parse_decoded(&decoded)
    }

    /// Deserialize a frame directly from a ring buffer window, without an
    /// intermediate copy of the escaped bytes.
    ///
    /// The caller must have located the frame first: the byte at the
    /// consumer cursor is `BEGIN_FRAME_BYTE` and the byte `end` positions
    /// past it is an unescaped `END_FRAME_BYTE`. Escaped byte pairs are read
    /// lazily from the window, so the scan never walks past the producer
    /// cursor.
    ///
    /// The window is left untouched; consuming it is the caller's decision.
    pub fn deserialize_from_ring<const N: usize>(
        rb: &RingBuffer<N>,
        end: usize,
    ) -> Result<Self, DeserializeError> {
        if rb.peek(0) != Some(BEGIN_FRAME_BYTE) {
            return Err(DeserializeError::InvalidStartByte);
        }
        if rb.peek(end) != Some(END_FRAME_BYTE) {
            return Err(DeserializeError::InvalidEndByte);
        }
        if rb.occupied() < FRAME_MIN_SIZE {
            return Err(DeserializeError::UnexpectedEOF);
        }

        let mut decoded: Vec<u8, DECODED_MAX_SIZE> = Vec::new();
        let mut idx = 1;
        while idx < end {
            let mut window = [0u8; 2];
            let mut available = 0;
            for (slot, offset) in window.iter_mut().zip([idx, idx + 1]) {
                match rb.peek(offset) {
                    Some(byte) => {
                        *slot = byte;
                        available += 1;
                    }
                    None => break,
                }
            }

            // An escape marker directly before `end` pairs with the END
            // delimiter and fails decoding, so `idx` never passes `end`.
            let (read, byte) = decode_byte(&window[..available])?;
            decoded
                .push(byte)
                .map_err(|_| DeserializeError::DataTooBig)?;
            idx += read;
        }

        Self::parse_decoded(&decoded)
    }

    /// Parse the un-escaped interior: fixed-order fields, then checksum.
    fn parse_decoded(decoded: &[u8]) -> Result<Self, DeserializeError> {
        let mut reader = FieldReader::new(decoded);

        let sender = reader.take::<1>()?[0];
        let receiver = reader.take::<1>()?[0];
        let data_len = u16::from_be_bytes(reader.take::<2>()?) as usize;

        if data_len > FRAME_DATA_MAX_SIZE {
            return Err(DeserializeError::DataTooBig);
        }

        let payload = reader.take_slice(data_len)?;
        let received = u32::from_be_bytes(reader.take::<4>()?);

        if !reader.finished() {
            return Err(DeserializeError::ExpectedEOF);
        }

        let frame = Self {
            sender,
            receiver,
            // data_len is already bounds-checked against the capacity
            data: Vec::from_slice(payload).map_err(|_| DeserializeError::DataTooBig)?,
        };

        let calculated = frame.crc32();
        if received != calculated {
            return Err(DeserializeError::CRC32MissMatch {
                received,
                calculated,
            });
        }

        Ok(frame)
    }
}

/// Append one body byte to `out`, escaping it when required.
fn push_escaped<const CAP: usize>(out: &mut Vec<u8, CAP>, byte: u8) -> Result<(), SerializeError> {
    match escape_code(byte) {
        Some(code) => {
            out.push(ESCAPE_BYTE)
                .map_err(|_| SerializeError::BufferTooSmall)?;
            out.push(code).map_err(|_| SerializeError::BufferTooSmall)
        }
        None => out.push(byte).map_err(|_| SerializeError::BufferTooSmall),
    }
}

/// Cursor over the decoded interior, reading fixed-size fields in order.
struct FieldReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const K: usize>(&mut self) -> Result<[u8; K], DeserializeError> {
        let slice = self.take_slice(K)?;
        let mut bytes = [0u8; K];
        bytes.copy_from_slice(slice);
        Ok(bytes)
    }

    fn take_slice(&mut self, len: usize) -> Result<&'a [u8], DeserializeError> {
        if self.pos + len > self.data.len() {
            return Err(DeserializeError::UnexpectedEOF);
        }

        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn finished(&self) -> bool {
        self.pos == self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::protocol::FRAME_MAX_SIZE;

    fn serialize(frame: &Frame) -> Vec<u8, { FRAME_MAX_SIZE * 2 }> {
        let mut out = Vec::new();
        frame.serialize_into(&mut out).expect("serialize");
        out
    }

    #[test]
    fn round_trip_empty_payload() {
        let frame = Frame::new(133, 20);

        let encoded = serialize(&frame);
        assert_eq!(encoded.len(), frame.serialized_len());
        assert_eq!(Frame::deserialize(&encoded), Ok(frame));
    }

    #[test]
    fn round_trip_payload_with_delimiters() {
        let frame = Frame::with_payload(253, 150, b"hell(o w)or\x1bld").unwrap();

        let encoded = serialize(&frame);
        assert_eq!(Frame::deserialize(&encoded), Ok(frame));
    }

    #[test]
    fn escaping_hides_delimiters_inside_the_body() {
        let frame = Frame::with_payload(1, 2, &[b'(', b')', 0x1B, b'(']).unwrap();

        let encoded = serialize(&frame);
        let interior = &encoded[1..encoded.len() - 1];
        assert!(!interior.contains(&BEGIN_FRAME_BYTE));
        assert!(!interior.contains(&END_FRAME_BYTE));
    }

    #[test]
    fn crc_detects_a_single_bit_flip() {
        let frame = Frame::with_payload(1, 2, b"hello").unwrap();

        let mut encoded = serialize(&frame);
        // Flip the low bit of the first payload byte ('h' stays a plain byte).
        encoded[5] ^= 0x01;

        assert!(matches!(
            Frame::deserialize(&encoded),
            Err(DeserializeError::CRC32MissMatch { .. })
        ));
    }

    #[test]
    fn rejects_short_input() {
        assert_eq!(
            Frame::deserialize(&[BEGIN_FRAME_BYTE, 0, 0, END_FRAME_BYTE]),
            Err(DeserializeError::UnexpectedEOF)
        );
    }

    #[test]
    fn rejects_bad_delimiters() {
        let frame = Frame::new(1, 2);
        let good = serialize(&frame);

        let mut bad_start = good.clone();
        bad_start[0] = b'[';
        assert_eq!(
            Frame::deserialize(&bad_start),
            Err(DeserializeError::InvalidStartByte)
        );

        let mut bad_end = good.clone();
        let last = bad_end.len() - 1;
        bad_end[last] = b']';
        assert_eq!(
            Frame::deserialize(&bad_end),
            Err(DeserializeError::InvalidEndByte)
        );
    }

    #[test]
    fn rejects_oversized_declared_length() {
        // Declared payload length 0x04F8 = 1272 > FRAME_DATA_MAX_SIZE.
        let encoded = [
            BEGIN_FRAME_BYTE,
            1,
            2,
            0x04,
            0xF8,
            0,
            0,
            0,
            0,
            END_FRAME_BYTE,
        ];
        assert_eq!(
            Frame::deserialize(&encoded),
            Err(DeserializeError::DataTooBig)
        );
    }

    #[test]
    fn rejects_unknown_escape_sequence() {
        let encoded = [
            BEGIN_FRAME_BYTE,
            1,
            2,
            ESCAPE_BYTE,
            0x99,
            0,
            0,
            0,
            0,
            END_FRAME_BYTE,
        ];
        assert_eq!(
            Frame::deserialize(&encoded),
            Err(DeserializeError::InvalidEscapeSequence)
        );
    }

    #[test]
    fn rejects_raw_delimiter_inside_the_body() {
        let encoded = [
            BEGIN_FRAME_BYTE,
            1,
            2,
            0,
            0,
            BEGIN_FRAME_BYTE,
            0,
            0,
            0,
            END_FRAME_BYTE,
        ];
        assert_eq!(
            Frame::deserialize(&encoded),
            Err(DeserializeError::InvalidByte)
        );
    }

    #[test]
    fn rejects_truncated_payload() {
        // Declared length 5 with only 3 payload bytes present: the CRC field
        // runs out of data.
        let encoded = [
            BEGIN_FRAME_BYTE,
            1,
            2,
            0,
            5,
            b'a',
            b'b',
            b'c',
            9,
            9,
            9,
            9,
            END_FRAME_BYTE,
        ];
        assert_eq!(
            Frame::deserialize(&encoded),
            Err(DeserializeError::UnexpectedEOF)
        );
    }

    #[test]
    fn trailing_bytes_fail_before_the_checksum() {
        let frame = Frame::with_payload(1, 2, b"hi").unwrap();

        let mut encoded = serialize(&frame);
        let end = encoded.pop().unwrap();
        encoded.push(0x00).unwrap();
        encoded.push(end).unwrap();

        assert_eq!(
            Frame::deserialize(&encoded),
            Err(DeserializeError::ExpectedEOF)
        );
    }

    #[test]
    fn ring_window_decode_matches_slice_decode() {
        let frame = Frame::with_payload(7, 100, b"SET_FREQ 100").unwrap();
        let encoded = serialize(&frame);

        let mut rb: RingBuffer<{ FRAME_MAX_SIZE * 4 }> = RingBuffer::new();
        for &byte in &encoded {
            rb.try_push(byte).unwrap();
        }

        let end = encoded.len() - 1;
        assert_eq!(Frame::deserialize_from_ring(&rb, end), Ok(frame));

        // The window itself is not consumed.
        assert_eq!(rb.occupied(), encoded.len());
    }

    #[test]
    fn ring_window_decode_survives_wrap_around() {
        let frame = Frame::with_payload(3, 4, b"STATUS").unwrap();
        let encoded = serialize(&frame);

        let mut rb: RingBuffer<24> = RingBuffer::new();
        // Shift the cursors close to the end of the backing array first.
        for _ in 0..20 {
            rb.try_push(0xEE).unwrap();
            rb.try_pop().unwrap();
        }
        for &byte in &encoded {
            rb.try_push(byte).unwrap();
        }

        let end = encoded.len() - 1;
        assert_eq!(Frame::deserialize_from_ring(&rb, end), Ok(frame));
    }

    #[test]
    fn payload_too_long_is_rejected_at_construction() {
        let payload = [0u8; FRAME_DATA_MAX_SIZE + 1];
        assert_eq!(
            Frame::with_payload(1, 2, &payload),
            Err(SerializeError::FrameTooLong)
        );
    }

    #[test]
    fn serialize_fails_on_exhausted_buffer() {
        let frame = Frame::with_payload(1, 2, b"hello").unwrap();

        let mut tiny: Vec<u8, 4> = Vec::new();
        assert_eq!(
            frame.serialize_into(&mut tiny),
            Err(SerializeError::BufferTooSmall)
        );
    }
}
