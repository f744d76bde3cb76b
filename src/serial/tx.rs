//! Outbound frame transmission.

use heapless::Vec;

use crate::config::serial::TX_STAGING_SIZE;
use crate::protocol::{Frame, SerializeError};
use crate::serial::traits::ByteSink;

/// Serialize `frame` and enqueue every byte into `sink`.
///
/// Keeps offering the unsent remainder until the sink has accepted the whole
/// frame, so this blocks while the transmit path catches up. A frame that
/// fails to serialize is reported and nothing is enqueued.
pub fn send_frame<S: ByteSink>(sink: &mut S, frame: &Frame) -> Result<(), SerializeError> {
    let mut encoded: Vec<u8, TX_STAGING_SIZE> = Vec::new();
    frame.serialize_into(&mut encoded)?;

    let mut sent = 0;
    while sent < encoded.len() {
        sent += sink.send(&encoded[sent..]);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serial::traits::mock::MockByteSink;

    #[test]
    fn sends_the_complete_encoded_frame() {
        let frame = Frame::with_payload(100, 7, b"PWM_ON").unwrap();
        let mut sink = MockByteSink::new();

        send_frame(&mut sink, &frame).unwrap();

        assert_eq!(Frame::deserialize(sink.data()), Ok(frame));
    }

    #[test]
    fn retries_the_remainder_after_refusals() {
        let frame = Frame::with_payload(100, 7, b"STATUS_RESP 0 1 0").unwrap();
        let mut expected = Vec::<u8, TX_STAGING_SIZE>::new();
        frame.serialize_into(&mut expected).unwrap();

        let mut sink = MockByteSink::new();
        sink.refuse_next(5);

        send_frame(&mut sink, &frame).unwrap();

        assert_eq!(sink.data(), expected.as_slice());
    }
}
