//! Configuration constants for the PWM serial-command node.

/// Wire protocol constants.
pub mod protocol {
    /// Byte opening every serialized frame.
    pub const BEGIN_FRAME_BYTE: u8 = b'(';

    /// Byte closing every serialized frame.
    pub const END_FRAME_BYTE: u8 = b')';

    /// Escape marker. Any occurrence of the delimiters or the marker itself
    /// inside the frame body is replaced by a two-byte escape sequence.
    pub const ESCAPE_BYTE: u8 = 0x1B;

    /// Maximum serialized frame size before escaping, delimiters included.
    pub const FRAME_MAX_SIZE: usize = 1280;

    /// Smallest possible frame: delimiters, sender, receiver, length and CRC
    /// with an empty payload.
    pub const FRAME_MIN_SIZE: usize = 10;

    /// Maximum payload length carried by a single frame.
    pub const FRAME_DATA_MAX_SIZE: usize = FRAME_MAX_SIZE - FRAME_MIN_SIZE;
}

/// Node addressing.
pub mod node {
    /// Identity of this node in frame sender/receiver fields.
    pub const LOCAL_ID: u8 = 100;
}

/// Serial buffer sizing.
pub mod serial {
    use super::protocol::FRAME_MAX_SIZE;

    /// Receive ring capacity. Holds several frames even when every body byte
    /// needs escaping.
    pub const RX_BUFFER_SIZE: usize = FRAME_MAX_SIZE * 4;

    /// Transmit ring capacity.
    pub const TX_BUFFER_SIZE: usize = FRAME_MAX_SIZE * 4;

    /// Staging buffer for one escaped outbound frame. Escaping at worst
    /// doubles the body.
    pub const TX_STAGING_SIZE: usize = FRAME_MAX_SIZE * 2;
}

/// PWM command limits.
pub mod pwm {
    /// Maximum number of duty-cycle values accepted by SET_DUTY_CYCLES.
    pub const MAX_DUTY_CYCLES: usize = 312;
}
