//! Main-loop service: drains received frames and answers commands.
//!
//! The receive interrupt pushes raw bytes into a shared ring buffer; the
//! main loop calls [`Node::process_pending`] to extract frames, dispatch the
//! commands they carry and send one response frame per accepted request.

use log::{trace, warn};

use crate::buffer::SharedRingBuffer;
use crate::commands::{CommandDispatcher, DeviceState, ResponseBuffer};
use crate::config::node::LOCAL_ID;
use crate::protocol::{Extraction, Frame, FrameExtractor};
use crate::pwm::PwmControl;
use crate::serial::traits::ByteSink;
use crate::serial::tx::send_frame;

/// The command-processing half of the firmware.
///
/// Owns the device state, the PWM backend and the transmit sink. Constructed
/// once at startup; the surrounding loop invokes `process_pending` forever.
pub struct Node<P: PwmControl, S: ByteSink> {
    extractor: FrameExtractor,
    dispatcher: CommandDispatcher,
    state: DeviceState,
    pwm: P,
    sink: S,
}

impl<P: PwmControl, S: ByteSink> Node<P, S> {
    pub fn new(pwm: P, sink: S) -> Self {
        Self {
            extractor: FrameExtractor::new(),
            dispatcher: CommandDispatcher::new(),
            state: DeviceState::new(),
            pwm,
            sink,
        }
    }

    /// Drain every fully received frame from `rx` and handle it.
    ///
    /// Corrupted frames are consumed and skipped; the pass ends when no
    /// complete frame remains. A single bad input never stops the loop.
    pub fn process_pending<const N: usize>(&mut self, rx: &SharedRingBuffer<N>) {
        loop {
            let extraction = rx.lock(|rb| self.extractor.extract(rb));

            match extraction {
                Extraction::Frame(frame) => self.handle_frame(frame),
                Extraction::Dropped(_) => continue,
                Extraction::Incomplete => break,
            }
        }
    }

    fn handle_frame(&mut self, frame: Frame) {
        if frame.receiver != LOCAL_ID {
            trace!("ignoring frame addressed to {}", frame.receiver);
            return;
        }

        // An empty payload carries no command and gets no response.
        let Some(tokens) = self.dispatcher.parse(&frame.data) else {
            return;
        };

        let mut response = ResponseBuffer::new();
        self.dispatcher
            .execute(&tokens, &mut self.state, &mut self.pwm, &mut response);

        if response.overflowed() {
            warn!(
                "response for {} exceeded the frame payload limit, dropping it",
                frame.sender
            );
            return;
        }

        let reply = Frame {
            sender: LOCAL_ID,
            receiver: frame.sender,
            data: response.into_data(),
        };

        if let Err(err) = send_frame(&mut self.sink, &reply) {
            warn!("failed to serialize response frame: {:?}", err);
        }
    }

    pub fn state(&self) -> &DeviceState {
        &self.state
    }

    pub fn pwm(&self) -> &P {
        &self.pwm
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Extraction counters for diagnostics.
    pub fn extractor(&self) -> &FrameExtractor {
        &self.extractor
    }
}
