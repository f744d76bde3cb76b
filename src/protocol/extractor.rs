//! Frame extraction from the receive ring buffer.
//!
//! Scans the buffered bytes for a delimited frame, decodes it in place and
//! consumes everything up to and including the end delimiter, valid or not.

use log::{debug, warn};

use crate::buffer::RingBuffer;
use crate::config::protocol::{BEGIN_FRAME_BYTE, END_FRAME_BYTE};
use crate::protocol::frame::{DeserializeError, Frame};

/// Outcome of one extraction pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// A complete, valid frame was extracted and consumed.
    Frame(Frame),
    /// A complete frame was consumed but failed to decode. The buffer has
    /// advanced past it, so the caller may keep draining.
    Dropped(DeserializeError),
    /// No complete frame is buffered yet. Any partial frame stays in the
    /// buffer and the next pass resumes where this one stopped.
    Incomplete,
}

/// Scans a ring buffer for delimited frames, one per call.
///
/// Repeated calls drain every fully received frame in arrival order. Each
/// frame is consumed exactly once: corrupted frames are dropped, never
/// retried.
pub struct FrameExtractor {
    frames_extracted: u32,
    frames_dropped: u32,
    resyncs: u32,
}

impl FrameExtractor {
    pub const fn new() -> Self {
        Self {
            frames_extracted: 0,
            frames_dropped: 0,
            resyncs: 0,
        }
    }

    /// Run one extraction pass over `rb`.
    ///
    /// The caller provides exclusive buffer access, normally through
    /// [`SharedRingBuffer::lock`](crate::buffer::SharedRingBuffer::lock) so
    /// the pass is atomic with respect to the receive interrupt.
    pub fn extract<const N: usize>(&mut self, rb: &mut RingBuffer<N>) -> Extraction {
        // Skip leading garbage until the consumer cursor sits on a frame
        // start or the buffer runs dry.
        while let Some(byte) = rb.peek(0) {
            if byte == BEGIN_FRAME_BYTE {
                break;
            }
            rb.try_pop();
        }

        if rb.is_empty() {
            return Extraction::Incomplete;
        }

        // Look for the matching end delimiter. A second start delimiter
        // before it means the first frame can never complete: resynchronise
        // on the newer start and report nothing this pass.
        let occupied = rb.occupied();
        let mut end = None;
        for idx in 1..occupied {
            match rb.peek(idx) {
                Some(END_FRAME_BYTE) => {
                    end = Some(idx);
                    break;
                }
                Some(BEGIN_FRAME_BYTE) => {
                    rb.release(idx);
                    self.resyncs += 1;
                    debug!("abandoned partial frame, resynchronised on newer start");
                    return Extraction::Incomplete;
                }
                _ => {}
            }
        }

        // Frame still arriving; leave the cursor on its start byte.
        let Some(end) = end else {
            return Extraction::Incomplete;
        };

        let result = Frame::deserialize_from_ring(rb, end);
        rb.release(end + 1);

        match result {
            Ok(frame) => {
                self.frames_extracted = self.frames_extracted.wrapping_add(1);
                Extraction::Frame(frame)
            }
            Err(err) => {
                self.frames_dropped = self.frames_dropped.wrapping_add(1);
                warn!("dropped corrupted frame: {:?}", err);
                Extraction::Dropped(err)
            }
        }
    }

    /// Frames successfully extracted since construction.
    pub fn frames_extracted(&self) -> u32 {
        self.frames_extracted
    }

    /// Complete frames consumed but discarded as undecodable.
    pub fn frames_dropped(&self) -> u32 {
        self.frames_dropped
    }

    /// Partial frames abandoned in favour of a newer start delimiter.
    pub fn resyncs(&self) -> u32 {
        self.resyncs
    }
}

impl Default for FrameExtractor {
    fn default() -> Self {
        Self::new()
    }
}
