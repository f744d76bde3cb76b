//! Interrupt-shared ring buffer.
//!
//! Wraps a [`RingBuffer`] in a critical-section mutex so one interrupt
//! context can produce bytes while the main loop consumes them. The cursors
//! are never reachable outside a critical section.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::buffer::RingBuffer;

/// Single-producer/single-consumer byte channel between an interrupt and the
/// main loop.
///
/// Exactly one producer context and one consumer context may operate on an
/// instance. Producer-side calls mask interrupts for a single-byte span; the
/// consumer's [`lock`](Self::lock) holds the critical section for one bounded
/// pass over the buffered bytes.
///
/// `new` is const, so instances can be statically allocated, one per
/// direction:
///
/// ```ignore
/// static RX_BUFFER: SharedRingBuffer<RX_BUFFER_SIZE> = SharedRingBuffer::new();
/// ```
pub struct SharedRingBuffer<const N: usize> {
    inner: Mutex<CriticalSectionRawMutex, RefCell<RingBuffer<N>>>,
}

impl<const N: usize> SharedRingBuffer<N> {
    /// Create an empty shared ring buffer.
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(RingBuffer::new())),
        }
    }

    /// Producer side: commit one received byte, evicting the oldest byte on
    /// overrun.
    pub fn push_overwrite(&self, byte: u8) {
        self.inner.lock(|rb| rb.borrow_mut().push_overwrite(byte));
    }

    /// Producer side: commit one byte, handing it back when the buffer is
    /// full.
    pub fn try_push(&self, byte: u8) -> Result<(), u8> {
        self.inner.lock(|rb| rb.borrow_mut().try_push(byte))
    }

    /// Consumer side: remove and return the oldest byte.
    pub fn try_pop(&self) -> Option<u8> {
        self.inner.lock(|rb| rb.borrow_mut().try_pop())
    }

    /// Consumer side: run one bounded pass with exclusive buffer access.
    ///
    /// The closure executes inside the critical section; keep the work
    /// proportional to the buffered bytes (a frame-extraction pass), never
    /// unbounded.
    pub fn lock<R>(&self, f: impl FnOnce(&mut RingBuffer<N>) -> R) -> R {
        self.inner.lock(|rb| f(&mut rb.borrow_mut()))
    }

    pub fn occupied(&self) -> usize {
        self.inner.lock(|rb| rb.borrow().occupied())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock(|rb| rb.borrow().is_empty())
    }
}

impl<const N: usize> Default for SharedRingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn produce_then_consume_in_order() {
        let ring: SharedRingBuffer<16> = SharedRingBuffer::new();

        for b in [0x10, 0x20, 0x30] {
            ring.push_overwrite(b);
        }

        assert_eq!(ring.occupied(), 3);
        assert_eq!(ring.try_pop(), Some(0x10));
        assert_eq!(ring.try_pop(), Some(0x20));
        assert_eq!(ring.try_pop(), Some(0x30));
        assert_eq!(ring.try_pop(), None);
    }

    #[test]
    fn try_push_reports_full() {
        let ring: SharedRingBuffer<4> = SharedRingBuffer::new();

        assert_eq!(ring.try_push(1), Ok(()));
        assert_eq!(ring.try_push(2), Ok(()));
        assert_eq!(ring.try_push(3), Ok(()));
        assert_eq!(ring.try_push(4), Err(4));
    }

    #[test]
    fn lock_gives_exclusive_buffer_access() {
        let ring: SharedRingBuffer<16> = SharedRingBuffer::new();
        ring.push_overwrite(0xAB);

        let peeked = ring.lock(|rb| rb.peek(0));
        assert_eq!(peeked, Some(0xAB));
        assert!(!ring.is_empty());
    }

    #[test]
    fn static_instance_is_usable() {
        static RING: SharedRingBuffer<8> = SharedRingBuffer::new();

        RING.push_overwrite(7);
        assert_eq!(RING.try_pop(), Some(7));
    }
}
