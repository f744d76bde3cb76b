//! PWM backend interface.
//!
//! The actual timer driver lives outside this crate; command handlers only
//! see this trait. A mock implementation records calls for unit tests.

/// Hardware PWM control consumed by the command handlers.
///
/// Only command handlers invoke these operations, never the codec or buffer
/// layers.
pub trait PwmControl {
    /// Begin output generation with the given raw compare values.
    fn start(&mut self, duty_cycles: &[u32]);

    /// Stop output generation.
    fn stop(&mut self);

    /// Reprogram the timer period. `raw` is at least 1.
    fn set_period(&mut self, raw: u32);

    /// Currently configured timer period. Implementations return at least 1.
    fn period(&self) -> u32;

    /// Timer input clock in hertz.
    fn input_clock_hz(&self) -> u32;
}
