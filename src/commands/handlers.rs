//! Command handlers and the device state they mutate.
//!
//! State lives in [`DeviceState`], constructed once at startup and touched
//! only from these handlers; STATUS reads it back. Handlers never fail
//! outward: every outcome becomes response content.

use core::fmt::Write;

use heapless::Vec;
use log::debug;

use crate::commands::response::{self, ResponseBuffer};
use crate::config::pwm::MAX_DUTY_CYCLES;
use crate::pwm::PwmControl;

/// PWM generation state owned by the node.
pub struct DeviceState {
    /// Raw timer compare values handed to the backend.
    duty_cycles: Vec<u32, MAX_DUTY_CYCLES>,
    /// Percentages as requested, kept for rescaling on frequency changes.
    user_duty_cycles: Vec<u8, MAX_DUTY_CYCLES>,
    generating: bool,
}

impl DeviceState {
    pub fn new() -> Self {
        let mut duty_cycles = Vec::new();
        let _ = duty_cycles.push(0);

        Self {
            duty_cycles,
            user_duty_cycles: Vec::new(),
            generating: false,
        }
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    pub fn duty_cycles(&self) -> &[u32] {
        &self.duty_cycles
    }

    pub fn user_duty_cycles(&self) -> &[u8] {
        &self.user_duty_cycles
    }
}

impl Default for DeviceState {
    fn default() -> Self {
        Self::new()
    }
}

fn start_generation<P: PwmControl>(state: &mut DeviceState, pwm: &mut P) {
    state.generating = true;
    pwm.start(&state.duty_cycles);
}

fn stop_generation<P: PwmControl>(state: &mut DeviceState, pwm: &mut P) {
    state.generating = false;
    pwm.stop();
}

/// ON: enable output generation. Idempotent.
pub(crate) fn pwm_on<P: PwmControl>(state: &mut DeviceState, pwm: &mut P, out: &mut ResponseBuffer) {
    if !state.generating {
        start_generation(state, pwm);
    }

    let _ = out.write_str(response::PWM_ON);
}

/// OFF: disable output generation. Idempotent.
pub(crate) fn pwm_off<P: PwmControl>(
    state: &mut DeviceState,
    pwm: &mut P,
    out: &mut ResponseBuffer,
) {
    if state.generating {
        stop_generation(state, pwm);
    }

    let _ = out.write_str(response::PWM_OFF);
}

/// SET_FREQ: reprogram the timer period for the requested frequency and
/// rescale the stored duty cycles against it.
pub(crate) fn set_freq<P: PwmControl>(
    state: &mut DeviceState,
    pwm: &mut P,
    args: &[&[u8]],
    out: &mut ResponseBuffer,
) {
    let Some(hz) = args.first().and_then(|arg| parse_u32(arg)) else {
        let _ = out.write_str(response::INVALID_ARGUMENT);
        return;
    };

    if hz == 0 {
        let _ = out.write_str(response::INVALID_FREQUENCY);
        return;
    }

    let period = pwm.input_clock_hz() / hz;
    if period == 0 {
        let _ = out.write_str(response::INVALID_FREQUENCY);
        return;
    }

    let restore = state.generating;
    if restore {
        stop_generation(state, pwm);
    }

    pwm.set_period(period);
    for (raw, &pct) in state
        .duty_cycles
        .iter_mut()
        .zip(state.user_duty_cycles.iter())
    {
        *raw = (pct as u64 * period as u64 / 100) as u32;
    }

    if restore {
        start_generation(state, pwm);
    }

    debug!("frequency set to {} Hz (period {})", hz, period);
    let _ = write!(out, "{} {}", response::FREQ_CHANGED, hz);
}

/// SET_DUTY_CYCLES: replace the duty-cycle set. All-or-nothing: one bad
/// value rejects the request and the previous state stays untouched.
pub(crate) fn set_duty_cycles<P: PwmControl>(
    state: &mut DeviceState,
    pwm: &mut P,
    args: &[&[u8]],
    out: &mut ResponseBuffer,
) {
    let period = pwm.period().max(1);
    let mut duty_cycles: Vec<u32, MAX_DUTY_CYCLES> = Vec::new();
    let mut user_duty_cycles: Vec<u8, MAX_DUTY_CYCLES> = Vec::new();

    for arg in args {
        let Some(pct) = parse_u32(arg) else {
            let _ = out.write_str(response::INVALID_ARGUMENT);
            return;
        };
        if pct > 100 {
            let _ = out.write_str(response::INVALID_DUTY_CYCLE);
            return;
        }

        // Arity validation caps the argument count, so these never fail.
        let _ = user_duty_cycles.push(pct as u8);
        let _ = duty_cycles.push((pct as u64 * period as u64 / 100) as u32);
    }

    let restore = state.generating;
    if restore {
        stop_generation(state, pwm);
    }

    state.duty_cycles = duty_cycles;
    state.user_duty_cycles = user_duty_cycles;

    if restore {
        start_generation(state, pwm);
    }

    let _ = out.write_str(response::DUTY_CYCLES_CHANGED);
    for arg in args {
        out.write_bytes(b" ");
        out.write_bytes(arg);
    }
}

/// STATUS: report the generation flag, effective frequency and every duty
/// cycle as a percentage.
pub(crate) fn status<P: PwmControl>(
    state: &mut DeviceState,
    pwm: &mut P,
    out: &mut ResponseBuffer,
) {
    let period = pwm.period().max(1) as u64;
    let freq = pwm.input_clock_hz() as u64 / period;

    let _ = write!(
        out,
        "{} {} {}",
        response::STATUS_RESP,
        state.generating as u8,
        freq
    );

    for &raw in state.duty_cycles.iter() {
        let pct = raw as u64 * 100 / period;
        let _ = write!(out, " {}", pct);
    }
}

/// Parse a full-width unsigned decimal token. Rejects empty input, stray
/// characters and overflow.
fn parse_u32(bytes: &[u8]) -> Option<u32> {
    if bytes.is_empty() {
        return None;
    }

    let mut value: u32 = 0;
    for &byte in bytes {
        if !byte.is_ascii_digit() {
            return None;
        }
        value = value
            .checked_mul(10)?
            .checked_add((byte - b'0') as u32)?;
    }
    Some(value)
}
