//! Command tokenisation and dispatch.
//!
//! A frame payload is split into space-delimited tokens; the first token is
//! matched case-sensitively against a fixed command table, arity is
//! validated and the handler runs. Every outcome, including lookup and arity
//! failures, is written into the response buffer: dispatch itself never
//! fails.

use core::fmt::Write;

use heapless::Vec;

use crate::commands::handlers::{self, DeviceState};
use crate::commands::response::{self, ResponseBuffer};
use crate::config::pwm::MAX_DUTY_CYCLES;
use crate::pwm::PwmControl;

/// Most tokens a payload can produce: the command name plus the widest
/// argument list in the table.
pub const MAX_COMMAND_TOKENS: usize = MAX_DUTY_CYCLES + 1;

/// Closed set of commands this node understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    PwmOn,
    PwmOff,
    SetFreq,
    SetDutyCycles,
    Status,
}

/// One command table entry: name, handler selector and inclusive argument
/// arity range.
pub struct CommandSpec {
    pub name: &'static str,
    pub kind: CommandKind,
    pub min_args: usize,
    pub max_args: usize,
}

/// Supported commands. Built once, never mutated at runtime.
pub static COMMAND_TABLE: [CommandSpec; 5] = [
    CommandSpec {
        name: "ON",
        kind: CommandKind::PwmOn,
        min_args: 0,
        max_args: 0,
    },
    CommandSpec {
        name: "OFF",
        kind: CommandKind::PwmOff,
        min_args: 0,
        max_args: 0,
    },
    CommandSpec {
        name: "SET_FREQ",
        kind: CommandKind::SetFreq,
        min_args: 1,
        max_args: 1,
    },
    CommandSpec {
        name: "SET_DUTY_CYCLES",
        kind: CommandKind::SetDutyCycles,
        min_args: 1,
        max_args: MAX_DUTY_CYCLES,
    },
    CommandSpec {
        name: "STATUS",
        kind: CommandKind::Status,
        min_args: 0,
        max_args: 0,
    },
];

/// Tokenised payload. The first token is the command name.
pub struct Tokens<'a> {
    items: Vec<&'a [u8], MAX_COMMAND_TOKENS>,
    truncated: bool,
}

impl<'a> Tokens<'a> {
    /// The command name token.
    pub fn first(&self) -> Option<&'a [u8]> {
        self.items.first().copied()
    }

    /// Everything after the command name.
    pub fn args(&self) -> &[&'a [u8]] {
        self.items.get(1..).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// True when the payload held more tokens than fit. A truncated list
    /// always fails arity validation.
    pub fn truncated(&self) -> bool {
        self.truncated
    }
}

/// Lookup-validate-invoke dispatcher over [`COMMAND_TABLE`].
pub struct CommandDispatcher;

impl CommandDispatcher {
    pub const fn new() -> Self {
        Self
    }

    /// Split a payload on spaces into non-empty tokens.
    ///
    /// Consecutive or trailing delimiters produce no empty tokens. Returns
    /// `None` when nothing remains, which the caller treats as "no command,
    /// no response".
    pub fn parse<'a>(&self, payload: &'a [u8]) -> Option<Tokens<'a>> {
        let mut items: Vec<&[u8], MAX_COMMAND_TOKENS> = Vec::new();
        let mut truncated = false;

        for token in payload.split(|&byte| byte == b' ') {
            if token.is_empty() {
                continue;
            }
            if items.push(token).is_err() {
                truncated = true;
                break;
            }
        }

        if items.is_empty() {
            None
        } else {
            Some(Tokens { items, truncated })
        }
    }

    /// Look up the command, validate arity and run its handler.
    ///
    /// Exactly one handler runs per call; failures are encoded as response
    /// content, never propagated.
    pub fn execute<P: PwmControl>(
        &self,
        tokens: &Tokens<'_>,
        state: &mut DeviceState,
        pwm: &mut P,
        out: &mut ResponseBuffer,
    ) {
        let Some(name) = tokens.first() else {
            let _ = out.write_str(response::UNKNOWN_COMMAND);
            return;
        };

        let Some(spec) = COMMAND_TABLE
            .iter()
            .find(|spec| spec.name.as_bytes() == name)
        else {
            let _ = out.write_str(response::UNKNOWN_COMMAND);
            return;
        };

        let args = tokens.args();
        if tokens.truncated() || args.len() < spec.min_args || args.len() > spec.max_args {
            let _ = out.write_str(response::INVALID_ARGUMENT);
            return;
        }

        match spec.kind {
            CommandKind::PwmOn => handlers::pwm_on(state, pwm, out),
            CommandKind::PwmOff => handlers::pwm_off(state, pwm, out),
            CommandKind::SetFreq => handlers::set_freq(state, pwm, args, out),
            CommandKind::SetDutyCycles => handlers::set_duty_cycles(state, pwm, args, out),
            CommandKind::Status => handlers::status(state, pwm, out),
        }
    }
}

impl Default for CommandDispatcher {
    fn default() -> Self {
        Self::new()
    }
}
