#![cfg_attr(not(test), no_std)]

// Links the host critical-section implementation into test binaries.
#[cfg(test)]
use critical_section as _;

pub mod buffer;
pub mod commands;
pub mod config;
pub mod node;
pub mod protocol;
pub mod pwm;
pub mod serial;
