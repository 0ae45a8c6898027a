//! RP2040-specific HAL for the pulse-train decoder firmware
//!
//! This crate implements the `pulsetally-core` decoder traits on top of
//! the RP2040's Programmable I/O blocks:
//!
//! - PIO decode program and timing math
//! - Decode bank (one PIO block, four state machines)
//! - Decode unit (one state machine bound to one input line)
//! - Config-driven input pin allocation

#![no_std]

pub mod decoder;
pub mod pins;
pub mod pio;

pub use decoder::{AnyStateMachine, PioDecodeBank, PioDecodeUnit};
pub use pins::{BoardPeripherals, LinePins};
