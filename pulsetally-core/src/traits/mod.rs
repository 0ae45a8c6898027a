//! Hardware abstraction traits
//!
//! These traits define the interface between the channel logic
//! and the peripheral that actually counts pulses.

pub mod decoder;

pub use decoder::{DecodeError, DecodeUnit, DecoderBank, InstanceId, LineId};
