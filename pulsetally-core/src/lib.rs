//! Board-agnostic core logic for the pulse-train decoder firmware
//!
//! This crate contains all logic that does not depend on a specific
//! pulse-counting peripheral:
//!
//! - Hardware abstraction traits (decode bank, decode unit)
//! - Shared program registry (load-once decode program)
//! - Channel accumulation and draining
//! - Polling driver with idle backoff
//! - Configuration types and parser

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod channel;
pub mod config;
pub mod traits;

pub use channel::{Channel, CycleOutcome, Poller, ProgramRegistry, Report, ReportSink};
pub use traits::{DecodeError, DecodeUnit, DecoderBank, InstanceId, LineId};
