//! Channel abstraction and polling
//!
//! A [`Channel`] wraps one decode unit and keeps the running totals for
//! its line. The [`ProgramRegistry`] makes sure every channel on a bank
//! shares a single copy of the decode program, and the [`Poller`]
//! services any number of channels from one control flow.

pub mod counter;
pub mod poller;
pub mod registry;

#[cfg(test)]
pub(crate) mod mock;

pub use counter::{Channel, Report};
pub use poller::{CycleOutcome, PollStats, Poller, ReportSink};
pub use registry::ProgramRegistry;
