//! Pulse-train channel
//!
//! Pairs one decode unit with the running totals for its line.
//!
//! # Draining
//!
//! [`Channel::drain`] pops until the queue reports empty, re-checking the
//! depth after every pop. Trains that complete while the drain is running
//! are folded into the same `current` sum, so one drain can cover several
//! trains when the poll interval is longer than the train spacing.

use crate::traits::{DecodeError, DecodeUnit, DecoderBank, InstanceId, LineId};

use super::registry::ProgramRegistry;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Result of one successful drain, as handed to the report sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Report {
    /// Line the pulses arrived on
    pub line_id: LineId,
    /// Total raw queue entries consumed so far
    pub report_count: u32,
    /// Pulses consumed by this drain
    pub current: u32,
    /// Pulses consumed since construction (wrapping)
    pub cumulative: u32,
    /// The hardware queue overflowed before the most recent successful drain
    pub overflowed: bool,
}

/// One input line bound to one decode unit
pub struct Channel<U> {
    line_id: LineId,
    instance_id: InstanceId,
    unit: U,
    current: u32,
    cumulative: u32,
    report_count: u32,
    overflow_count: u32,
    last_overflowed: bool,
}

impl<U: DecodeUnit> Channel<U> {
    /// Bind a line to a decode unit and start it
    ///
    /// The program is resolved through `registry`, so it is loaded into
    /// `bank` only by the first channel. The unit counts from the moment
    /// this returns; call [`clear_queue`](Self::clear_queue) before
    /// polling if stale trains must be discarded.
    pub fn new<B>(
        bank: &mut B,
        registry: &mut ProgramRegistry<B::Program>,
        line_id: LineId,
        line: B::Line,
        instance_id: InstanceId,
    ) -> Result<Self, DecodeError>
    where
        B: DecoderBank<Unit = U>,
    {
        let program = registry.ensure_loaded(bank)?;
        let unit = bank.configure(line, program, instance_id)?;
        Ok(Self::from_unit(line_id, instance_id, unit))
    }

    /// Wrap a unit that is already configured and running
    pub fn from_unit(line_id: LineId, instance_id: InstanceId, unit: U) -> Self {
        Self {
            line_id,
            instance_id,
            unit,
            current: 0,
            cumulative: 0,
            report_count: 0,
            overflow_count: 0,
            last_overflowed: false,
        }
    }

    /// Discard queued counts without touching the totals
    pub fn clear_queue(&mut self) {
        self.unit.clear_queue();
    }

    /// Consume everything queued
    ///
    /// Returns `false` without touching the totals or the overflow flag
    /// when nothing was queued. `current` is reset to 0 either way.
    pub fn drain(&mut self) -> bool {
        self.current = 0;

        if self.unit.queue_depth() == 0 {
            return false;
        }

        self.last_overflowed = false;

        while self.unit.queue_depth() > 0 {
            let raw = self.unit.pop_raw();
            self.current = self.current.wrapping_add(raw);
            self.report_count = self.report_count.wrapping_add(1);
        }

        self.cumulative = self.cumulative.wrapping_add(self.current);

        if self.unit.take_overflow() {
            self.last_overflowed = true;
            self.overflow_count = self.overflow_count.wrapping_add(1);
        }

        true
    }

    /// Snapshot of the most recent drain
    pub fn report(&self) -> Report {
        Report {
            line_id: self.line_id,
            report_count: self.report_count,
            current: self.current,
            cumulative: self.cumulative,
            overflowed: self.last_overflowed,
        }
    }
}

impl<U> Channel<U> {
    /// Pulses consumed by the most recent drain
    pub fn current(&self) -> u32 {
        self.current
    }

    /// Pulses consumed since construction (wrapping)
    pub fn cumulative(&self) -> u32 {
        self.cumulative
    }

    /// Raw queue entries consumed since construction
    pub fn report_count(&self) -> u32 {
        self.report_count
    }

    /// Drains that found the hardware queue had overflowed
    pub fn overflow_count(&self) -> u32 {
        self.overflow_count
    }

    /// Input line
    pub fn line_id(&self) -> LineId {
        self.line_id
    }

    /// Decode unit index within its bank
    pub fn instance_id(&self) -> InstanceId {
        self.instance_id
    }

    /// Underlying decode unit
    pub fn unit(&self) -> &U {
        &self.unit
    }
}
