//! Pulse decoder traits
//!
//! A decoder bank is one shared peripheral (e.g. an RP2040 PIO block)
//! with a fixed amount of instruction memory and a handful of decode
//! units. Each unit counts the pulses of one input line and queues a
//! count every time a train is followed by an idle pause.

/// Physical input line identifier (GPIO number on RP2040)
pub type LineId = u8;

/// Decode unit index within a bank (state machine number on RP2040)
pub type InstanceId = u8;

/// Errors raised while setting up decode hardware
///
/// All of these are configuration errors found at startup; none of
/// them can occur once polling has begun.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DecodeError {
    /// Instruction memory has no room for the decode program
    ProgramMemoryFull,
    /// Instance id does not exist in this bank
    InvalidInstance(InstanceId),
    /// Instance id is already bound to another channel
    InstanceInUse(InstanceId),
    /// Line cannot be used as a decoder input
    LineUnavailable(LineId),
    /// The unit refused its configuration (e.g. timeout preload failed)
    ConfigRejected,
}

/// One hardware decode unit bound to one input line
///
/// The unit fills its queue on its own; the host only ever reads.
/// The queue is single-producer/single-consumer, so no locking is
/// needed beyond the depth the hardware reports.
pub trait DecodeUnit {
    /// Number of completed-train counts waiting in the queue
    ///
    /// Must be free of side effects.
    fn queue_depth(&mut self) -> u32;

    /// Remove and return the oldest queued count
    ///
    /// Only valid when `queue_depth() > 0`.
    fn pop_raw(&mut self) -> u32;

    /// Discard everything currently queued
    ///
    /// A pending overflow is discarded too, so the next
    /// [`take_overflow`](Self::take_overflow) only reports overflows that
    /// happen after the clear.
    fn clear_queue(&mut self);

    /// Report (and reset) whether the queue overflowed since the last call
    ///
    /// Units that cannot detect overflow keep the default.
    fn take_overflow(&mut self) -> bool {
        false
    }
}

/// A shared peripheral that hosts the decode program and its units
pub trait DecoderBank {
    /// Handle to the installed decode program
    type Program;
    /// Physical line as the bank wants it handed over
    type Line;
    /// Configured decode unit
    type Unit: DecodeUnit;

    /// Install the decode program into instruction memory
    ///
    /// Each call consumes memory; callers go through
    /// [`ProgramRegistry`](crate::channel::ProgramRegistry) so this
    /// runs once per bank.
    fn load_program(&mut self) -> Result<Self::Program, DecodeError>;

    /// Bind `line` to unit `instance`, point it at `program` and enable it
    ///
    /// The unit starts counting immediately.
    fn configure(
        &mut self,
        line: Self::Line,
        program: &Self::Program,
        instance: InstanceId,
    ) -> Result<Self::Unit, DecodeError>;
}
