//! PIO pulse-train decode program
//!
//! Uses RP2040's Programmable I/O to count pulses without CPU involvement.
//! Every state machine on a PIO block runs the same program, loaded once.
//!
//! # Program
//!
//! The X register counts down from `0xFFFF_FFFF`, one step per rising
//! edge. After each falling edge the machine waits up to the pause
//! timeout (held in OSR) for the line to rise again. If it does, that is
//! the next pulse of the same train; if the timeout runs out, `!X` is the
//! pulse count and gets pushed to the RX FIFO.
//!
//! The push blocks when the FIFO is full. The machine stalls, pulses in
//! the meantime are missed, and the hardware latches RXSTALL so the host
//! can tell.

use ::pio::{Program, RP2040_MAX_PROGRAM_SIZE};

use pulsetally_core::config::DecoderConfig;

/// System clock frequency (RP2040 default)
pub const SYS_CLK_HZ: u32 = 125_000_000;

/// PIO cycles per iteration of the pause loop (`jmp pin` + `jmp y--`)
pub const PAUSE_LOOP_CYCLES: u32 = 2;

/// RX FIFO depth per state machine (not joined)
pub const RX_FIFO_DEPTH: u32 = 4;

/// Assemble the decode program
pub fn decode_program() -> Program<RP2040_MAX_PROGRAM_SIZE> {
    ::pio::pio_asm!(
        "pull block",    // pause timeout from TX FIFO, kept in OSR
        ".wrap_target",
        "mov x, ~null",  // x counts down from 0xFFFF_FFFF
        "wait 1 pin 0",  // first rising edge of a train
        "count:",
        "jmp x-- high",
        "high:",
        "wait 0 pin 0",
        "mov y, osr",
        "pause:",
        "jmp pin count", // line high again: next pulse of this train
        "jmp y-- pause",
        "mov isr, ~x",   // train complete: pulses = !x
        "push",
        ".wrap"
    )
    .program
}

/// PIO clock for an integer divider
pub fn pio_clock_hz(clock_divider: u16) -> u32 {
    SYS_CLK_HZ / (clock_divider.max(1) as u32)
}

/// Clock divider in the 24.8 fixed-point layout the hardware expects
pub fn clock_divider_bits(clock_divider: u16) -> u32 {
    (clock_divider.max(1) as u32) << 8
}

/// Pause loop iterations for a pause of `pause_us`
///
/// This is the value preloaded into OSR. Never returns 0, so even a
/// tiny pause waits one loop.
pub fn pause_loop_count(pause_us: u32, clock_divider: u16) -> u32 {
    let cycles = pause_us as u64 * pio_clock_hz(clock_divider) as u64 / 1_000_000;
    let loops = cycles / PAUSE_LOOP_CYCLES as u64;
    loops.clamp(1, u32::MAX as u64) as u32
}

/// Shortest high or low level the program is guaranteed to see
///
/// Inside the pause loop the line is only sampled every other cycle.
pub fn min_pulse_width_ns(clock_divider: u16) -> u32 {
    let period_ns = 1_000_000_000 / pio_clock_hz(clock_divider);
    period_ns * PAUSE_LOOP_CYCLES
}

/// Timing derived from a [`DecoderConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DecodeTiming {
    /// Value for the state machine clock divider register
    pub divider_bits: u32,
    /// Pause loop iterations preloaded into OSR
    pub pause_loops: u32,
}

impl DecodeTiming {
    /// Work out register values for `config`
    pub fn from_config(config: &DecoderConfig) -> Self {
        Self {
            divider_bits: clock_divider_bits(config.clock_divider),
            pause_loops: pause_loop_count(config.pause_us, config.clock_divider),
        }
    }
}
