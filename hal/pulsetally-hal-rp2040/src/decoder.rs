//! PIO-backed decode bank and decode units
//!
//! A [`PioDecodeBank`] owns one PIO block: its instruction memory and
//! its four state machines. Channels borrow a state machine each through
//! [`DecoderBank::configure`]; the bank refuses to hand the same state
//! machine out twice.

use embassy_rp::pio::{
    Common, Config, Direction as PioDirection, Instance, LoadedProgram, Pin, Pio, ShiftConfig,
    ShiftDirection, StateMachine,
};
use fixed::types::U24F8;

use pulsetally_core::config::DecoderConfig;
use pulsetally_core::traits::{DecodeError, DecodeUnit, DecoderBank, InstanceId, LineId};

use crate::pins::LinePins;
use crate::pio::{decode_program, DecodeTiming};

/// State machines per PIO block
pub const SM_COUNT: usize = 4;

/// Any of the four state machines of a PIO block
///
/// Embassy types each state machine by its index; this erases the index
/// so units can be picked at runtime from config.
pub enum AnyStateMachine<'d, PIO: Instance> {
    Sm0(StateMachine<'d, PIO, 0>),
    Sm1(StateMachine<'d, PIO, 1>),
    Sm2(StateMachine<'d, PIO, 2>),
    Sm3(StateMachine<'d, PIO, 3>),
}

/// Run `$body` with `$sm` bound to the concrete state machine
macro_rules! with_sm {
    ($any:expr, $sm:ident => $body:expr) => {
        match $any {
            AnyStateMachine::Sm0($sm) => $body,
            AnyStateMachine::Sm1($sm) => $body,
            AnyStateMachine::Sm2($sm) => $body,
            AnyStateMachine::Sm3($sm) => $body,
        }
    };
}

impl<'d, PIO: Instance> AnyStateMachine<'d, PIO> {
    /// State machine index
    pub fn index(&self) -> InstanceId {
        match self {
            AnyStateMachine::Sm0(_) => 0,
            AnyStateMachine::Sm1(_) => 1,
            AnyStateMachine::Sm2(_) => 2,
            AnyStateMachine::Sm3(_) => 3,
        }
    }
}

/// One PIO block used as a pulse-train decoder bank
pub struct PioDecodeBank<'d, PIO: Instance> {
    common: Common<'d, PIO>,
    slots: [Option<AnyStateMachine<'d, PIO>>; SM_COUNT],
    timing: DecodeTiming,
}

impl<'d, PIO: Instance> PioDecodeBank<'d, PIO> {
    /// Take over a PIO block
    ///
    /// All units configured through this bank share `config`'s timing.
    pub fn new(pio: Pio<'d, PIO>, config: &DecoderConfig) -> Self {
        let Pio {
            common,
            sm0,
            sm1,
            sm2,
            sm3,
            ..
        } = pio;

        Self {
            common,
            slots: [
                Some(AnyStateMachine::Sm0(sm0)),
                Some(AnyStateMachine::Sm1(sm1)),
                Some(AnyStateMachine::Sm2(sm2)),
                Some(AnyStateMachine::Sm3(sm3)),
            ],
            timing: DecodeTiming::from_config(config),
        }
    }

    /// Hand GPIO `line` over to this PIO block
    pub fn bind_line(
        &mut self,
        pins: &mut LinePins,
        line: LineId,
    ) -> Result<Pin<'d, PIO>, DecodeError> {
        pins.take_pio_pin(&mut self.common, line)
    }

    /// Register values applied to every unit
    pub fn timing(&self) -> DecodeTiming {
        self.timing
    }
}

impl<'d, PIO: Instance> DecoderBank for PioDecodeBank<'d, PIO> {
    type Program = LoadedProgram<'d, PIO>;
    type Line = Pin<'d, PIO>;
    type Unit = PioDecodeUnit<'d, PIO>;

    fn load_program(&mut self) -> Result<LoadedProgram<'d, PIO>, DecodeError> {
        self.common
            .try_load_program(&decode_program())
            .map_err(|_| DecodeError::ProgramMemoryFull)
    }

    fn configure(
        &mut self,
        line: Pin<'d, PIO>,
        program: &LoadedProgram<'d, PIO>,
        instance: InstanceId,
    ) -> Result<PioDecodeUnit<'d, PIO>, DecodeError> {
        let index = instance as usize;
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(DecodeError::InvalidInstance(instance))?;
        let mut sm = slot.take().ok_or(DecodeError::InstanceInUse(instance))?;

        let mut cfg = Config::default();
        cfg.use_program(program, &[]);
        // `wait` reads IN pin 0, `jmp pin` reads the JMP pin; both are the line
        cfg.set_in_pins(&[&line]);
        cfg.set_jmp_pin(&line);
        cfg.shift_in = ShiftConfig {
            threshold: 32,
            direction: ShiftDirection::Left,
            auto_fill: false,
        };
        cfg.clock_divider = U24F8::from_bits(self.timing.divider_bits);

        let pause_loops = self.timing.pause_loops;
        let started = with_sm!(&mut sm, s => {
            s.set_config(&cfg);
            s.set_pin_dirs(PioDirection::In, &[&line]);
            // Consumed by the program's `pull block` before the wrap target
            if s.tx().try_push(pause_loops) {
                s.set_enable(true);
                true
            } else {
                false
            }
        });

        if !started {
            self.slots[index] = Some(sm);
            return Err(DecodeError::ConfigRejected);
        }

        Ok(PioDecodeUnit { sm, _line: line })
    }
}

/// One state machine counting pulse trains on one line
pub struct PioDecodeUnit<'d, PIO: Instance> {
    sm: AnyStateMachine<'d, PIO>,
    _line: Pin<'d, PIO>,
}

impl<'d, PIO: Instance> PioDecodeUnit<'d, PIO> {
    /// State machine index
    pub fn instance(&self) -> InstanceId {
        self.sm.index()
    }
}

impl<'d, PIO: Instance> DecodeUnit for PioDecodeUnit<'d, PIO> {
    fn queue_depth(&mut self) -> u32 {
        with_sm!(&mut self.sm, s => s.rx().level() as u32)
    }

    fn pop_raw(&mut self) -> u32 {
        with_sm!(&mut self.sm, s => s.rx().pull())
    }

    fn clear_queue(&mut self) {
        // Drain RX only; clearing both FIFOs could drop a timeout the
        // program has not pulled yet
        with_sm!(&mut self.sm, s => {
            while s.rx().try_pull().is_some() {}
            // Reading RXSTALL clears it; a stall from before the clear is stale
            let _ = s.rx().stalled();
        })
    }

    fn take_overflow(&mut self) -> bool {
        with_sm!(&mut self.sm, s => s.rx().stalled())
    }
}
