//! Config-driven input pin allocation
//!
//! Decoder inputs come from the config file as GPIO numbers, but embassy
//! types every pin individually. [`LinePins`] holds all GPIOs and hands
//! them out by number, already converted to PIO pins.

use embassy_rp::peripherals::{self, PIO0, PIO1};
use embassy_rp::pio::{Common, Instance, Pin};
use embassy_rp::{Peri, Peripherals};

use pulsetally_core::traits::{DecodeError, LineId};

/// Peripherals left over once the GPIOs are in a [`LinePins`]
pub struct BoardPeripherals {
    pub pio0: Peri<'static, PIO0>,
    pub pio1: Peri<'static, PIO1>,
}

macro_rules! line_pins {
    ($($num:literal => $field:ident: $pin:ident),* $(,)?) => {
        /// Every GPIO that can feed a decode unit, taken by number
        pub struct LinePins {
            $($field: Option<Peri<'static, peripherals::$pin>>,)*
        }

        impl LinePins {
            /// Split the GPIOs out of the peripherals
            pub fn from_peripherals(p: Peripherals) -> (Self, BoardPeripherals) {
                let pins = Self {
                    $($field: Some(p.$pin),)*
                };
                let rest = BoardPeripherals {
                    pio0: p.PIO0,
                    pio1: p.PIO1,
                };
                (pins, rest)
            }

            /// Take GPIO `line` and hand it to a PIO block
            ///
            /// Fails if the number does not exist or the pin was taken.
            pub fn take_pio_pin<'d, PIO: Instance>(
                &mut self,
                common: &mut Common<'d, PIO>,
                line: LineId,
            ) -> Result<Pin<'d, PIO>, DecodeError> {
                match line {
                    $($num => {
                        let pin = self.$field.take().ok_or(DecodeError::LineUnavailable(line))?;
                        Ok(common.make_pio_pin(pin))
                    })*
                    _ => Err(DecodeError::LineUnavailable(line)),
                }
            }
        }
    };
}

line_pins! {
    0 => pin0: PIN_0,
    1 => pin1: PIN_1,
    2 => pin2: PIN_2,
    3 => pin3: PIN_3,
    4 => pin4: PIN_4,
    5 => pin5: PIN_5,
    6 => pin6: PIN_6,
    7 => pin7: PIN_7,
    8 => pin8: PIN_8,
    9 => pin9: PIN_9,
    10 => pin10: PIN_10,
    11 => pin11: PIN_11,
    12 => pin12: PIN_12,
    13 => pin13: PIN_13,
    14 => pin14: PIN_14,
    15 => pin15: PIN_15,
    16 => pin16: PIN_16,
    17 => pin17: PIN_17,
    18 => pin18: PIN_18,
    19 => pin19: PIN_19,
    20 => pin20: PIN_20,
    21 => pin21: PIN_21,
    22 => pin22: PIN_22,
    23 => pin23: PIN_23,
    24 => pin24: PIN_24,
    25 => pin25: PIN_25,
    26 => pin26: PIN_26,
    27 => pin27: PIN_27,
    28 => pin28: PIN_28,
    29 => pin29: PIN_29,
}
