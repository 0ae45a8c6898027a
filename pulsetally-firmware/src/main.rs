//! Pulsetally - Pulse-Train Decoder Firmware
//!
//! Main firmware binary for RP2040-based boards. Each configured input
//! line is counted by its own PIO state machine; one task drains the
//! state machine FIFOs and logs per-line totals.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio::{InterruptHandler, Pio};
use heapless::Vec;
use {defmt_rtt as _, panic_probe as _};

use pulsetally_core::channel::{Channel, ProgramRegistry};
use pulsetally_core::config::MAX_CHANNELS;
use pulsetally_hal_rp2040::{LinePins, PioDecodeBank};

use crate::tasks::DecodeChannel;

/// Embedded decoder configuration (compiled into firmware)
/// Edit decoder.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../decoder.toml");

mod config;
mod tasks;

bind_interrupts!(struct Irqs {
    PIO0_IRQ_0 => InterruptHandler<PIO0>;
});

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Pulsetally firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = config::load(EMBEDDED_CONFIG);

    // Pins are handed out by number from the config
    let (mut pins, rest) = LinePins::from_peripherals(p);

    let pio = Pio::new(rest.pio0, Irqs);
    let mut bank = PioDecodeBank::new(pio, &config.decoder);
    let mut registry = ProgramRegistry::new();

    // Channels are built one after another before polling starts; the
    // first one loads the decode program, the rest reuse it
    let mut channels: Vec<DecodeChannel, MAX_CHANNELS> = Vec::new();
    for channel_config in &config.channels {
        let built = bank
            .bind_line(&mut pins, channel_config.pin)
            .and_then(|line| {
                Channel::new(
                    &mut bank,
                    &mut registry,
                    channel_config.pin,
                    line,
                    channel_config.instance,
                )
            });

        let mut channel = match built {
            Ok(channel) => channel,
            Err(e) => defmt::panic!(
                "Channel {} (gpio{}, sm{}) failed: {}",
                channel_config.name, channel_config.pin, channel_config.instance, e
            ),
        };

        // Trains counted before now are stale
        channel.clear_queue();

        debug!(
            "Channel {} on gpio{} bound to sm{}, queue cleared",
            channel_config.name,
            channel.line_id(),
            channel.unit().instance()
        );

        if channels.push(channel).is_err() {
            defmt::panic!("More than {} channels configured", MAX_CHANNELS);
        }
    }

    if let Some(program) = registry.program() {
        info!(
            "Decode program loaded once at offset {} for {} channel(s)",
            program.origin,
            channels.len()
        );
    }

    spawner
        .spawn(tasks::poll_task(channels, config.channels.clone(), config.poll))
        .unwrap();

    info!("All tasks spawned, firmware running");

    // The bank and registry stay alive here for the life of the firmware
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
