//! Configuration loading
//!
//! The config text is compiled into the firmware and already checked by
//! build.rs, so any error here is fatal.

use defmt::*;

use pulsetally_core::config::{load_config, Config};
use pulsetally_hal_rp2040::decoder::SM_COUNT;
use pulsetally_hal_rp2040::pio::{min_pulse_width_ns, DecodeTiming};

/// Parse and validate the embedded configuration
///
/// Halts on any error; there is no useful way to run with a broken
/// channel list.
pub fn load(text: &str) -> Config {
    let config = match load_config(text, SM_COUNT as u8) {
        Ok(config) => config,
        Err(e) => defmt::panic!("decoder.toml: {}", e),
    };

    let timing = DecodeTiming::from_config(&config.decoder);
    info!(
        "Decoder config: pause={}us divider={} ({} pause loops, min pulse {}ns)",
        config.decoder.pause_us,
        config.decoder.clock_divider,
        timing.pause_loops,
        min_pulse_width_ns(config.decoder.clock_divider)
    );
    info!(
        "Poll config: backoff={}ms, {} channel(s)",
        config.poll.backoff_ms,
        config.channels.len()
    );

    config
}
