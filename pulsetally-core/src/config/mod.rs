//! Configuration types
//!
//! Configuration is read from a small TOML file compiled into the
//! firmware. The types here are plain data; [`parse`] turns text into a
//! [`Config`] and [`Config::validate`] checks it before any hardware is
//! touched.

pub mod parse;

pub use parse::{parse_config, ParseError};

use heapless::{String, Vec};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::channel::poller::DEFAULT_BACKOFF_MS;
use crate::traits::{InstanceId, LineId};

/// Maximum channels per config (one per state machine on a PIO block)
pub const MAX_CHANNELS: usize = 4;

/// Maximum length of a channel name
pub const MAX_NAME_LEN: usize = 16;

/// Highest GPIO number usable as an input line
pub const MAX_LINE: LineId = 29;

/// Default idle time that ends a pulse train
pub const DEFAULT_PAUSE_US: u32 = 1000;

/// Decode program timing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecoderConfig {
    /// Line must stay low this long for a train to be complete
    pub pause_us: u32,
    /// Integer clock divider for the decode units
    pub clock_divider: u16,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            pause_us: DEFAULT_PAUSE_US,
            clock_divider: 1,
        }
    }
}

/// Polling driver settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PollConfig {
    /// Sleep after a cycle in which no channel had data
    pub backoff_ms: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            backoff_ms: DEFAULT_BACKOFF_MS,
        }
    }
}

/// One input line and the decode unit it is bound to
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ChannelConfig {
    /// Name used in log output
    pub name: String<MAX_NAME_LEN>,
    /// GPIO number of the input
    pub pin: LineId,
    /// State machine index
    pub instance: InstanceId,
}

/// Complete decoder configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    pub decoder: DecoderConfig,
    pub poll: PollConfig,
    pub channels: Vec<ChannelConfig, MAX_CHANNELS>,
}

/// Problems found by [`Config::validate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// No `[channel ...]` sections
    NoChannels,
    /// Pin number does not exist
    InvalidPin(LineId),
    /// Two channels share a pin
    DuplicatePin(LineId),
    /// Instance index outside the bank
    InvalidInstance(InstanceId),
    /// Two channels share a decode unit
    DuplicateInstance(InstanceId),
    /// Pause must be non-zero
    ZeroPause,
    /// Clock divider must be non-zero
    ZeroDivider,
}

/// Why the embedded config could not be used
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LoadError {
    Parse(ParseError),
    Invalid(ConfigError),
}

impl From<ParseError> for LoadError {
    fn from(e: ParseError) -> Self {
        LoadError::Parse(e)
    }
}

impl From<ConfigError> for LoadError {
    fn from(e: ConfigError) -> Self {
        LoadError::Invalid(e)
    }
}

/// Parse `text` and check it fits a bank of `units` decode units
pub fn load_config(text: &str, units: u8) -> Result<Config, LoadError> {
    let config = parse_config(text)?;
    config.validate(units)?;
    Ok(config)
}

impl Config {
    /// Create an empty config with default timing
    pub fn new() -> Self {
        Self::default()
    }

    /// Find a channel by name
    pub fn find_channel(&self, name: &str) -> Option<&ChannelConfig> {
        self.channels.iter().find(|c| c.name.as_str() == name)
    }

    /// Check the config can be applied to one bank of `units` decode units
    pub fn validate(&self, units: u8) -> Result<(), ConfigError> {
        if self.channels.is_empty() {
            return Err(ConfigError::NoChannels);
        }
        if self.decoder.pause_us == 0 {
            return Err(ConfigError::ZeroPause);
        }
        if self.decoder.clock_divider == 0 {
            return Err(ConfigError::ZeroDivider);
        }

        for (i, channel) in self.channels.iter().enumerate() {
            if channel.pin > MAX_LINE {
                return Err(ConfigError::InvalidPin(channel.pin));
            }
            if channel.instance >= units {
                return Err(ConfigError::InvalidInstance(channel.instance));
            }

            for other in &self.channels[..i] {
                if other.pin == channel.pin {
                    return Err(ConfigError::DuplicatePin(channel.pin));
                }
                if other.instance == channel.instance {
                    return Err(ConfigError::DuplicateInstance(channel.instance));
                }
            }
        }

        Ok(())
    }
}
