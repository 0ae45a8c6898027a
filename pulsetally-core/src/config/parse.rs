//! Minimal TOML parser for decoder configuration
//!
//! Handles only the subset the decoder config uses. It does NOT
//! support the full TOML grammar.
//!
//! Supported features:
//! - Key = value pairs (integer, or a quoted `"gpioN"` pin string)
//! - `[decoder]` and `[poll]` section headers
//! - `[channel.name]` section headers
//! - Comments (# ...), including trailing comments
//!
//! NOT supported:
//! - Strings other than pin names
//! - Arrays and inline tables
//! - Multi-line values

use heapless::String;

use heapless::Vec;

use crate::traits::InstanceId;

use super::{ChannelConfig, Config, MAX_CHANNELS, MAX_NAME_LEN};

/// Parse error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ParseError {
    /// Unknown or malformed section header
    InvalidSection,
    /// Line is not `key = value`
    InvalidLine,
    /// Key not valid in the current section
    UnknownKey,
    /// Value is not a number or is out of range
    InvalidValue,
    /// Pin string is not `gpioN`
    InvalidPin,
    /// More channels than the config can hold
    TooManyChannels,
    /// Channel section without a `pin` key
    MissingPin,
    /// No free decode unit left for a channel without `instance`
    NoFreeInstance,
}

/// Current parsing context
#[derive(Debug, Clone, PartialEq)]
enum Section {
    Root,
    Decoder,
    Poll,
    Channel,
}

/// Channel section under construction
struct PendingChannel {
    config: ChannelConfig,
    has_pin: bool,
    has_instance: bool,
}

/// Parse TOML text into a [`Config`]
///
/// Missing sections and keys keep their defaults. A channel without an
/// explicit `instance` gets the lowest index no other channel uses, once
/// the whole file has been read.
pub fn parse_config(input: &str) -> Result<Config, ParseError> {
    let mut config = Config::new();
    let mut section = Section::Root;
    let mut pending: Option<PendingChannel> = None;
    let mut defaulted: Vec<usize, MAX_CHANNELS> = Vec::new();

    for line in input.lines() {
        let line = strip_comment(line).trim();

        if line.is_empty() {
            continue;
        }

        if line.starts_with('[') && line.ends_with(']') {
            save_channel(&mut config, &mut pending, &mut defaulted)?;

            let (next, name) = parse_section_header(&line[1..line.len() - 1])?;
            if next == Section::Channel {
                pending = Some(PendingChannel {
                    config: ChannelConfig {
                        name: name.unwrap_or_default(),
                        pin: 0,
                        instance: 0,
                    },
                    has_pin: false,
                    has_instance: false,
                });
            }
            section = next;
            continue;
        }

        let (key, value) = parse_key_value(line).ok_or(ParseError::InvalidLine)?;
        apply_value(&section, key, value, &mut config, &mut pending)?;
    }

    save_channel(&mut config, &mut pending, &mut defaulted)?;
    assign_default_instances(&mut config, &defaulted)?;

    Ok(config)
}

/// Drop a trailing `# comment`
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

/// Parse a section header like "decoder" or "channel.lmt01"
fn parse_section_header(
    header: &str,
) -> Result<(Section, Option<String<MAX_NAME_LEN>>), ParseError> {
    let header = header.trim();

    let (kind, name) = match header.split_once('.') {
        Some((kind, name)) => (kind.trim(), Some(name.trim())),
        None => (header, None),
    };

    match (kind, name) {
        ("decoder", None) => Ok((Section::Decoder, None)),
        ("poll", None) => Ok((Section::Poll, None)),
        ("channel", Some(name)) if is_bare_key(name) => {
            let name = String::try_from(name).map_err(|_| ParseError::InvalidSection)?;
            Ok((Section::Channel, Some(name)))
        }
        _ => Err(ParseError::InvalidSection),
    }
}

/// TOML bare key: ASCII letters, digits, `_` and `-`
fn is_bare_key(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Split `key = value`
fn parse_key_value(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    let value = value.trim();
    if key.is_empty() || value.is_empty() {
        return None;
    }
    Some((key, value))
}

/// Parse a decimal integer, allowing `_` separators
fn parse_u32(value: &str) -> Result<u32, ParseError> {
    let mut result: u32 = 0;
    let mut digits = 0;

    for c in value.chars().filter(|c| *c != '_') {
        let digit = c.to_digit(10).ok_or(ParseError::InvalidValue)?;
        result = result
            .checked_mul(10)
            .and_then(|r| r.checked_add(digit))
            .ok_or(ParseError::InvalidValue)?;
        digits += 1;
    }

    if digits == 0 {
        return Err(ParseError::InvalidValue);
    }
    Ok(result)
}

fn parse_u16(value: &str) -> Result<u16, ParseError> {
    u16::try_from(parse_u32(value)?).map_err(|_| ParseError::InvalidValue)
}

fn parse_u8(value: &str) -> Result<u8, ParseError> {
    u8::try_from(parse_u32(value)?).map_err(|_| ParseError::InvalidValue)
}

/// Parse a pin given as `28` or `"gpio28"`
fn parse_pin(value: &str) -> Result<u8, ParseError> {
    match value.strip_prefix('"').and_then(|v| v.strip_suffix('"')) {
        Some(name) => name
            .strip_prefix("gpio")
            .ok_or(ParseError::InvalidPin)
            .and_then(|n| parse_u8(n).map_err(|_| ParseError::InvalidPin)),
        None => parse_u8(value).map_err(|_| ParseError::InvalidPin),
    }
}

fn apply_value(
    section: &Section,
    key: &str,
    value: &str,
    config: &mut Config,
    pending: &mut Option<PendingChannel>,
) -> Result<(), ParseError> {
    match section {
        Section::Decoder => match key {
            "pause_us" => config.decoder.pause_us = parse_u32(value)?,
            "clock_divider" => config.decoder.clock_divider = parse_u16(value)?,
            _ => return Err(ParseError::UnknownKey),
        },
        Section::Poll => match key {
            "backoff_ms" => config.poll.backoff_ms = parse_u32(value)?,
            _ => return Err(ParseError::UnknownKey),
        },
        Section::Channel => {
            let channel = pending.as_mut().ok_or(ParseError::InvalidSection)?;
            match key {
                "pin" => {
                    channel.config.pin = parse_pin(value)?;
                    channel.has_pin = true;
                }
                "instance" => {
                    channel.config.instance = parse_u8(value)?;
                    channel.has_instance = true;
                }
                _ => return Err(ParseError::UnknownKey),
            }
        }
        Section::Root => return Err(ParseError::UnknownKey),
    }

    Ok(())
}

/// Move a finished channel section into the config
fn save_channel(
    config: &mut Config,
    pending: &mut Option<PendingChannel>,
    defaulted: &mut Vec<usize, MAX_CHANNELS>,
) -> Result<(), ParseError> {
    if let Some(channel) = pending.take() {
        if !channel.has_pin {
            return Err(ParseError::MissingPin);
        }
        let index = config.channels.len();
        config
            .channels
            .push(channel.config)
            .map_err(|_| ParseError::TooManyChannels)?;
        if !channel.has_instance {
            defaulted
                .push(index)
                .map_err(|_| ParseError::TooManyChannels)?;
        }
    }
    Ok(())
}

/// Give every channel without `instance` the lowest free index
///
/// Explicit instances are never moved. Defaulted channels are filled in
/// file order.
fn assign_default_instances(config: &mut Config, defaulted: &[usize]) -> Result<(), ParseError> {
    for (n, &index) in defaulted.iter().enumerate() {
        let pending = &defaulted[n..];
        let instance = (0..=InstanceId::MAX)
            .find(|id| {
                !config
                    .channels
                    .iter()
                    .enumerate()
                    .any(|(i, c)| c.instance == *id && !pending.contains(&i))
            })
            .ok_or(ParseError::NoFreeInstance)?;
        config.channels[index].instance = instance;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pin() {
        assert_eq!(parse_pin("28"), Ok(28));
        assert_eq!(parse_pin("\"gpio4\""), Ok(4));
        assert_eq!(parse_pin("pin4"), Err(ParseError::InvalidPin));
        // Not valid TOML, or strings without the gpio prefix
        assert_eq!(parse_pin("gpio11"), Err(ParseError::InvalidPin));
        assert_eq!(parse_pin("\"28\""), Err(ParseError::InvalidPin));
        assert_eq!(parse_pin("\"gpio\""), Err(ParseError::InvalidPin));
    }

    #[test]
    fn test_parse_section_header() {
        assert_eq!(parse_section_header("decoder"), Ok((Section::Decoder, None)));
        assert_eq!(parse_section_header(" poll "), Ok((Section::Poll, None)));

        let (section, name) = parse_section_header("channel.lmt01").unwrap();
        assert_eq!(section, Section::Channel);
        assert_eq!(name.unwrap().as_str(), "lmt01");

        assert_eq!(parse_section_header("channel"), Err(ParseError::InvalidSection));
        assert_eq!(
            parse_section_header("channel lmt01"),
            Err(ParseError::InvalidSection)
        );
        assert_eq!(
            parse_section_header("channel.a b"),
            Err(ParseError::InvalidSection)
        );
        assert_eq!(parse_section_header("stepper x"), Err(ParseError::InvalidSection));
    }

    #[test]
    fn test_parse_full_config() {
        let text = r#"
# Two LMT01 sensors
[decoder]
pause_us = 2_000   # trains end after 2ms idle
clock_divider = 4

[poll]
backoff_ms = 20

[channel.lmt01]
pin = 28

[channel.aux]
pin = "gpio27"
instance = 3
"#;
        let config = parse_config(text).unwrap();

        assert_eq!(config.decoder.pause_us, 2000);
        assert_eq!(config.decoder.clock_divider, 4);
        assert_eq!(config.poll.backoff_ms, 20);
        assert_eq!(config.channels.len(), 2);

        let lmt = config.find_channel("lmt01").unwrap();
        assert_eq!(lmt.pin, 28);
        assert_eq!(lmt.instance, 0);

        let aux = config.find_channel("aux").unwrap();
        assert_eq!(aux.pin, 27);
        assert_eq!(aux.instance, 3);

        assert_eq!(config.validate(4), Ok(()));
    }

    #[test]
    fn test_minimal_config_keeps_defaults() {
        let config = parse_config("[channel.a]\npin = 5\n").unwrap();
        assert_eq!(config.decoder.pause_us, 1000);
        assert_eq!(config.poll.backoff_ms, 10);
        assert_eq!(config.channels[0].pin, 5);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse_config("[channel.a]\ninstance = 1\n"),
            Err(ParseError::MissingPin)
        );
        assert_eq!(
            parse_config("[decoder]\nspeed = 3\n"),
            Err(ParseError::UnknownKey)
        );
        assert_eq!(
            parse_config("[decoder]\npause_us = soon\n"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(
            parse_config("[decoder]\nclock_divider = 70000\n"),
            Err(ParseError::InvalidValue)
        );
        assert_eq!(parse_config("pause_us = 3\n"), Err(ParseError::UnknownKey));
        assert_eq!(parse_config("[poll]\nbackoff_ms\n"), Err(ParseError::InvalidLine));
    }

    #[test]
    fn test_default_instance_skips_explicit_one() {
        let text = "[channel.a]\npin = 1\ninstance = 1\n\n[channel.b]\npin = 2\n";
        let config = parse_config(text).unwrap();

        assert_eq!(config.find_channel("a").unwrap().instance, 1);
        assert_eq!(config.find_channel("b").unwrap().instance, 0);
        assert_eq!(config.validate(4), Ok(()));
    }

    #[test]
    fn test_default_instances_fill_gaps_in_order() {
        let text = "[channel.a]\npin = 1\n\
                    [channel.b]\npin = 2\ninstance = 0\n\
                    [channel.c]\npin = 3\n\
                    [channel.d]\npin = 4\ninstance = 2\n";
        let config = parse_config(text).unwrap();

        let instances: Vec<u8, 4> = config.channels.iter().map(|c| c.instance).collect();
        assert_eq!(instances.as_slice(), &[1, 0, 3, 2]);
        assert_eq!(config.validate(4), Ok(()));
    }

    #[test]
    fn test_too_many_channels() {
        let text = "[channel.a]\npin=1\n[channel.b]\npin=2\n[channel.c]\npin=3\n\
                    [channel.d]\npin=4\n[channel.e]\npin=5\n";
        assert_eq!(parse_config(text), Err(ParseError::TooManyChannels));
    }
}
