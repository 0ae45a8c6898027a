//! Build script for pulsetally-firmware
//!
//! - Sets up linker search paths and scripts for memory.x
//! - Validates decoder.toml at compile time

use std::collections::HashSet;
use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Highest usable GPIO on RP2040
const MAX_PIN: i64 = 29;

/// State machines per PIO block
const SM_COUNT: i64 = 4;

fn main() {
    setup_linker();
    validate_config();
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    // Copy memory.x to the output directory
    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    // Tell rustc where to find memory.x
    println!("cargo:rustc-link-search={}", out_dir.display());

    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    // Re-run if memory.x changes
    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Validate decoder.toml configuration at compile time
fn validate_config() {
    println!("cargo:rerun-if-changed=decoder.toml");

    let config_path = Path::new("decoder.toml");

    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: decoder.toml not found!                                  ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a decoder.toml configuration file.        ║\n\
            ║  Please create one in the pulsetally-firmware directory.         ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let config_content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read decoder.toml                              ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&config_content) {
        Ok(value) => value,
        Err(e) => {
            let error_msg = e.to_string();
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in decoder.toml                      ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&error_msg)
            );
        }
    };

    let mut errors = Vec::new();
    validate_timing(&config, &mut errors);
    validate_channels(&config, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid configuration in decoder.toml                    ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=decoder.toml validated successfully");
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Check an optional integer key lies in `min..=max`
fn check_range(
    table: &toml::Value,
    section: &str,
    key: &str,
    min: i64,
    max: i64,
    errors: &mut Vec<String>,
) {
    match table.get(key) {
        None => {}
        Some(toml::Value::Integer(v)) if (min..=max).contains(v) => {}
        Some(_) => errors.push(format!("[{}] {} must be {}-{}", section, key, min, max)),
    }
}

/// Validate [decoder] and [poll]
fn validate_timing(config: &toml::Value, errors: &mut Vec<String>) {
    if let Some(decoder) = config.get("decoder") {
        check_range(decoder, "decoder", "pause_us", 1, u32::MAX as i64, errors);
        check_range(decoder, "decoder", "clock_divider", 1, u16::MAX as i64, errors);
    }
    if let Some(poll) = config.get("poll") {
        check_range(poll, "poll", "backoff_ms", 0, u32::MAX as i64, errors);
    }
}

/// Validate [channel.*] sections
fn validate_channels(config: &toml::Value, errors: &mut Vec<String>) {
    let channels = match config.get("channel") {
        Some(toml::Value::Table(t)) if !t.is_empty() => t,
        _ => {
            errors.push("Missing [channel.*] section - at least one is required".to_string());
            return;
        }
    };

    if channels.len() > SM_COUNT as usize {
        errors.push(format!("At most {} channels fit on one PIO block", SM_COUNT));
    }

    let mut pins = HashSet::new();
    let mut instances = HashSet::new();

    for (name, channel) in channels {
        let section = format!("channel.{}", name);

        if name.len() > 16 {
            errors.push(format!("[{}] name is longer than 16 characters", section));
        }

        match channel.get("pin") {
            Some(toml::Value::Integer(pin)) if (0..=MAX_PIN).contains(pin) => {
                if !pins.insert(*pin) {
                    errors.push(format!("[{}] pin {} is used twice", section, pin));
                }
            }
            Some(toml::Value::String(pin)) => {
                match pin.strip_prefix("gpio").and_then(|n| n.parse::<i64>().ok()) {
                    Some(n) if (0..=MAX_PIN).contains(&n) => {
                        if !pins.insert(n) {
                            errors.push(format!("[{}] pin {} is used twice", section, n));
                        }
                    }
                    _ => errors.push(format!("[{}] pin must look like \"gpioN\"", section)),
                }
            }
            Some(_) => errors.push(format!("[{}] pin must be 0-{}", section, MAX_PIN)),
            None => errors.push(format!("[{}] missing 'pin'", section)),
        }

        // Without an explicit instance the firmware picks the lowest one
        // no other channel uses; the channel count check keeps that in range
        match channel.get("instance") {
            None => {}
            Some(toml::Value::Integer(i)) if (0..SM_COUNT).contains(i) => {
                if !instances.insert(*i) {
                    errors.push(format!("[{}] instance {} is used twice", section, i));
                }
            }
            Some(_) => errors.push(format!("[{}] instance must be 0-{}", section, SM_COUNT - 1)),
        }
    }
}
