//! Audio input device listing and selection
//!
//! Selection failures never reach the recording state machine: any
//! problem here falls back to the system default device with a warning.

use crate::error::AudioError;
use cpal::traits::{DeviceTrait, HostTrait};
use std::io::Write;

/// Names of all available input devices, in enumeration order
pub fn list_input_devices() -> Result<Vec<String>, AudioError> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| AudioError::Connection(e.to_string()))?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}

/// Resolve a device index from `--device N` to a device name
pub fn device_name_by_index(index: usize) -> Result<String, AudioError> {
    let devices = list_input_devices()?;
    devices
        .get(index)
        .cloned()
        .ok_or_else(|| AudioError::DeviceNotFound(format!("index {}", index)))
}

/// Print the device list to stdout (for the list-devices subcommand)
pub fn print_devices() -> Result<(), AudioError> {
    let devices = list_input_devices()?;
    if devices.is_empty() {
        println!("No audio input devices found.");
        return Ok(());
    }
    println!("Available audio input devices:");
    for (i, name) in devices.iter().enumerate() {
        println!("  [{}] {}", i, name);
    }
    Ok(())
}

/// Interactive device picker. Returns the chosen device name, or None
/// to use the system default. Any failure (no terminal, bad input,
/// enumeration error) falls back to the default.
pub fn select_device_interactive() -> Option<String> {
    let devices = match list_input_devices() {
        Ok(d) if !d.is_empty() => d,
        Ok(_) => {
            tracing::warn!("No input devices enumerated, using system default");
            return None;
        }
        Err(e) => {
            tracing::warn!("Device enumeration failed ({}), using system default", e);
            return None;
        }
    };

    println!("Available audio input devices:");
    for (i, name) in devices.iter().enumerate() {
        println!("  [{}] {}", i, name);
    }
    print!("Select device number (Enter for system default): ");
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    if std::io::stdin().read_line(&mut line).is_err() {
        tracing::warn!("Could not read selection, using system default");
        return None;
    }

    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }

    match trimmed.parse::<usize>() {
        Ok(i) if i < devices.len() => Some(devices[i].clone()),
        _ => {
            tracing::warn!("Invalid selection '{}', using system default", trimmed);
            None
        }
    }
}
