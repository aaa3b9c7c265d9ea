//! evdev-based key listener
//!
//! Opens every keyboard under /dev/input in non-blocking mode and polls
//! them from a dedicated blocking task, forwarding press/release events
//! for the mapped keys over a channel. Key repeats (value 2) are
//! dropped here so the debouncer only sees real transitions.

use super::{KeyEvent, KeyListener, MappedKey};
use crate::config::HotkeyConfig;
use crate::error::HotkeyError;
use evdev::{Device, InputEventKind, Key};
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use tokio::sync::{mpsc, oneshot};

/// evdev-based key listener
pub struct EvdevListener {
    record_key: Key,
    format_key: Key,
    exit_key: Key,
    device_paths: Vec<PathBuf>,
    stop_signal: Option<oneshot::Sender<()>>,
}

impl EvdevListener {
    /// Create a listener for the configured keys
    pub fn new(config: &HotkeyConfig) -> Result<Self, HotkeyError> {
        let record_key = parse_key_name(&config.record_key)?;
        let format_key = parse_key_name(&config.format_key)?;
        let exit_key = parse_key_name(&config.exit_key)?;

        let device_paths = find_keyboard_devices()?;
        if device_paths.is_empty() {
            return Err(HotkeyError::NoKeyboard);
        }

        tracing::debug!(
            "Found {} keyboard device(s): {:?}",
            device_paths.len(),
            device_paths
        );

        Ok(Self {
            record_key,
            format_key,
            exit_key,
            device_paths,
            stop_signal: None,
        })
    }

}

#[async_trait::async_trait]
impl KeyListener for EvdevListener {
    async fn start(&mut self) -> Result<mpsc::Receiver<KeyEvent>, HotkeyError> {
        let (tx, rx) = mpsc::channel(64);
        let (stop_tx, stop_rx) = oneshot::channel();
        self.stop_signal = Some(stop_tx);

        let keymap = KeyMap {
            record: self.record_key,
            format: self.format_key,
            exit: self.exit_key,
        };
        let device_paths = self.device_paths.clone();

        tokio::task::spawn_blocking(move || {
            evdev_listener_loop(device_paths, keymap, tx, stop_rx);
        });

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<(), HotkeyError> {
        if let Some(stop) = self.stop_signal.take() {
            let _ = stop.send(());
        }
        Ok(())
    }
}

/// Keys the polling loop maps (copy of the listener's fields so the
/// loop owns its data)
struct KeyMap {
    record: Key,
    format: Key,
    exit: Key,
}

impl KeyMap {
    fn map(&self, key: Key) -> Option<MappedKey> {
        if key == Key::KEY_LEFTALT || key == Key::KEY_RIGHTALT {
            Some(MappedKey::Alt)
        } else if key == self.record {
            Some(MappedKey::Record)
        } else if key == self.format {
            Some(MappedKey::Format)
        } else if key == self.exit {
            Some(MappedKey::Exit)
        } else {
            None
        }
    }
}

/// Main listener loop running in a blocking task
fn evdev_listener_loop(
    device_paths: Vec<PathBuf>,
    keymap: KeyMap,
    tx: mpsc::Sender<KeyEvent>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    // Open all keyboard devices in non-blocking mode
    let mut devices: Vec<Device> = device_paths
        .iter()
        .filter_map(|path| match Device::open(path) {
            Ok(device) => {
                let fd = device.as_raw_fd();
                unsafe {
                    let flags = libc::fcntl(fd, libc::F_GETFL);
                    if flags != -1 {
                        libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK);
                    }
                }
                tracing::debug!("Opened device (non-blocking): {:?}", path);
                Some(device)
            }
            Err(e) => {
                tracing::warn!("Failed to open {:?}: {}", path, e);
                None
            }
        })
        .collect();

    if devices.is_empty() {
        tracing::error!("No keyboard devices could be opened");
        return;
    }

    loop {
        // Check for stop signal (non-blocking)
        match stop_rx.try_recv() {
            Ok(_) | Err(oneshot::error::TryRecvError::Closed) => {
                tracing::debug!("Key listener stopping");
                return;
            }
            Err(oneshot::error::TryRecvError::Empty) => {}
        }

        for device in &mut devices {
            // fetch_events returns immediately if no events (non-blocking)
            if let Ok(events) = device.fetch_events() {
                for event in events {
                    if let InputEventKind::Key(key) = event.kind() {
                        let Some(mapped) = keymap.map(key) else {
                            continue;
                        };
                        let pressed = match event.value() {
                            1 => true,
                            0 => false,
                            // Autorepeat: not a transition
                            _ => continue,
                        };
                        let event = KeyEvent {
                            key: mapped,
                            pressed,
                            at: std::time::Instant::now(),
                        };
                        if tx.blocking_send(event).is_err() {
                            return; // Channel closed
                        }
                    }
                }
            }
        }

        // Small sleep to avoid busy-waiting
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
}

/// Find all keyboard input devices
fn find_keyboard_devices() -> Result<Vec<PathBuf>, HotkeyError> {
    let mut keyboards = Vec::new();

    let input_dir = std::fs::read_dir("/dev/input")
        .map_err(|e| HotkeyError::DeviceAccess(format!("/dev/input: {}", e)))?;

    for entry in input_dir {
        let entry = entry.map_err(|e| HotkeyError::DeviceAccess(e.to_string()))?;
        let path = entry.path();

        let is_event_device = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("event"))
            .unwrap_or(false);

        if !is_event_device {
            continue;
        }

        match Device::open(&path) {
            Ok(device) => {
                // A keyboard should have at least some letter keys
                let has_keys = device
                    .supported_keys()
                    .map(|keys| {
                        keys.contains(Key::KEY_A)
                            && keys.contains(Key::KEY_Z)
                            && keys.contains(Key::KEY_ENTER)
                    })
                    .unwrap_or(false);

                if has_keys {
                    tracing::debug!(
                        "Found keyboard: {:?} ({:?})",
                        path,
                        device.name().unwrap_or("unknown")
                    );
                    keyboards.push(path);
                }
            }
            Err(e) => {
                // Permission denied is common for non-input-group users
                if e.kind() == std::io::ErrorKind::PermissionDenied {
                    return Err(HotkeyError::DeviceAccess(path.display().to_string()));
                }
                tracing::trace!("Skipping {:?}: {}", path, e);
            }
        }
    }

    Ok(keyboards)
}

/// Parse a key name from config into an evdev Key
fn parse_key_name(name: &str) -> Result<Key, HotkeyError> {
    // Normalize: uppercase and replace - or space with _
    let normalized: String = name
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect();

    let key_name = if normalized.starts_with("KEY_") {
        normalized
    } else {
        format!("KEY_{}", normalized)
    };

    let key = match key_name.as_str() {
        "KEY_ESC" | "KEY_ESCAPE" => Key::KEY_ESC,
        "KEY_A" => Key::KEY_A,
        "KEY_B" => Key::KEY_B,
        "KEY_C" => Key::KEY_C,
        "KEY_D" => Key::KEY_D,
        "KEY_E" => Key::KEY_E,
        "KEY_F" => Key::KEY_F,
        "KEY_G" => Key::KEY_G,
        "KEY_H" => Key::KEY_H,
        "KEY_I" => Key::KEY_I,
        "KEY_J" => Key::KEY_J,
        "KEY_K" => Key::KEY_K,
        "KEY_L" => Key::KEY_L,
        "KEY_M" => Key::KEY_M,
        "KEY_N" => Key::KEY_N,
        "KEY_O" => Key::KEY_O,
        "KEY_P" => Key::KEY_P,
        "KEY_Q" => Key::KEY_Q,
        "KEY_R" => Key::KEY_R,
        "KEY_S" => Key::KEY_S,
        "KEY_T" => Key::KEY_T,
        "KEY_U" => Key::KEY_U,
        "KEY_V" => Key::KEY_V,
        "KEY_W" => Key::KEY_W,
        "KEY_X" => Key::KEY_X,
        "KEY_Y" => Key::KEY_Y,
        "KEY_Z" => Key::KEY_Z,
        "KEY_F1" => Key::KEY_F1,
        "KEY_F2" => Key::KEY_F2,
        "KEY_F3" => Key::KEY_F3,
        "KEY_F4" => Key::KEY_F4,
        "KEY_F5" => Key::KEY_F5,
        "KEY_F6" => Key::KEY_F6,
        "KEY_F7" => Key::KEY_F7,
        "KEY_F8" => Key::KEY_F8,
        "KEY_F9" => Key::KEY_F9,
        "KEY_F10" => Key::KEY_F10,
        "KEY_F11" => Key::KEY_F11,
        "KEY_F12" => Key::KEY_F12,
        "KEY_SCROLLLOCK" => Key::KEY_SCROLLLOCK,
        "KEY_PAUSE" => Key::KEY_PAUSE,
        "KEY_INSERT" => Key::KEY_INSERT,
        _ => return Err(HotkeyError::UnknownKey(name.to_string())),
    };

    Ok(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_letter_and_named_keys() {
        assert_eq!(parse_key_name("R").unwrap(), Key::KEY_R);
        assert_eq!(parse_key_name("g").unwrap(), Key::KEY_G);
        assert_eq!(parse_key_name("ESC").unwrap(), Key::KEY_ESC);
        assert_eq!(parse_key_name("escape").unwrap(), Key::KEY_ESC);
        assert_eq!(parse_key_name("KEY_F12").unwrap(), Key::KEY_F12);
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(parse_key_name("NOSUCHKEY").is_err());
    }

    #[test]
    fn keymap_maps_alt_and_configured_keys() {
        let keymap = KeyMap {
            record: Key::KEY_R,
            format: Key::KEY_G,
            exit: Key::KEY_ESC,
        };
        assert_eq!(keymap.map(Key::KEY_LEFTALT), Some(MappedKey::Alt));
        assert_eq!(keymap.map(Key::KEY_RIGHTALT), Some(MappedKey::Alt));
        assert_eq!(keymap.map(Key::KEY_R), Some(MappedKey::Record));
        assert_eq!(keymap.map(Key::KEY_G), Some(MappedKey::Format));
        assert_eq!(keymap.map(Key::KEY_ESC), Some(MappedKey::Exit));
        assert_eq!(keymap.map(Key::KEY_Q), None);
    }
}
