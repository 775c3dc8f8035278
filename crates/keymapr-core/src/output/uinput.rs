// Keymapr Output Layer
// Virtual uinput keyboard for re-injected and synthetic keys

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{AttributeSet, EventType, InputEvent};

use crate::input::KeyAction;
use crate::Key;

/// Error types for uinput operations
#[derive(Debug, thiserror::Error)]
pub enum UInputError {
    #[error("Failed to create virtual device: {0}")]
    DeviceCreation(String),

    #[error("Failed to write event: {0}")]
    WriteError(String),
}

/// Virtual uinput keyboard.
///
/// Used to re-inject keys the detector consumed but no trigger claimed, and
/// to execute key-tap actions. Its device name starts with the prefix the
/// event loop filters out, so its own events are never read back.
pub struct VirtualKeyboard {
    device: VirtualDevice,
}

impl VirtualKeyboard {
    pub fn new() -> Result<Self, UInputError> {
        let mut keys = AttributeSet::new();
        // All standard keyboard key codes.
        for code in 0..256u16 {
            keys.insert(evdev::Key::new(code));
        }

        let device = VirtualDeviceBuilder::new()
            .map_err(|e: std::io::Error| UInputError::DeviceCreation(e.to_string()))?
            .name("Keymapr (virtual) Keyboard")
            .with_keys(&keys)
            .map_err(|e: std::io::Error| UInputError::DeviceCreation(e.to_string()))?
            .build()
            .map_err(|e: std::io::Error| UInputError::DeviceCreation(e.to_string()))?;

        Ok(Self { device })
    }

    /// Write a single key transition followed by the SYN the kernel needs
    /// before it processes the event.
    pub fn send_key_action(&mut self, key: Key, action: KeyAction) -> Result<(), UInputError> {
        let key_event = InputEvent::new(EventType::KEY, key.code(), action as i32);
        let syn_event = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);

        self.device
            .emit(&[key_event, syn_event])
            .map_err(|e: std::io::Error| UInputError::WriteError(e.to_string()))
    }

    /// Emit a full press-release tap.
    pub fn tap_key(&mut self, key: Key) -> Result<(), UInputError> {
        self.send_key_action(key, KeyAction::Press)?;
        self.send_key_action(key, KeyAction::Release)
    }

    /// Type out a text snippet. Letters, digits and basic whitespace only;
    /// anything else is logged and skipped.
    pub fn send_text(&mut self, text: &str) -> Result<(), UInputError> {
        for ch in text.chars() {
            let Some((key, shifted)) = ascii_key_and_shift(ch) else {
                log::warn!("cannot type character {:?}; skipping", ch);
                continue;
            };
            if shifted {
                let shift = Key::new(42); // LEFT_SHIFT
                self.send_key_action(shift, KeyAction::Press)?;
                self.tap_key(key)?;
                self.send_key_action(shift, KeyAction::Release)?;
            } else {
                self.tap_key(key)?;
            }
        }
        Ok(())
    }
}

fn ascii_key_and_shift(ch: char) -> Option<(Key, bool)> {
    if ch.is_ascii_lowercase() {
        return Key::from_name(&ch.to_string()).map(|k| (k, false));
    }
    if ch.is_ascii_digit() {
        return Key::from_name(&format!("KEY_{}", ch)).map(|k| (k, false));
    }
    if ch.is_ascii_uppercase() {
        return Key::from_name(&ch.to_ascii_lowercase().to_string()).map(|k| (k, true));
    }
    match ch {
        ' ' => Key::from_name("SPACE").map(|k| (k, false)),
        '\n' => Key::from_name("ENTER").map(|k| (k, false)),
        '\t' => Key::from_name("TAB").map(|k| (k, false)),
        _ => None,
    }
}
