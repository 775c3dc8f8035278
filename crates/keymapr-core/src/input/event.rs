// Keymapr Input Layer - Key Events
// The raw key transitions the detector consumes

use std::fmt;

use crate::Key;

/// The transition state of a key event.
///
/// From evdev, the event values are:
///   0 == 'released'
///   1 == 'pressed'
///   2 == 'repeated'
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum KeyAction {
    Release = 0,
    Press = 1,
    /// Auto-repeat while held. The detector ignores these and never consumes
    /// them.
    Repeat = 2,
}

impl KeyAction {
    /// Create a KeyAction from an evdev event value.
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(KeyAction::Release),
            1 => Some(KeyAction::Press),
            2 => Some(KeyAction::Repeat),
            _ => None,
        }
    }
}

impl fmt::Display for KeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyAction::Release => write!(f, "release"),
            KeyAction::Press => write!(f, "press"),
            KeyAction::Repeat => write!(f, "repeat"),
        }
    }
}

/// Which device produced a key event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceOrigin {
    /// The built-in keyboard.
    Internal,
    /// An external device, identified by a stable descriptor string.
    External(String),
}

impl DeviceOrigin {
    pub fn is_external(&self) -> bool {
        matches!(self, DeviceOrigin::External(_))
    }

    /// The descriptor for external devices.
    pub fn descriptor(&self) -> Option<&str> {
        match self {
            DeviceOrigin::Internal => None,
            DeviceOrigin::External(descriptor) => Some(descriptor),
        }
    }
}

/// One physical key transition as delivered by the input layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub action: KeyAction,
    pub origin: DeviceOrigin,
}

impl KeyEvent {
    pub fn new(key: Key, action: KeyAction, origin: DeviceOrigin) -> Self {
        Self {
            key,
            action,
            origin,
        }
    }

    /// A press from the built-in keyboard.
    pub fn press(key: Key) -> Self {
        Self::new(key, KeyAction::Press, DeviceOrigin::Internal)
    }

    /// A release from the built-in keyboard.
    pub fn release(key: Key) -> Self {
        Self::new(key, KeyAction::Release, DeviceOrigin::Internal)
    }
}
