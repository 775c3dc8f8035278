// Keymapr Trigger Structures
// ClickType, TriggerMode, DeviceScope, TriggerKey, Trigger

use std::fmt;

use strum_macros::{Display, EnumString};

use crate::Key;

/// Default rolling timeout for sequence triggers, in milliseconds.
pub const DEFAULT_SEQUENCE_TIMEOUT_MS: u64 = 1000;

/// How a single key must be pressed for a trigger key to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ClickType {
    Short,
    Long,
    Double,
}

/// Whether the trigger keys must arrive one after another or be held together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TriggerMode {
    /// Keys pressed in order, each within a rolling timeout of the previous.
    Sequence,
    /// Keys held down together (a chord).
    Parallel,
}

/// Which input device a trigger key accepts events from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DeviceScope {
    /// Only the built-in keyboard.
    Internal,
    /// Any device, internal or external.
    Any,
    /// One specific external device, identified by its stable descriptor.
    External(String),
}

impl fmt::Display for DeviceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceScope::Internal => write!(f, "this"),
            DeviceScope::Any => write!(f, "any"),
            DeviceScope::External(descriptor) => write!(f, "{}", descriptor),
        }
    }
}

/// One key within a trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriggerKey {
    pub key: Key,
    pub click_type: ClickType,
    pub device: DeviceScope,
}

impl TriggerKey {
    /// A short-press key scoped to the built-in keyboard.
    pub fn new(key: Key) -> Self {
        Self {
            key,
            click_type: ClickType::Short,
            device: DeviceScope::Internal,
        }
    }

    pub fn with_click_type(mut self, click_type: ClickType) -> Self {
        self.click_type = click_type;
        self
    }

    pub fn with_device(mut self, device: DeviceScope) -> Self {
        self.device = device;
        self
    }
}

/// The condition side of a keymap: an ordered list of keys and a mode.
///
/// Key order is significant in both modes. For sequences it is the temporal
/// order; for chords it is the resolution order the detector walks when
/// advancing the match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trigger {
    pub mode: TriggerMode,
    pub keys: Vec<TriggerKey>,
    /// Sequence-only rolling timeout override in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Trigger {
    pub fn sequence(keys: Vec<TriggerKey>) -> Self {
        Self {
            mode: TriggerMode::Sequence,
            keys,
            timeout_ms: None,
        }
    }

    pub fn parallel(keys: Vec<TriggerKey>) -> Self {
        Self {
            mode: TriggerMode::Parallel,
            keys,
            timeout_ms: None,
        }
    }

    pub fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    /// The timeout to apply between sequence steps.
    pub fn timeout(&self) -> u64 {
        self.timeout_ms.unwrap_or(DEFAULT_SEQUENCE_TIMEOUT_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_click_type_parsing() {
        assert_eq!(ClickType::from_str("short"), Ok(ClickType::Short));
        assert_eq!(ClickType::from_str("LONG"), Ok(ClickType::Long));
        assert_eq!(ClickType::from_str("Double"), Ok(ClickType::Double));
        assert!(ClickType::from_str("triple").is_err());
    }

    #[test]
    fn test_trigger_mode_parsing() {
        assert_eq!(TriggerMode::from_str("sequence"), Ok(TriggerMode::Sequence));
        assert_eq!(TriggerMode::from_str("parallel"), Ok(TriggerMode::Parallel));
        assert!(TriggerMode::from_str("chord").is_err());
    }

    #[test]
    fn test_trigger_timeout_fallback() {
        let trigger = Trigger::sequence(vec![TriggerKey::new(Key::new(30))]);
        assert_eq!(trigger.timeout(), DEFAULT_SEQUENCE_TIMEOUT_MS);

        let trigger = trigger.with_timeout(500);
        assert_eq!(trigger.timeout(), 500);
    }

    #[test]
    fn test_trigger_key_builder() {
        let key = TriggerKey::new(Key::new(114))
            .with_click_type(ClickType::Long)
            .with_device(DeviceScope::Any);
        assert_eq!(key.click_type, ClickType::Long);
        assert_eq!(key.device, DeviceScope::Any);
    }
}
