// Keymapr Keymap Structures
// KeyMap and the wholesale-replaced KeyMapConfig

use crate::{Action, Trigger};

/// One user rule: when the trigger matches, perform the actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyMap {
    pub enabled: bool,
    pub trigger: Trigger,
    pub actions: Vec<Action>,
    pub vibrate: bool,
}

impl KeyMap {
    pub fn new(trigger: Trigger, actions: Vec<Action>) -> Self {
        Self {
            enabled: true,
            trigger,
            actions,
            vibrate: false,
        }
    }

    pub fn with_vibrate(mut self, vibrate: bool) -> Self {
        self.vibrate = vibrate;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// A keymap with no actions is inert and excluded from compilation.
    pub fn is_inert(&self) -> bool {
        !self.enabled || self.actions.is_empty()
    }
}

/// The full, ordered set of keymaps.
///
/// Replaced wholesale whenever the configuration changes; the detector never
/// mutates it and compiles a fresh table set from it each time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMapConfig {
    key_maps: Vec<KeyMap>,
}

impl KeyMapConfig {
    pub fn new(key_maps: Vec<KeyMap>) -> Self {
        Self { key_maps }
    }

    pub fn key_maps(&self) -> &[KeyMap] {
        &self.key_maps
    }

    pub fn is_empty(&self) -> bool {
        self.key_maps.is_empty()
    }

    /// Keymaps that take part in detection.
    pub fn active_key_maps(&self) -> impl Iterator<Item = &KeyMap> {
        self.key_maps.iter().filter(|m| !m.is_inert())
    }
}

impl From<Vec<KeyMap>> for KeyMapConfig {
    fn from(key_maps: Vec<KeyMap>) -> Self {
        Self::new(key_maps)
    }
}
