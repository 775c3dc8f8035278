// Keymapr Config Parser - TOML with Serde
// Parses configuration from TOML files

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::{
    Action, ClickType, DetectionPreferences, DeviceScope, Key, KeyMap, KeyMapConfig, Trigger,
    TriggerKey, TriggerMode,
};

/// Configuration parser errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid click type: {0}")]
    InvalidClickType(String),

    #[error("Invalid trigger mode: {0}")]
    InvalidMode(String),

    #[error("Keymap '{0}' has no trigger keys")]
    EmptyTrigger(String),

    #[error("Keymap '{0}': timeout_ms only applies to sequence triggers")]
    TimeoutOnParallel(String),
}

/// Main configuration structure (root TOML table)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigToml {
    /// Detection timing preferences
    #[serde(default)]
    pub preferences: Option<PreferencesConfig>,

    /// Device filter configuration
    #[serde(default)]
    pub devices: Option<DevicesConfig>,

    /// Keymap entries
    #[serde(default)]
    pub keymap: Vec<KeymapTomlEntry>,
}

/// Detection timing preferences
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreferencesConfig {
    /// Hold threshold for long presses (milliseconds)
    pub long_press_delay_ms: Option<u64>,

    /// Window for the second press of a double press (milliseconds)
    pub double_press_delay_ms: Option<u64>,

    /// Request a haptic pulse on every fire, regardless of per-keymap flags
    pub force_vibrate: Option<bool>,
}

/// Device filtering configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DevicesConfig {
    /// Explicit device names/paths to use
    #[serde(default)]
    pub only: Vec<String>,
}

/// Keymap entry (array of tables)
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct KeymapTomlEntry {
    /// Optional name, used in log and error messages
    pub name: Option<String>,

    /// Disabled keymaps are parsed but never detected
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// "sequence" or "parallel"
    pub mode: Option<String>,

    /// Request a haptic pulse when this keymap fires
    #[serde(default)]
    pub vibrate: bool,

    /// Rolling timeout for sequence triggers (milliseconds)
    pub timeout_ms: Option<u64>,

    /// Trigger keys, in order
    #[serde(default)]
    pub keys: Vec<TriggerKeyToml>,

    /// Actions to perform when the trigger fires
    #[serde(default)]
    pub actions: Vec<ActionToml>,
}

fn default_true() -> bool {
    true
}

/// One trigger key: a bare key name, or a table with click type and device.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TriggerKeyToml {
    /// Short press on this device
    Name(String),

    /// Full form
    Full {
        key: String,
        /// "short" (default), "long" or "double"
        click: Option<String>,
        /// "internal" (default), "any", or an external device descriptor
        device: Option<String>,
    },
}

/// One action entry, tagged by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", deny_unknown_fields)]
pub enum ActionToml {
    /// Run a shell command
    Command { command: String },

    /// Inject a key tap
    Key { key: String },

    /// Type out a text snippet
    Text { text: String },
}

/// Parsed configuration: the keymaps plus ambient settings the detector and
/// daemon need.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub key_maps: Vec<KeyMap>,
    pub preferences: DetectionPreferences,
    /// Device name/path filter (empty = autodetect keyboards)
    pub device_filter: Vec<String>,
}

impl Config {
    /// Parse a TOML configuration file
    pub fn from_toml_path<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let toml_config: ConfigToml =
            toml::from_str(content).map_err(|e| ConfigError::TomlParse(e.to_string()))?;
        toml_config.to_config()
    }

    /// The keymap set handed to the trigger compiler.
    pub fn to_key_maps(&self) -> KeyMapConfig {
        KeyMapConfig::new(self.key_maps.clone())
    }
}

impl ConfigToml {
    fn to_config(&self) -> Result<Config, ConfigError> {
        let mut preferences = DetectionPreferences::default();
        if let Some(p) = &self.preferences {
            if let Some(ms) = p.long_press_delay_ms {
                preferences.long_press_delay_ms = ms;
            }
            if let Some(ms) = p.double_press_delay_ms {
                preferences.double_press_delay_ms = ms;
            }
            if let Some(force) = p.force_vibrate {
                preferences.force_vibrate = force;
            }
        }

        let mut key_maps = Vec::with_capacity(self.keymap.len());
        for (index, entry) in self.keymap.iter().enumerate() {
            key_maps.push(parse_keymap(entry, index)?);
        }

        log::debug!(
            "parsed config: {} keymaps, long={}ms double={}ms",
            key_maps.len(),
            preferences.long_press_delay_ms,
            preferences.double_press_delay_ms
        );

        Ok(Config {
            key_maps,
            preferences,
            device_filter: self
                .devices
                .as_ref()
                .map(|d| d.only.clone())
                .unwrap_or_default(),
        })
    }
}

fn parse_keymap(entry: &KeymapTomlEntry, index: usize) -> Result<KeyMap, ConfigError> {
    let name = entry
        .name
        .clone()
        .unwrap_or_else(|| format!("keymap #{}", index + 1));

    if entry.keys.is_empty() {
        return Err(ConfigError::EmptyTrigger(name));
    }

    let mode = match entry.mode.as_deref() {
        None => TriggerMode::Sequence,
        Some(raw) => raw
            .parse::<TriggerMode>()
            .map_err(|_| ConfigError::InvalidMode(raw.to_string()))?,
    };
    if mode == TriggerMode::Parallel && entry.timeout_ms.is_some() {
        return Err(ConfigError::TimeoutOnParallel(name));
    }

    let mut keys = Vec::with_capacity(entry.keys.len());
    for key_toml in &entry.keys {
        keys.push(parse_trigger_key(key_toml)?);
    }

    let mut actions = Vec::with_capacity(entry.actions.len());
    for action_toml in &entry.actions {
        actions.push(parse_action(action_toml)?);
    }

    let trigger = Trigger {
        mode,
        keys,
        timeout_ms: entry.timeout_ms,
    };

    Ok(KeyMap::new(trigger, actions)
        .with_vibrate(entry.vibrate)
        .with_enabled(entry.enabled))
}

fn parse_trigger_key(toml: &TriggerKeyToml) -> Result<TriggerKey, ConfigError> {
    let (raw_key, click, device) = match toml {
        TriggerKeyToml::Name(name) => (name.as_str(), None, None),
        TriggerKeyToml::Full { key, click, device } => {
            (key.as_str(), click.as_deref(), device.as_deref())
        }
    };

    let key = Key::from_name(raw_key).ok_or_else(|| ConfigError::InvalidKey(raw_key.into()))?;

    let click_type = match click {
        None => ClickType::Short,
        Some(raw) => raw
            .parse::<ClickType>()
            .map_err(|_| ConfigError::InvalidClickType(raw.to_string()))?,
    };

    let scope = match device {
        None => DeviceScope::Internal,
        Some("internal") => DeviceScope::Internal,
        Some("any") => DeviceScope::Any,
        Some(descriptor) => DeviceScope::External(descriptor.to_string()),
    };

    Ok(TriggerKey::new(key)
        .with_click_type(click_type)
        .with_device(scope))
}

fn parse_action(toml: &ActionToml) -> Result<Action, ConfigError> {
    match toml {
        ActionToml::Command { command } => Ok(Action::Command {
            command: command.clone(),
        }),
        ActionToml::Key { key } => {
            let key = Key::from_name(key).ok_or_else(|| ConfigError::InvalidKey(key.clone()))?;
            Ok(Action::SendKey { key })
        }
        ActionToml::Text { text } => Ok(Action::Text { text: text.clone() }),
    }
}
