// Keymapr Core Library
// Trigger compilation and key event classification for keyboard remapping

pub mod action;
pub mod config;
pub mod detect;
pub mod event;
pub mod input;
pub mod key;
pub mod keymap;
pub mod output;
pub mod preferences;
pub mod trigger;

pub use action::Action;
pub use config::{Config, ConfigError};
pub use detect::{Effect, TriggerDetector};
pub use input::{DeviceOrigin, KeyAction, KeyEvent};
pub use key::Key;
pub use keymap::{KeyMap, KeyMapConfig};
pub use preferences::DetectionPreferences;
pub use trigger::{ClickType, DeviceScope, Trigger, TriggerKey, TriggerMode};

#[cfg(feature = "evdev")]
pub use event::{DeviceInfo, EventLoop, EventLoopError, EventLoopResult};
#[cfg(feature = "evdev")]
pub use output::{UInputError, VirtualKeyboard};
