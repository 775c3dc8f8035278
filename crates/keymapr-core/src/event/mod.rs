// Keymapr Event Handling
// evdev polling behind the `evdev` feature

#[cfg(feature = "evdev")]
pub mod r#loop;

#[cfg(feature = "evdev")]
pub use r#loop::{DeviceInfo, EventLoop, EventLoopError, EventLoopResult};
