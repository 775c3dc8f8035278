// Keymapr Output Layer
// Virtual keyboard behind the `evdev` feature

#[cfg(feature = "evdev")]
mod uinput;

#[cfg(feature = "evdev")]
pub use uinput::{UInputError, VirtualKeyboard};
