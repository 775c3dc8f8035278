// Keymapr Input Layer
// Key event types and device classification

mod device;
mod event;
mod filter;

pub use device::{device_descriptor, is_external_phys, is_virtual_device};
pub use event::{DeviceOrigin, KeyAction, KeyEvent};
pub use filter::matches_device_filter;
