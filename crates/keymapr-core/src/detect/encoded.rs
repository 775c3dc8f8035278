// Keymapr Detection - Encoded Events
// Packed integer identity for comparing observed events against trigger tables

use crate::{ClickType, Key};

/// Bits [0, 10) hold the key code.
const KEY_CODE_MASK: u32 = 0x3ff;

/// One-hot click-type field, bits 10..13.
const SHORT_PRESS: u32 = 1 << 10;
const LONG_PRESS: u32 = 1 << 11;
const DOUBLE_PRESS: u32 = 1 << 12;
const CLICK_MASK: u32 = SHORT_PRESS | LONG_PRESS | DOUBLE_PRESS;

/// Marks an event from the built-in keyboard.
const INTERNAL_DEVICE: u32 = 1 << 13;

/// External device ids are power-of-two flags from this bit upward.
pub(crate) const DEVICE_BIT_SHIFT: u32 = 14;

/// Reserved id for external devices absent from the compiled device table.
/// Such events match any-device trigger keys but never device-scoped ones.
const UNKNOWN_DEVICE: u32 = 1 << 31;

const DEVICE_MASK: u32 = !(KEY_CODE_MASK | CLICK_MASK);

/// A key event packed into one integer: key code, click type, and device
/// scope, so the hot path compares single words instead of structs.
///
/// An event with no device bits set means "any device" and matches the other
/// operand on key code and click type alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EncodedEvent(u32);

impl EncodedEvent {
    /// Encode a key with an optional click type and raw device bits.
    ///
    /// `device_bits` is 0 for any-device, [`EncodedEvent::internal`]'s flag
    /// for the built-in keyboard, or a power-of-two external device id from
    /// the compiled device table.
    pub(crate) fn new(key: Key, click_type: Option<ClickType>, device_bits: u32) -> Self {
        let mut value = u32::from(key.code()) & KEY_CODE_MASK;
        if let Some(click_type) = click_type {
            value |= click_flag(click_type);
        }
        value |= device_bits & DEVICE_MASK;
        EncodedEvent(value)
    }

    /// An undetermined-click event from the built-in keyboard.
    pub(crate) fn internal(key: Key) -> Self {
        Self::new(key, None, INTERNAL_DEVICE)
    }

    /// An undetermined-click event matched regardless of device.
    #[cfg(test)]
    pub(crate) fn any_device(key: Key) -> Self {
        Self::new(key, None, 0)
    }

    /// An undetermined-click event from an external device with no compiled
    /// id.
    pub(crate) fn unknown_external(key: Key) -> Self {
        Self::new(key, None, UNKNOWN_DEVICE)
    }

    pub(crate) fn internal_device_bits() -> u32 {
        INTERNAL_DEVICE
    }

    /// This event with its click-type field replaced.
    pub(crate) fn with_click_type(self, click_type: ClickType) -> Self {
        EncodedEvent((self.0 & !CLICK_MASK) | click_flag(click_type))
    }

    pub(crate) fn key_code(self) -> u16 {
        (self.0 & KEY_CODE_MASK) as u16
    }

    fn click_bits(self) -> u32 {
        self.0 & CLICK_MASK
    }

    fn device_bits(self) -> u32 {
        self.0 & DEVICE_MASK
    }

    /// No device bits set: matches any concrete device.
    pub(crate) fn is_any_device(self) -> bool {
        self.device_bits() == 0
    }

    /// Full match: key code, click type, and device, honoring the any-device
    /// sentinel on either operand.
    pub(crate) fn matches(self, other: EncodedEvent) -> bool {
        if self.is_any_device() || other.is_any_device() {
            self.key_code() == other.key_code() && self.click_bits() == other.click_bits()
        } else {
            self == other
        }
    }

    /// Match on key code and device only, for decisions made before the click
    /// type of a press is known.
    pub(crate) fn matches_ignoring_click(self, other: EncodedEvent) -> bool {
        if self.key_code() != other.key_code() {
            return false;
        }
        self.is_any_device() || other.is_any_device() || self.device_bits() == other.device_bits()
    }
}

fn click_flag(click_type: ClickType) -> u32 {
    match click_type {
        ClickType::Short => SHORT_PRESS,
        ClickType::Long => LONG_PRESS,
        ClickType::Double => DOUBLE_PRESS,
    }
}
