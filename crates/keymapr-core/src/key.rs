// Keymapr Key Type
// A single key code from Linux input-event-codes.h

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// A physical key, identified by its Linux input event code.
///
/// Key codes occupy the range [0, 1024) so they fit in the key-code field of
/// an encoded trigger event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key(u16);

/// Name table for the keys that commonly appear in trigger configurations.
/// The names match input-event-codes.h with the KEY_ prefix stripped.
static KEY_NAMES: &[(u16, &str)] = &[
    (1, "ESC"),
    (2, "KEY_1"),
    (3, "KEY_2"),
    (4, "KEY_3"),
    (5, "KEY_4"),
    (6, "KEY_5"),
    (7, "KEY_6"),
    (8, "KEY_7"),
    (9, "KEY_8"),
    (10, "KEY_9"),
    (11, "KEY_0"),
    (12, "MINUS"),
    (13, "EQUAL"),
    (14, "BACKSPACE"),
    (15, "TAB"),
    (16, "Q"),
    (17, "W"),
    (18, "E"),
    (19, "R"),
    (20, "T"),
    (21, "Y"),
    (22, "U"),
    (23, "I"),
    (24, "O"),
    (25, "P"),
    (26, "LEFT_BRACE"),
    (27, "RIGHT_BRACE"),
    (28, "ENTER"),
    (29, "LEFT_CTRL"),
    (30, "A"),
    (31, "S"),
    (32, "D"),
    (33, "F"),
    (34, "G"),
    (35, "H"),
    (36, "J"),
    (37, "K"),
    (38, "L"),
    (39, "SEMICOLON"),
    (40, "APOSTROPHE"),
    (41, "GRAVE"),
    (42, "LEFT_SHIFT"),
    (43, "BACKSLASH"),
    (44, "Z"),
    (45, "X"),
    (46, "C"),
    (47, "V"),
    (48, "B"),
    (49, "N"),
    (50, "M"),
    (51, "COMMA"),
    (52, "DOT"),
    (53, "SLASH"),
    (54, "RIGHT_SHIFT"),
    (55, "KPASTERISK"),
    (56, "LEFT_ALT"),
    (57, "SPACE"),
    (58, "CAPSLOCK"),
    (59, "F1"),
    (60, "F2"),
    (61, "F3"),
    (62, "F4"),
    (63, "F5"),
    (64, "F6"),
    (65, "F7"),
    (66, "F8"),
    (67, "F9"),
    (68, "F10"),
    (69, "NUMLOCK"),
    (70, "SCROLLLOCK"),
    (87, "F11"),
    (88, "F12"),
    (96, "KPENTER"),
    (97, "RIGHT_CTRL"),
    (98, "KPSLASH"),
    (99, "SYSRQ"),
    (100, "RIGHT_ALT"),
    (102, "HOME"),
    (103, "UP"),
    (104, "PAGE_UP"),
    (105, "LEFT"),
    (106, "RIGHT"),
    (107, "END"),
    (108, "DOWN"),
    (109, "PAGE_DOWN"),
    (110, "INSERT"),
    (111, "DELETE"),
    (113, "MUTE"),
    (114, "VOLUME_DOWN"),
    (115, "VOLUME_UP"),
    (116, "POWER"),
    (119, "PAUSE"),
    (125, "LEFT_META"),
    (126, "RIGHT_META"),
    (127, "COMPOSE"),
    (139, "MENU"),
    (142, "SLEEP"),
    (158, "BACK"),
    (159, "FORWARD"),
    (161, "EJECTCD"),
    (163, "NEXT_SONG"),
    (164, "PLAY_PAUSE"),
    (165, "PREVIOUS_SONG"),
    (166, "STOP_CD"),
    (172, "HOMEPAGE"),
    (224, "BRIGHTNESS_DOWN"),
    (225, "BRIGHTNESS_UP"),
];

fn name_by_code() -> &'static HashMap<u16, &'static str> {
    static MAP: OnceLock<HashMap<u16, &'static str>> = OnceLock::new();
    MAP.get_or_init(|| KEY_NAMES.iter().copied().collect())
}

fn code_by_name() -> &'static HashMap<&'static str, u16> {
    static MAP: OnceLock<HashMap<&'static str, u16>> = OnceLock::new();
    MAP.get_or_init(|| KEY_NAMES.iter().map(|&(code, name)| (name, code)).collect())
}

impl Key {
    /// Create a key from a raw input event code.
    pub const fn new(code: u16) -> Self {
        Self(code)
    }

    /// The raw input event code.
    pub const fn code(self) -> u16 {
        self.0
    }

    /// Look up a key by its configuration name (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_uppercase();
        code_by_name().get(upper.as_str()).map(|&code| Key(code))
    }

    /// Display name for this key, if it is in the name table.
    pub fn name(self) -> Option<&'static str> {
        name_by_code().get(&self.0).copied()
    }
}

impl From<u16> for Key {
    fn from(code: u16) -> Self {
        Key(code)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "KEY_{}", self.0),
        }
    }
}

impl FromStr for Key {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Key::from_name(s).ok_or_else(|| format!("unknown key name: {}", s))
    }
}
