// Keymapr Detection Preferences
// User-tunable timing and haptics settings

/// Default hold time before a press counts as a long press, in milliseconds.
pub const DEFAULT_LONG_PRESS_DELAY_MS: u64 = 500;

/// Default window for the second press of a double press, in milliseconds.
pub const DEFAULT_DOUBLE_PRESS_DELAY_MS: u64 = 300;

/// Timing thresholds and haptics settings the detector reads at decision
/// time. These are never baked into compiled tables, so changing them takes
/// effect without a recompile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectionPreferences {
    pub long_press_delay_ms: u64,
    pub double_press_delay_ms: u64,
    /// Vibrate on every trigger, whether or not the keymap asks for it.
    pub force_vibrate: bool,
}

impl Default for DetectionPreferences {
    fn default() -> Self {
        Self {
            long_press_delay_ms: DEFAULT_LONG_PRESS_DELAY_MS,
            double_press_delay_ms: DEFAULT_DOUBLE_PRESS_DELAY_MS,
            force_vibrate: false,
        }
    }
}
