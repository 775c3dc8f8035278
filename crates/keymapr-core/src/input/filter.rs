// Keymapr Input Layer - Device Filtering
// Decides which evdev devices the event loop opens

/// Check if a device should be opened.
///
/// With an explicit filter, devices are matched by exact name or path and
/// nothing else is opened; an explicitly named virtual device is allowed.
/// Without a filter, virtual devices are always excluded and only detected
/// keyboards are used.
pub fn matches_device_filter(
    device_name: &str,
    device_path: &str,
    filter_names: &[String],
    is_keyboard: bool,
    is_virtual: bool,
) -> bool {
    if !filter_names.is_empty() {
        return filter_names
            .iter()
            .any(|wanted| device_path == wanted || device_name == wanted);
    }

    if is_virtual {
        return false;
    }

    is_keyboard
}
