// Keymapr Input Layer - Device Classification
// Descriptor construction and internal/external origin detection

/// Build a stable descriptor for an input device.
///
/// The descriptor is what trigger configurations use to scope a key to one
/// specific external device, so it must survive reboots and re-plugs. Vendor
/// and product ids plus the physical path are stable for a given device on a
/// given port.
pub fn device_descriptor(vendor_id: u16, product_id: u16, phys: Option<&str>) -> String {
    match phys {
        Some(phys) if !phys.is_empty() => {
            format!("{:04x}:{:04x}:{}", vendor_id, product_id, phys)
        }
        _ => format!("{:04x}:{:04x}", vendor_id, product_id),
    }
}

/// Classify a device as external from its physical path.
///
/// Built-in keyboards sit on the platform bus (e.g. "isa0060/serio0/input0");
/// USB and Bluetooth devices carry their transport in the phys string. A
/// device with no phys path at all is treated as internal.
pub fn is_external_phys(phys: Option<&str>) -> bool {
    let Some(phys) = phys else {
        return false;
    };
    let lower = phys.to_lowercase();
    lower.contains("usb") || lower.contains("bluetooth") || lower.starts_with("b8:")
}

/// Check if a device is keymapr's own virtual output device.
///
/// The virtual device must be filtered out of enumeration to prevent a
/// feedback loop between output and input.
pub fn is_virtual_device(name: &str, prefix: &str) -> bool {
    name.contains(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_descriptor_with_phys() {
        assert_eq!(
            device_descriptor(0x046d, 0xc52b, Some("usb-0000:00:14.0-1/input1")),
            "046d:c52b:usb-0000:00:14.0-1/input1"
        );
    }

    #[test]
    fn test_device_descriptor_without_phys() {
        assert_eq!(device_descriptor(0x0001, 0x0001, None), "0001:0001");
        assert_eq!(device_descriptor(0x0001, 0x0001, Some("")), "0001:0001");
    }

    #[test]
    fn test_is_external_phys_usb() {
        assert!(is_external_phys(Some("usb-0000:00:14.0-1/input1")));
    }

    #[test]
    fn test_is_external_phys_bluetooth() {
        assert!(is_external_phys(Some("bluetooth-hci0")));
        assert!(is_external_phys(Some("b8:27:eb:aa:bb:cc")));
    }

    #[test]
    fn test_is_external_phys_internal() {
        assert!(!is_external_phys(Some("isa0060/serio0/input0")));
        assert!(!is_external_phys(None));
    }

    #[test]
    fn test_is_virtual_device() {
        assert!(is_virtual_device(
            "Keymapr (virtual) Keyboard",
            "Keymapr (virtual)"
        ));
        assert!(!is_virtual_device(
            "Logitech USB Keyboard",
            "Keymapr (virtual)"
        ));
    }
}
