//! Utility functions for flowerpot-core.

use btleplug::platform::PeripheralId;

/// Address reported on platforms that hide the real MAC (macOS).
const NULL_ADDRESS: &str = "00:00:00:00:00:00";

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms they wrap the
/// Bluetooth address. This strips the `PeripheralId(..)` debug wrapper.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    strip_peripheral_wrapper(&format!("{:?}", id))
}

fn strip_peripheral_wrapper(debug: &str) -> String {
    debug
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}

/// Create an identifier string from an address and peripheral ID.
///
/// On macOS where addresses are 00:00:00:00:00:00, uses the peripheral ID.
/// On other platforms, uses the Bluetooth address.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if is_null_address(address) {
        format_peripheral_id(peripheral_id)
    } else {
        address.to_string()
    }
}

/// Returns true for the all-zero address macOS reports.
pub fn is_null_address(address: &str) -> bool {
    address == NULL_ADDRESS
}

/// Normalize a MAC address for comparison (lowercase, no separators).
pub fn normalize_address(address: &str) -> String {
    address
        .chars()
        .filter(|c| *c != ':' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_peripheral_wrapper() {
        assert_eq!(
            strip_peripheral_wrapper("PeripheralId(AA:BB:CC:DD:EE:FF)"),
            "AA:BB:CC:DD:EE:FF"
        );
        assert_eq!(
            strip_peripheral_wrapper("FFD1E37E-0A9F-1881-3867-7579D66A34E5"),
            "FFD1E37E-0A9F-1881-3867-7579D66A34E5"
        );
    }

    #[test]
    fn test_is_null_address() {
        assert!(is_null_address("00:00:00:00:00:00"));
        assert!(!is_null_address("AA:BB:CC:DD:EE:FF"));
    }

    #[test]
    fn test_normalize_address() {
        assert_eq!(normalize_address("AA:BB:CC:DD:EE:FF"), "aabbccddeeff");
        assert_eq!(normalize_address("aa-bb-cc-dd-ee-ff"), "aabbccddeeff");
        assert_eq!(normalize_address("aabbccddeeff"), "aabbccddeeff");
    }
}
