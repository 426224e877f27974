//! Peripheral identifier helpers.

use btleplug::platform::PeripheralId;

/// Address reported on platforms that hide the Bluetooth MAC (macOS).
const HIDDEN_ADDRESS: &str = "00:00:00:00:00:00";

/// Format a peripheral ID as a string.
///
/// On macOS, peripheral IDs are UUIDs. On other platforms they wrap a
/// MAC address. The `PeripheralId(...)` wrapper is stripped.
pub fn format_peripheral_id(id: &PeripheralId) -> String {
    strip_debug_wrapper(&format!("{:?}", id))
}

/// Create an identifier string from an address and peripheral ID.
///
/// On macOS where addresses are hidden, uses the peripheral ID.
/// On other platforms, uses the Bluetooth address.
pub fn create_identifier(address: &str, peripheral_id: &PeripheralId) -> String {
    if is_hidden_address(address) {
        format_peripheral_id(peripheral_id)
    } else {
        address.to_string()
    }
}

fn is_hidden_address(address: &str) -> bool {
    address == HIDDEN_ADDRESS
}

fn strip_debug_wrapper(debug: &str) -> String {
    debug
        .trim_start_matches("PeripheralId(")
        .trim_end_matches(')')
        .to_string()
}
