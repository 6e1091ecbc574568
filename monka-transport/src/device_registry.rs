//! Device registry - display names by PID
//!
//! Connection medium comes from the configured pid lists (see
//! `DeviceDiscovery`); this table only maps a pid to the product name shown
//! to the user. Connections that share a name are grouped into one mouse.

/// Name used for pids missing from [`PRODUCT_NAMES`]
pub const FALLBACK_NAME: &str = "Monka Device";

/// Company name stripped from obfuscated config values
pub const COMPANY: &str = "Monka";

/// Known product ids and their display names
pub const PRODUCT_NAMES: &[(&str, &str)] = &[
    ("b00e", "Monka M1 Pro"),
    ("b00f", "Monka M2 Pro"),
    ("b010", "Monka M3 Pro"),
    ("b012", "Monka Dongle"),
    ("b013", "Monka Dongle Pro"),
];

/// Look up the display name for a product id
pub fn product_name(pid: &str) -> &'static str {
    PRODUCT_NAMES
        .iter()
        .find(|(known, _)| known.eq_ignore_ascii_case(pid))
        .map(|(_, name)| *name)
        .unwrap_or(FALLBACK_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_product_names() {
        assert_eq!(product_name("b00e"), "Monka M1 Pro");
        assert_eq!(product_name("B013"), "Monka Dongle Pro");
    }

    #[test]
    fn test_unknown_pid_falls_back() {
        assert_eq!(product_name("ffff"), FALLBACK_NAME);
        assert_eq!(product_name(""), FALLBACK_NAME);
    }
}
