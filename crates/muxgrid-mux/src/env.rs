//! Environment-variable tunables shared by the drivers.

use std::time::Duration;

/// Truthy flag parsing: `1`, `true`, `yes`, `on` (case-insensitive).
pub fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false)
}

/// Like [`env_flag`] but with a configurable default for unset/empty values.
pub fn env_flag_or(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => !matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "0" | "false" | "no" | "off"
        ),
        _ => default,
    }
}

/// Duration override in milliseconds; malformed or negative values fall back
/// to the default.
pub fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    let ms = std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 0)
        .map(|v| v as u64)
        .unwrap_or(default_ms);
    Duration::from_millis(ms)
}

/// Non-empty trimmed value of an environment variable.
pub fn env_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_flag_values() {
        std::env::set_var("MUXGRID_TEST_FLAG_A", "yes");
        assert!(env_flag("MUXGRID_TEST_FLAG_A"));
        std::env::set_var("MUXGRID_TEST_FLAG_A", "0");
        assert!(!env_flag("MUXGRID_TEST_FLAG_A"));
        assert!(!env_flag("MUXGRID_TEST_FLAG_UNSET"));
    }

    #[test]
    fn test_env_flag_or_default() {
        assert!(env_flag_or("MUXGRID_TEST_FLAG_UNSET2", true));
        std::env::set_var("MUXGRID_TEST_FLAG_B", "off");
        assert!(!env_flag_or("MUXGRID_TEST_FLAG_B", true));
    }

    #[test]
    fn test_env_duration_fallback() {
        std::env::set_var("MUXGRID_TEST_DELAY", "250");
        assert_eq!(env_duration_ms("MUXGRID_TEST_DELAY", 10), Duration::from_millis(250));
        std::env::set_var("MUXGRID_TEST_DELAY", "not-a-number");
        assert_eq!(env_duration_ms("MUXGRID_TEST_DELAY", 10), Duration::from_millis(10));
        std::env::set_var("MUXGRID_TEST_DELAY", "-5");
        assert_eq!(env_duration_ms("MUXGRID_TEST_DELAY", 10), Duration::from_millis(10));
    }
}
