//! Environment variable utilities
//!
//! Generic `env_get<T>` function for parsing environment variables with
//! defaults. Used by `keelson-runtime`'s config layer.

use std::str::FromStr;

/// Get environment variable parsed as type T, or return default
///
/// Works with any type that implements `FromStr`.
#[inline]
pub fn env_get<T>(key: &str, default: T) -> T
where
    T: FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Get environment variable as boolean
///
/// Accepts: "1", "true", "yes", "on" (case-insensitive) as true.
/// Everything else (including unset) returns the default.
#[inline]
pub fn env_get_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => matches!(val.to_lowercase().as_str(), "1" | "true" | "yes" | "on"),
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_when_unset() {
        let v: usize = env_get("KEELSON_TEST_UNSET_VAR", 7);
        assert_eq!(v, 7);
    }

    #[test]
    fn test_bool_default() {
        assert!(env_get_bool("KEELSON_TEST_UNSET_BOOL", true));
        assert!(!env_get_bool("KEELSON_TEST_UNSET_BOOL", false));
    }
}
