//! Configuration validation helpers
//!
//! Small checks the config structs compose in their `validate()` methods.
//! Endpoint URLs are checked structurally (scheme + host) rather than with
//! a pattern, since the only URLs this configuration carries are http(s)
//! provider endpoints.

use std::ops::RangeInclusive;

use crate::{ConfigError, ConfigResult};

/// Trait for validating configuration values
pub trait Validate {
    /// Validate this configuration object
    ///
    /// # Errors
    /// Returns validation errors if the configuration is invalid
    fn validate(&self) -> ConfigResult<()>;
}

/// Check that a value is an http(s) endpoint with a host
///
/// # Errors
/// Returns `ConfigError::InvalidUrl` when the scheme is missing, the host
/// is empty, or the value contains whitespace.
pub fn ensure_http_url(url: &str, _field: &str) -> ConfigResult<()> {
    let invalid = || ConfigError::InvalidUrl {
        url: url.to_string(),
    };

    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(invalid)?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || url.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    Ok(())
}

/// Check that a port is non-zero
///
/// # Errors
/// Returns `ConfigError::InvalidPort` for port 0.
pub fn ensure_port(port: u16, _field: &str) -> ConfigResult<()> {
    if port == 0 {
        return Err(ConfigError::InvalidPort { port });
    }
    Ok(())
}

/// Check that a value falls inside an inclusive range
///
/// # Errors
/// Returns `ConfigError::OutOfRange` naming the field and bounds.
pub fn ensure_within(value: u64, range: RangeInclusive<u64>, field: &str) -> ConfigResult<()> {
    if range.contains(&value) {
        return Ok(());
    }
    Err(ConfigError::OutOfRange {
        field: field.to_string(),
        value,
        min: *range.start(),
        max: *range.end(),
    })
}

/// Check that a string has non-whitespace content
///
/// # Errors
/// Returns `ConfigError::MissingField` for empty or whitespace-only values.
pub fn ensure_present(value: &str, field: &str) -> ConfigResult<()> {
    if value.trim().is_empty() {
        return Err(ConfigError::MissingField {
            field: field.to_string(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_http_url() {
        assert!(ensure_http_url("https://api.openai.com/v1", "f").is_ok());
        assert!(ensure_http_url("http://localhost:8080", "f").is_ok());
        assert!(ensure_http_url("ftp://host/path", "f").is_err(), "wrong scheme");
        assert!(ensure_http_url("https:///path", "f").is_err(), "empty host");
        assert!(ensure_http_url("https://a b.com", "f").is_err(), "whitespace");
    }

    #[test]
    fn test_ensure_within_bounds_are_inclusive() {
        assert!(ensure_within(1, 1..=10, "f").is_ok());
        assert!(ensure_within(10, 1..=10, "f").is_ok());
        let err = ensure_within(11, 1..=10, "f").expect_err("out of range");
        assert!(err.to_string().contains("expected 1-10"), "got {err}");
    }

    #[test]
    fn test_ensure_present_rejects_whitespace() {
        assert!(ensure_present("value", "f").is_ok());
        assert!(ensure_present("   ", "f").is_err());
    }

    #[test]
    fn test_ensure_port() {
        assert!(ensure_port(5432, "f").is_ok());
        assert!(ensure_port(0, "f").is_err());
    }
}
