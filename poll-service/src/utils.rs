//! Shared utility functions for the poll service

use std::{fmt::Display, str::FromStr};

use anyhow::{anyhow, Result};
use tracing::info;

/// Parse an environment variable, falling back to `default` when it is unset.
///
/// A set but unparsable value is an error rather than a silent default.
pub fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("Invalid {} value {:?}: {}", key, raw, e)),
        Err(_) => {
            info!("{} not set, using default: {}", key, default);
            Ok(default)
        }
    }
}

/// Read an optional environment variable, treating blank values as unset
pub fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Whether a string is empty once surrounding whitespace is removed
pub fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}
