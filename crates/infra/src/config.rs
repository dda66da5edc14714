//! Configuration loading and representation.
//!
//! Settings come from environment variables, read once at startup into typed
//! structs. Unset variables fall back to defaults; set-but-invalid ones are errors.

use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const OP_TIMEOUT_MS_VAR: &str = "STOCKROOM_OP_TIMEOUT_MS";

const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: '{value}' ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Stock ledger settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Upper bound for every store call made by the ledger. A call that exceeds it
    /// is abandoned (its transaction rolls back) and reported as transient.
    pub operation_timeout: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            operation_timeout: DEFAULT_OP_TIMEOUT,
        }
    }
}

impl LedgerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let timeout_ms: u64 = env_or(OP_TIMEOUT_MS_VAR, DEFAULT_OP_TIMEOUT.as_millis() as u64)?;
        if timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                name: OP_TIMEOUT_MS_VAR,
                value: timeout_ms.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(Self {
            operation_timeout: Duration::from_millis(timeout_ms),
        })
    }
}

/// Read and parse `name`, or return `default` when it is unset or empty.
pub fn env_or<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) if !raw.trim().is_empty() => parse_value(name, &raw),
        _ => Ok(default),
    }
}

fn parse_value<T>(name: &'static str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
        name,
        value: raw.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_timeout_is_five_seconds() {
        assert_eq!(LedgerConfig::default().operation_timeout, Duration::from_secs(5));
    }

    #[test]
    fn parse_value_reports_variable_name() {
        let err = parse_value::<u64>("SOME_VAR", "soon").unwrap_err();
        let ConfigError::Invalid { name, value, .. } = err;
        assert_eq!(name, "SOME_VAR");
        assert_eq!(value, "soon");
    }

    #[test]
    fn parse_value_trims() {
        assert_eq!(parse_value::<u64>("SOME_VAR", " 250 ").unwrap(), 250);
    }
}
