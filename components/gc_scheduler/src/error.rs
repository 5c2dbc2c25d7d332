//! Error types for scheduler configuration.
//!
//! Only configuration loading can fail recoverably. Misuse of the scheduling
//! policy (escalating before a callback is registered, registering twice) is a
//! broken runtime invariant and panics instead.

use thiserror::Error;

/// Errors produced while loading or validating scheduler settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A tunable was given a value the scheduler cannot operate with
    #[error("invalid value for `{field}`: {reason}")]
    InvalidValue {
        /// Name of the offending field
        field: &'static str,
        /// Why the value was rejected
        reason: String,
    },

    /// Settings document could not be parsed
    #[error("failed to parse scheduler settings: {0}")]
    Parse(#[from] serde_json::Error),

    /// An environment variable held something that is not a valid value
    #[error("environment variable `{var}` has invalid value `{value}`")]
    Env {
        /// Variable name
        var: String,
        /// Raw value found in the environment
        value: String,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
