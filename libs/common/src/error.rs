//! Custom error types for the common library
//!
//! This module defines application-specific error types that can be used
//! throughout the application.

use thiserror::Error;

/// Error raised while loading or validating configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required secret is not configured
    #[error("Missing required secret: {0}")]
    MissingSecret(String),

    /// A value is present but unusable
    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    /// The configuration sources could not be read or deserialized
    #[error("Configuration source error: {0}")]
    Source(String),
}

/// Type alias for Result with ConfigError
pub type ConfigResult<T> = Result<T, ConfigError>;
