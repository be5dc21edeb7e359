//! Configuration error types

use thiserror::Error;

/// Errors that can occur during configuration loading
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration loading failed: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Validation failed: {0}")]
    ValidationFailed(#[from] ValidationError),
}

/// Errors that can occur during configuration validation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Required configuration missing: {0}")]
    MissingRequired(&'static str),

    #[error("Assistant base URL must start with http:// or https://")]
    InvalidBaseUrl,

    #[error("Chat path must start with '/'")]
    InvalidChatPath,

    #[error("Timeouts must be at least one second")]
    InvalidTimeout,

    #[error("Session user id must not be blank")]
    BlankUserId,

    #[error("Invalid log filter: {0}")]
    InvalidLogFilter(String),
}
