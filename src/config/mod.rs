//! Application configuration module
//!
//! This module provides type-safe configuration loading from environment variables
//! using the `config` and `dotenvy` crates. Configuration is loaded with the
//! `FIXIT` prefix and nested values use double underscores as separators.
//!
//! # Example
//!
//! ```no_run
//! use fixit_client::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//!
//! println!("Assistant at {}{}", config.assistant.base_url, config.assistant.chat_path);
//! ```

mod assistant;
mod error;
mod logging;
mod session;

pub use assistant::AssistantConfig;
pub use error::{ConfigError, ValidationError};
pub use logging::{LogFormat, LoggingConfig};
pub use session::SessionConfig;

use serde::Deserialize;
use std::path::Path;

const ENV_PREFIX: &str = "FIXIT";
const ENV_SEPARATOR: &str = "__";

/// Root application configuration
///
/// Every section has defaults, so an empty environment yields a usable
/// configuration pointed at the hosted assistant.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Assistant endpoint configuration
    #[serde(default)]
    pub assistant: AssistantConfig,

    /// Session identity
    #[serde(default)]
    pub session: SessionConfig,

    /// Log filter and format
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` file if present (for development)
    /// 2. Reads environment variables with `FIXIT` prefix
    /// 3. Uses `__` (double underscore) to separate nested values
    /// 4. Deserializes into typed configuration structs
    /// 5. Validates the result
    ///
    /// # Environment Variable Format
    ///
    /// - `FIXIT__ASSISTANT__BASE_URL=http://localhost:3000` -> `assistant.base_url`
    /// - `FIXIT__SESSION__USER_ID=user-7` -> `session.user_id`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::LoadError` if values cannot be parsed into
    /// expected types, `ConfigError::ValidationFailed` if they parse but are
    /// invalid
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if present (development)
        dotenvy::dotenv().ok();

        let config: Self = config::Config::builder()
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, with environment variables on top
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::LoadError` if the file is missing or malformed,
    /// `ConfigError::ValidationFailed` if the merged values are invalid
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let config: Self = config::Config::builder()
            .add_source(config::File::from(path.as_ref()).format(config::FileFormat::Toml))
            .add_source(environment())
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.assistant.validate()?;
        self.session.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

fn environment() -> config::Environment {
    config::Environment::default()
        .prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
}
