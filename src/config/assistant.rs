//! Assistant endpoint configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Where the chat endpoint lives and how long to wait for it
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct AssistantConfig {
    /// Scheme and host of the assistant service
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the chat endpoint
    #[serde(default = "default_chat_path")]
    pub chat_path: String,

    /// Connect timeout in seconds; transport default when unset
    pub connect_timeout_secs: Option<u64>,

    /// Whole-exchange timeout in seconds; transport default when unset
    pub request_timeout_secs: Option<u64>,
}

impl AssistantConfig {
    /// Get the connect timeout as Duration
    pub fn connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.map(Duration::from_secs)
    }

    /// Get the request timeout as Duration
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Validate assistant configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.base_url.trim().is_empty() {
            return Err(ValidationError::MissingRequired("assistant.base_url"));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ValidationError::InvalidBaseUrl);
        }
        if !self.chat_path.starts_with('/') {
            return Err(ValidationError::InvalidChatPath);
        }
        if self.connect_timeout_secs == Some(0) || self.request_timeout_secs == Some(0) {
            return Err(ValidationError::InvalidTimeout);
        }
        Ok(())
    }
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            chat_path: default_chat_path(),
            connect_timeout_secs: None,
            request_timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    "https://fixit-ai-agent.vercel.app".to_string()
}

fn default_chat_path() -> String {
    "/api/chat".to_string()
}
