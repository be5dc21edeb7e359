//! Session configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::foundation::UserId;

/// Identity forwarded with each turn
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct SessionConfig {
    /// Signed-in user; omitted from requests when unset
    pub user_id: Option<String>,
}

impl SessionConfig {
    /// Creates a session configuration for the given user.
    pub fn for_user(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
        }
    }

    /// Returns the configured user id, if it is usable.
    pub fn user_id(&self) -> Option<UserId> {
        self.user_id.as_deref().and_then(|id| UserId::new(id).ok())
    }

    /// Validate session configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.user_id {
            Some(id) if id.trim().is_empty() => Err(ValidationError::BlankUserId),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_user_by_default() {
        let config = SessionConfig::default();
        assert!(config.user_id().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_user_id_is_exposed() {
        let config = SessionConfig::for_user("user-42");
        assert_eq!(config.user_id().unwrap().as_str(), "user-42");
    }

    #[test]
    fn test_blank_user_id_is_rejected() {
        let config = SessionConfig::for_user("   ");
        assert_eq!(config.validate(), Err(ValidationError::BlankUserId));
        assert!(config.user_id().is_none());
    }
}
