use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin";

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, Eq, PartialEq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Viewer,
    Admin,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Viewer => "viewer",
            Self::Admin => "admin",
        }
    }
}

#[derive(Debug, Clone, Error, Eq, PartialEq)]
pub enum AuthError {
    #[error("Tài khoản hoặc mật khẩu không chính xác.")]
    InvalidCredentials,
}

/// Decides which role a credential pair grants.
pub trait Authenticator: Send + Sync {
    /// # Errors
    /// Returns [`AuthError::InvalidCredentials`] when the pair is rejected.
    fn authenticate(&self, username: &str, password: &str) -> Result<Role, AuthError>;
}

/// Administrator credential pair, read from configuration.
#[derive(Clone, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct AuthSettings {
    pub username: String,
    pub password: String,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            username: DEFAULT_ADMIN_USERNAME.to_string(),
            password: DEFAULT_ADMIN_PASSWORD.to_string(),
        }
    }
}

impl fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthSettings")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Grants [`Role::Admin`] to exactly one username/password pair, compared
/// case-sensitively.
#[derive(Debug, Clone, Default)]
pub struct FixedCredentialAuthenticator {
    settings: AuthSettings,
}

impl FixedCredentialAuthenticator {
    #[must_use]
    pub fn new(settings: AuthSettings) -> Self {
        Self { settings }
    }
}

impl Authenticator for FixedCredentialAuthenticator {
    fn authenticate(&self, username: &str, password: &str) -> Result<Role, AuthError> {
        if username == self.settings.username && password == self.settings.password {
            Ok(Role::Admin)
        } else {
            Err(AuthError::InvalidCredentials)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pair_grants_admin() {
        let auth = FixedCredentialAuthenticator::default();
        assert_eq!(auth.authenticate("admin", "admin"), Ok(Role::Admin));
    }

    #[test]
    fn comparison_is_case_sensitive_on_both_fields() {
        let auth = FixedCredentialAuthenticator::default();
        assert_eq!(auth.authenticate("Admin", "admin"), Err(AuthError::InvalidCredentials));
        assert_eq!(auth.authenticate("admin", "ADMIN"), Err(AuthError::InvalidCredentials));
        assert_eq!(auth.authenticate("", ""), Err(AuthError::InvalidCredentials));
    }

    #[test]
    fn configured_pair_replaces_default() {
        let auth = FixedCredentialAuthenticator::new(AuthSettings {
            username: "quantri".to_string(),
            password: "s3cret".to_string(),
        });
        assert_eq!(auth.authenticate("quantri", "s3cret"), Ok(Role::Admin));
        assert!(auth.authenticate("admin", "admin").is_err());
    }

    #[test]
    fn debug_output_hides_password() {
        let rendered = format!(
            "{:?}",
            AuthSettings { username: "quantri".to_string(), password: "s3cret".to_string() }
        );
        assert!(rendered.contains("quantri"));
        assert!(!rendered.contains("s3cret"));
    }
}
