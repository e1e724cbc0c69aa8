//! Authentication state management.

use crate::models::UserId;

/// Credentials of a logged-in administrator.
#[derive(Debug, Clone)]
pub struct AuthInfo {
    /// Bearer token.
    pub token: String,
    /// Admin account ID.
    pub admin_id: UserId,
}

impl AuthInfo {
    /// Create new auth info.
    pub fn new(token: impl Into<String>, admin_id: impl Into<UserId>) -> Self {
        Self {
            token: token.into(),
            admin_id: admin_id.into(),
        }
    }

    /// Check if auth looks valid.
    pub fn is_valid(&self) -> bool {
        !self.token.is_empty() && !self.admin_id.is_empty()
    }

    /// Value for the `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}
