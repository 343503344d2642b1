//! # Signed-in user
//!
//! [`UserInfo`] is the part of an auth provider's user record this crate cares
//! about. `id` keys every stored resource of the user's page.

use serde::{Deserialize, Serialize};

/// User information returned by the auth provider.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
}

impl UserInfo {
    /// New email/password user; the name defaults to the local part of the email.
    pub fn from_email(id: impl Into<String>, email: &str) -> Self {
        let name = email
            .split('@')
            .next()
            .filter(|local| !local.is_empty())
            .map(str::to_string);
        Self {
            id: id.into(),
            email: email.to_string(),
            name,
        }
    }

    /// Get display name, falling back to email if name is not set.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_email_uses_local_part() {
        let user = UserInfo::from_email("u1", "ada@example.com");
        assert_eq!(user.display_name(), "ada");

        let user = UserInfo::from_email("u2", "@example.com");
        assert_eq!(user.display_name(), "@example.com");
    }
}
