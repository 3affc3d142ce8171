// ABOUTME: Registry credentials for a single pull.
// ABOUTME: Password is redacted from Debug output and never persisted.

use std::fmt;

/// Username/password pair for an authenticated pull.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> &str {
        &self.password
    }

    /// Both halves present. Partial credentials are treated as anonymous.
    pub fn is_usable(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// `user:password`, the inline form skopeo and podman accept.
    pub fn inline(&self) -> String {
        format!("{}:{}", self.username, self.password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
