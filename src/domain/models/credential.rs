use std::fmt;

use serde::Deserialize;

use crate::domain::models::account::Role;

/// Length in bytes of every digest the hashers produce.
pub const DIGEST_LEN: usize = 32;

/// Value object representing a one-way password digest
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest([u8; DIGEST_LEN]);

impl PasswordDigest {
    /// Wrap digest bytes produced by a hasher
    pub fn new(bytes: [u8; DIGEST_LEN]) -> Self {
        Self(bytes)
    }

    /// Get the digest as a fixed-size byte array
    pub fn as_bytes(&self) -> &[u8; DIGEST_LEN] {
        &self.0
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(..)")
    }
}

/// An account to be created when the store is loaded
#[derive(Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub password: String,
    pub role: Role,
}

impl Registration {
    pub fn new(username: impl Into<String>, password: impl Into<String>, role: Role) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            role,
        }
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .finish()
    }
}
