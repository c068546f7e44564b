use std::{fmt, str::FromStr};

use crate::domain::{error::DomainError, models::credential::PasswordDigest};

/// The designated one-way hash used for every stored and submitted password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Argon2id,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashAlgorithm::Sha256 => f.write_str("sha256"),
            HashAlgorithm::Argon2id => f.write_str("argon2id"),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sha256" => Ok(HashAlgorithm::Sha256),
            "argon2id" | "argon2" => Ok(HashAlgorithm::Argon2id),
            other => Err(format!("unsupported hash algorithm: {other}")),
        }
    }
}

/// Service for turning plain text passwords into digests
///
/// Implementations hash the UTF-8 bytes of the password and nothing else,
/// so the load path and the verify path always see the same encoding.
pub trait PasswordHasher: Clone + Send + Sync {
    fn algorithm(&self) -> HashAlgorithm;

    /// Hash a plain text password into a fixed-length digest
    fn digest(&self, plain_password: &str) -> Result<PasswordDigest, DomainError>;
}
