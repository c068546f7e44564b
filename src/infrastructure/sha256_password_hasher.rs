use sha2::{Digest, Sha256};

use crate::domain::{
    error::DomainError,
    models::credential::PasswordDigest,
    services::password_service::{HashAlgorithm, PasswordHasher},
};

#[derive(Clone)]
pub struct Sha256PasswordHasher;

impl Sha256PasswordHasher {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Sha256PasswordHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl PasswordHasher for Sha256PasswordHasher {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Sha256
    }

    fn digest(&self, plain_password: &str) -> Result<PasswordDigest, DomainError> {
        Ok(PasswordDigest::new(
            Sha256::digest(plain_password.as_bytes()).into(),
        ))
    }
}
