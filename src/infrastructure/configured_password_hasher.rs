use crate::{
    domain::{
        error::DomainError,
        models::credential::PasswordDigest,
        services::password_service::{HashAlgorithm, PasswordHasher},
    },
    infrastructure::{
        argon2_password_hasher::Argon2PasswordHasher, sha256_password_hasher::Sha256PasswordHasher,
    },
};

/// The hasher picked once at startup from `HASH_ALGORITHM`
#[derive(Clone)]
pub enum ConfiguredPasswordHasher {
    Sha256(Sha256PasswordHasher),
    Argon2(Argon2PasswordHasher),
}

impl ConfiguredPasswordHasher {
    pub fn build(algorithm: HashAlgorithm, salt: Option<&str>) -> Result<Self, DomainError> {
        match algorithm {
            HashAlgorithm::Sha256 => Ok(Self::Sha256(Sha256PasswordHasher::new())),
            HashAlgorithm::Argon2id => {
                let salt = salt.ok_or_else(|| {
                    DomainError::Hashing("argon2id requires a deployment salt".to_string())
                })?;
                Ok(Self::Argon2(Argon2PasswordHasher::new(salt.as_bytes())?))
            }
        }
    }
}

impl PasswordHasher for ConfiguredPasswordHasher {
    fn algorithm(&self) -> HashAlgorithm {
        match self {
            Self::Sha256(hasher) => hasher.algorithm(),
            Self::Argon2(hasher) => hasher.algorithm(),
        }
    }

    fn digest(&self, plain_password: &str) -> Result<PasswordDigest, DomainError> {
        match self {
            Self::Sha256(hasher) => hasher.digest(plain_password),
            Self::Argon2(hasher) => hasher.digest(plain_password),
        }
    }
}
