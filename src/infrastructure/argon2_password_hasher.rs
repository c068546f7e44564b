use argon2::{Algorithm, Argon2, Params, Version};

use crate::domain::{
    error::DomainError,
    models::credential::{DIGEST_LEN, PasswordDigest},
    services::password_service::{HashAlgorithm, PasswordHasher},
};

const MIN_SALT_LEN: usize = 8;

/// Argon2id with one deployment-wide salt.
///
/// Digests stay deterministic per password, which the fixed-length
/// comparison relies on, while precomputed tables for plain SHA-256 do
/// not apply.
#[derive(Clone)]
pub struct Argon2PasswordHasher {
    argon2: Argon2<'static>,
    salt: Vec<u8>,
}

impl Argon2PasswordHasher {
    pub fn new(salt: impl Into<Vec<u8>>) -> Result<Self, DomainError> {
        Self::with_params(
            salt,
            Params::DEFAULT_M_COST,
            Params::DEFAULT_T_COST,
            Params::DEFAULT_P_COST,
        )
    }

    pub fn with_params(
        salt: impl Into<Vec<u8>>,
        m_cost: u32,
        t_cost: u32,
        p_cost: u32,
    ) -> Result<Self, DomainError> {
        let salt = salt.into();
        if salt.len() < MIN_SALT_LEN {
            return Err(DomainError::Hashing(format!(
                "salt must be at least {MIN_SALT_LEN} bytes"
            )));
        }

        let params = Params::new(m_cost, t_cost, p_cost, Some(DIGEST_LEN))
            .map_err(|e| DomainError::Hashing(e.to_string()))?;

        let hasher = Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
            salt,
        };
        // surface bad parameters at startup rather than on the first login
        hasher.digest("")?;

        Ok(hasher)
    }
}

impl PasswordHasher for Argon2PasswordHasher {
    fn algorithm(&self) -> HashAlgorithm {
        HashAlgorithm::Argon2id
    }

    fn digest(&self, plain_password: &str) -> Result<PasswordDigest, DomainError> {
        let mut out = [0u8; DIGEST_LEN];
        self.argon2
            .hash_password_into(plain_password.as_bytes(), &self.salt, &mut out)
            .map_err(|e| DomainError::Hashing(e.to_string()))?;

        Ok(PasswordDigest::new(out))
    }
}
