use std::{fs, net::SocketAddr, time::Duration};

use thiserror::Error;

use crate::domain::{
    models::credential::Registration, services::password_service::HashAlgorithm,
};

pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
pub const DEFAULT_LOGIN_DELAY_MS: u64 = 100;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("Failed to read registrations from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse registrations from {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Construction inputs for the store and the verifier; immutable after startup
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub hash_algorithm: HashAlgorithm,
    pub hash_salt: Option<String>,
    pub login_delay: Duration,
    pub registrations: Vec<Registration>,
}

impl AppConfig {
    /// Read the configuration from the process environment (and `.env`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let bind_addr = lookup("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::Invalid {
                var: "BIND_ADDR",
                reason: e.to_string(),
            })?;

        let hash_algorithm = match lookup("HASH_ALGORITHM") {
            Some(value) => value
                .parse::<HashAlgorithm>()
                .map_err(|reason| ConfigError::Invalid {
                    var: "HASH_ALGORITHM",
                    reason,
                })?,
            None => HashAlgorithm::Sha256,
        };

        let hash_salt = lookup("HASH_SALT").filter(|salt| !salt.is_empty());
        if hash_algorithm == HashAlgorithm::Argon2id && hash_salt.is_none() {
            return Err(ConfigError::Missing("HASH_SALT"));
        }

        let login_delay = match lookup("LOGIN_DELAY_MS") {
            Some(value) => value
                .parse::<u64>()
                .map(Duration::from_millis)
                .map_err(|e| ConfigError::Invalid {
                    var: "LOGIN_DELAY_MS",
                    reason: e.to_string(),
                })?,
            None => Duration::from_millis(DEFAULT_LOGIN_DELAY_MS),
        };

        let registrations = match lookup("REGISTRATIONS_PATH") {
            Some(path) => load_registrations(&path)?,
            None => Vec::new(),
        };

        Ok(Self {
            bind_addr,
            hash_algorithm,
            hash_salt,
            login_delay,
            registrations,
        })
    }
}

/// Read `[{"username", "password", "role"}, ...]` from a JSON file
pub fn load_registrations(path: &str) -> Result<Vec<Registration>, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_string(),
        source,
    })?;

    serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
        path: path.to_string(),
        source,
    })
}
