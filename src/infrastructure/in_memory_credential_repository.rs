use std::{
    collections::{HashMap, hash_map::Entry},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::{
    error::{DomainError, RepositoryError},
    models::{
        account::{Account, AccountId, Role},
        credential::{PasswordDigest, Registration},
    },
    repositories::credential_repository::CredentialRepository,
    services::password_service::PasswordHasher,
};

struct StoredAccount {
    id: AccountId,
    username: String,
    password_digest: PasswordDigest,
    role: Role,
    // per-account lock; logins by different users never contend
    last_login: Mutex<Option<DateTime<Utc>>>,
}

impl StoredAccount {
    fn snapshot(&self) -> Result<Account, RepositoryError> {
        let last_login = *self
            .last_login
            .lock()
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        Ok(Account::new(
            self.id,
            self.username.clone(),
            self.password_digest.clone(),
            self.role,
            last_login,
        ))
    }
}

/// Credential store built once at startup.
///
/// The username map itself is never mutated after `load`, so lookups take
/// no lock. Only `last_login` changes, behind each account's own mutex.
#[derive(Clone)]
pub struct InMemoryCredentialRepository {
    accounts: Arc<HashMap<String, StoredAccount>>,
}

impl InMemoryCredentialRepository {
    pub fn load<P: PasswordHasher>(
        registrations: impl IntoIterator<Item = Registration>,
        hasher: &P,
    ) -> Result<Self, DomainError> {
        let mut accounts = HashMap::new();

        for registration in registrations {
            if registration.username.is_empty() || registration.password.is_empty() {
                return Err(DomainError::MalformedRequest);
            }

            match accounts.entry(registration.username) {
                Entry::Occupied(entry) => {
                    return Err(DomainError::DuplicateUsername(entry.key().clone()));
                }
                Entry::Vacant(entry) => {
                    let password_digest = hasher.digest(&registration.password)?;
                    let username = entry.key().clone();
                    entry.insert(StoredAccount {
                        id: AccountId::new(),
                        username,
                        password_digest,
                        role: registration.role,
                        last_login: Mutex::new(None),
                    });
                }
            }
        }

        debug!(
            accounts = accounts.len(),
            algorithm = %hasher.algorithm(),
            "credential store loaded"
        );

        Ok(Self {
            accounts: Arc::new(accounts),
        })
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }
}

#[async_trait]
impl CredentialRepository for InMemoryCredentialRepository {
    async fn lookup(&self, username: &str) -> Result<Option<Account>, RepositoryError> {
        self.accounts
            .get(username)
            .map(StoredAccount::snapshot)
            .transpose()
    }

    async fn record_login(
        &self,
        username: &str,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, RepositoryError> {
        let account = self.accounts.get(username).ok_or(RepositoryError::NotFound)?;
        let mut last_login = account
            .last_login
            .lock()
            .map_err(|e| RepositoryError::Storage(e.to_string()))?;

        // concurrent logins may arrive out of order; keep the latest
        let stored = match *last_login {
            Some(existing) if existing > at => existing,
            _ => at,
        };
        *last_login = Some(stored);

        Ok(stored)
    }

    async fn usernames(&self) -> Result<Vec<String>, RepositoryError> {
        let mut usernames: Vec<String> = self.accounts.keys().cloned().collect();
        usernames.sort();
        Ok(usernames)
    }
}
