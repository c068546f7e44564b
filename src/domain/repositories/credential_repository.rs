use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{error::RepositoryError, models::account::Account};

#[async_trait]
pub trait CredentialRepository: Send + Sync {
    /// Snapshot of the account registered under `username`, if any
    async fn lookup(&self, username: &str) -> Result<Option<Account>, RepositoryError>;

    /// Store `at` as the last successful login and return the stored value.
    ///
    /// Unknown usernames yield `RepositoryError::NotFound`.
    async fn record_login(
        &self,
        username: &str,
        at: DateTime<Utc>,
    ) -> Result<DateTime<Utc>, RepositoryError>;

    async fn usernames(&self) -> Result<Vec<String>, RepositoryError>;
}
