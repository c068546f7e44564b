use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::models::credential::PasswordDigest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Role {
    Admin,
    User,
    Operator,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
            Role::Operator => "operator",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            "operator" => Ok(Role::Operator),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccountId(Uuid);
impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of a stored account.
///
/// The digest is readable inside the crate only; callers outside the
/// verifier get role and login metadata, never hash bytes.
#[derive(Debug, Clone)]
pub struct Account {
    id: AccountId,
    username: String,
    password_digest: PasswordDigest,
    role: Role,
    last_login: Option<DateTime<Utc>>,
}

impl Account {
    pub fn new(
        id: AccountId,
        username: String,
        password_digest: PasswordDigest,
        role: Role,
        last_login: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id,
            username,
            password_digest,
            role,
            last_login,
        }
    }

    pub fn id(&self) -> &AccountId {
        &self.id
    }
    pub fn username(&self) -> &str {
        &self.username
    }
    pub(crate) fn password_digest(&self) -> &PasswordDigest {
        &self.password_digest
    }
    pub fn role(&self) -> Role {
        self.role
    }
    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.last_login
    }

    pub fn with_last_login(mut self, at: DateTime<Utc>) -> Self {
        self.last_login = Some(at);
        self
    }
}
