use std::fmt;

use crate::domain::models::account::Account;

/// A login attempt as received from the transport layer.
///
/// The password is transient: it is hashed once and dropped with the
/// request.
#[derive(Clone)]
pub struct VerificationRequest {
    pub username: String,
    pub password: String,
}

impl VerificationRequest {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for VerificationRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    InvalidCredentials,
    MalformedRequest,
}

#[derive(Debug, Clone)]
pub struct VerificationResult {
    outcome: Outcome,
    account: Option<Account>,
}

impl VerificationResult {
    pub fn success(account: Account) -> Self {
        Self {
            outcome: Outcome::Success,
            account: Some(account),
        }
    }

    pub fn invalid_credentials() -> Self {
        Self {
            outcome: Outcome::InvalidCredentials,
            account: None,
        }
    }

    pub fn malformed_request() -> Self {
        Self {
            outcome: Outcome::MalformedRequest,
            account: None,
        }
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Present only when the outcome is `Success`
    pub fn account(&self) -> Option<&Account> {
        self.account.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.outcome == Outcome::Success
    }
}
