use tracing::debug;

use crate::domain::{
    error::DomainError,
    models::{
        account::{Account, Role},
        verification::{Outcome, VerificationResult},
    },
};

/// A downstream operation and the roles allowed to perform it
#[derive(Debug, Clone, Copy)]
pub struct Operation {
    pub name: &'static str,
    pub allowed_roles: &'static [Role],
}

impl Operation {
    pub fn permits(&self, role: Role) -> bool {
        self.allowed_roles.contains(&role)
    }
}

pub const LOGIN: Operation = Operation {
    name: "login",
    allowed_roles: &[Role::Admin, Role::User, Role::Operator],
};

pub const ADMIN_PANEL: Operation = Operation {
    name: "admin_panel",
    allowed_roles: &[Role::Admin],
};

/// Role gate for an already verified account.
///
/// Runs strictly after verification has finished, so nothing here can
/// influence verification timing.
pub fn authorize<'a>(
    account: &'a Account,
    operation: &Operation,
) -> Result<&'a Account, DomainError> {
    if operation.permits(account.role()) {
        Ok(account)
    } else {
        debug!(operation = operation.name, role = %account.role(), "operation forbidden");
        Err(DomainError::Forbidden)
    }
}

/// Gate a verification result; failed verifications keep their own error
pub fn authorize_result<'a>(
    result: &'a VerificationResult,
    operation: &Operation,
) -> Result<&'a Account, DomainError> {
    match result.account() {
        Some(account) if result.is_success() => authorize(account, operation),
        _ if result.outcome() == Outcome::MalformedRequest => Err(DomainError::MalformedRequest),
        _ => Err(DomainError::InvalidCredentials),
    }
}
