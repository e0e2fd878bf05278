//! Owner/elevated policy checks.
//!
//! - No IO
//! - No panics
//! - No business logic (pure policy check)

use thiserror::Error;

use tourbook_core::{DomainError, UserId};

use crate::Principal;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("forbidden: staff or admin role required")]
    ElevatedRoleRequired,

    #[error("forbidden: caller does not own this resource")]
    NotOwner,
}

impl From<AuthzError> for DomainError {
    fn from(value: AuthzError) -> Self {
        DomainError::forbidden(value.to_string())
    }
}

/// Privileged operations (list all bookings, staff-driven transitions).
pub fn require_elevated(principal: &Principal) -> Result<(), AuthzError> {
    if principal.is_elevated() {
        Ok(())
    } else {
        Err(AuthzError::ElevatedRoleRequired)
    }
}

/// Reads of a single resource: the owner or any elevated role.
pub fn authorize_owner_or_elevated(principal: &Principal, owner: UserId) -> Result<(), AuthzError> {
    if principal.user_id == owner || principal.is_elevated() {
        Ok(())
    } else {
        Err(AuthzError::NotOwner)
    }
}
