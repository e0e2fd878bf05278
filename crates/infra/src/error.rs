//! Infrastructure and service error model.
//!
//! ## Error Mapping
//!
//! SQLx errors are mapped to `StoreError` as follows:
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Duplicate` |
//! | Database (check constraint violation) | `23514` | `Constraint` |
//! | Database (foreign key violation) | `23503` | `Constraint` |
//! | Database (other) | Any other | `Backend` |
//! | Column decode | N/A | `Corrupt` |
//! | PoolClosed / IO / other | N/A | `Backend` |

use thiserror::Error;

use tourbook_core::DomainError;

/// Failure of a storage backend, independent of business rules.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("duplicate key in {operation}: {message}")]
    Duplicate { operation: String, message: String },

    #[error("constraint violated in {operation}: {message}")]
    Constraint { operation: String, message: String },

    /// A stored row could not be turned back into a domain value.
    #[error("corrupt row in {operation}: {message}")]
    Corrupt { operation: String, message: String },

    #[error("storage backend error in {operation}: {message}")]
    Backend { operation: String, message: String },
}

impl StoreError {
    pub fn corrupt(operation: &str, message: impl core::fmt::Display) -> Self {
        Self::Corrupt {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    pub fn backend(operation: &str, message: impl core::fmt::Display) -> Self {
        Self::Backend {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }
}

/// Error returned by storage ports and the booking service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn domain(&self) -> Option<&DomainError> {
        match self {
            ServiceError::Domain(err) => Some(err),
            ServiceError::Store(_) => None,
        }
    }
}

impl From<tourbook_auth::AuthzError> for ServiceError {
    fn from(value: tourbook_auth::AuthzError) -> Self {
        ServiceError::Domain(value.into())
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Map SQLx errors to `StoreError` by SQLSTATE.
pub(crate) fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let operation = operation.to_string();
            let message = db_err.message().to_string();
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Duplicate { operation, message },
                Some("23514") | Some("23503") => StoreError::Constraint { operation, message },
                _ => StoreError::Backend { operation, message },
            }
        }
        sqlx::Error::ColumnDecode { index, source } => {
            StoreError::corrupt(operation, format!("column {index}: {source}"))
        }
        sqlx::Error::Decode(source) => StoreError::corrupt(operation, source),
        other => StoreError::backend(operation, other),
    }
}

/// Check if a SQLx error is a unique constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == "23505";
        }
    }
    false
}
