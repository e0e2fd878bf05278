//! Domain error model.

use thiserror::Error;

use crate::id::{BookingId, TourId};

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// ownership, inventory, lifecycle). Infrastructure concerns belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A request was malformed or carried out-of-range values.
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Unknown tour, booking or notification.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// The caller is neither the owner nor sufficiently privileged.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Fewer seats remain than were requested.
    #[error("insufficient inventory on tour {tour_id}: requested {requested}, available {available}")]
    InsufficientInventory {
        tour_id: TourId,
        requested: u32,
        available: u32,
    },

    /// The requested transition is not in the legal graph.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidStatus { from: String, to: String },

    /// Cancel was requested on a booking that is already cancelled.
    ///
    /// Callers treat this as a successful no-op.
    #[error("booking {booking_id} is already cancelled")]
    AlreadyCancelled { booking_id: BookingId },

    /// A concurrent writer changed the record first (lost compare-and-set).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn invalid_status(from: impl core::fmt::Display, to: impl core::fmt::Display) -> Self {
        Self::InvalidStatus {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// `true` for outcomes a caller should treat as success.
    pub fn is_soft(&self) -> bool {
        matches!(self, Self::AlreadyCancelled { .. })
    }
}
