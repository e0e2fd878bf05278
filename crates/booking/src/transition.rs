//! Legal booking status graph and the side effects of each edge.
//!
//! ```text
//! pending ──► confirmed ──► in_progress ──► completed
//!    │            │              │
//!    └────────────┴──────────────┴──► cancelled
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tourbook_core::{DomainError, DomainResult};

use crate::booking::{Booking, BookingStatus, PaymentStatus};

/// Who is asking for the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// The booking's owner: may only cancel.
    Owner,
    /// Staff or admin acting through the privileged operation.
    Staff,
}

/// A validated transition, ready to be written with compare-and-set on `from`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionPlan {
    pub from: BookingStatus,
    pub to: BookingStatus,
    pub payment_status: PaymentStatus,
    /// Seats go back to the ledger (cancellation only).
    pub releases_inventory: bool,
}

impl TransitionPlan {
    pub fn is_cancellation(&self) -> bool {
        self.to == BookingStatus::Cancelled
    }

    pub fn apply(&self, booking: &mut Booking, now: DateTime<Utc>) {
        booking.status = self.to;
        booking.payment_status = self.payment_status;
        booking.updated_at = now;
    }
}

/// Decide whether `booking` may move to `target` on behalf of `actor`.
///
/// Errors leave nothing to undo: this function only reads.
pub fn plan_transition(
    booking: &Booking,
    target: BookingStatus,
    actor: Actor,
) -> DomainResult<TransitionPlan> {
    let from = booking.status;

    if target == BookingStatus::Cancelled && from == BookingStatus::Cancelled {
        return Err(DomainError::AlreadyCancelled {
            booking_id: booking.id,
        });
    }

    if actor == Actor::Owner && target != BookingStatus::Cancelled {
        return Err(DomainError::forbidden(format!(
            "owners may only cancel; '{target}' requires staff or admin"
        )));
    }

    let payment_status = match (from, target) {
        (BookingStatus::Pending, BookingStatus::Confirmed) => match booking.payment_status {
            PaymentStatus::Pending => PaymentStatus::Paid,
            other => other,
        },
        (BookingStatus::Confirmed, BookingStatus::InProgress)
        | (BookingStatus::InProgress, BookingStatus::Completed) => booking.payment_status,
        (
            BookingStatus::Pending | BookingStatus::Confirmed | BookingStatus::InProgress,
            BookingStatus::Cancelled,
        ) => PaymentStatus::Refunded,
        _ => return Err(DomainError::invalid_status(from, target)),
    };

    Ok(TransitionPlan {
        from,
        to: target,
        payment_status,
        releases_inventory: target == BookingStatus::Cancelled,
    })
}
