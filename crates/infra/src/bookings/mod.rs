//! Booking record storage.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tourbook_booking::{Booking, TransitionPlan};
use tourbook_core::{BookingId, UserId};

use crate::error::ServiceResult;

pub use in_memory::InMemoryBookingStore;
pub use postgres::PostgresBookingStore;

/// Persistence port for bookings.
///
/// Records are never physically deleted; cancellation is a status.
/// Listings are newest first.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert(&self, booking: &Booking) -> ServiceResult<()>;

    async fn get(&self, booking_id: BookingId) -> ServiceResult<Option<Booking>>;

    async fn list_for_owner(&self, owner_id: UserId) -> ServiceResult<Vec<Booking>>;

    async fn list_all(&self) -> ServiceResult<Vec<Booking>>;

    /// Write `plan` only if the stored status still equals `plan.from`.
    ///
    /// Returns `None` when another writer got there first; the caller decides
    /// what that means. `total_price` is never touched.
    async fn apply_transition(
        &self,
        booking_id: BookingId,
        plan: &TransitionPlan,
        now: DateTime<Utc>,
    ) -> ServiceResult<Option<Booking>>;
}

#[async_trait]
impl<S> BookingStore for Arc<S>
where
    S: BookingStore + ?Sized,
{
    async fn insert(&self, booking: &Booking) -> ServiceResult<()> {
        (**self).insert(booking).await
    }

    async fn get(&self, booking_id: BookingId) -> ServiceResult<Option<Booking>> {
        (**self).get(booking_id).await
    }

    async fn list_for_owner(&self, owner_id: UserId) -> ServiceResult<Vec<Booking>> {
        (**self).list_for_owner(owner_id).await
    }

    async fn list_all(&self) -> ServiceResult<Vec<Booking>> {
        (**self).list_all().await
    }

    async fn apply_transition(
        &self,
        booking_id: BookingId,
        plan: &TransitionPlan,
        now: DateTime<Utc>,
    ) -> ServiceResult<Option<Booking>> {
        (**self).apply_transition(booking_id, plan, now).await
    }
}
