//! Seat inventory ledger: the only writer of `available_seats`.
//!
//! Both operations are single conditional mutations. There is no
//! read-then-write window in which two reservations could both see the same
//! free seat.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use tourbook_booking::{Reservation, Tour};
use tourbook_core::TourId;

use crate::error::ServiceResult;

pub use in_memory::InMemoryInventoryLedger;
pub use postgres::PostgresInventoryLedger;

#[async_trait]
pub trait InventoryLedger: Send + Sync {
    async fn tour(&self, tour_id: TourId) -> ServiceResult<Option<Tour>>;

    /// Catalog sync: create the tour with every seat free, or apply a new
    /// price and capacity while keeping sold seats sold.
    async fn upsert_tour(&self, tour_id: TourId, price: u64, max_seats: u32) -> ServiceResult<Tour>;

    /// Atomically take `quantity` seats and capture the unit price.
    ///
    /// Errors: `NotFound`, `InsufficientInventory` (nothing changed), `Validation`.
    async fn reserve(&self, tour_id: TourId, quantity: u32) -> ServiceResult<Reservation>;

    /// Atomically return `quantity` seats. Returns the new available count.
    ///
    /// Errors with `Conflict` when the release would push the counter past
    /// `max_seats`.
    async fn release(&self, tour_id: TourId, quantity: u32) -> ServiceResult<u32>;
}

#[async_trait]
impl<L> InventoryLedger for Arc<L>
where
    L: InventoryLedger + ?Sized,
{
    async fn tour(&self, tour_id: TourId) -> ServiceResult<Option<Tour>> {
        (**self).tour(tour_id).await
    }

    async fn upsert_tour(&self, tour_id: TourId, price: u64, max_seats: u32) -> ServiceResult<Tour> {
        (**self).upsert_tour(tour_id, price, max_seats).await
    }

    async fn reserve(&self, tour_id: TourId, quantity: u32) -> ServiceResult<Reservation> {
        (**self).reserve(tour_id, quantity).await
    }

    async fn release(&self, tour_id: TourId, quantity: u32) -> ServiceResult<u32> {
        (**self).release(tour_id, quantity).await
    }
}
