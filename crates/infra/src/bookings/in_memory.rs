use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tourbook_booking::{Booking, TransitionPlan};
use tourbook_core::{BookingId, DomainError, UserId};

use crate::error::{ServiceResult, StoreError};

use super::BookingStore;

/// In-memory booking store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryBookingStore {
    inner: RwLock<HashMap<BookingId, Booking>>,
}

impl InMemoryBookingStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collect(&self, operation: &str, filter: impl Fn(&Booking) -> bool) -> ServiceResult<Vec<Booking>> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::backend(operation, "booking store lock poisoned"))?;
        let mut bookings: Vec<Booking> = map.values().filter(|b| filter(b)).cloned().collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(bookings)
    }
}

#[async_trait]
impl BookingStore for InMemoryBookingStore {
    async fn insert(&self, booking: &Booking) -> ServiceResult<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| StoreError::backend("insert_booking", "booking store lock poisoned"))?;
        if map.contains_key(&booking.id) {
            return Err(DomainError::conflict(format!("booking {} already exists", booking.id)).into());
        }
        map.insert(booking.id, booking.clone());
        Ok(())
    }

    async fn get(&self, booking_id: BookingId) -> ServiceResult<Option<Booking>> {
        let map = self
            .inner
            .read()
            .map_err(|_| StoreError::backend("get_booking", "booking store lock poisoned"))?;
        Ok(map.get(&booking_id).cloned())
    }

    async fn list_for_owner(&self, owner_id: UserId) -> ServiceResult<Vec<Booking>> {
        self.collect("list_for_owner", |b| b.owner_id == owner_id)
    }

    async fn list_all(&self) -> ServiceResult<Vec<Booking>> {
        self.collect("list_all", |_| true)
    }

    async fn apply_transition(
        &self,
        booking_id: BookingId,
        plan: &TransitionPlan,
        now: DateTime<Utc>,
    ) -> ServiceResult<Option<Booking>> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| StoreError::backend("apply_transition", "booking store lock poisoned"))?;
        let booking = map
            .get_mut(&booking_id)
            .ok_or_else(|| DomainError::not_found("booking"))?;

        if booking.status != plan.from {
            return Ok(None);
        }
        plan.apply(booking, now);
        Ok(Some(booking.clone()))
    }
}
