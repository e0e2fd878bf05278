use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use tourbook_booking::{Reservation, Tour};
use tourbook_core::{DomainError, TourId};

use crate::error::{ServiceResult, StoreError};

use super::InventoryLedger;

/// In-memory ledger for tests/dev.
///
/// Every mutation runs check-and-update under one write lock.
#[derive(Debug, Default)]
pub struct InMemoryInventoryLedger {
    tours: RwLock<HashMap<TourId, Tour>>,
}

impl InMemoryInventoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a tour directly (fixtures).
    pub fn with_tour(self, tour: Tour) -> Self {
        if let Ok(mut tours) = self.tours.write() {
            tours.insert(tour.id, tour);
        }
        self
    }

    fn mutate<T>(
        &self,
        operation: &str,
        tour_id: TourId,
        f: impl FnOnce(&mut Tour) -> Result<T, DomainError>,
    ) -> ServiceResult<T> {
        let mut tours = self
            .tours
            .write()
            .map_err(|_| StoreError::backend(operation, "ledger lock poisoned"))?;
        let tour = tours
            .get_mut(&tour_id)
            .ok_or_else(|| DomainError::not_found("tour"))?;
        Ok(f(tour)?)
    }
}

#[async_trait]
impl InventoryLedger for InMemoryInventoryLedger {
    async fn tour(&self, tour_id: TourId) -> ServiceResult<Option<Tour>> {
        let tours = self
            .tours
            .read()
            .map_err(|_| StoreError::backend("tour", "ledger lock poisoned"))?;
        Ok(tours.get(&tour_id).cloned())
    }

    async fn upsert_tour(&self, tour_id: TourId, price: u64, max_seats: u32) -> ServiceResult<Tour> {
        let mut tours = self
            .tours
            .write()
            .map_err(|_| StoreError::backend("upsert_tour", "ledger lock poisoned"))?;
        match tours.get_mut(&tour_id) {
            Some(existing) => {
                existing.resize(price, max_seats)?;
                Ok(existing.clone())
            }
            None => {
                let tour = Tour::new(tour_id, price, max_seats);
                tours.insert(tour_id, tour.clone());
                Ok(tour)
            }
        }
    }

    async fn reserve(&self, tour_id: TourId, quantity: u32) -> ServiceResult<Reservation> {
        self.mutate("reserve", tour_id, |tour| tour.reserve(quantity))
    }

    async fn release(&self, tour_id: TourId, quantity: u32) -> ServiceResult<u32> {
        self.mutate("release", tour_id, |tour| tour.release(quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceError;
    use std::sync::Arc;

    #[tokio::test]
    async fn reserve_on_unknown_tour_is_not_found() {
        let ledger = InMemoryInventoryLedger::new();
        let err = ledger.reserve(TourId::new(), 1).await.unwrap_err();
        assert_eq!(err, ServiceError::Domain(DomainError::not_found("tour")));
    }

    #[tokio::test]
    async fn upsert_creates_then_resizes() {
        let ledger = InMemoryInventoryLedger::new();
        let id = TourId::new();

        let created = ledger.upsert_tour(id, 1_000, 4).await.unwrap();
        assert_eq!(created.available_seats, 4);

        ledger.reserve(id, 3).await.unwrap();
        let err = ledger.upsert_tour(id, 1_000, 2).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Validation(_))));

        let resized = ledger.upsert_tour(id, 1_200, 8).await.unwrap();
        assert_eq!(resized.available_seats, 5);
        assert_eq!(resized.price, 1_200);
    }

    #[tokio::test]
    async fn release_is_bounded_by_capacity() {
        let id = TourId::new();
        let ledger = InMemoryInventoryLedger::new().with_tour(Tour::new(id, 500, 2));

        ledger.reserve(id, 2).await.unwrap();
        assert_eq!(ledger.release(id, 2).await.unwrap(), 2);
        let err = ledger.release(id, 1).await.unwrap_err();
        assert!(matches!(err, ServiceError::Domain(DomainError::Conflict(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reservations_never_oversell() {
        let id = TourId::new();
        let ledger = Arc::new(InMemoryInventoryLedger::new().with_tour(Tour::new(id, 100, 10)));

        let mut handles = Vec::new();
        for _ in 0..40 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move { ledger.reserve(id, 1).await }));
        }

        let mut granted = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                granted += 1;
            }
        }

        assert_eq!(granted, 10);
        assert_eq!(ledger.tour(id).await.unwrap().unwrap().available_seats, 0);
    }
}
