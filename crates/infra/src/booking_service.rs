//! Booking workflows: reservation, ownership checks, transitions and their
//! side effects, in the order that keeps the inventory counter honest.
//!
//! ## Ordering rules
//!
//! - Create: reserve seats, then insert the booking. If the insert fails the
//!   seats are released before the error is returned.
//! - Transition: compare-and-set the status first; only the writer that won
//!   the compare-and-set releases seats, so a cancellation releases once. If
//!   that release fails the status is set back, leaving the step retryable.
//! - Notifications come last and never undo a committed change.

use chrono::Utc;
use tracing::{Span, instrument};

use tourbook_auth::{Principal, authorize_owner_or_elevated, require_elevated};
use tourbook_booking::{
    Actor, Booking, BookingEvent, BookingStatus, NewBooking, Tour, TransitionPlan, plan_transition,
};
use tourbook_core::{BookingId, DomainError, TourId};
use tourbook_events::Publisher;

use crate::bookings::BookingStore;
use crate::dispatcher::NotificationDispatcher;
use crate::error::{ServiceError, ServiceResult};
use crate::ledger::InventoryLedger;
use crate::notifications::NotificationStore;

pub struct BookingService<L, B, N, P> {
    ledger: L,
    bookings: B,
    dispatcher: NotificationDispatcher<N, P>,
}

impl<L, B, N, P> BookingService<L, B, N, P>
where
    L: InventoryLedger,
    B: BookingStore,
    N: NotificationStore,
    P: Publisher,
{
    pub fn new(ledger: L, bookings: B, dispatcher: NotificationDispatcher<N, P>) -> Self {
        Self {
            ledger,
            bookings,
            dispatcher,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn dispatcher(&self) -> &NotificationDispatcher<N, P> {
        &self.dispatcher
    }

    #[instrument(
        skip(self, principal, request),
        fields(owner_id = %principal.user_id, tour_id = %request.tour_id, quantity = request.quantity, booking_id),
        err
    )]
    pub async fn create_booking(
        &self,
        principal: &Principal,
        request: NewBooking,
    ) -> ServiceResult<Booking> {
        let now = Utc::now();
        request.validate(now.date_naive())?;

        let reservation = self.ledger.reserve(request.tour_id, request.quantity).await?;

        let booking = match Booking::create(principal.user_id, request, &reservation, now) {
            Ok(booking) => booking,
            Err(err) => {
                self.roll_back_reservation(reservation.tour_id, reservation.quantity)
                    .await;
                return Err(err.into());
            }
        };
        Span::current().record("booking_id", tracing::field::display(booking.id));

        if let Err(err) = self.bookings.insert(&booking).await {
            self.roll_back_reservation(booking.tour_id, booking.quantity).await;
            return Err(err);
        }

        tracing::info!(remaining = reservation.remaining, "booking created");
        self.announce(BookingEvent::Created {
            booking: booking.clone(),
        })
        .await;

        Ok(booking)
    }

    /// The owner, or any elevated caller.
    #[instrument(skip(self, principal), fields(booking_id = %booking_id), err)]
    pub async fn get_booking(&self, principal: &Principal, booking_id: BookingId) -> ServiceResult<Booking> {
        let booking = self.load(booking_id).await?;
        authorize_owner_or_elevated(principal, booking.owner_id)?;
        Ok(booking)
    }

    pub async fn list_own(&self, principal: &Principal) -> ServiceResult<Vec<Booking>> {
        self.bookings.list_for_owner(principal.user_id).await
    }

    pub async fn list_all(&self, principal: &Principal) -> ServiceResult<Vec<Booking>> {
        require_elevated(principal)?;
        self.bookings.list_all().await
    }

    /// Cancel a booking on behalf of its owner (or an elevated caller).
    ///
    /// A repeat cancel yields `AlreadyCancelled` and changes nothing.
    #[instrument(skip(self, principal), fields(booking_id = %booking_id), err)]
    pub async fn cancel_booking(
        &self,
        principal: &Principal,
        booking_id: BookingId,
    ) -> ServiceResult<Booking> {
        let booking = self.load(booking_id).await?;
        authorize_owner_or_elevated(principal, booking.owner_id)?;

        let actor = if booking.is_owned_by(principal.user_id) {
            Actor::Owner
        } else {
            Actor::Staff
        };
        let plan = plan_transition(&booking, BookingStatus::Cancelled, actor)?;
        self.commit(booking, plan).await
    }

    /// Privileged status change along the legal graph.
    #[instrument(skip(self, principal), fields(booking_id = %booking_id, to = %target), err)]
    pub async fn change_status(
        &self,
        principal: &Principal,
        booking_id: BookingId,
        target: BookingStatus,
    ) -> ServiceResult<Booking> {
        require_elevated(principal)?;
        let booking = self.load(booking_id).await?;
        let plan = plan_transition(&booking, target, Actor::Staff)?;
        self.commit(booking, plan).await
    }

    /// Catalog sync (privileged).
    #[instrument(skip(self, principal), fields(tour_id = %tour_id), err)]
    pub async fn sync_tour(
        &self,
        principal: &Principal,
        tour_id: TourId,
        price: u64,
        max_seats: u32,
    ) -> ServiceResult<Tour> {
        require_elevated(principal)?;
        self.ledger.upsert_tour(tour_id, price, max_seats).await
    }

    pub async fn tour(&self, tour_id: TourId) -> ServiceResult<Tour> {
        self.ledger
            .tour(tour_id)
            .await?
            .ok_or_else(|| DomainError::not_found("tour").into())
    }

    async fn load(&self, booking_id: BookingId) -> ServiceResult<Booking> {
        self.bookings
            .get(booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found("booking").into())
    }

    async fn commit(&self, booking: Booking, plan: TransitionPlan) -> ServiceResult<Booking> {
        let updated = match self
            .bookings
            .apply_transition(booking.id, &plan, Utc::now())
            .await?
        {
            Some(updated) => updated,
            None => return Err(self.lost_race(booking.id, &plan).await),
        };

        if plan.releases_inventory {
            if let Err(err) = self.ledger.release(updated.tour_id, updated.quantity).await {
                self.revert(&booking, &plan).await;
                return Err(err);
            }
        }

        tracing::info!(from = %plan.from, to = %plan.to, "booking status changed");
        let event = if plan.is_cancellation() {
            BookingEvent::Cancelled {
                booking: updated.clone(),
                from: plan.from,
            }
        } else {
            BookingEvent::StatusChanged {
                booking: updated.clone(),
                from: plan.from,
            }
        };
        self.announce(event).await;

        Ok(updated)
    }

    /// Someone else moved the booking between our read and our write.
    async fn lost_race(&self, booking_id: BookingId, plan: &TransitionPlan) -> ServiceError {
        match self.bookings.get(booking_id).await {
            Ok(Some(current)) if plan.is_cancellation() && current.status == BookingStatus::Cancelled => {
                DomainError::AlreadyCancelled { booking_id }.into()
            }
            Ok(Some(current)) => DomainError::conflict(format!(
                "booking {booking_id} moved to '{}' concurrently",
                current.status
            ))
            .into(),
            Ok(None) => DomainError::not_found("booking").into(),
            Err(err) => err,
        }
    }

    /// Undo a committed transition whose seat release failed, so the caller
    /// can retry the whole step.
    async fn revert(&self, original: &Booking, plan: &TransitionPlan) {
        let undo = TransitionPlan {
            from: plan.to,
            to: plan.from,
            payment_status: original.payment_status,
            releases_inventory: false,
        };
        match self.bookings.apply_transition(original.id, &undo, Utc::now()).await {
            Ok(Some(_)) => {
                tracing::warn!(
                    booking_id = %original.id,
                    status = %plan.from,
                    "seat release failed; status change reverted"
                );
            }
            Ok(None) => {
                tracing::error!(
                    booking_id = %original.id,
                    tour_id = %original.tour_id,
                    quantity = original.quantity,
                    "seat release failed and the booking moved again; counter needs reconciliation"
                );
            }
            Err(err) => {
                tracing::error!(
                    booking_id = %original.id,
                    tour_id = %original.tour_id,
                    quantity = original.quantity,
                    error = %err,
                    "seat release failed and the revert failed; counter needs reconciliation"
                );
            }
        }
    }

    async fn roll_back_reservation(&self, tour_id: TourId, quantity: u32) {
        match self.ledger.release(tour_id, quantity).await {
            Ok(available) => {
                tracing::warn!(%tour_id, quantity, available, "booking insert failed; reservation released");
            }
            Err(err) => {
                tracing::error!(%tour_id, quantity, error = %err, "reservation rollback failed");
            }
        }
    }

    // The booking change is already committed; a failed notification write is
    // logged rather than reported to the caller.
    async fn announce(&self, event: BookingEvent) {
        if let Err(err) = self.dispatcher.booking_event(&event).await {
            tracing::error!(
                booking_id = %event.booking().id,
                event = event.event_type(),
                error = %err,
                "failed to record booking notification"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use chrono::{DateTime, Duration};
    use tourbook_auth::Role;
    use tourbook_booking::{ContactInfo, PaymentStatus, Reservation, Traveler};
    use tourbook_core::UserId;
    use tourbook_events::SessionRegistry;

    use crate::bookings::InMemoryBookingStore;
    use crate::error::StoreError;
    use crate::ledger::InMemoryInventoryLedger;
    use crate::notifications::InMemoryNotificationStore;

    type TestService = BookingService<
        Arc<InMemoryInventoryLedger>,
        Arc<dyn BookingStore>,
        Arc<InMemoryNotificationStore>,
        Arc<SessionRegistry>,
    >;

    struct Fixture {
        service: TestService,
        ledger: Arc<InMemoryInventoryLedger>,
        notifications: Arc<InMemoryNotificationStore>,
        tour_id: TourId,
    }

    fn fixture_with(bookings: Arc<dyn BookingStore>, seats: u32) -> Fixture {
        let tour_id = TourId::new();
        let ledger = Arc::new(InMemoryInventoryLedger::new().with_tour(Tour::new(tour_id, 4_000, seats)));
        let notifications = Arc::new(InMemoryNotificationStore::new());
        let dispatcher = NotificationDispatcher::new(notifications.clone(), Arc::new(SessionRegistry::new()));
        Fixture {
            service: BookingService::new(ledger.clone(), bookings, dispatcher),
            ledger,
            notifications,
            tour_id,
        }
    }

    fn fixture(seats: u32) -> Fixture {
        fixture_with(Arc::new(InMemoryBookingStore::new()), seats)
    }

    fn customer() -> Principal {
        Principal::new(UserId::new(), vec![])
    }

    fn staff() -> Principal {
        Principal::new(UserId::new(), vec![Role::STAFF])
    }

    fn request(tour_id: TourId, quantity: u32) -> NewBooking {
        NewBooking {
            tour_id,
            quantity,
            travel_date: (Utc::now() + Duration::days(30)).date_naive(),
            travelers: vec![Traveler {
                name: "Grace".to_string(),
                age: 41,
            }],
            contact_info: ContactInfo {
                phone: "555-0199".to_string(),
                email: "grace@example.com".to_string(),
            },
        }
    }

    async fn available(f: &Fixture) -> u32 {
        f.ledger.tour(f.tour_id).await.unwrap().unwrap().available_seats
    }

    /// Booking store whose inserts always fail.
    struct BrokenInserts(InMemoryBookingStore);

    #[async_trait]
    impl BookingStore for BrokenInserts {
        async fn insert(&self, _booking: &Booking) -> ServiceResult<()> {
            Err(StoreError::backend("insert_booking", "disk full").into())
        }

        async fn get(&self, booking_id: BookingId) -> ServiceResult<Option<Booking>> {
            self.0.get(booking_id).await
        }

        async fn list_for_owner(&self, owner_id: UserId) -> ServiceResult<Vec<Booking>> {
            self.0.list_for_owner(owner_id).await
        }

        async fn list_all(&self) -> ServiceResult<Vec<Booking>> {
            self.0.list_all().await
        }

        async fn apply_transition(
            &self,
            booking_id: BookingId,
            plan: &TransitionPlan,
            now: DateTime<Utc>,
        ) -> ServiceResult<Option<Booking>> {
            self.0.apply_transition(booking_id, plan, now).await
        }
    }

    /// Ledger whose next `release` calls fail.
    struct FlakyRelease {
        inner: Arc<InMemoryInventoryLedger>,
        failures: AtomicU32,
    }

    #[async_trait]
    impl InventoryLedger for FlakyRelease {
        async fn tour(&self, tour_id: TourId) -> ServiceResult<Option<Tour>> {
            self.inner.tour(tour_id).await
        }

        async fn upsert_tour(&self, tour_id: TourId, price: u64, max_seats: u32) -> ServiceResult<Tour> {
            self.inner.upsert_tour(tour_id, price, max_seats).await
        }

        async fn reserve(&self, tour_id: TourId, quantity: u32) -> ServiceResult<Reservation> {
            self.inner.reserve(tour_id, quantity).await
        }

        async fn release(&self, tour_id: TourId, quantity: u32) -> ServiceResult<u32> {
            let pending = self.failures.load(Ordering::SeqCst);
            if pending > 0 {
                self.failures.store(pending - 1, Ordering::SeqCst);
                return Err(StoreError::backend("release", "connection reset").into());
            }
            self.inner.release(tour_id, quantity).await
        }
    }

    #[tokio::test]
    async fn failed_release_reverts_the_cancel_so_a_retry_returns_the_seats() {
        let tour_id = TourId::new();
        let inner = Arc::new(InMemoryInventoryLedger::new().with_tour(Tour::new(tour_id, 1_000, 5)));
        let ledger = Arc::new(FlakyRelease {
            inner: inner.clone(),
            failures: AtomicU32::new(1),
        });
        let notifications = Arc::new(InMemoryNotificationStore::new());
        let dispatcher = NotificationDispatcher::new(notifications.clone(), Arc::new(SessionRegistry::new()));
        let service = BookingService::new(ledger, Arc::new(InMemoryBookingStore::new()), dispatcher);
        let owner = customer();
        let booking = service.create_booking(&owner, request(tour_id, 2)).await.unwrap();

        let err = service.cancel_booking(&owner, booking.id).await.unwrap_err();
        assert!(matches!(err, ServiceError::Store(_)));

        let stored = service.get_booking(&owner, booking.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Pending);
        assert_eq!(stored.payment_status, PaymentStatus::Pending);
        assert_eq!(inner.tour(tour_id).await.unwrap().unwrap().available_seats, 3);
        assert_eq!(notifications.list_for_recipient(owner.user_id, false).await.unwrap().len(), 1);

        let cancelled = service.cancel_booking(&owner, booking.id).await.unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(inner.tour(tour_id).await.unwrap().unwrap().available_seats, 5);
        assert_eq!(notifications.list_for_recipient(owner.user_id, false).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn create_reserves_seats_freezes_price_and_notifies_owner() {
        let f = fixture(10);
        let me = customer();

        let booking = f.service.create_booking(&me, request(f.tour_id, 3)).await.unwrap();

        assert_eq!(booking.total_price, 12_000);
        assert_eq!(booking.status, BookingStatus::Pending);
        assert_eq!(available(&f).await, 7);

        let inbox = f.notifications.list_for_recipient(me.user_id, false).await.unwrap();
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].link.as_deref(), Some(booking.link().as_str()));
    }

    #[tokio::test]
    async fn insufficient_inventory_reports_remaining_seats() {
        let f = fixture(2);
        let err = f
            .service
            .create_booking(&customer(), request(f.tour_id, 3))
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ServiceError::Domain(DomainError::InsufficientInventory {
                tour_id: f.tour_id,
                requested: 3,
                available: 2,
            })
        );
        assert_eq!(available(&f).await, 2);
    }

    #[tokio::test]
    async fn failed_insert_returns_the_seats() {
        let f = fixture_with(Arc::new(BrokenInserts(InMemoryBookingStore::new())), 5);
        let me = customer();

        let err = f.service.create_booking(&me, request(f.tour_id, 4)).await.unwrap_err();

        assert!(matches!(err, ServiceError::Store(_)));
        assert_eq!(available(&f).await, 5);
        assert_eq!(f.notifications.unread_count(me.user_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn invalid_request_never_touches_inventory() {
        let f = fixture(5);
        let mut req = request(f.tour_id, 1);
        req.contact_info.email = "nope".to_string();

        let err = f.service.create_booking(&customer(), req).await.unwrap_err();

        assert!(matches!(err.domain(), Some(DomainError::Validation(_))));
        assert_eq!(available(&f).await, 5);
    }

    #[tokio::test]
    async fn strangers_cannot_read_or_cancel() {
        let f = fixture(5);
        let owner = customer();
        let booking = f.service.create_booking(&owner, request(f.tour_id, 1)).await.unwrap();
        let stranger = customer();

        let read = f.service.get_booking(&stranger, booking.id).await.unwrap_err();
        assert!(matches!(read.domain(), Some(DomainError::Forbidden(_))));
        let cancel = f.service.cancel_booking(&stranger, booking.id).await.unwrap_err();
        assert!(matches!(cancel.domain(), Some(DomainError::Forbidden(_))));

        assert!(f.service.get_booking(&staff(), booking.id).await.is_ok());
        let missing = f.service.get_booking(&owner, BookingId::new()).await.unwrap_err();
        assert_eq!(missing.domain(), Some(&DomainError::not_found("booking")));
    }

    #[tokio::test]
    async fn list_all_requires_an_elevated_role() {
        let f = fixture(5);
        let owner = customer();
        f.service.create_booking(&owner, request(f.tour_id, 1)).await.unwrap();

        assert!(matches!(
            f.service.list_all(&owner).await.unwrap_err().domain(),
            Some(DomainError::Forbidden(_))
        ));
        assert_eq!(f.service.list_all(&staff()).await.unwrap().len(), 1);
        assert_eq!(f.service.list_own(&owner).await.unwrap().len(), 1);
        assert!(f.service.list_own(&customer()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn owner_cannot_confirm_their_own_booking() {
        let f = fixture(5);
        let owner = customer();
        let booking = f.service.create_booking(&owner, request(f.tour_id, 1)).await.unwrap();

        let err = f
            .service
            .change_status(&owner, booking.id, BookingStatus::Confirmed)
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Forbidden(_))));
    }

    #[tokio::test]
    async fn illegal_transition_leaves_booking_unchanged() {
        let f = fixture(5);
        let booking = f.service.create_booking(&customer(), request(f.tour_id, 1)).await.unwrap();

        let err = f
            .service
            .change_status(&staff(), booking.id, BookingStatus::Completed)
            .await
            .unwrap_err();

        assert!(matches!(err.domain(), Some(DomainError::InvalidStatus { .. })));
        let stored = f.service.get_booking(&staff(), booking.id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Pending);
        assert_eq!(stored.payment_status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn staff_cancellation_releases_seats() {
        let f = fixture(5);
        let booking = f.service.create_booking(&customer(), request(f.tour_id, 2)).await.unwrap();

        let cancelled = f
            .service
            .change_status(&staff(), booking.id, BookingStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(cancelled.payment_status, PaymentStatus::Refunded);
        assert_eq!(available(&f).await, 5);
    }

    #[tokio::test]
    async fn catalog_sync_requires_staff_and_keeps_sold_seats() {
        let f = fixture(5);
        f.service.create_booking(&customer(), request(f.tour_id, 3)).await.unwrap();

        let err = f.service.sync_tour(&customer(), f.tour_id, 1, 9).await.unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Forbidden(_))));

        let tour = f.service.sync_tour(&staff(), f.tour_id, 5_000, 9).await.unwrap();
        assert_eq!(tour.available_seats, 6);

        let err = f.service.sync_tour(&staff(), f.tour_id, 5_000, 2).await.unwrap_err();
        assert!(matches!(err.domain(), Some(DomainError::Validation(_))));
        assert!(matches!(
            f.service.tour(TourId::new()).await.unwrap_err().domain(),
            Some(DomainError::NotFound { .. })
        ));
    }
}
