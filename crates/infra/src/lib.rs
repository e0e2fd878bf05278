//! Infrastructure layer: storage adapters, schema bootstrap, notification
//! fan-out and the booking workflows that tie them together.

pub mod booking_service;
pub mod bookings;
pub mod dispatcher;
pub mod error;
pub mod ledger;
pub mod notifications;
pub mod schema;


pub use booking_service::BookingService;
pub use bookings::{BookingStore, InMemoryBookingStore, PostgresBookingStore};
pub use dispatcher::{NOTIFICATION_EVENT, NotificationDispatcher, OPERATIONS_ROLES};
pub use error::{ServiceError, ServiceResult, StoreError};
pub use ledger::{InMemoryInventoryLedger, InventoryLedger, PostgresInventoryLedger};
pub use notifications::{InMemoryNotificationStore, NotificationStore, PostgresNotificationStore};
