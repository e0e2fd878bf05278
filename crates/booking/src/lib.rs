//! Booking domain module.
//!
//! Business rules for tour inventory, the booking lifecycle and the
//! notifications each lifecycle step produces, implemented purely as
//! deterministic domain logic (no IO, no HTTP, no storage).

pub mod booking;
pub mod event;
pub mod notification;
pub mod tour;
pub mod transition;

pub use booking::{Booking, BookingStatus, ContactInfo, NewBooking, PaymentStatus, Traveler};
pub use event::BookingEvent;
pub use notification::{NewNotification, Notification, NotificationKind};
pub use tour::{Reservation, Tour};
pub use transition::{Actor, TransitionPlan, plan_transition};
