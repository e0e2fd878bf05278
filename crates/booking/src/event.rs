//! Domain events raised by the booking lifecycle.
//!
//! Each event yields exactly one owner notification and one lightweight
//! summary for the operational role groups.

use serde::{Deserialize, Serialize};
use serde_json::{Value as JsonValue, json};

use crate::booking::{Booking, BookingStatus};
use crate::notification::{NewNotification, NotificationKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum BookingEvent {
    Created { booking: Booking },
    Cancelled { booking: Booking, from: BookingStatus },
    StatusChanged { booking: Booking, from: BookingStatus },
}

impl BookingEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            BookingEvent::Created { .. } => "booking.created",
            BookingEvent::Cancelled { .. } => "booking.cancelled",
            BookingEvent::StatusChanged { .. } => "booking.status_changed",
        }
    }

    pub fn booking(&self) -> &Booking {
        match self {
            BookingEvent::Created { booking }
            | BookingEvent::Cancelled { booking, .. }
            | BookingEvent::StatusChanged { booking, .. } => booking,
        }
    }

    /// The single notification persisted for the booking's owner.
    pub fn owner_notice(&self) -> NewNotification {
        let booking = self.booking();
        let (title, message) = match self {
            BookingEvent::Created { .. } => (
                "Booking received".to_string(),
                format!(
                    "Your booking for {} seat(s) on {} has been received and is awaiting confirmation.",
                    booking.quantity, booking.travel_date
                ),
            ),
            BookingEvent::Cancelled { .. } => (
                "Booking cancelled".to_string(),
                format!(
                    "Your booking for {} has been cancelled. Payment status: {}.",
                    booking.travel_date, booking.payment_status
                ),
            ),
            BookingEvent::StatusChanged { from, .. } => (
                "Booking status updated".to_string(),
                format!(
                    "Your booking for {} moved from {} to {}.",
                    booking.travel_date, from, booking.status
                ),
            ),
        };

        NewNotification {
            recipient_id: booking.owner_id,
            kind: NotificationKind::Booking,
            title,
            message,
            link: Some(booking.link()),
        }
    }

    /// Operational summary for staff dashboards (no personal data).
    pub fn staff_summary(&self) -> JsonValue {
        let booking = self.booking();
        let mut summary = json!({
            "booking_id": booking.id,
            "tour_id": booking.tour_id,
            "quantity": booking.quantity,
            "status": booking.status,
            "total_price": booking.total_price,
        });

        if let BookingEvent::Cancelled { from, .. } | BookingEvent::StatusChanged { from, .. } = self {
            summary["from"] = json!(from);
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{ContactInfo, NewBooking, PaymentStatus};
    use crate::tour::Reservation;
    use chrono::{NaiveDate, Utc};
    use tourbook_core::TourId;
    use tourbook_core::UserId;

    fn booking() -> Booking {
        let tour_id = TourId::new();
        let req = NewBooking {
            tour_id,
            quantity: 2,
            travel_date: NaiveDate::from_ymd_opt(2026, 9, 12).unwrap(),
            travelers: vec![],
            contact_info: ContactInfo {
                phone: "555-0101".to_string(),
                email: "owner@example.com".to_string(),
            },
        };
        let r = Reservation { tour_id, quantity: 2, unit_price: 500, remaining: 3 };
        Booking::create(UserId::new(), req, &r, Utc::now()).unwrap()
    }

    #[test]
    fn owner_notice_targets_owner_and_links_booking() {
        let b = booking();
        let notice = BookingEvent::Created { booking: b.clone() }.owner_notice();
        assert_eq!(notice.recipient_id, b.owner_id);
        assert_eq!(notice.kind, NotificationKind::Booking);
        assert_eq!(notice.link.as_deref(), Some(b.link().as_str()));
    }

    #[test]
    fn status_change_message_names_both_states() {
        let mut b = booking();
        b.status = BookingStatus::Confirmed;
        b.payment_status = PaymentStatus::Paid;
        let notice = BookingEvent::StatusChanged { booking: b, from: BookingStatus::Pending }
            .owner_notice();
        assert!(notice.message.contains("pending"));
        assert!(notice.message.contains("confirmed"));
    }

    #[test]
    fn staff_summary_carries_previous_status() {
        let mut b = booking();
        b.status = BookingStatus::Cancelled;
        let event = BookingEvent::Cancelled { booking: b, from: BookingStatus::Pending };
        let summary = event.staff_summary();
        assert_eq!(summary["from"], "pending");
        assert_eq!(summary["status"], "cancelled");
        assert_eq!(event.event_type(), "booking.cancelled");
    }
}
