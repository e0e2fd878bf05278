use core::str::FromStr;

use serde::{Deserialize, Serialize};

use tourbook_booking::{Booking, BookingStatus, Tour};
use tourbook_core::{DomainError, TourId};

use crate::app::errors;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct ChangeStatusRequest {
    pub status: String,
}

impl ChangeStatusRequest {
    pub fn target(&self) -> Result<BookingStatus, axum::response::Response> {
        self.status
            .parse()
            .map_err(errors::domain_error_to_response)
    }
}

/// Catalog push for one tour.
#[derive(Debug, Deserialize)]
pub struct SyncTourRequest {
    pub price: u64,
    pub max_seats: u32,
}

#[derive(Debug, Default, Deserialize)]
pub struct NotificationsQuery {
    #[serde(default)]
    pub unread: bool,
}

// -------------------------
// Response DTOs
// -------------------------

/// Body of a cancel request; `already_cancelled` marks the idempotent repeat.
#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub already_cancelled: bool,
    pub booking: Booking,
}

#[derive(Debug, Serialize)]
pub struct AvailabilityResponse {
    pub tour_id: TourId,
    pub price: u64,
    pub max_seats: u32,
    pub available_seats: u32,
    pub sold_seats: u32,
}

impl From<Tour> for AvailabilityResponse {
    fn from(tour: Tour) -> Self {
        Self {
            tour_id: tour.id,
            price: tour.price,
            max_seats: tour.max_seats,
            sold_seats: tour.sold_seats(),
            available_seats: tour.available_seats,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UnreadCountResponse {
    pub unread: u64,
}

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: u64,
}

// -------------------------
// Path parsing
// -------------------------

/// Parse a path identifier, answering `400 invalid_id` on failure.
pub fn parse_id<T>(raw: &str) -> Result<T, axum::response::Response>
where
    T: FromStr<Err = DomainError>,
{
    raw.parse().map_err(errors::domain_error_to_response)
}
