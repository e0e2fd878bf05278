use core::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use tourbook_core::{BookingId, DomainError, DomainResult, TourId, UserId};

use crate::tour::Reservation;

/// Booking lifecycle.
///
/// `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 5] = [
        BookingStatus::Pending,
        BookingStatus::Confirmed,
        BookingStatus::InProgress,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::InProgress => "in_progress",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Completed | BookingStatus::Cancelled)
    }
}

impl core::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown booking status '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl core::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(DomainError::validation(format!("unknown payment status '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traveler {
    pub name: String,
    pub age: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    pub phone: String,
    pub email: String,
}

/// A customer's reservation request, before any seats are taken.
///
/// `travelers` is not required to have `quantity` entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
    pub tour_id: TourId,
    pub quantity: u32,
    pub travel_date: NaiveDate,
    #[serde(default)]
    pub travelers: Vec<Traveler>,
    pub contact_info: ContactInfo,
}

const MAX_TRAVELER_AGE: u32 = 150;

impl NewBooking {
    /// Shape checks only; inventory is checked by the ledger.
    pub fn validate(&self, today: NaiveDate) -> DomainResult<()> {
        if self.quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        if self.travel_date < today {
            return Err(DomainError::validation("travel_date cannot be in the past"));
        }
        for (idx, traveler) in self.travelers.iter().enumerate() {
            if traveler.name.trim().is_empty() {
                return Err(DomainError::validation(format!(
                    "travelers[{idx}].name cannot be empty"
                )));
            }
            if traveler.age > MAX_TRAVELER_AGE {
                return Err(DomainError::validation(format!(
                    "travelers[{idx}].age must be at most {MAX_TRAVELER_AGE}"
                )));
            }
        }
        if self.contact_info.phone.trim().is_empty() {
            return Err(DomainError::validation("contact_info.phone cannot be empty"));
        }
        if !self.contact_info.email.contains('@') {
            return Err(DomainError::validation("contact_info.email is not a valid address"));
        }
        Ok(())
    }
}

/// One customer's reservation of seats on a tour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub tour_id: TourId,
    pub owner_id: UserId,
    pub quantity: u32,
    /// Frozen at creation; later catalog price changes do not apply.
    pub total_price: u64,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub travel_date: NaiveDate,
    pub travelers: Vec<Traveler>,
    pub contact_info: ContactInfo,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Build the record for a request whose seats are already reserved.
    pub fn create(
        owner_id: UserId,
        request: NewBooking,
        reservation: &Reservation,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        if reservation.tour_id != request.tour_id || reservation.quantity != request.quantity {
            return Err(DomainError::conflict(
                "reservation does not match the booking request",
            ));
        }

        let total_price = reservation
            .unit_price
            .checked_mul(u64::from(request.quantity))
            .ok_or_else(|| DomainError::validation("total price overflows"))?;

        Ok(Self {
            id: BookingId::new(),
            tour_id: request.tour_id,
            owner_id,
            quantity: request.quantity,
            total_price,
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Pending,
            travel_date: request.travel_date,
            travelers: request.travelers,
            contact_info: request.contact_info,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.owner_id == user_id
    }

    /// Deep reference used in notification links.
    pub fn link(&self) -> String {
        format!("/bookings/{}", self.id)
    }
}
