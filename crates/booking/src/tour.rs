//! Inventory-bearing view of a catalog tour.

use serde::{Deserialize, Serialize};

use tourbook_core::{DomainError, DomainResult, TourId};

/// Seat inventory for one tour.
///
/// Catalog fields (`price`, `max_seats`) are owned by the external catalog;
/// `available_seats` is written only through [`Tour::reserve`] and
/// [`Tour::release`] (or their single-statement SQL equivalents).
///
/// Invariant: `available_seats <= max_seats`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tour {
    pub id: TourId,
    /// Unit price in smallest currency unit (e.g., cents).
    pub price: u64,
    pub max_seats: u32,
    pub available_seats: u32,
}

/// Outcome of a successful seat reservation.
///
/// `unit_price` is the price read in the same indivisible step as the
/// decrement, so it is the price the booking must freeze.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub tour_id: TourId,
    pub quantity: u32,
    pub unit_price: u64,
    pub remaining: u32,
}

impl Tour {
    /// A freshly listed tour has every seat available.
    pub fn new(id: TourId, price: u64, max_seats: u32) -> Self {
        Self {
            id,
            price,
            max_seats,
            available_seats: max_seats,
        }
    }

    pub fn sold_seats(&self) -> u32 {
        self.max_seats - self.available_seats
    }

    /// Conditional decrement: fails without touching state when short.
    pub fn reserve(&mut self, quantity: u32) -> DomainResult<Reservation> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        if self.available_seats < quantity {
            return Err(DomainError::InsufficientInventory {
                tour_id: self.id,
                requested: quantity,
                available: self.available_seats,
            });
        }

        self.available_seats -= quantity;

        Ok(Reservation {
            tour_id: self.id,
            quantity,
            unit_price: self.price,
            remaining: self.available_seats,
        })
    }

    /// Return seats to the pool. Returns the new available count.
    ///
    /// Releasing past `max_seats` means seats are being returned twice.
    pub fn release(&mut self, quantity: u32) -> DomainResult<u32> {
        let restored = self
            .available_seats
            .checked_add(quantity)
            .filter(|n| *n <= self.max_seats)
            .ok_or_else(|| {
                DomainError::conflict(format!(
                    "releasing {quantity} seats on tour {} would exceed max_seats {}",
                    self.id, self.max_seats
                ))
            })?;

        self.available_seats = restored;
        Ok(restored)
    }

    /// Apply a catalog update. Sold seats stay sold.
    pub fn resize(&mut self, price: u64, max_seats: u32) -> DomainResult<()> {
        let sold = self.sold_seats();
        if max_seats < sold {
            return Err(DomainError::validation(format!(
                "max_seats {max_seats} is below the {sold} seats already sold"
            )));
        }

        self.price = price;
        self.max_seats = max_seats;
        self.available_seats = max_seats - sold;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tour(seats: u32) -> Tour {
        Tour::new(TourId::new(), 2_500, seats)
    }

    #[test]
    fn reserve_decrements_and_captures_price() {
        let mut t = tour(5);
        let r = t.reserve(2).unwrap();
        assert_eq!(r.unit_price, 2_500);
        assert_eq!(r.remaining, 3);
        assert_eq!(t.available_seats, 3);
    }

    #[test]
    fn reserve_beyond_capacity_leaves_state_untouched() {
        let mut t = tour(1);
        let err = t.reserve(2).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientInventory {
                tour_id: t.id,
                requested: 2,
                available: 1
            }
        );
        assert_eq!(t.available_seats, 1);
    }

    #[test]
    fn zero_quantity_is_a_validation_error() {
        let mut t = tour(3);
        assert!(matches!(t.reserve(0), Err(DomainError::Validation(_))));
    }

    #[test]
    fn release_cannot_exceed_max_seats() {
        let mut t = tour(3);
        t.reserve(1).unwrap();
        assert_eq!(t.release(1).unwrap(), 3);
        assert!(matches!(t.release(1), Err(DomainError::Conflict(_))));
        assert_eq!(t.available_seats, 3);
    }

    #[test]
    fn resize_keeps_sold_seats_sold() {
        let mut t = tour(10);
        t.reserve(4).unwrap();
        t.resize(3_000, 6).unwrap();
        assert_eq!(t.available_seats, 2);
        assert_eq!(t.price, 3_000);

        let err = t.resize(3_000, 3).unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        assert_eq!(t.max_seats, 6);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: whatever mix of reservations is attempted, the seats
        /// handed out plus the seats left always equal capacity.
        #[test]
        fn reservations_conserve_capacity(
            capacity in 0u32..50,
            requests in prop::collection::vec(1u32..8, 0..30)
        ) {
            let mut t = tour(capacity);
            let mut granted: u32 = 0;

            for q in requests {
                if let Ok(r) = t.reserve(q) {
                    granted += r.quantity;
                }
            }

            prop_assert!(granted <= capacity);
            prop_assert_eq!(granted + t.available_seats, capacity);
        }
    }
}
