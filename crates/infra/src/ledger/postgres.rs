//! Postgres-backed inventory ledger.
//!
//! Each mutation is a single conditional `UPDATE ... RETURNING`. When the
//! statement touches no row, a follow-up read only decides which error to
//! report; it never retries the write.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tracing::{Span, instrument};

use tourbook_booking::{Reservation, Tour};
use tourbook_core::{DomainError, TourId};

use crate::error::{ServiceResult, StoreError, map_sqlx_error};

use super::InventoryLedger;

#[derive(Debug, Clone)]
pub struct PostgresInventoryLedger {
    pool: Arc<PgPool>,
}

impl PostgresInventoryLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn available_seats(&self, tour_id: TourId) -> ServiceResult<Option<u32>> {
        let row = sqlx::query("SELECT available_seats FROM tours WHERE id = $1")
            .bind(tour_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("available_seats", e))?;

        row.map(|row| {
            let seats: i32 = row
                .try_get("available_seats")
                .map_err(|e| map_sqlx_error("available_seats", e))?;
            to_u32("available_seats", seats)
        })
        .transpose()
    }
}

#[async_trait]
impl InventoryLedger for PostgresInventoryLedger {
    #[instrument(skip(self), fields(tour_id = %tour_id), err)]
    async fn tour(&self, tour_id: TourId) -> ServiceResult<Option<Tour>> {
        let row = sqlx::query(
            "SELECT id, price, max_seats, available_seats FROM tours WHERE id = $1",
        )
        .bind(tour_id.as_uuid())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("tour", e))?;

        row.map(|row| tour_from_row("tour", &row)).transpose()
    }

    #[instrument(skip(self), fields(tour_id = %tour_id, operation), err)]
    async fn upsert_tour(&self, tour_id: TourId, price: u64, max_seats: u32) -> ServiceResult<Tour> {
        Span::current().record("operation", "upsert_tour");
        let price = to_i64("upsert_tour", price)?;

        // The WHERE guard refuses a capacity below the seats already sold.
        let row = sqlx::query(
            r#"
            INSERT INTO tours (id, price, max_seats, available_seats)
            VALUES ($1, $2, $3, $3)
            ON CONFLICT (id) DO UPDATE SET
                price = EXCLUDED.price,
                available_seats = tours.available_seats + (EXCLUDED.max_seats - tours.max_seats),
                max_seats = EXCLUDED.max_seats,
                updated_at = NOW()
            WHERE tours.max_seats - tours.available_seats <= EXCLUDED.max_seats
            RETURNING id, price, max_seats, available_seats
            "#,
        )
        .bind(tour_id.as_uuid())
        .bind(price)
        .bind(i64::from(max_seats))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("upsert_tour", e))?;

        match row {
            Some(row) => tour_from_row("upsert_tour", &row),
            None => {
                let sold = match self.tour(tour_id).await? {
                    Some(tour) => tour.sold_seats(),
                    None => return Err(DomainError::not_found("tour").into()),
                };
                Err(DomainError::validation(format!(
                    "max_seats {max_seats} is below the {sold} seats already sold"
                ))
                .into())
            }
        }
    }

    #[instrument(skip(self), fields(tour_id = %tour_id, operation), err)]
    async fn reserve(&self, tour_id: TourId, quantity: u32) -> ServiceResult<Reservation> {
        Span::current().record("operation", "reserve");
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be at least 1").into());
        }

        let row = sqlx::query(
            r#"
            UPDATE tours
            SET available_seats = available_seats - $2, updated_at = NOW()
            WHERE id = $1 AND available_seats >= $2
            RETURNING price, available_seats
            "#,
        )
        .bind(tour_id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("reserve", e))?;

        let Some(row) = row else {
            return match self.available_seats(tour_id).await? {
                None => Err(DomainError::not_found("tour").into()),
                Some(available) => Err(DomainError::InsufficientInventory {
                    tour_id,
                    requested: quantity,
                    available,
                }
                .into()),
            };
        };

        let price: i64 = row.try_get("price").map_err(|e| map_sqlx_error("reserve", e))?;
        let remaining: i32 = row
            .try_get("available_seats")
            .map_err(|e| map_sqlx_error("reserve", e))?;

        Ok(Reservation {
            tour_id,
            quantity,
            unit_price: to_u64("reserve", price)?,
            remaining: to_u32("reserve", remaining)?,
        })
    }

    #[instrument(skip(self), fields(tour_id = %tour_id, operation), err)]
    async fn release(&self, tour_id: TourId, quantity: u32) -> ServiceResult<u32> {
        Span::current().record("operation", "release");

        let row = sqlx::query(
            r#"
            UPDATE tours
            SET available_seats = available_seats + $2, updated_at = NOW()
            WHERE id = $1 AND available_seats + $2 <= max_seats
            RETURNING available_seats
            "#,
        )
        .bind(tour_id.as_uuid())
        .bind(i64::from(quantity))
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("release", e))?;

        let Some(row) = row else {
            return match self.available_seats(tour_id).await? {
                None => Err(DomainError::not_found("tour").into()),
                Some(_) => Err(DomainError::conflict(format!(
                    "releasing {quantity} seats on tour {tour_id} would exceed max_seats"
                ))
                .into()),
            };
        };

        let available: i32 = row
            .try_get("available_seats")
            .map_err(|e| map_sqlx_error("release", e))?;
        to_u32("release", available)
    }
}

fn tour_from_row(operation: &str, row: &sqlx::postgres::PgRow) -> ServiceResult<Tour> {
    let id: uuid::Uuid = row.try_get("id").map_err(|e| map_sqlx_error(operation, e))?;
    let price: i64 = row.try_get("price").map_err(|e| map_sqlx_error(operation, e))?;
    let max_seats: i32 = row.try_get("max_seats").map_err(|e| map_sqlx_error(operation, e))?;
    let available: i32 = row
        .try_get("available_seats")
        .map_err(|e| map_sqlx_error(operation, e))?;

    Ok(Tour {
        id: TourId::from_uuid(id),
        price: to_u64(operation, price)?,
        max_seats: to_u32(operation, max_seats)?,
        available_seats: to_u32(operation, available)?,
    })
}

pub(crate) fn to_u32(operation: &str, value: i32) -> ServiceResult<u32> {
    u32::try_from(value)
        .map_err(|_| StoreError::corrupt(operation, format!("negative count {value}")).into())
}

pub(crate) fn to_u64(operation: &str, value: i64) -> ServiceResult<u64> {
    u64::try_from(value)
        .map_err(|_| StoreError::corrupt(operation, format!("negative amount {value}")).into())
}

pub(crate) fn to_i64(operation: &str, value: u64) -> ServiceResult<i64> {
    i64::try_from(value).map_err(|_| {
        DomainError::validation(format!("{operation}: amount {value} is out of range")).into()
    })
}
