//! Postgres-backed booking store.
//!
//! Status updates are a conditional `UPDATE ... WHERE status = $from`, so two
//! concurrent transitions from the same state cannot both succeed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use tracing::{Span, instrument};

use tourbook_booking::{Booking, BookingStatus, ContactInfo, PaymentStatus, Traveler, TransitionPlan};
use tourbook_core::{BookingId, DomainError, TourId, UserId};

use crate::error::{ServiceResult, StoreError, is_unique_violation, map_sqlx_error};
use crate::ledger::postgres::{to_i64, to_u32, to_u64};

use super::BookingStore;

const BOOKING_COLUMNS: &str = "id, tour_id, owner_id, quantity, total_price, status, payment_status, \
     travel_date, travelers, contact_info, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresBookingStore {
    pool: Arc<PgPool>,
}

impl PostgresBookingStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    async fn fetch_many(
        &self,
        operation: &str,
        owner_id: Option<UserId>,
    ) -> ServiceResult<Vec<Booking>> {
        let sql = format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings \
             WHERE ($1::uuid IS NULL OR owner_id = $1) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(owner_id.map(|id| *id.as_uuid()))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error(operation, e))?;

        rows.into_iter()
            .map(|row| BookingRow::from_row(&row).and_then(|r| r.into_booking(operation)))
            .collect()
    }
}

#[async_trait]
impl BookingStore for PostgresBookingStore {
    #[instrument(
        skip(self, booking),
        fields(booking_id = %booking.id, tour_id = %booking.tour_id, quantity = booking.quantity, operation),
        err
    )]
    async fn insert(&self, booking: &Booking) -> ServiceResult<()> {
        Span::current().record("operation", "insert_booking");

        let result = sqlx::query(
            r#"
            INSERT INTO bookings (
                id, tour_id, owner_id, quantity, total_price, status, payment_status,
                travel_date, travelers, contact_info, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(booking.id.as_uuid())
        .bind(booking.tour_id.as_uuid())
        .bind(booking.owner_id.as_uuid())
        .bind(i64::from(booking.quantity))
        .bind(to_i64("insert_booking", booking.total_price)?)
        .bind(booking.status.as_str())
        .bind(booking.payment_status.as_str())
        .bind(booking.travel_date)
        .bind(Json(&booking.travelers))
        .bind(Json(&booking.contact_info))
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&*self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => {
                Err(DomainError::conflict(format!("booking {} already exists", booking.id)).into())
            }
            Err(e) => Err(map_sqlx_error("insert_booking", e).into()),
        }
    }

    #[instrument(skip(self), fields(booking_id = %booking_id), err)]
    async fn get(&self, booking_id: BookingId) -> ServiceResult<Option<Booking>> {
        let sql = format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(booking_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_booking", e))?;

        row.map(|row| BookingRow::from_row(&row).and_then(|r| r.into_booking("get_booking")))
            .transpose()
    }

    #[instrument(skip(self), fields(owner_id = %owner_id), err)]
    async fn list_for_owner(&self, owner_id: UserId) -> ServiceResult<Vec<Booking>> {
        self.fetch_many("list_for_owner", Some(owner_id)).await
    }

    #[instrument(skip(self), err)]
    async fn list_all(&self) -> ServiceResult<Vec<Booking>> {
        self.fetch_many("list_all", None).await
    }

    #[instrument(
        skip(self, plan),
        fields(booking_id = %booking_id, from = %plan.from, to = %plan.to, operation),
        err
    )]
    async fn apply_transition(
        &self,
        booking_id: BookingId,
        plan: &TransitionPlan,
        now: DateTime<Utc>,
    ) -> ServiceResult<Option<Booking>> {
        Span::current().record("operation", "apply_transition");

        let sql = format!(
            "UPDATE bookings SET status = $3, payment_status = $4, updated_at = $5 \
             WHERE id = $1 AND status = $2 \
             RETURNING {BOOKING_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(booking_id.as_uuid())
            .bind(plan.from.as_str())
            .bind(plan.to.as_str())
            .bind(plan.payment_status.as_str())
            .bind(now)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("apply_transition", e))?;

        match row {
            Some(row) => BookingRow::from_row(&row)?
                .into_booking("apply_transition")
                .map(Some),
            None => {
                if self.get(booking_id).await?.is_none() {
                    return Err(DomainError::not_found("booking").into());
                }
                Ok(None)
            }
        }
    }
}

#[derive(Debug)]
struct BookingRow {
    id: uuid::Uuid,
    tour_id: uuid::Uuid,
    owner_id: uuid::Uuid,
    quantity: i32,
    total_price: i64,
    status: String,
    payment_status: String,
    travel_date: NaiveDate,
    travelers: Json<Vec<Traveler>>,
    contact_info: Json<ContactInfo>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl BookingRow {
    fn from_row(row: &sqlx::postgres::PgRow) -> ServiceResult<Self> {
        let get = |e| map_sqlx_error("decode_booking", e);
        Ok(BookingRow {
            id: row.try_get("id").map_err(get)?,
            tour_id: row.try_get("tour_id").map_err(get)?,
            owner_id: row.try_get("owner_id").map_err(get)?,
            quantity: row.try_get("quantity").map_err(get)?,
            total_price: row.try_get("total_price").map_err(get)?,
            status: row.try_get("status").map_err(get)?,
            payment_status: row.try_get("payment_status").map_err(get)?,
            travel_date: row.try_get("travel_date").map_err(get)?,
            travelers: row.try_get("travelers").map_err(get)?,
            contact_info: row.try_get("contact_info").map_err(get)?,
            created_at: row.try_get("created_at").map_err(get)?,
            updated_at: row.try_get("updated_at").map_err(get)?,
        })
    }

    fn into_booking(self, operation: &str) -> ServiceResult<Booking> {
        let status: BookingStatus = self
            .status
            .parse()
            .map_err(|e| StoreError::corrupt(operation, e))?;
        let payment_status: PaymentStatus = self
            .payment_status
            .parse()
            .map_err(|e| StoreError::corrupt(operation, e))?;

        Ok(Booking {
            id: BookingId::from_uuid(self.id),
            tour_id: TourId::from_uuid(self.tour_id),
            owner_id: UserId::from_uuid(self.owner_id),
            quantity: to_u32(operation, self.quantity)?,
            total_price: to_u64(operation, self.total_price)?,
            status,
            payment_status,
            travel_date: self.travel_date,
            travelers: self.travelers.0,
            contact_info: self.contact_info.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
