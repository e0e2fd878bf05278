//! Postgres-backed notification inbox.
//!
//! Every statement filters on `recipient_id`, so one user's ids are invisible
//! to another.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::instrument;

use tourbook_booking::{Notification, NotificationKind};
use tourbook_core::{DomainError, NotificationId, UserId};

use crate::error::{ServiceResult, StoreError, is_unique_violation, map_sqlx_error};

use super::NotificationStore;

const NOTIFICATION_COLUMNS: &str = "id, recipient_id, kind, title, message, read, link, created_at";

#[derive(Debug, Clone)]
pub struct PostgresNotificationStore {
    pool: Arc<PgPool>,
}

impl PostgresNotificationStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }
}

#[async_trait]
impl NotificationStore for PostgresNotificationStore {
    #[instrument(
        skip(self, notification),
        fields(notification_id = %notification.id, recipient_id = %notification.recipient_id),
        err
    )]
    async fn insert(&self, notification: &Notification) -> ServiceResult<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (id, recipient_id, kind, title, message, read, link, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(notification.id.as_uuid())
        .bind(notification.recipient_id.as_uuid())
        .bind(notification.kind.as_str())
        .bind(&notification.title)
        .bind(&notification.message)
        .bind(notification.read)
        .bind(notification.link.as_deref())
        .bind(notification.created_at)
        .execute(&*self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(DomainError::conflict(format!(
                "notification {} already exists",
                notification.id
            ))
            .into()),
            Err(e) => Err(map_sqlx_error("insert_notification", e).into()),
        }
    }

    #[instrument(skip(self), fields(recipient_id = %recipient_id), err)]
    async fn list_for_recipient(
        &self,
        recipient_id: UserId,
        unread_only: bool,
    ) -> ServiceResult<Vec<Notification>> {
        let sql = format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications \
             WHERE recipient_id = $1 AND (NOT $2 OR read = FALSE) \
             ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&sql)
            .bind(recipient_id.as_uuid())
            .bind(unread_only)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_notifications", e))?;

        rows.iter()
            .map(|row| notification_from_row("list_notifications", row))
            .collect()
    }

    #[instrument(skip(self), fields(recipient_id = %recipient_id), err)]
    async fn unread_count(&self, recipient_id: UserId) -> ServiceResult<u64> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS unread FROM notifications WHERE recipient_id = $1 AND read = FALSE",
        )
        .bind(recipient_id.as_uuid())
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("unread_count", e))?;

        let unread: i64 = row
            .try_get("unread")
            .map_err(|e| map_sqlx_error("unread_count", e))?;
        Ok(unread.max(0) as u64)
    }

    #[instrument(skip(self), fields(notification_id = %notification_id, recipient_id = %recipient_id), err)]
    async fn mark_read(
        &self,
        notification_id: NotificationId,
        recipient_id: UserId,
    ) -> ServiceResult<Notification> {
        let sql = format!(
            "UPDATE notifications SET read = TRUE \
             WHERE id = $1 AND recipient_id = $2 \
             RETURNING {NOTIFICATION_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(notification_id.as_uuid())
            .bind(recipient_id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("mark_read", e))?;

        match row {
            Some(row) => notification_from_row("mark_read", &row),
            None => Err(DomainError::not_found("notification").into()),
        }
    }

    #[instrument(skip(self), fields(recipient_id = %recipient_id), err)]
    async fn mark_all_read(&self, recipient_id: UserId) -> ServiceResult<u64> {
        let result = sqlx::query(
            "UPDATE notifications SET read = TRUE WHERE recipient_id = $1 AND read = FALSE",
        )
        .bind(recipient_id.as_uuid())
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("mark_all_read", e))?;

        Ok(result.rows_affected())
    }

    #[instrument(skip(self), fields(notification_id = %notification_id, recipient_id = %recipient_id), err)]
    async fn delete(&self, notification_id: NotificationId, recipient_id: UserId) -> ServiceResult<()> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1 AND recipient_id = $2")
            .bind(notification_id.as_uuid())
            .bind(recipient_id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_notification", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("notification").into());
        }
        Ok(())
    }
}

fn notification_from_row(operation: &str, row: &sqlx::postgres::PgRow) -> ServiceResult<Notification> {
    let get = |e| map_sqlx_error(operation, e);

    let id: uuid::Uuid = row.try_get("id").map_err(get)?;
    let recipient_id: uuid::Uuid = row.try_get("recipient_id").map_err(get)?;
    let kind: String = row.try_get("kind").map_err(get)?;
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(get)?;

    Ok(Notification {
        id: NotificationId::from_uuid(id),
        recipient_id: UserId::from_uuid(recipient_id),
        kind: kind
            .parse::<NotificationKind>()
            .map_err(|e| StoreError::corrupt(operation, e))?,
        title: row.try_get("title").map_err(get)?,
        message: row.try_get("message").map_err(get)?,
        read: row.try_get("read").map_err(get)?,
        link: row.try_get("link").map_err(get)?,
        created_at,
    })
}
