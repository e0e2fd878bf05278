//! Durable notification inbox.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;

use tourbook_booking::Notification;
use tourbook_core::{NotificationId, UserId};

use crate::error::ServiceResult;

pub use in_memory::InMemoryNotificationStore;
pub use postgres::PostgresNotificationStore;

/// Recipient-scoped notification storage.
///
/// Every read or mutation by id also takes the recipient; an id that belongs
/// to someone else behaves exactly like an unknown id (`NotFound`).
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, notification: &Notification) -> ServiceResult<()>;

    /// Newest first.
    async fn list_for_recipient(
        &self,
        recipient_id: UserId,
        unread_only: bool,
    ) -> ServiceResult<Vec<Notification>>;

    async fn unread_count(&self, recipient_id: UserId) -> ServiceResult<u64>;

    async fn mark_read(
        &self,
        notification_id: NotificationId,
        recipient_id: UserId,
    ) -> ServiceResult<Notification>;

    /// Returns how many notifications changed.
    async fn mark_all_read(&self, recipient_id: UserId) -> ServiceResult<u64>;

    async fn delete(&self, notification_id: NotificationId, recipient_id: UserId) -> ServiceResult<()>;
}

#[async_trait]
impl<S> NotificationStore for Arc<S>
where
    S: NotificationStore + ?Sized,
{
    async fn insert(&self, notification: &Notification) -> ServiceResult<()> {
        (**self).insert(notification).await
    }

    async fn list_for_recipient(
        &self,
        recipient_id: UserId,
        unread_only: bool,
    ) -> ServiceResult<Vec<Notification>> {
        (**self).list_for_recipient(recipient_id, unread_only).await
    }

    async fn unread_count(&self, recipient_id: UserId) -> ServiceResult<u64> {
        (**self).unread_count(recipient_id).await
    }

    async fn mark_read(
        &self,
        notification_id: NotificationId,
        recipient_id: UserId,
    ) -> ServiceResult<Notification> {
        (**self).mark_read(notification_id, recipient_id).await
    }

    async fn mark_all_read(&self, recipient_id: UserId) -> ServiceResult<u64> {
        (**self).mark_all_read(recipient_id).await
    }

    async fn delete(&self, notification_id: NotificationId, recipient_id: UserId) -> ServiceResult<()> {
        (**self).delete(notification_id, recipient_id).await
    }
}
