use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use tourbook_booking::Notification;
use tourbook_core::{DomainError, NotificationId, UserId};

use crate::error::{ServiceResult, StoreError};

use super::NotificationStore;

/// In-memory notification store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryNotificationStore {
    inner: RwLock<HashMap<NotificationId, Notification>>,
}

impl InMemoryNotificationStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(
        &self,
        operation: &str,
    ) -> Result<RwLockReadGuard<'_, HashMap<NotificationId, Notification>>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::backend(operation, "notification store lock poisoned"))
    }

    fn write(
        &self,
        operation: &str,
    ) -> Result<RwLockWriteGuard<'_, HashMap<NotificationId, Notification>>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::backend(operation, "notification store lock poisoned"))
    }
}

#[async_trait]
impl NotificationStore for InMemoryNotificationStore {
    async fn insert(&self, notification: &Notification) -> ServiceResult<()> {
        let mut map = self.write("insert_notification")?;
        if map.contains_key(&notification.id) {
            return Err(DomainError::conflict(format!(
                "notification {} already exists",
                notification.id
            ))
            .into());
        }
        map.insert(notification.id, notification.clone());
        Ok(())
    }

    async fn list_for_recipient(
        &self,
        recipient_id: UserId,
        unread_only: bool,
    ) -> ServiceResult<Vec<Notification>> {
        let map = self.read("list_notifications")?;
        let mut listed: Vec<Notification> = map
            .values()
            .filter(|n| n.recipient_id == recipient_id && (!unread_only || !n.read))
            .cloned()
            .collect();
        listed.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(listed)
    }

    async fn unread_count(&self, recipient_id: UserId) -> ServiceResult<u64> {
        let map = self.read("unread_count")?;
        Ok(map
            .values()
            .filter(|n| n.recipient_id == recipient_id && !n.read)
            .count() as u64)
    }

    async fn mark_read(
        &self,
        notification_id: NotificationId,
        recipient_id: UserId,
    ) -> ServiceResult<Notification> {
        let mut map = self.write("mark_read")?;
        match map.get_mut(&notification_id) {
            Some(n) if n.recipient_id == recipient_id => {
                n.read = true;
                Ok(n.clone())
            }
            _ => Err(DomainError::not_found("notification").into()),
        }
    }

    async fn mark_all_read(&self, recipient_id: UserId) -> ServiceResult<u64> {
        let mut map = self.write("mark_all_read")?;
        let mut changed = 0;
        for n in map.values_mut() {
            if n.recipient_id == recipient_id && !n.read {
                n.read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn delete(&self, notification_id: NotificationId, recipient_id: UserId) -> ServiceResult<()> {
        let mut map = self.write("delete_notification")?;
        let owned = map
            .get(&notification_id)
            .is_some_and(|n| n.recipient_id == recipient_id);
        if !owned {
            return Err(DomainError::not_found("notification").into());
        }
        map.remove(&notification_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use tourbook_booking::{NewNotification, NotificationKind};

    fn note(recipient: UserId, minutes_ago: i64) -> Notification {
        Notification::from_new(
            NewNotification {
                recipient_id: recipient,
                kind: NotificationKind::General,
                title: "Hello".to_string(),
                message: "Welcome aboard".to_string(),
                link: None,
            },
            Utc::now() - Duration::minutes(minutes_ago),
        )
    }

    #[tokio::test]
    async fn inbox_is_newest_first_and_filterable() {
        let store = InMemoryNotificationStore::new();
        let me = UserId::new();
        let old = note(me, 10);
        let new = note(me, 1);
        store.insert(&old).await.unwrap();
        store.insert(&new).await.unwrap();
        store.insert(&note(UserId::new(), 0)).await.unwrap();

        let all = store.list_for_recipient(me, false).await.unwrap();
        assert_eq!(all.iter().map(|n| n.id).collect::<Vec<_>>(), vec![new.id, old.id]);

        store.mark_read(old.id, me).await.unwrap();
        let unread = store.list_for_recipient(me, true).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(store.unread_count(me).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn foreign_ids_look_missing() {
        let store = InMemoryNotificationStore::new();
        let owner = UserId::new();
        let intruder = UserId::new();
        let n = note(owner, 0);
        store.insert(&n).await.unwrap();

        let not_found = DomainError::not_found("notification");
        assert_eq!(store.mark_read(n.id, intruder).await.unwrap_err().domain(), Some(&not_found));
        assert_eq!(store.delete(n.id, intruder).await.unwrap_err().domain(), Some(&not_found));

        store.delete(n.id, owner).await.unwrap();
        assert!(store.list_for_recipient(owner, false).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn mark_all_read_only_touches_own_unread() {
        let store = InMemoryNotificationStore::new();
        let me = UserId::new();
        let other = UserId::new();
        for n in [note(me, 3), note(me, 2), note(other, 1)] {
            store.insert(&n).await.unwrap();
        }

        assert_eq!(store.mark_all_read(me).await.unwrap(), 2);
        assert_eq!(store.mark_all_read(me).await.unwrap(), 0);
        assert_eq!(store.unread_count(other).await.unwrap(), 1);
    }
}
