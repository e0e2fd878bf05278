//! Notification fan-out: durable record first, live push second.

use chrono::Utc;
use serde_json::Value as JsonValue;

use tourbook_auth::Role;
use tourbook_booking::{BookingEvent, NewNotification, Notification};
use tourbook_events::{PushMessage, Publisher, Topic};

use crate::error::ServiceResult;
use crate::notifications::NotificationStore;

/// Event name of a personal push carrying a stored notification.
pub const NOTIFICATION_EVENT: &str = "notification";

/// Role groups that receive operational booking events.
pub const OPERATIONS_ROLES: [Role; 2] = [Role::STAFF, Role::ADMIN];

pub struct NotificationDispatcher<N, P> {
    store: N,
    publisher: P,
}

impl<N, P> NotificationDispatcher<N, P>
where
    N: NotificationStore,
    P: Publisher,
{
    pub fn new(store: N, publisher: P) -> Self {
        Self { store, publisher }
    }

    pub fn store(&self) -> &N {
        &self.store
    }

    /// Persist the notification, then push a copy to the recipient's live
    /// connections if there are any.
    ///
    /// Only the persistence step can fail. A push that reaches nobody is
    /// silently dropped; the record stays unread until pulled.
    pub async fn notify(&self, notice: NewNotification) -> ServiceResult<Notification> {
        let notification = Notification::from_new(notice, Utc::now());
        self.store.insert(&notification).await?;

        let topic = Topic::User(notification.recipient_id);
        if self.publisher.has_subscribers(&topic) {
            match serde_json::to_value(&notification) {
                Ok(payload) => {
                    let delivered = self
                        .publisher
                        .publish(&topic, PushMessage::new(NOTIFICATION_EVENT, payload));
                    tracing::debug!(notification_id = %notification.id, delivered, "notification pushed");
                }
                Err(err) => {
                    tracing::warn!(notification_id = %notification.id, error = %err, "notification push skipped");
                }
            }
        }

        Ok(notification)
    }

    /// Fire-and-forget signal to a role group. Never persisted.
    pub fn broadcast(&self, role: &Role, event: &str, payload: JsonValue) -> usize {
        let delivered = self
            .publisher
            .publish(&Topic::Role(role.clone()), PushMessage::new(event, payload));
        tracing::debug!(role = %role, event, delivered, "broadcast sent");
        delivered
    }

    /// Record and announce one booking event: a single owner notification
    /// plus a summary for every operations role group.
    pub async fn booking_event(&self, event: &BookingEvent) -> ServiceResult<Notification> {
        let notification = self.notify(event.owner_notice()).await?;

        let summary = event.staff_summary();
        for role in &OPERATIONS_ROLES {
            self.broadcast(role, event.event_type(), summary.clone());
        }

        Ok(notification)
    }
}
