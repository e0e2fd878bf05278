use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tourbook_core::{DomainError, NotificationId, UserId};

/// Notification category shown to the recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Booking,
    Payment,
    Tour,
    Review,
    General,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Booking => "booking",
            NotificationKind::Payment => "payment",
            NotificationKind::Tour => "tour",
            NotificationKind::Review => "review",
            NotificationKind::General => "general",
        }
    }
}

impl core::str::FromStr for NotificationKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "booking" => Ok(NotificationKind::Booking),
            "payment" => Ok(NotificationKind::Payment),
            "tour" => Ok(NotificationKind::Tour),
            "review" => Ok(NotificationKind::Review),
            "general" => Ok(NotificationKind::General),
            other => Err(DomainError::validation(format!("unknown notification type '{other}'"))),
        }
    }
}

/// Content of a notification before it is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub recipient_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub link: Option<String>,
}

/// Durable, recipient-scoped record of a domain event.
///
/// This is the source of truth for "has the user been told"; a live push is
/// only a faster copy of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub recipient_id: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub read: bool,
    pub link: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn from_new(new: NewNotification, now: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::new(),
            recipient_id: new.recipient_id,
            kind: new.kind,
            title: new.title,
            message: new.message,
            read: false,
            link: new.link,
            created_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_notifications_start_unread_and_serialize_kind_as_type() {
        let n = Notification::from_new(
            NewNotification {
                recipient_id: UserId::new(),
                kind: NotificationKind::Booking,
                title: "Booking received".to_string(),
                message: "hello".to_string(),
                link: None,
            },
            Utc::now(),
        );
        assert!(!n.read);

        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["type"], "booking");
        assert!(json.get("kind").is_none());
    }

    #[test]
    fn kind_parses_from_wire_names() {
        assert_eq!("payment".parse::<NotificationKind>().unwrap(), NotificationKind::Payment);
        assert!("sms".parse::<NotificationKind>().is_err());
    }
}
