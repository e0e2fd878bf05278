//! Topic-based publish/subscribe abstraction (mechanics only).
//!
//! This module provides the **live delivery pattern**: a publisher hands a
//! message to every connection subscribed to a topic.
//!
//! ## Design Philosophy
//!
//! - **Transport-agnostic**: callers see topics and JSON payloads, never sockets.
//! - **Best-effort**: a message for a topic nobody listens to is dropped.
//!   There is no retry, no buffering for offline users, no backpressure on
//!   the publisher.
//! - **No persistence**: the notification store is the source of truth; the
//!   bus only distributes copies of what was already stored.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::mpsc::error::TryRecvError;

use tourbook_auth::Role;
use tourbook_core::{ConnectionId, UserId};

use crate::session_registry::RegistryError;

/// Delivery address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Topic {
    /// Personal channel: every live connection of one identity.
    User(UserId),
    /// Role group: every live connection whose verified roles include this one.
    Role(Role),
}

impl core::fmt::Display for Topic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Topic::User(id) => write!(f, "user:{id}"),
            Topic::Role(role) => write!(f, "role:{role}"),
        }
    }
}

/// A server-to-client frame.
///
/// Personal channels receive `event = "notification"` with the full stored
/// notification as payload; role groups receive lightweight operational events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushMessage {
    pub event: String,
    pub payload: JsonValue,
}

impl PushMessage {
    pub fn new(event: impl Into<String>, payload: JsonValue) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

/// Receiving end of one live connection.
///
/// Each registered connection gets exactly one subscription; every topic the
/// connection is subscribed to feeds into it.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: UnboundedReceiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: UnboundedReceiver<M>) -> Self {
        Self { receiver }
    }

    /// Wait for the next message. `None` once the connection was unregistered.
    pub async fn recv(&mut self) -> Option<M> {
        self.receiver.recv().await
    }

    /// Try to receive a message without waiting.
    pub fn try_recv(&mut self) -> Result<M, TryRecvError> {
        self.receiver.try_recv()
    }
}

/// Domain-agnostic publish/subscribe contract used by the notification dispatcher.
///
/// ## Thread Safety
///
/// Implementations are shared across request handlers and must be `Send + Sync`.
/// `publish` must never block on a slow or vanished receiver.
pub trait Publisher: Send + Sync {
    /// Deliver `message` to every connection subscribed to `topic`.
    ///
    /// Returns the number of connections the message was handed to.
    fn publish(&self, topic: &Topic, message: PushMessage) -> usize;

    /// Add a registered connection to `topic`.
    fn subscribe(&self, connection_id: ConnectionId, topic: Topic) -> Result<(), RegistryError>;

    /// `true` when at least one live connection listens on `topic`.
    fn has_subscribers(&self, topic: &Topic) -> bool;
}

impl<P> Publisher for Arc<P>
where
    P: Publisher + ?Sized,
{
    fn publish(&self, topic: &Topic, message: PushMessage) -> usize {
        (**self).publish(topic, message)
    }

    fn subscribe(&self, connection_id: ConnectionId, topic: Topic) -> Result<(), RegistryError> {
        (**self).subscribe(connection_id, topic)
    }

    fn has_subscribers(&self, topic: &Topic) -> bool {
        (**self).has_subscribers(topic)
    }
}
