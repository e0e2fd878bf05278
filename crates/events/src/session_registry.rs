//! In-memory registry of live connections.
//!
//! One structure indexes both directions (connection → session, topic →
//! connections) under a single lock, so a connection can never stay listed
//! under a topic after it is gone.

use std::collections::{HashMap, HashSet};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::{self, UnboundedSender};

use tourbook_auth::Role;
use tourbook_core::{ConnectionId, UserId};

use crate::bus::{PushMessage, Publisher, Subscription, Topic};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),
}

/// A live, authenticated connection. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub connection_id: ConnectionId,
    pub identity_id: UserId,
    pub roles: Vec<Role>,
}

#[derive(Debug)]
struct ConnectionEntry {
    session: Session,
    topics: HashSet<Topic>,
    sender: UnboundedSender<PushMessage>,
}

#[derive(Debug, Default)]
struct Inner {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    topics: HashMap<Topic, HashSet<ConnectionId>>,
}

impl Inner {
    fn attach(&mut self, connection_id: ConnectionId, topic: Topic) {
        let Some(entry) = self.connections.get_mut(&connection_id) else {
            return;
        };
        if entry.topics.insert(topic.clone()) {
            self.topics.entry(topic).or_default().insert(connection_id);
        }
    }

    fn detach(&mut self, connection_id: ConnectionId) -> Option<Session> {
        let entry = self.connections.remove(&connection_id)?;
        for topic in &entry.topics {
            if let Some(members) = self.topics.get_mut(topic) {
                members.remove(&connection_id);
                if members.is_empty() {
                    self.topics.remove(topic);
                }
            }
        }
        Some(entry.session)
    }
}

/// Volatile index of who is connected and which role groups they joined.
///
/// - A connection belongs to exactly one identity.
/// - An identity may hold several connections (one per device).
/// - Role groups are fixed at registration from the verified roles.
///
/// Carries no durability guarantee; a restart forgets everyone.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    inner: RwLock<Inner>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    // Registry state is rebuilt by reconnects, so a poisoned lock is recovered
    // rather than propagated.
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Index a connection after its credential handshake succeeded.
    ///
    /// Registering an id that is already present replaces the old entry.
    pub fn register(
        &self,
        connection_id: ConnectionId,
        identity_id: UserId,
        roles: Vec<Role>,
    ) -> Subscription<PushMessage> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut roles = roles;
        roles.sort();
        roles.dedup();

        let mut inner = self.write();
        if inner.detach(connection_id).is_some() {
            tracing::warn!(%connection_id, "connection re-registered; previous entry replaced");
        }

        inner.connections.insert(
            connection_id,
            ConnectionEntry {
                session: Session {
                    connection_id,
                    identity_id,
                    roles: roles.clone(),
                },
                topics: HashSet::new(),
                sender: tx,
            },
        );
        inner.attach(connection_id, Topic::User(identity_id));
        for role in roles {
            inner.attach(connection_id, Topic::Role(role));
        }

        tracing::debug!(%connection_id, %identity_id, "session registered");
        Subscription::new(rx)
    }

    /// Drop a connection from every index. Returns the removed session, if any.
    pub fn unregister(&self, connection_id: ConnectionId) -> Option<Session> {
        let removed = self.write().detach(connection_id);
        if removed.is_some() {
            tracing::debug!(%connection_id, "session unregistered");
        }
        removed
    }

    pub fn is_online(&self, identity_id: UserId) -> bool {
        self.has_subscribers(&Topic::User(identity_id))
    }

    pub fn connections_for(&self, identity_id: UserId) -> Vec<ConnectionId> {
        let inner = self.read();
        let mut ids: Vec<ConnectionId> = inner
            .topics
            .get(&Topic::User(identity_id))
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    pub fn session(&self, connection_id: ConnectionId) -> Option<Session> {
        self.read()
            .connections
            .get(&connection_id)
            .map(|entry| entry.session.clone())
    }

    pub fn connection_count(&self) -> usize {
        self.read().connections.len()
    }

    /// Number of connections currently listening on `topic`.
    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.read().topics.get(topic).map_or(0, HashSet::len)
    }
}

impl Publisher for SessionRegistry {
    fn publish(&self, topic: &Topic, message: PushMessage) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        {
            let inner = self.read();
            let Some(members) = inner.topics.get(topic) else {
                return 0;
            };
            for connection_id in members {
                let Some(entry) = inner.connections.get(connection_id) else {
                    continue;
                };
                if entry.sender.send(message.clone()).is_ok() {
                    delivered += 1;
                } else {
                    closed.push(*connection_id);
                }
            }
        }

        // Receivers dropped without an explicit unregister (transport died).
        for connection_id in closed {
            tracing::warn!(%connection_id, %topic, "dropping push for closed connection");
            self.unregister(connection_id);
        }

        delivered
    }

    fn subscribe(&self, connection_id: ConnectionId, topic: Topic) -> Result<(), RegistryError> {
        let mut inner = self.write();
        if !inner.connections.contains_key(&connection_id) {
            return Err(RegistryError::UnknownConnection(connection_id));
        }
        inner.attach(connection_id, topic);
        Ok(())
    }

    fn has_subscribers(&self, topic: &Topic) -> bool {
        self.read()
            .topics
            .get(topic)
            .is_some_and(|members| !members.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ping() -> PushMessage {
        PushMessage::new("ping", json!({}))
    }

    #[test]
    fn register_indexes_identity_and_roles() {
        let registry = SessionRegistry::new();
        let user = UserId::new();
        let conn = ConnectionId::new();

        let _sub = registry.register(conn, user, vec![Role::STAFF, Role::STAFF]);

        assert!(registry.is_online(user));
        assert_eq!(registry.connections_for(user), vec![conn]);
        assert_eq!(registry.subscriber_count(&Topic::Role(Role::STAFF)), 1);
        assert_eq!(registry.session(conn).unwrap().roles, vec![Role::STAFF]);
    }

    #[test]
    fn unregister_leaves_no_orphans() {
        let registry = SessionRegistry::new();
        let user = UserId::new();
        let conn = ConnectionId::new();
        let _sub = registry.register(conn, user, vec![Role::STAFF, Role::ADMIN]);

        let removed = registry.unregister(conn).unwrap();
        assert_eq!(removed.identity_id, user);

        assert!(!registry.is_online(user));
        assert!(!registry.has_subscribers(&Topic::Role(Role::STAFF)));
        assert!(!registry.has_subscribers(&Topic::Role(Role::ADMIN)));
        assert_eq!(registry.connection_count(), 0);
        assert!(registry.read().topics.is_empty());
        assert!(registry.unregister(conn).is_none());
    }

    #[test]
    fn identity_with_two_devices_stays_online_until_both_leave() {
        let registry = SessionRegistry::new();
        let user = UserId::new();
        let phone = ConnectionId::new();
        let laptop = ConnectionId::new();
        let _a = registry.register(phone, user, vec![]);
        let _b = registry.register(laptop, user, vec![]);

        registry.unregister(phone);
        assert!(registry.is_online(user));
        assert_eq!(registry.connections_for(user), vec![laptop]);

        registry.unregister(laptop);
        assert!(!registry.is_online(user));
    }

    #[test]
    fn re_registering_a_connection_moves_it_to_the_new_identity() {
        let registry = SessionRegistry::new();
        let first = UserId::new();
        let second = UserId::new();
        let conn = ConnectionId::new();

        let _old = registry.register(conn, first, vec![Role::ADMIN]);
        let _new = registry.register(conn, second, vec![]);

        assert!(!registry.is_online(first));
        assert!(registry.is_online(second));
        assert!(!registry.has_subscribers(&Topic::Role(Role::ADMIN)));
        assert_eq!(registry.connection_count(), 1);
    }

    #[test]
    fn publish_fans_out_to_every_connection_of_the_topic() {
        let registry = SessionRegistry::new();
        let user = UserId::new();
        let mut a = registry.register(ConnectionId::new(), user, vec![]);
        let mut b = registry.register(ConnectionId::new(), user, vec![]);
        let mut other = registry.register(ConnectionId::new(), UserId::new(), vec![]);

        let delivered = registry.publish(&Topic::User(user), ping());

        assert_eq!(delivered, 2);
        assert_eq!(a.try_recv().unwrap().event, "ping");
        assert_eq!(b.try_recv().unwrap().event, "ping");
        assert!(other.try_recv().is_err());
    }

    #[test]
    fn publish_to_empty_topic_is_dropped() {
        let registry = SessionRegistry::new();
        assert_eq!(registry.publish(&Topic::User(UserId::new()), ping()), 0);
    }

    #[test]
    fn publish_prunes_connections_whose_receiver_is_gone() {
        let registry = SessionRegistry::new();
        let user = UserId::new();
        let conn = ConnectionId::new();
        drop(registry.register(conn, user, vec![]));

        assert_eq!(registry.publish(&Topic::User(user), ping()), 0);
        assert!(!registry.is_online(user));
        assert!(registry.session(conn).is_none());
    }

    #[test]
    fn subscribe_requires_registration() {
        let registry = SessionRegistry::new();
        let conn = ConnectionId::new();
        assert_eq!(
            registry.subscribe(conn, Topic::Role(Role::STAFF)),
            Err(RegistryError::UnknownConnection(conn))
        );

        let _sub = registry.register(conn, UserId::new(), vec![]);
        registry.subscribe(conn, Topic::Role(Role::STAFF)).unwrap();
        assert_eq!(registry.subscriber_count(&Topic::Role(Role::STAFF)), 1);

        registry.unregister(conn);
        assert_eq!(registry.subscriber_count(&Topic::Role(Role::STAFF)), 0);
    }

    #[tokio::test]
    async fn subscription_ends_after_unregister() {
        let registry = SessionRegistry::new();
        let user = UserId::new();
        let conn = ConnectionId::new();
        let mut sub = registry.register(conn, user, vec![]);

        registry.publish(&Topic::User(user), ping());
        registry.unregister(conn);

        assert_eq!(sub.recv().await.unwrap().event, "ping");
        assert!(sub.recv().await.is_none());
    }
}
