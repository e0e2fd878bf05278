//! Realtime delivery plumbing: topics, live subscriptions and the session registry.
//!
//! Nothing here is durable. Persisted notifications are the source of truth;
//! this crate only moves copies of them to whoever happens to be connected.

pub mod bus;
pub mod session_registry;

pub use bus::{PushMessage, Publisher, Subscription, Topic};
pub use session_registry::{RegistryError, Session, SessionRegistry};
