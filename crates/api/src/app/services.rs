//! Infrastructure wiring: picks the storage backend and assembles the
//! booking service, notification inbox and session registry.

use std::sync::Arc;

use sqlx::PgPool;
use thiserror::Error;

use tourbook_events::SessionRegistry;
use tourbook_infra::{
    BookingService, BookingStore, InMemoryBookingStore, InMemoryInventoryLedger,
    InMemoryNotificationStore, InventoryLedger, NotificationDispatcher, NotificationStore,
    PostgresBookingStore, PostgresInventoryLedger, PostgresNotificationStore, StoreError, schema,
};

use crate::config::{ApiConfig, StoreBackend};

pub type DynBookingService = BookingService<
    Arc<dyn InventoryLedger>,
    Arc<dyn BookingStore>,
    Arc<dyn NotificationStore>,
    Arc<SessionRegistry>,
>;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to connect to Postgres: {0}")]
    Connect(#[from] sqlx::Error),

    #[error("failed to prepare database schema: {0}")]
    Schema(#[from] StoreError),
}

/// Shared application services, injected into handlers as an `Extension`.
#[derive(Clone)]
pub struct AppServices {
    pub bookings: Arc<DynBookingService>,
    pub notifications: Arc<dyn NotificationStore>,
    pub registry: Arc<SessionRegistry>,
    pub backend: &'static str,
}

impl AppServices {
    fn assemble(
        ledger: Arc<dyn InventoryLedger>,
        bookings: Arc<dyn BookingStore>,
        notifications: Arc<dyn NotificationStore>,
        backend: &'static str,
    ) -> Self {
        let registry = Arc::new(SessionRegistry::new());
        let dispatcher = NotificationDispatcher::new(notifications.clone(), registry.clone());
        let service = BookingService::new(ledger, bookings, dispatcher);

        Self {
            bookings: Arc::new(service),
            notifications,
            registry,
            backend,
        }
    }
}

pub async fn build_services(config: &ApiConfig) -> Result<AppServices, StartupError> {
    match &config.store {
        StoreBackend::InMemory => {
            tracing::info!("using in-memory stores");
            Ok(build_in_memory_services())
        }
        StoreBackend::Postgres { database_url } => {
            tracing::info!("using Postgres stores");
            build_persistent_services(database_url).await
        }
    }
}

pub fn build_in_memory_services() -> AppServices {
    AppServices::assemble(
        Arc::new(InMemoryInventoryLedger::new()),
        Arc::new(InMemoryBookingStore::new()),
        Arc::new(InMemoryNotificationStore::new()),
        "in_memory",
    )
}

async fn build_persistent_services(database_url: &str) -> Result<AppServices, StartupError> {
    let pool = PgPool::connect(database_url).await?;
    schema::bootstrap(&pool).await?;

    Ok(AppServices::assemble(
        Arc::new(PostgresInventoryLedger::new(pool.clone())),
        Arc::new(PostgresBookingStore::new(pool.clone())),
        Arc::new(PostgresNotificationStore::new(pool)),
        "postgres",
    ))
}
