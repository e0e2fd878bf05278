//! Database schema bootstrap.
//!
//! The DDL is idempotent, so running it on every startup is safe.

use sqlx::PgPool;

use crate::error::{StoreError, map_sqlx_error};

const INIT_SQL: &str = include_str!("../migrations/0001_init.sql");

/// Create tables, indexes and triggers if they do not exist yet.
pub async fn bootstrap(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::raw_sql(INIT_SQL)
        .execute(pool)
        .await
        .map_err(|e| map_sqlx_error("bootstrap_schema", e))?;
    tracing::info!("database schema ready");
    Ok(())
}
