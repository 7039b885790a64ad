use std::time::Duration;

use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::error::{IngestError, Result};

pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Establish a Postgres connection pool for the event store.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .map_err(IngestError::unavailable)?;

    tracing::info!(max_connections, "database connection pool established");
    Ok(pool)
}
