//! Durable, idempotent storage for normalized webhook events.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::record::NormalizedRecord;
use crate::schema::ColumnDescription;

pub use memory::MemoryEventStore;
pub use postgres::PgEventStore;

/// Acknowledgment returned for a stored event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendReceipt {
    pub id: String,
    pub process_hour: DateTime<Utc>,
}

/// Storage for normalized events, keyed on the event id.
///
/// Uniqueness of `id` is enforced by the backend itself; implementations must
/// not cache previously seen records to decide duplicates.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Creates the events table if it does not exist. Never drops data.
    async fn ensure_schema(&self) -> Result<()>;

    /// Drops and recreates the events table, discarding every stored event.
    async fn recreate_schema(&self) -> Result<()>;

    /// Inserts exactly one record. Fails with
    /// [`DuplicateKey`](crate::IngestError::DuplicateKey) if the id exists.
    async fn append(&self, record: &NormalizedRecord) -> Result<AppendReceipt>;

    /// Ordered column names and types, or an empty list if the table cannot
    /// be described. The cause of an empty result is logged.
    async fn describe_schema(&self) -> Vec<ColumnDescription>;
}
