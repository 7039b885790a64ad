use std::collections::hash_map::Entry;
use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::{AppendReceipt, EventStore};
use crate::error::{IngestError, Result};
use crate::record::NormalizedRecord;
use crate::schema::{self, ColumnDescription};

/// Process-local event store. The map is the storage itself, so it is only
/// durable for the lifetime of the process; it is meant for tests and for
/// running the listener without a database.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    table: Mutex<Option<HashMap<String, NormalizedRecord>>>,
}

impl MemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store whose table already exists.
    pub fn with_schema() -> Self {
        Self {
            table: Mutex::new(Some(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.as_ref().map_or(0, HashMap::len)
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get(&self, id: &str) -> Option<NormalizedRecord> {
        self.table.lock().await.as_ref()?.get(id).cloned()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn ensure_schema(&self) -> Result<()> {
        self.table.lock().await.get_or_insert_with(HashMap::new);
        Ok(())
    }

    async fn recreate_schema(&self) -> Result<()> {
        warn!("dropping in-memory events table before recreating it");
        *self.table.lock().await = Some(HashMap::new());
        Ok(())
    }

    async fn append(&self, record: &NormalizedRecord) -> Result<AppendReceipt> {
        let id = record
            .id
            .clone()
            .ok_or_else(|| IngestError::malformed("id", "primary key must not be null"))?;

        let mut guard = self.table.lock().await;
        let rows = guard
            .as_mut()
            .ok_or_else(|| IngestError::unavailable("events table does not exist"))?;

        match rows.entry(id) {
            Entry::Occupied(entry) => Err(IngestError::DuplicateKey(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(id = %entry.key(), "inserting event");
                let receipt = AppendReceipt {
                    id: entry.key().clone(),
                    process_hour: record.process_hour,
                };
                entry.insert(record.clone());
                Ok(receipt)
            }
        }
    }

    async fn describe_schema(&self) -> Vec<ColumnDescription> {
        if self.table.lock().await.is_none() {
            warn!("in-memory events table does not exist");
            return Vec::new();
        }
        schema::declared_columns()
    }
}
