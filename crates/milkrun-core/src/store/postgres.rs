use async_trait::async_trait;
use sqlx::error::ErrorKind;
use sqlx::{PgPool, Row};
use tracing::{debug, error, info, warn};

use super::{AppendReceipt, EventStore};
use crate::db;
use crate::error::{IngestError, Result};
use crate::record::NormalizedRecord;
use crate::schema::{self, ColumnDescription, TableName};

/// Postgres-backed event store. The primary key on `id` is the only
/// duplicate guard; concurrent appends of one id are resolved by the database.
#[derive(Clone)]
pub struct PgEventStore {
    pool: PgPool,
    table: TableName,
    insert_sql: String,
}

impl PgEventStore {
    pub fn new(pool: PgPool, table: TableName) -> Self {
        let insert_sql = schema::insert_sql(&table);
        Self {
            pool,
            table,
            insert_sql,
        }
    }

    pub async fn connect(database_url: &str, max_connections: u32, table: TableName) -> Result<Self> {
        let pool = db::connect(database_url, max_connections).await?;
        Ok(Self::new(pool, table))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Releases pooled connections. Further calls fail with `StorageUnavailable`.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(&schema::create_table_sql(&self.table))
            .execute(&self.pool)
            .await
            .map_err(IngestError::unavailable)?;
        info!(table = %self.table, "events table ready");
        Ok(())
    }

    async fn recreate_schema(&self) -> Result<()> {
        warn!(table = %self.table, "dropping events table before recreating it");
        sqlx::query(&schema::drop_table_sql(&self.table))
            .execute(&self.pool)
            .await
            .map_err(IngestError::unavailable)?;
        self.ensure_schema().await
    }

    async fn append(&self, record: &NormalizedRecord) -> Result<AppendReceipt> {
        debug!(id = record.id_or_placeholder(), "inserting event");

        sqlx::query(&self.insert_sql)
            .bind(&record.id)
            .bind(&record.created_at)
            .bind(record.live)
            .bind(&record.event_type)
            .bind(&record.user_id)
            .bind(&record.mm_user_id)
            .bind(record.latitude)
            .bind(record.longitude)
            .bind(&record.trip_id)
            .bind(&record.trip_external_id)
            .bind(&record.trip_created_at)
            .bind(&record.trip_updated_at)
            .bind(&record.trip_started_at)
            .bind(&record.trip_mm_user_id)
            .bind(&record.route_session_type)
            .bind(record.process_timestamp)
            .bind(record.process_hour)
            .execute(&self.pool)
            .await
            .map_err(|err| classify_insert_error(record, err))?;

        Ok(AppendReceipt {
            id: record.id.clone().unwrap_or_default(),
            process_hour: record.process_hour,
        })
    }

    async fn describe_schema(&self) -> Vec<ColumnDescription> {
        let rows = match sqlx::query(schema::DESCRIBE_SQL)
            .bind(self.table.as_str())
            .fetch_all(&self.pool)
            .await
        {
            Ok(rows) => rows,
            Err(err) => {
                error!(table = %self.table, error = %err, "failed to describe events table");
                return Vec::new();
            }
        };

        if rows.is_empty() {
            warn!(table = %self.table, "events table does not exist");
            return Vec::new();
        }

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            match (row.try_get("column_name"), row.try_get("data_type")) {
                (Ok(name), Ok(data_type)) => columns.push(ColumnDescription { name, data_type }),
                (Err(err), _) | (_, Err(err)) => {
                    error!(table = %self.table, error = %err, "unreadable schema row");
                    return Vec::new();
                }
            }
        }
        columns
    }
}

/// Maps an insert failure onto the ingest taxonomy. Unique violations are
/// duplicates; other constraint (class 23) and data (class 22) errors mean
/// the row itself was rejected; everything else is infrastructural.
fn classify_insert_error(record: &NormalizedRecord, err: sqlx::Error) -> IngestError {
    if let sqlx::Error::Database(db_err) = &err {
        if matches!(db_err.kind(), ErrorKind::UniqueViolation) {
            return IngestError::DuplicateKey(record.id_or_placeholder().to_string());
        }

        let code = db_err.code().unwrap_or_default();
        if matches!(db_err.kind(), ErrorKind::NotNullViolation | ErrorKind::CheckViolation)
            || code.starts_with("22")
            || code.starts_with("23")
        {
            return IngestError::malformed("record", db_err.message().to_string());
        }
    }
    IngestError::unavailable(err)
}
