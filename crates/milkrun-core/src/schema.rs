//! The single definition of the events table, shared by every code path that
//! creates, writes or reports on it.

use serde::Serialize;

pub const DEFAULT_TABLE: &str = "webhook_events";

/// Postgres truncates identifiers beyond this length.
const MAX_IDENTIFIER_LEN: usize = 63;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    pub name: &'static str,
    pub sql_type: &'static str,
    /// Placeholder expression used in `INSERT`; text-bound timestamps are cast here.
    pub bind_as: &'static str,
}

const fn column(name: &'static str, sql_type: &'static str) -> Column {
    Column {
        name,
        sql_type,
        bind_as: "",
    }
}

const fn cast_column(name: &'static str, sql_type: &'static str, bind_as: &'static str) -> Column {
    Column {
        name,
        sql_type,
        bind_as,
    }
}

/// Column order matches the bind order in [`crate::store::PgEventStore::append`].
pub const COLUMNS: &[Column] = &[
    column("id", "TEXT PRIMARY KEY"),
    cast_column("created_at", "TIMESTAMP", "::timestamp"),
    column("live", "BOOLEAN NOT NULL"),
    column("event_type", "TEXT"),
    column("user_id", "TEXT"),
    column("mm_user_id", "TEXT"),
    column("latitude", "DOUBLE PRECISION"),
    column("longitude", "DOUBLE PRECISION"),
    column("trip_id", "TEXT"),
    column("trip_external_id", "TEXT"),
    cast_column("trip_created_at", "TIMESTAMP", "::timestamp"),
    cast_column("trip_updated_at", "TIMESTAMP", "::timestamp"),
    cast_column("trip_started_at", "TIMESTAMP", "::timestamp"),
    column("trip_mm_user_id", "TEXT"),
    column("route_session_type", "TEXT"),
    column("process_timestamp", "TIMESTAMPTZ NOT NULL"),
    column("process_hour", "TIMESTAMPTZ NOT NULL"),
];

/// A table name checked to be a plain, unquoted, lower-case SQL identifier so
/// it can be interpolated into statements and matches the folded name
/// Postgres records in `information_schema`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableName(String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Result<Self, InvalidTableName> {
        let name = name.into();
        let mut chars = name.chars();
        let valid_start = chars
            .next()
            .is_some_and(|c| c.is_ascii_lowercase() || c == '_');
        let valid_rest = chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');

        if valid_start && valid_rest && name.len() <= MAX_IDENTIFIER_LEN {
            Ok(Self(name))
        } else {
            Err(InvalidTableName(name))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TableName {
    fn default() -> Self {
        Self(DEFAULT_TABLE.to_string())
    }
}

impl std::fmt::Display for TableName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("`{0}` is not a valid table name (expected [a-z_][a-z0-9_]*, at most 63 bytes)")]
pub struct InvalidTableName(pub String);

/// One row of the schema report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDescription {
    pub name: String,
    pub data_type: String,
}

pub fn create_table_sql(table: &TableName) -> String {
    let columns = COLUMNS
        .iter()
        .map(|column| format!("    {} {}", column.name, column.sql_type))
        .collect::<Vec<_>>()
        .join(",\n");
    format!("CREATE TABLE IF NOT EXISTS {table} (\n{columns}\n)")
}

pub fn drop_table_sql(table: &TableName) -> String {
    format!("DROP TABLE IF EXISTS {table}")
}

pub fn insert_sql(table: &TableName) -> String {
    let names = COLUMNS
        .iter()
        .map(|column| column.name)
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = COLUMNS
        .iter()
        .enumerate()
        .map(|(idx, column)| format!("${}{}", idx + 1, column.bind_as))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {table} ({names}) VALUES ({placeholders})")
}

pub const DESCRIBE_SQL: &str = r#"
    SELECT column_name::text AS column_name, data_type::text AS data_type
    FROM information_schema.columns
    WHERE table_schema = current_schema() AND table_name = $1
    ORDER BY ordinal_position
"#;

/// The report the store would produce for a freshly created table, using
/// the declared column types.
pub fn declared_columns() -> Vec<ColumnDescription> {
    COLUMNS
        .iter()
        .map(|column| ColumnDescription {
            name: column.name.to_string(),
            data_type: declared_type(column.sql_type).to_string(),
        })
        .collect()
}

fn declared_type(sql_type: &str) -> &str {
    sql_type
        .trim_end_matches(" PRIMARY KEY")
        .trim_end_matches(" NOT NULL")
}
