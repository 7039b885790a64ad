use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One webhook event flattened into the fixed column set of the events table.
///
/// Source-derived timestamps keep their canonical text form
/// (`YYYY-MM-DD HH:MM:SS[.fff]`), already checked to parse as a timestamp,
/// and are interpreted by the store without any timezone conversion. The two `process_*` fields are the capture instant
/// and its hour bucket, always UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub id: Option<String>,
    pub created_at: Option<String>,
    pub live: bool,
    pub event_type: Option<String>,
    pub user_id: Option<String>,
    pub mm_user_id: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub trip_id: Option<String>,
    pub trip_external_id: Option<String>,
    pub trip_created_at: Option<String>,
    pub trip_updated_at: Option<String>,
    pub trip_started_at: Option<String>,
    pub trip_mm_user_id: Option<String>,
    pub route_session_type: Option<String>,
    pub process_timestamp: DateTime<Utc>,
    pub process_hour: DateTime<Utc>,
}

impl NormalizedRecord {
    /// An empty record captured at `process_timestamp`.
    pub fn empty(process_timestamp: DateTime<Utc>, process_hour: DateTime<Utc>) -> Self {
        Self {
            id: None,
            created_at: None,
            live: false,
            event_type: None,
            user_id: None,
            mm_user_id: None,
            latitude: None,
            longitude: None,
            trip_id: None,
            trip_external_id: None,
            trip_created_at: None,
            trip_updated_at: None,
            trip_started_at: None,
            trip_mm_user_id: None,
            route_session_type: None,
            process_timestamp,
            process_hour,
        }
    }

    pub fn id_or_placeholder(&self) -> &str {
        self.id.as_deref().unwrap_or("<missing>")
    }
}
