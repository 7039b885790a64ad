use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta, Timelike, Utc};
use serde_json::Value;

use crate::error::{IngestError, Result};
use crate::json_path::lookup;
use crate::record::NormalizedRecord;

const ID: &[&str] = &["id"];
const CREATED_AT: &[&str] = &["created_at"];
const LIVE: &[&str] = &["live"];
const EVENT_TYPE: &[&str] = &["type"];
const USER_ID: &[&str] = &["_id"];
const MM_USER_ID: &[&str] = &["MMUserId"];
const LATITUDE: &[&str] = &["location", "coordinates", "latitude"];
const LONGITUDE: &[&str] = &["location", "coordinates", "longitude"];
const TRIP_ID: &[&str] = &["trip", "_id"];
const TRIP_EXTERNAL_ID: &[&str] = &["trip", "externalId"];
const TRIP_CREATED_AT: &[&str] = &["trip", "createdAt"];
const TRIP_UPDATED_AT: &[&str] = &["trip", "updatedAt"];
const TRIP_STARTED_AT: &[&str] = &["trip", "startedAt"];
const TRIP_MM_USER_ID: &[&str] = &["trip", "MMUserId"];
const ROUTE_SESSION_TYPE: &[&str] = &["trip", "metadata", "route_session_type"];

/// The only `live` flag value that marks an event as live.
pub const LIVE_FLAG: &str = "TRUE";

/// Flattens a webhook payload into a [`NormalizedRecord`] captured at `now`.
///
/// Missing or null paths become `None` (or `false` for `live`). Only values
/// that are present but cannot be coerced to their column type produce
/// [`IngestError::MalformedInput`].
pub fn normalize(raw: &Value, now: DateTime<Utc>) -> Result<NormalizedRecord> {
    let mut record = NormalizedRecord::empty(now, hour_bucket(now));

    record.id = text(raw, ID, "id")?;
    record.created_at = timestamp(raw, CREATED_AT, "created_at")?;
    record.live = matches!(lookup(raw, LIVE), Some(Value::String(flag)) if flag == LIVE_FLAG);
    record.event_type = text(raw, EVENT_TYPE, "event_type")?;
    record.user_id = text(raw, USER_ID, "user_id")?;
    record.mm_user_id = text(raw, MM_USER_ID, "mm_user_id")?;
    record.latitude = coordinate(raw, LATITUDE, "latitude")?;
    record.longitude = coordinate(raw, LONGITUDE, "longitude")?;
    record.trip_id = text(raw, TRIP_ID, "trip_id")?;
    record.trip_external_id = text(raw, TRIP_EXTERNAL_ID, "trip_external_id")?;
    record.trip_created_at = timestamp(raw, TRIP_CREATED_AT, "trip_created_at")?;
    record.trip_updated_at = timestamp(raw, TRIP_UPDATED_AT, "trip_updated_at")?;
    record.trip_started_at = timestamp(raw, TRIP_STARTED_AT, "trip_started_at")?;
    record.trip_mm_user_id = text(raw, TRIP_MM_USER_ID, "trip_mm_user_id")?;
    record.route_session_type = text(raw, ROUTE_SESSION_TYPE, "route_session_type")?;

    Ok(record)
}

/// Truncates `instant` to the start of its hour, keeping it in UTC.
pub fn hour_bucket(instant: DateTime<Utc>) -> DateTime<Utc> {
    let into_hour = TimeDelta::seconds(i64::from(instant.minute() * 60 + instant.second()))
        + TimeDelta::nanoseconds(i64::from(instant.nanosecond()));
    instant - into_hour
}

/// Rewrites an ISO-8601 style timestamp into the `date time` form the table
/// stores: the trailing `Z` is dropped and the `T` separator becomes a space.
pub fn canonical_timestamp(raw: &str) -> String {
    let trimmed = raw.strip_suffix('Z').unwrap_or(raw);
    trimmed.replacen('T', " ", 1)
}

fn text(raw: &Value, path: &[&str], field: &'static str) -> Result<Option<String>> {
    match lookup(raw, path) {
        None => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(value @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(value.to_string())),
        Some(other) => Err(IngestError::malformed(
            field,
            format!("expected a scalar, found {}", kind(other)),
        )),
    }
}

fn timestamp(raw: &Value, path: &[&str], field: &'static str) -> Result<Option<String>> {
    match lookup(raw, path) {
        None => Ok(None),
        Some(Value::String(value)) if value.is_empty() => Ok(None),
        Some(Value::String(value)) => {
            let canonical = canonical_timestamp(value);
            if is_valid_timestamp(&canonical) {
                Ok(Some(canonical))
            } else {
                Err(IngestError::malformed(
                    field,
                    format!("`{value}` is not a timestamp"),
                ))
            }
        }
        Some(other) => Err(IngestError::malformed(
            field,
            format!("expected a timestamp string, found {}", kind(other)),
        )),
    }
}

/// Accepts the canonical forms a `TIMESTAMP` column takes verbatim. A
/// trailing offset is allowed but never applied.
pub fn is_valid_timestamp(canonical: &str) -> bool {
    NaiveDateTime::parse_from_str(canonical, "%Y-%m-%d %H:%M:%S%.f").is_ok()
        || NaiveDateTime::parse_from_str(canonical, "%Y-%m-%d %H:%M").is_ok()
        || NaiveDate::parse_from_str(canonical, "%Y-%m-%d").is_ok()
        || DateTime::parse_from_str(canonical, "%Y-%m-%d %H:%M:%S%.f%#z").is_ok()
}

fn coordinate(raw: &Value, path: &[&str], field: &'static str) -> Result<Option<f64>> {
    match lookup(raw, path) {
        None => Ok(None),
        Some(Value::String(value)) if value.is_empty() || value == " " => Ok(None),
        Some(Value::String(value)) => value.trim().parse::<f64>().map(Some).map_err(|err| {
            IngestError::malformed(field, format!("`{value}` is not a number: {err}"))
        }),
        Some(Value::Number(number)) => number
            .as_f64()
            .map(Some)
            .ok_or_else(|| IngestError::malformed(field, format!("{number} is out of range"))),
        Some(other) => Err(IngestError::malformed(
            field,
            format!("expected a coordinate, found {}", kind(other)),
        )),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
