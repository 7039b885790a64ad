use chrono::{DateTime, TimeZone, Timelike, Utc};
use milkrun_core::normalize::{canonical_timestamp, hour_bucket, is_valid_timestamp};
use milkrun_core::{normalize, IngestError};
use serde_json::{json, Value};

fn at(ts: &str) -> DateTime<Utc> {
    ts.parse().expect("parse instant")
}

fn now() -> DateTime<Utc> {
    at("2024-03-09T14:27:31.123456789Z")
}

fn with_coordinates(latitude: Value, longitude: Value) -> Value {
    json!({
        "id": "e1",
        "location": {"coordinates": {"latitude": latitude, "longitude": longitude}}
    })
}

#[test]
fn normalizes_full_webhook_payload() {
    let payload = json!({
        "id": "e1",
        "created_at": "2024-01-05T10:30:00Z",
        "live": "TRUE",
        "type": "arrival",
        "trip": {"_id": "t1", "metadata": {"route_session_type": "milk_run"}},
        "location": {"coordinates": {"latitude": "40.1", "longitude": "-73.9"}}
    });

    let record = normalize(&payload, now()).expect("normalize");

    assert_eq!(record.id.as_deref(), Some("e1"));
    assert!(record.live);
    assert_eq!(record.event_type.as_deref(), Some("arrival"));
    assert_eq!(record.trip_id.as_deref(), Some("t1"));
    assert_eq!(record.route_session_type.as_deref(), Some("milk_run"));
    assert_eq!(record.latitude, Some(40.1));
    assert_eq!(record.longitude, Some(-73.9));
    assert_eq!(record.created_at.as_deref(), Some("2024-01-05 10:30:00"));
    assert_eq!(record.trip_external_id, None);
    assert_eq!(record.user_id, None);
}

#[test]
fn maps_identifiers_and_trip_fields() {
    let payload = json!({
        "id": "e2",
        "_id": "internal-7",
        "MMUserId": "mm-42",
        "trip": {
            "_id": "t9",
            "externalId": "ext-9",
            "createdAt": "2024-02-01T08:00:00Z",
            "updatedAt": "2024-02-01T09:15:30.250Z",
            "startedAt": "2024-02-01T08:05:00Z",
            "MMUserId": "mm-43"
        }
    });

    let record = normalize(&payload, now()).expect("normalize");

    assert_eq!(record.user_id.as_deref(), Some("internal-7"));
    assert_eq!(record.mm_user_id.as_deref(), Some("mm-42"));
    assert_eq!(record.trip_external_id.as_deref(), Some("ext-9"));
    assert_eq!(record.trip_created_at.as_deref(), Some("2024-02-01 08:00:00"));
    assert_eq!(record.trip_updated_at.as_deref(), Some("2024-02-01 09:15:30.250"));
    assert_eq!(record.trip_started_at.as_deref(), Some("2024-02-01 08:05:00"));
    assert_eq!(record.trip_mm_user_id.as_deref(), Some("mm-43"));
    assert_eq!(record.route_session_type, None);
}

#[test]
fn missing_trip_leaves_trip_fields_null() {
    for payload in [json!({"id": "e3"}), json!({"id": "e3", "trip": null}), json!({"id": "e3", "trip": "t1"})] {
        let record = normalize(&payload, now()).expect("normalize");
        assert_eq!(record.trip_id, None);
        assert_eq!(record.trip_external_id, None);
        assert_eq!(record.trip_created_at, None);
        assert_eq!(record.trip_updated_at, None);
        assert_eq!(record.trip_started_at, None);
        assert_eq!(record.trip_mm_user_id, None);
        assert_eq!(record.route_session_type, None);
    }
}

#[test]
fn empty_event_still_gets_processing_instants() {
    let record = normalize(&json!({}), now()).expect("normalize");

    assert_eq!(record.id, None);
    assert!(!record.live);
    assert_eq!(record.created_at, None);
    assert_eq!(record.latitude, None);
    assert_eq!(record.longitude, None);
    assert_eq!(record.process_timestamp, now());
    assert_eq!(record.process_hour, at("2024-03-09T14:00:00Z"));
}

#[test]
fn non_object_payload_normalizes_to_empty_record() {
    let record = normalize(&json!(["not", "an", "event"]), now()).expect("normalize");
    assert_eq!(record.id, None);
    assert_eq!(record.event_type, None);
}

#[test]
fn live_is_true_only_for_exact_flag() {
    let cases = [
        (json!("TRUE"), true),
        (json!("true"), false),
        (json!("1"), false),
        (json!(true), false),
        (Value::Null, false),
    ];
    for (flag, expected) in cases {
        let record = normalize(&json!({"id": "e4", "live": flag}), now()).expect("normalize");
        assert_eq!(record.live, expected, "flag {flag}");
    }

    let missing = normalize(&json!({"id": "e4"}), now()).expect("normalize");
    assert!(!missing.live);
}

#[test]
fn blank_coordinates_are_null() {
    for blank in [json!(""), json!(" "), Value::Null] {
        let record = normalize(&with_coordinates(blank.clone(), blank), now()).expect("normalize");
        assert_eq!(record.latitude, None);
        assert_eq!(record.longitude, None);
    }

    let absent = normalize(&json!({"id": "e5", "location": {}}), now()).expect("normalize");
    assert_eq!(absent.latitude, None);
    assert_eq!(absent.longitude, None);
}

#[test]
fn coordinates_are_independently_nullable() {
    let record = normalize(&with_coordinates(json!("12.5"), json!("")), now()).expect("normalize");
    assert_eq!(record.latitude, Some(12.5));
    assert_eq!(record.longitude, None);

    let record = normalize(&with_coordinates(Value::Null, json!(-8)), now()).expect("normalize");
    assert_eq!(record.latitude, None);
    assert_eq!(record.longitude, Some(-8.0));
}

#[test]
fn unparsable_coordinate_is_malformed() {
    let err = normalize(&with_coordinates(json!("abc"), json!("1.0")), now())
        .expect_err("abc is not a coordinate");
    assert!(matches!(err, IngestError::MalformedInput { field: "latitude", .. }), "{err}");

    let err = normalize(&with_coordinates(json!("1.0"), json!("  ")), now())
        .expect_err("wider whitespace is not blank");
    assert!(matches!(err, IngestError::MalformedInput { field: "longitude", .. }), "{err}");

    let err = normalize(&with_coordinates(json!({"deg": 1}), json!("1.0")), now())
        .expect_err("objects are not coordinates");
    assert!(matches!(err, IngestError::MalformedInput { field: "latitude", .. }), "{err}");
}

#[test]
fn padded_coordinate_strings_parse() {
    let record = normalize(&with_coordinates(json!(" 40.5 "), json!("-73.25")), now()).expect("normalize");
    assert_eq!(record.latitude, Some(40.5));
    assert_eq!(record.longitude, Some(-73.25));
}

#[test]
fn timestamps_are_canonicalized() {
    assert_eq!(canonical_timestamp("2024-01-05T10:30:00Z"), "2024-01-05 10:30:00");
    assert_eq!(canonical_timestamp("2024-01-05 10:30:00"), "2024-01-05 10:30:00");
    assert_eq!(canonical_timestamp("2024-01-05T10:30:00.5"), "2024-01-05 10:30:00.5");

    let record = normalize(&json!({"id": "e6", "created_at": ""}), now()).expect("normalize");
    assert_eq!(record.created_at, None);

    let record = normalize(&json!({"id": "e6"}), now()).expect("normalize");
    assert_eq!(record.created_at, None);
}

#[test]
fn unparsable_timestamp_is_malformed() {
    let err = normalize(&json!({"id": "e2", "created_at": "yesterday-ish"}), now())
        .expect_err("not a timestamp");
    assert!(matches!(err, IngestError::MalformedInput { field: "created_at", .. }), "{err}");

    let err = normalize(&json!({"id": "e2", "trip": {"updatedAt": "2024-02-30T10:00:00Z"}}), now())
        .expect_err("no such date");
    assert!(matches!(err, IngestError::MalformedInput { field: "trip_updated_at", .. }), "{err}");
}

#[test]
fn accepted_timestamp_forms_are_not_shifted() {
    for valid in [
        "2024-01-05 10:30:00",
        "2024-01-05 10:30:00.250",
        "2024-01-05 10:30",
        "2024-01-05",
        "2024-01-05 10:30:00+02:00",
    ] {
        assert!(is_valid_timestamp(valid), "{valid}");
    }
    for invalid in ["yesterday-ish", "10:30:00", "2024-13-01 00:00:00", " "] {
        assert!(!is_valid_timestamp(invalid), "{invalid}");
    }

    let record = normalize(&json!({"id": "e2", "created_at": "2024-01-05T10:30:00+02:00"}), now())
        .expect("normalize");
    assert_eq!(record.created_at.as_deref(), Some("2024-01-05 10:30:00+02:00"));
}

#[test]
fn non_string_timestamp_is_malformed() {
    let err = normalize(&json!({"id": "e7", "trip": {"startedAt": 1704450600}}), now())
        .expect_err("numeric timestamp");
    assert!(matches!(err, IngestError::MalformedInput { field: "trip_started_at", .. }), "{err}");
}

#[test]
fn scalar_identifiers_are_rendered_as_text() {
    let record = normalize(&json!({"id": 1234, "type": true}), now()).expect("normalize");
    assert_eq!(record.id.as_deref(), Some("1234"));
    assert_eq!(record.event_type.as_deref(), Some("true"));

    let err = normalize(&json!({"id": ["e8"]}), now()).expect_err("array id");
    assert!(matches!(err, IngestError::MalformedInput { field: "id", .. }), "{err}");
}

#[test]
fn hour_bucket_zeroes_sub_hour_components() {
    let instants = [
        now(),
        at("2024-03-09T14:00:00Z"),
        at("2024-12-31T23:59:59.999999999Z"),
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 30, 0).single().expect("valid"),
    ];
    for instant in instants {
        let bucket = hour_bucket(instant);
        assert!(bucket <= instant);
        assert_eq!(bucket.minute(), 0);
        assert_eq!(bucket.second(), 0);
        assert_eq!(bucket.nanosecond(), 0);
        assert_eq!(bucket.hour(), instant.hour());
        assert_eq!(bucket.date_naive(), instant.date_naive());
        assert!(instant - bucket < chrono::TimeDelta::hours(1));
    }
}

#[test]
fn record_process_fields_follow_now() {
    let current = Utc::now();
    let record = normalize(&json!({"id": "e9"}), current).expect("normalize");
    assert_eq!(record.process_timestamp, current);
    assert_eq!(record.process_hour, hour_bucket(current));
    assert!(record.process_hour <= record.process_timestamp);
}
