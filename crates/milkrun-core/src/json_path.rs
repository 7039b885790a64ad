//! Absence-tolerant lookups into loosely-typed JSON payloads.

use serde_json::Value;

/// Walks `path` through nested objects, returning `None` as soon as a segment
/// is missing or an intermediate value is not an object.
///
/// A present JSON `null` at the end of the path is also reported as `None`,
/// so callers only ever see concrete values.
pub fn lookup<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = root;
    for segment in path {
        current = current.as_object()?.get(*segment)?;
    }
    match current {
        Value::Null => None,
        value => Some(value),
    }
}

#[cfg(test)]
mod tests {
    use super::lookup;
    use serde_json::json;

    #[test]
    fn resolves_nested_values() {
        let event = json!({"trip": {"metadata": {"route_session_type": "milk_run"}}});
        let value = lookup(&event, &["trip", "metadata", "route_session_type"]);
        assert_eq!(value, Some(&json!("milk_run")));
    }

    #[test]
    fn missing_intermediate_is_absent() {
        let event = json!({"trip": {"_id": "t1"}});
        assert!(lookup(&event, &["trip", "metadata", "route_session_type"]).is_none());
        assert!(lookup(&event, &["location", "coordinates", "latitude"]).is_none());
    }

    #[test]
    fn non_object_intermediate_is_absent() {
        let event = json!({"trip": "t1", "location": [1, 2]});
        assert!(lookup(&event, &["trip", "_id"]).is_none());
        assert!(lookup(&event, &["location", "coordinates"]).is_none());
        assert!(lookup(&json!("scalar"), &["id"]).is_none());
    }

    #[test]
    fn explicit_null_is_absent() {
        let event = json!({"trip": null, "id": null});
        assert!(lookup(&event, &["trip", "_id"]).is_none());
        assert!(lookup(&event, &["id"]).is_none());
    }

    #[test]
    fn empty_path_returns_root() {
        let event = json!({"id": "e1"});
        assert_eq!(lookup(&event, &[]), Some(&event));
    }
}
