// Schema validation tests for the collector wire format
//
// Events built by the library, and hand-written JSON values, are checked
// against schemas/event.schema.json.

use chrono::{TimeZone, Utc};
use envisalink_tpi::Event;
use serde_json::json;

fn build_validator() -> jsonschema::Validator {
    let path = format!("{}/schemas/event.schema.json", env!("CARGO_MANIFEST_DIR"));
    let text = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read schema {path}: {e}"));
    let schema: serde_json::Value = serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("Failed to parse schema {path}: {e}"));
    jsonschema::validator_for(&schema)
        .unwrap_or_else(|e| panic!("Failed to compile schema {path}: {e}"))
}

fn validate(instance: &serde_json::Value) {
    let validator = build_validator();
    let errors: Vec<String> = validator
        .iter_errors(instance)
        .map(|e| format!("  - {e}"))
        .collect();
    if !errors.is_empty() {
        panic!(
            "Schema validation failed:\n{}\nInstance: {}",
            errors.join("\n"),
            serde_json::to_string_pretty(instance).unwrap()
        );
    }
}

fn validate_fails(instance: &serde_json::Value) {
    assert!(
        !build_validator().is_valid(instance),
        "Expected schema validation to fail, but it passed.\nInstance: {}",
        serde_json::to_string_pretty(instance).unwrap()
    );
}

#[test]
fn test_library_event_matches_schema() {
    let received = Utc.timestamp_opt(1_700_000_000, 42_000).unwrap();
    let event = Event::new(received, "609001", "TPI", "192.168.1.50:4025");
    let value = serde_json::to_value(&event).unwrap();

    assert_eq!(value["event_unixtime"], "1700000000.000042");
    validate(&value);
}

#[test]
fn test_application_event_matches_schema() {
    let event = Event::new(
        Utc::now(),
        "INFO envisalink_tpi::client: Authenticated",
        "Application",
        "10.0.0.5:4025",
    );
    validate(&serde_json::to_value(&event).unwrap());
}

#[test]
fn test_handwritten_event() {
    validate(&json!({
        "event_id": "3f1c2a9e-5b7d-4c21-9a0e-6d2f8b1c4e77",
        "event_unixtime": "1697712000.123456",
        "event_message": "510020",
        "message_type": "TPI",
        "system_id": "10.0.0.5:4025"
    }));
}

#[test]
fn test_rejects_missing_field() {
    validate_fails(&json!({
        "event_id": "3f1c2a9e-5b7d-4c21-9a0e-6d2f8b1c4e77",
        "event_unixtime": "1697712000.123456",
        "event_message": "510020",
        "message_type": "TPI"
    }));
}

#[test]
fn test_rejects_numeric_unixtime() {
    validate_fails(&json!({
        "event_id": "3f1c2a9e-5b7d-4c21-9a0e-6d2f8b1c4e77",
        "event_unixtime": 1697712000.123456,
        "event_message": "510020",
        "message_type": "TPI",
        "system_id": "10.0.0.5:4025"
    }));
}

#[test]
fn test_rejects_short_fraction() {
    validate_fails(&json!({
        "event_id": "3f1c2a9e-5b7d-4c21-9a0e-6d2f8b1c4e77",
        "event_unixtime": "1697712000.123",
        "event_message": "510020",
        "message_type": "TPI",
        "system_id": "10.0.0.5:4025"
    }));
}

#[test]
fn test_rejects_extra_field() {
    validate_fails(&json!({
        "event_id": "3f1c2a9e-5b7d-4c21-9a0e-6d2f8b1c4e77",
        "event_unixtime": "1697712000.123456",
        "event_message": "510020",
        "message_type": "TPI",
        "system_id": "10.0.0.5:4025",
        "severity": "info"
    }));
}
