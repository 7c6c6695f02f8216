//! Field-tolerant reads from structured documents.
//!
//! Every accessor returns the zero value of its type when the field is
//! missing or has the wrong shape. Inbound documents come from peers over a
//! lossy transport, so a bad field must degrade the value, never the receiver.

use serde_json::Value;

static NULL: Value = Value::Null;

pub fn field<'a>(doc: &'a Value, key: &str) -> &'a Value {
    doc.get(key).unwrap_or(&NULL)
}

pub fn int(doc: &Value, key: &str) -> i64 {
    field(doc, key).as_i64().unwrap_or(0)
}

/// Non-negative integer; negative values read as zero.
pub fn uint(doc: &Value, key: &str) -> u64 {
    field(doc, key).as_u64().unwrap_or(0)
}

pub fn float(doc: &Value, key: &str) -> f64 {
    field(doc, key).as_f64().unwrap_or(0.0)
}

pub fn boolean(doc: &Value, key: &str) -> bool {
    field(doc, key).as_bool().unwrap_or(false)
}

pub fn string(doc: &Value, key: &str) -> String {
    field(doc, key).as_str().unwrap_or_default().to_string()
}

pub fn array<'a>(doc: &'a Value, key: &str) -> &'a [Value] {
    field(doc, key).as_array().map(Vec::as_slice).unwrap_or(&[])
}

/// The `type` tag of a message document, if it carries one.
pub fn type_tag(doc: &Value) -> Option<&str> {
    doc.get("type").and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_present_fields_read_through() {
        let doc = json!({"n": 7, "f": 1.5, "b": true, "s": "hi", "a": [1, 2]});
        assert_eq!(int(&doc, "n"), 7);
        assert_eq!(uint(&doc, "n"), 7);
        assert_eq!(float(&doc, "f"), 1.5);
        assert!(boolean(&doc, "b"));
        assert_eq!(string(&doc, "s"), "hi");
        assert_eq!(array(&doc, "a").len(), 2);
    }

    #[test]
    fn test_missing_fields_are_zero() {
        let doc = json!({});
        assert_eq!(int(&doc, "n"), 0);
        assert_eq!(float(&doc, "f"), 0.0);
        assert!(!boolean(&doc, "b"));
        assert_eq!(string(&doc, "s"), "");
        assert!(array(&doc, "a").is_empty());
    }

    #[test]
    fn test_wrong_shapes_are_zero() {
        let doc = json!({"n": "seven", "u": -3, "b": 1, "s": 5, "a": {"x": 1}});
        assert_eq!(int(&doc, "n"), 0);
        assert_eq!(uint(&doc, "u"), 0);
        assert!(!boolean(&doc, "b"));
        assert_eq!(string(&doc, "s"), "");
        assert!(array(&doc, "a").is_empty());
    }

    #[test]
    fn test_non_object_document() {
        let doc = json!([1, 2, 3]);
        assert_eq!(int(&doc, "n"), 0);
        assert_eq!(type_tag(&doc), None);
        assert_eq!(type_tag(&json!({"type": "chat"})), Some("chat"));
        assert_eq!(type_tag(&json!({"type": 3})), None);
    }
}
