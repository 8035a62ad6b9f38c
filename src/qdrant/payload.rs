//! Helpers for constructing Qdrant payloads.

use crate::qdrant::types::PointInsert;
use serde_json::{Map, Value};
use time::OffsetDateTime;
use uuid::Uuid;

/// Build the payload object stored alongside each indexed chunk.
pub(crate) fn build_payload(chunk_id: &str, point: &PointInsert, timestamp_rfc3339: &str) -> Value {
    let mut payload = Map::new();
    payload.insert("chunk_id".into(), Value::String(chunk_id.to_string()));
    payload.insert("filename".into(), Value::String(point.filename.clone()));
    payload.insert("page_number".into(), Value::from(point.page_number));
    payload.insert("chunk_index".into(), Value::from(point.chunk_index));
    payload.insert(
        "timestamp".into(),
        Value::String(timestamp_rfc3339.to_string()),
    );
    payload.insert("text".into(), Value::String(point.text.clone()));
    Value::Object(payload)
}

/// Current timestamp formatted for payload storage.
pub(crate) fn current_timestamp_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

/// Construct an identifier suitable for Qdrant points.
pub(crate) fn generate_chunk_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_point() -> PointInsert {
        PointInsert {
            text: "sample".into(),
            filename: "report.pdf".into(),
            page_number: 3,
            chunk_index: 7,
            vector: vec![0.0, 1.0],
        }
    }

    #[test]
    fn timestamp_is_rfc3339_like() {
        let ts = current_timestamp_rfc3339();
        assert!(ts.contains('T') && ts.ends_with('Z'));
    }

    #[test]
    fn payload_carries_chunk_metadata() {
        let id = generate_chunk_id();
        let now = "2025-01-01T00:00:00Z";
        let payload = build_payload(&id, &sample_point(), now);
        assert_eq!(payload["chunk_id"], id);
        assert_eq!(payload["filename"], "report.pdf");
        assert_eq!(payload["page_number"], 3);
        assert_eq!(payload["chunk_index"], 7);
        assert_eq!(payload["timestamp"], now);
        assert_eq!(payload["text"], "sample");
    }

    #[test]
    fn chunk_ids_are_unique() {
        assert_ne!(generate_chunk_id(), generate_chunk_id());
    }
}
