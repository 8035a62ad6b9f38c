//! Mapping helpers between Qdrant payloads and API-facing records.

use crate::{processing::types::Source, qdrant::ScoredPoint};
use serde_json::{Map, Value};

/// Map a Qdrant scored point into a retrieval source record.
pub(crate) fn map_scored_point(point: ScoredPoint) -> Source {
    let ScoredPoint { id, score, payload } = point;

    let mut chunk_id = None;
    let mut filename = String::from("Unknown");
    // Points indexed without page metadata are reported as page 1.
    let mut page_number = 1;
    let mut text_snippet = String::new();

    if let Some(mut map) = payload {
        if let Some(Value::String(value)) = map.remove("chunk_id") {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                chunk_id = Some(trimmed.to_string());
            }
        }
        if let Some(Value::String(value)) = map.remove("filename") {
            let trimmed = value.trim();
            if !trimmed.is_empty() {
                filename = trimmed.to_string();
            }
        }
        if let Some(value) = map.remove("page_number")
            && let Some(number) = value.as_u64()
        {
            page_number = number as usize;
        }
        if let Some(Value::String(value)) = map.remove("text") {
            text_snippet = value;
        }
    }

    Source {
        id: chunk_id.unwrap_or(id),
        filename,
        page_number,
        score,
        text_snippet,
    }
}

/// Reconstruct document text by concatenating stored chunks in extraction order.
///
/// The original upload is never retained, so this is a lossy reconstruction: overlap
/// regions appear twice. Chunks are ordered by page, then by their document-wide index.
pub(crate) fn assemble_document_text(payloads: Vec<Map<String, Value>>) -> String {
    let mut chunks: Vec<(u64, u64, String)> = payloads
        .into_iter()
        .filter_map(|mut map| {
            let text = match map.remove("text") {
                Some(Value::String(text)) if !text.trim().is_empty() => text,
                _ => return None,
            };
            let page = map.get("page_number").and_then(Value::as_u64).unwrap_or(0);
            let index = map.get("chunk_index").and_then(Value::as_u64).unwrap_or(0);
            Some((page, index, text))
        })
        .collect();

    chunks.sort_by_key(|(page, index, _)| (*page, *index));
    chunks
        .into_iter()
        .map(|(_, _, text)| text)
        .collect::<Vec<_>>()
        .join("\n\n")
}
