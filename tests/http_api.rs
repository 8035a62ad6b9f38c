//! End-to-end pipeline tests against mocked Qdrant and Ollama backends.
//!
//! A single mock server stands in for both services; the shared process-wide
//! configuration points at it once, and each test works with its own collection
//! name so mock expectations stay independent.

use axum::{
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode},
};
use httpmock::{Method::GET, Method::POST, Method::PUT, MockServer};
use ragserver::{
    api,
    config::{CONFIG, Config, EmbeddingProvider},
    pdf::PageText,
    processing::{ProcessingService, RetrieveError},
};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::OnceCell;

static MOCK_SERVER: OnceCell<&'static MockServer> = OnceCell::const_new();

async fn harness() -> &'static MockServer {
    MOCK_SERVER
        .get_or_init(|| async {
            let server: &'static MockServer = Box::leak(Box::new(MockServer::start_async().await));
            let _ = CONFIG.set(Config {
                qdrant_url: server.base_url(),
                qdrant_api_key: None,
                embedding_provider: EmbeddingProvider::Ollama,
                embedding_model: "nomic-embed-text".into(),
                embedding_dimension: 4,
                ollama_url: Some(server.base_url()),
                openai_api_key: None,
                openai_base_url: None,
                // Large enough that each extracted page becomes exactly one chunk.
                text_splitter_chunk_size: Some(512),
                text_splitter_chunk_overlap: Some(0),
                uploads_dir: std::env::temp_dir().join("ragserver-int-tests"),
                server_port: None,
                retrieve_max_top_k: 50,
            });
            server
        })
        .await
}

#[tokio::test]
async fn ingest_pages_chunks_embeds_and_indexes() {
    let server = harness().await;
    let service = ProcessingService::new();

    let exists = server
        .mock_async(|when, then| {
            when.method(GET).path("/collections/rag_ingest_0");
            then.status(404).body("not found");
        })
        .await;
    let create = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/collections/rag_ingest_0")
                .body_contains("\"size\":4")
                .body_contains("Cosine");
            then.status(200).json_body(json!({ "result": true }));
        })
        .await;
    let embed = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/embed")
                .body_contains("ingest alpha text");
            then.status(200).json_body(json!({
                "model": "nomic-embed-text",
                "embeddings": [[0.1, 0.2, 0.3, 0.4], [0.5, 0.6, 0.7, 0.8]]
            }));
        })
        .await;
    let upsert = server
        .mock_async(|when, then| {
            when.method(PUT)
                .path("/collections/rag_ingest_0/points")
                .query_param("wait", "true")
                .body_contains("\"filename\":\"manual.pdf\"")
                .body_contains("\"page_number\":2");
            then.status(200).json_body(json!({
                "result": { "operation_id": 0, "status": "completed" }
            }));
        })
        .await;

    let pages = vec![
        PageText {
            page_number: 1,
            text: "ingest alpha text".into(),
        },
        PageText {
            page_number: 2,
            text: "ingest beta text".into(),
        },
    ];
    let outcome = service
        .ingest_pages("rag_ingest_0", "manual.pdf", pages)
        .await
        .expect("ingest pipeline");

    exists.assert();
    create.assert();
    embed.assert();
    upsert.assert();
    assert_eq!(outcome.chunks_indexed, 2);
}

#[tokio::test]
async fn retrieve_maps_qdrant_hits_to_sources() {
    let server = harness().await;
    let service = ProcessingService::new();

    server
        .mock_async(|when, then| {
            when.method(GET).path("/collections/rag_retrieve_0");
            then.status(200).json_body(json!({ "result": {} }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/embed")
                .body_contains("where is the appendix");
            then.status(200).json_body(json!({
                "embeddings": [[0.9, 0.1, 0.0, 0.0]]
            }));
        })
        .await;
    let query = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/collections/rag_retrieve_0/points/query")
                .body_contains("\"limit\":2");
            then.status(200).json_body(json!({
                "result": {
                    "points": [
                        {
                            "id": "11111111-1111-1111-1111-111111111111",
                            "score": 0.93,
                            "payload": {
                                "chunk_id": "11111111-1111-1111-1111-111111111111",
                                "filename": "manual.pdf",
                                "page_number": 7,
                                "chunk_index": 12,
                                "text": "See appendix B."
                            }
                        },
                        {
                            "id": "22222222-2222-2222-2222-222222222222",
                            "score": 0.58,
                            "payload": {
                                "filename": "manual.pdf",
                                "page_number": 2,
                                "text": "Earlier mention."
                            }
                        }
                    ]
                }
            }));
        })
        .await;

    let sources = service
        .retrieve("rag_retrieve_0", "where is the appendix", 2)
        .await
        .expect("retrieve pipeline");

    query.assert();
    assert_eq!(sources.len(), 2);
    assert_eq!(sources[0].id, "11111111-1111-1111-1111-111111111111");
    assert_eq!(sources[0].filename, "manual.pdf");
    assert_eq!(sources[0].page_number, 7);
    assert_eq!(sources[0].text_snippet, "See appendix B.");
    assert!(sources[0].score > sources[1].score);
}

#[tokio::test]
async fn retrieve_reports_missing_collection() {
    let server = harness().await;
    let service = ProcessingService::new();

    server
        .mock_async(|when, then| {
            when.method(GET).path("/collections/rag_missing_0");
            then.status(404).body("not found");
        })
        .await;

    let error = service
        .retrieve("rag_missing_0", "anything", 3)
        .await
        .expect_err("missing collection");
    assert!(matches!(error, RetrieveError::CollectionNotFound(name) if name == "rag_missing_0"));
}

#[tokio::test]
async fn collection_text_reassembles_chunks_in_order() {
    let server = harness().await;
    let service = ProcessingService::new();

    server
        .mock_async(|when, then| {
            when.method(GET).path("/collections/rag_text_0");
            then.status(200).json_body(json!({ "result": {} }));
        })
        .await;
    let scroll = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/collections/rag_text_0/points/scroll")
                .body_contains("\"offset\":null");
            then.status(200).json_body(json!({
                "result": {
                    "points": [
                        { "payload": { "page_number": 2, "chunk_index": 1, "text": "second" } },
                        { "payload": { "page_number": 1, "chunk_index": 0, "text": "first" } }
                    ],
                    "next_page_offset": null
                }
            }));
        })
        .await;

    let text = service
        .collection_text("rag_text_0")
        .await
        .expect("text reconstruction");

    scroll.assert();
    assert_eq!(text, "first\n\nsecond");
}

#[tokio::test]
async fn retrieve_endpoint_serves_sources_over_http() {
    use tower::ServiceExt;

    let server = harness().await;
    let app = api::create_router(Arc::new(ProcessingService::new()));

    server
        .mock_async(|when, then| {
            when.method(GET).path("/collections/rag_http_0");
            then.status(200).json_body(json!({ "result": {} }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/embed")
                .body_contains("summarize the findings");
            then.status(200).json_body(json!({
                "embeddings": [[0.2, 0.4, 0.6, 0.8]]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/collections/rag_http_0/points/query");
            then.status(200).json_body(json!({
                "result": [
                    {
                        "id": "33333333-3333-3333-3333-333333333333",
                        "score": 0.77,
                        "payload": {
                            "chunk_id": "33333333-3333-3333-3333-333333333333",
                            "filename": "findings.pdf",
                            "page_number": 1,
                            "text": "Key findings."
                        }
                    }
                ]
            }));
        })
        .await;

    let payload = json!({
        "collection_id": "rag_http_0",
        "question": "summarize the findings"
    });
    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/retrieve/")
                .header("content-type", "application/json")
                .body(Body::from(payload.to_string()))
                .expect("request"),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json body");
    let sources = body["sources"].as_array().expect("sources array");
    assert_eq!(sources.len(), 1);
    assert_eq!(sources[0]["filename"], "findings.pdf");
    assert_eq!(sources[0]["text_snippet"], "Key findings.");
}
