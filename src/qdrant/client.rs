//! HTTP client wrapper for interacting with Qdrant.

use crate::config::get_config;
use crate::qdrant::{
    payload::{build_payload, current_timestamp_rfc3339, generate_chunk_id},
    types::{
        ListCollectionsResponse, PointInsert, QdrantError, QueryResponse, QueryResponseResult,
        ScoredPoint, ScrollResponse,
    },
};
use reqwest::{Client, Method, StatusCode};
use serde_json::{Map, Value, json};

const SCROLL_PAGE_LIMIT: usize = 512;

/// Lightweight HTTP client for Qdrant operations.
pub struct QdrantService {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) api_key: Option<String>,
}

impl QdrantService {
    /// Construct a new client using configuration derived from the environment.
    pub fn new() -> Result<Self, QdrantError> {
        let config = get_config();
        let client = Client::builder().user_agent("rag-server/0.1").build()?;

        let base_url = normalize_base_url(&config.qdrant_url).map_err(QdrantError::InvalidUrl)?;
        tracing::debug!(
            url = %base_url,
            has_api_key = %config
                .qdrant_api_key
                .as_deref()
                .map(|value| !value.is_empty())
                .unwrap_or(false),
            "Initialized Qdrant HTTP client"
        );

        Ok(Self {
            client,
            base_url,
            api_key: config.qdrant_api_key.clone(),
        })
    }

    /// Check whether a collection is present in Qdrant.
    pub async fn collection_exists(&self, collection_name: &str) -> Result<bool, QdrantError> {
        let response = self
            .request(Method::GET, &format!("collections/{collection_name}"))?
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => {
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection = collection_name, error = %error, "Collection existence check failed");
                Err(error)
            }
        }
    }

    /// Create a collection only when it is missing from Qdrant.
    pub async fn create_collection_if_not_exists(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        if self.collection_exists(collection_name).await? {
            return Ok(());
        }

        tracing::debug!(
            collection = collection_name,
            vector_size,
            "Creating collection"
        );
        self.create_collection(collection_name, vector_size).await
    }

    /// Create or update a collection with the specified vector size.
    pub async fn create_collection(
        &self,
        collection_name: &str,
        vector_size: u64,
    ) -> Result<(), QdrantError> {
        let body = json!({
            "vectors": {
                "size": vector_size,
                "distance": "Cosine"
            }
        });

        let response = self
            .request(Method::PUT, &format!("collections/{collection_name}"))?
            .json(&body)
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(collection = collection_name, "Collection ensured/created");
        })
        .await
    }

    /// Retrieve the names of all collections present in Qdrant.
    pub async fn list_collections(&self) -> Result<Vec<String>, QdrantError> {
        let response = self.request(Method::GET, "collections")?.send().await?;

        if response.status().is_success() {
            let payload: ListCollectionsResponse = response.json().await?;
            let names = payload
                .result
                .collections
                .into_iter()
                .map(|collection| collection.name)
                .collect();
            Ok(names)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Failed to list collections");
            Err(error)
        }
    }

    /// Upload new vectors to the given collection, returning the number indexed.
    pub async fn index_points(
        &self,
        collection_name: &str,
        points: Vec<PointInsert>,
    ) -> Result<usize, QdrantError> {
        if points.is_empty() {
            return Ok(0);
        }

        let now = current_timestamp_rfc3339();
        let serialized: Vec<_> = points
            .iter()
            .map(|point| {
                let chunk_id = generate_chunk_id();
                let payload = build_payload(&chunk_id, point, &now);
                json!({
                    "id": chunk_id,
                    "vector": point.vector,
                    "payload": payload,
                })
            })
            .collect();

        let point_count = serialized.len();
        let response = self
            .request(
                Method::PUT,
                &format!("collections/{collection_name}/points"),
            )?
            .query(&[("wait", true)])
            .json(&json!({ "points": serialized }))
            .send()
            .await?;

        self.ensure_success(response, || {
            tracing::debug!(
                collection = collection_name,
                points = point_count,
                "Points indexed"
            );
        })
        .await?;

        Ok(point_count)
    }

    /// Perform a similarity search against a collection, returning scored payloads.
    pub async fn search_points(
        &self,
        collection_name: &str,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<ScoredPoint>, QdrantError> {
        let body = json!({
            "query": vector,
            "limit": limit,
            "with_payload": true,
        });

        let response = self
            .request(
                Method::POST,
                &format!("collections/{collection_name}/points/query"),
            )?
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(collection = collection_name, error = %error, "Qdrant search failed");
            return Err(error);
        }

        let payload: QueryResponse = response.json().await?;
        let points = match payload.result {
            QueryResponseResult::Points(points) => points,
            QueryResponseResult::Object { points, .. } => points,
        };
        let results = points
            .into_iter()
            .map(|point| ScoredPoint {
                id: stringify_point_id(point.id),
                score: point.score,
                payload: point.payload,
            })
            .collect();

        Ok(results)
    }

    /// Retrieve every payload stored in a collection via the scroll API.
    pub async fn scroll_payloads(
        &self,
        collection: &str,
        with_payload: Value,
    ) -> Result<Vec<Map<String, Value>>, QdrantError> {
        let mut offset: Option<Value> = None;
        let mut payloads = Vec::new();

        loop {
            let body = json!({
                "with_payload": with_payload.clone(),
                "with_vector": false,
                "limit": SCROLL_PAGE_LIMIT,
                "offset": offset.clone().unwrap_or(Value::Null),
            });

            let response = self
                .request(
                    Method::POST,
                    &format!("collections/{collection}/points/scroll"),
                )?
                .json(&body)
                .send()
                .await?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                let error = QdrantError::UnexpectedStatus { status, body };
                tracing::error!(collection, error = %error, "Failed to scroll payloads");
                return Err(error);
            }

            let ScrollResponse { result } = response.json().await?;
            for point in result.points {
                if let Some(payload) = point.payload {
                    payloads.push(payload);
                }
            }

            match result.next_page_offset {
                Some(next) if !next.is_null() => offset = Some(next),
                _ => break,
            }
        }

        Ok(payloads)
    }

    fn request(&self, method: Method, path: &str) -> Result<reqwest::RequestBuilder, QdrantError> {
        let url = format_endpoint(&self.base_url, path);
        let mut req = self.client.request(method, url);
        if let Some(api_key) = &self.api_key
            && !api_key.is_empty()
        {
            req = req.header("api-key", api_key);
        }
        Ok(req)
    }

    async fn ensure_success<F>(
        &self,
        response: reqwest::Response,
        on_success: F,
    ) -> Result<(), QdrantError>
    where
        F: FnOnce(),
    {
        if response.status().is_success() {
            on_success();
            Ok(())
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let error = QdrantError::UnexpectedStatus { status, body };
            tracing::error!(error = %error, "Qdrant request failed");
            Err(error)
        }
    }
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}

fn stringify_point_id(id: Value) -> String {
    match id {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Object(map) => map
            .get("uuid")
            .map(|value| match value {
                Value::String(uuid) => uuid.clone(),
                other => other.to_string(),
            })
            .unwrap_or_else(|| Value::Object(map).to_string()),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, Method::POST, Method::PUT, MockServer};
    use reqwest::Client;

    fn service_for(server: &MockServer) -> QdrantService {
        QdrantService {
            client: Client::builder()
                .user_agent("rag-server-test")
                .build()
                .expect("client"),
            base_url: server.base_url(),
            api_key: None,
        }
    }

    #[tokio::test]
    async fn search_points_parses_scored_results() {
        let server = MockServer::start_async().await;
        let service = service_for(&server);

        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/demo/points/query");
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": [
                        {
                            "id": "chunk-1",
                            "score": 0.42,
                            "payload": {
                                "text": "Example",
                                "filename": "report.pdf",
                                "page_number": 2
                            }
                        }
                    ]
                }));
            })
            .await;

        let results = service
            .search_points("demo", vec![0.1, 0.2], 3)
            .await
            .expect("search request");

        mock.assert();

        assert_eq!(results.len(), 1);
        let hit = &results[0];
        assert_eq!(hit.id, "chunk-1");
        assert!((hit.score - 0.42).abs() < f32::EPSILON);
        let payload = hit.payload.as_ref().expect("payload");
        assert_eq!(payload["filename"], Value::String("report.pdf".into()));
        assert_eq!(payload["page_number"], Value::from(2));
    }

    #[tokio::test]
    async fn list_collections_returns_names() {
        let server = MockServer::start_async().await;
        let service = service_for(&server);

        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/collections");
                then.status(200).json_body(json!({
                    "status": "ok",
                    "time": 0.0,
                    "result": {
                        "collections": [
                            { "name": "rag_manual_0" },
                            { "name": "rag_report_1724600000" }
                        ]
                    }
                }));
            })
            .await;

        let names = service.list_collections().await.expect("list request");

        mock.assert();
        assert_eq!(names, vec!["rag_manual_0", "rag_report_1724600000"]);
    }

    #[tokio::test]
    async fn collection_exists_maps_status_codes() {
        let server = MockServer::start_async().await;
        let service = service_for(&server);

        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/present");
                then.status(200).json_body(json!({ "result": {} }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/absent");
                then.status(404).body("not found");
            })
            .await;

        assert!(service.collection_exists("present").await.expect("present"));
        assert!(!service.collection_exists("absent").await.expect("absent"));
    }

    #[tokio::test]
    async fn index_points_upserts_with_wait() {
        let server = MockServer::start_async().await;
        let service = service_for(&server);

        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/demo/points")
                    .query_param("wait", "true")
                    .body_contains("\"page_number\":1");
                then.status(200).json_body(json!({
                    "status": "ok",
                    "result": { "operation_id": 0, "status": "completed" }
                }));
            })
            .await;

        let indexed = service
            .index_points(
                "demo",
                vec![PointInsert {
                    text: "chunk".into(),
                    filename: "doc.pdf".into(),
                    page_number: 1,
                    chunk_index: 0,
                    vector: vec![0.5, 0.5],
                }],
            )
            .await
            .expect("index request");

        mock.assert();
        assert_eq!(indexed, 1);
    }

    #[tokio::test]
    async fn scroll_payloads_follows_pagination() {
        let server = MockServer::start_async().await;
        let service = service_for(&server);

        let first = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/demo/points/scroll")
                    .body_contains("\"offset\":null");
                then.status(200).json_body(json!({
                    "result": {
                        "points": [
                            { "payload": { "chunk_index": 0, "text": "first" } }
                        ],
                        "next_page_offset": { "offset": 1 }
                    }
                }));
            })
            .await;

        let second = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/demo/points/scroll")
                    .body_contains("\"offset\":{\"offset\":1}");
                then.status(200).json_body(json!({
                    "result": {
                        "points": [
                            { "payload": { "chunk_index": 1, "text": "second" } }
                        ],
                        "next_page_offset": null
                    }
                }));
            })
            .await;

        let payloads = service
            .scroll_payloads("demo", json!(["text", "chunk_index"]))
            .await
            .expect("scroll");

        first.assert();
        second.assert();
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[0]["text"], Value::String("first".into()));
        assert_eq!(payloads[1]["text"], Value::String("second".into()));
    }
}
