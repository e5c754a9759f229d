//! Weaviate vector index backend.
//!
//! Provides [`WeaviateVectorIndex`], which implements [`VectorIndex`] over
//! Weaviate's REST and GraphQL endpoints. Vectors are always supplied by the
//! caller, so classes are created with `vectorizer: "none"`.
//!
//! Index names map to Weaviate class names, which must start with an
//! uppercase letter: `documents` is stored as class `Documents`.
//!
//! # Example
//!
//! ```rust,ignore
//! use docrag::weaviate::{WeaviateConfig, WeaviateVectorIndex};
//!
//! let index = WeaviateVectorIndex::new(WeaviateConfig::new("http", "localhost:8080"))?;
//! index.ensure_schema("Documents", 1536).await?;
//! index.upsert("Documents", chunks).await?;
//! let count = index.count("Documents").await?;
//! ```

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, error, info};

use crate::document::{Chunk, EmbeddedChunk, ScoredChunk};
use crate::error::{RagError, Result};
use crate::vectorstore::{SchemaStatus, VectorIndex};

const BACKEND: &str = "weaviate";

/// Fields stored on every object and read back on retrieval.
const RETURN_FIELDS: &str = "text source_path chunk_index overlap_with_previous format";

/// Connection settings for a Weaviate instance.
#[derive(Debug, Clone)]
pub struct WeaviateConfig {
    /// `http` or `https`.
    pub scheme: String,
    /// Host and optional port, e.g. `localhost:8080`.
    pub host: String,
    /// Optional API key sent as a bearer token.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl WeaviateConfig {
    /// Settings for `scheme://host` with no API key and a 30 second timeout.
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
        }
    }

    /// Set the API key.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn base_url(&self) -> String {
        format!("{}://{}", self.scheme, self.host.trim_end_matches('/'))
    }
}

/// A [`VectorIndex`] backed by [Weaviate](https://weaviate.io/).
///
/// One HTTP client is created up front and reused for every call, so a
/// single instance can be shared (behind an `Arc`) by ingestion and query.
pub struct WeaviateVectorIndex {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl WeaviateVectorIndex {
    /// Create a client for the configured instance.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if the scheme is not `http`/`https`, the
    /// host is empty, or the HTTP client cannot be built.
    pub fn new(config: WeaviateConfig) -> Result<Self> {
        if !matches!(config.scheme.as_str(), "http" | "https") {
            return Err(RagError::Config(format!(
                "weaviate scheme must be http or https, got '{}'",
                config.scheme
            )));
        }
        if config.host.trim().is_empty() {
            return Err(RagError::Config("weaviate host is required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RagError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url: config.base_url(), api_key: config.api_key })
    }

    fn map_err(message: impl Into<String>) -> RagError {
        RagError::Index { backend: BACKEND.to_string(), message: message.into() }
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, format!("{}{path}", self.base_url));
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        builder.send().await.map_err(|e| {
            error!(backend = BACKEND, error = %e, "request failed");
            Self::map_err(format!("request failed: {e}"))
        })
    }

    async fn graphql(&self, query: String) -> Result<Value> {
        let response =
            self.send(self.request(reqwest::Method::POST, "/v1/graphql").json(&json!({ "query": query }))).await?;

        if !response.status().is_success() {
            return Err(Self::map_err(error_body(response).await));
        }

        let body: GraphQlResponse =
            response.json().await.map_err(|e| Self::map_err(format!("failed to parse response: {e}")))?;

        if let Some(errors) = body.errors.filter(|errors| !errors.is_empty()) {
            let message = errors.into_iter().map(|e| e.message).collect::<Vec<_>>().join("; ");
            return Err(Self::map_err(message));
        }
        body.data.ok_or_else(|| Self::map_err("GraphQL response contained no data"))
    }
}

/// Map an index name to a Weaviate class name.
///
/// The first letter is uppercased; the rest must be ASCII alphanumeric or
/// `_`. The check also keeps the name safe to splice into GraphQL.
fn class_name(name: &str) -> Result<String> {
    let mut chars = name.chars();
    let first = chars
        .next()
        .filter(char::is_ascii_alphabetic)
        .ok_or_else(|| RagError::Config(format!("invalid weaviate class name '{name}'")))?;
    let rest = chars.as_str();
    if !rest.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(RagError::Config(format!("invalid weaviate class name '{name}'")));
    }
    Ok(format!("{}{rest}", first.to_ascii_uppercase()))
}

async fn error_body(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    format!("API returned {status}: {body}")
}

fn class_definition(class: &str) -> Value {
    json!({
        "class": class,
        "vectorizer": "none",
        "vectorIndexConfig": { "distance": "cosine" },
        "properties": [
            { "name": "text", "dataType": ["text"] },
            { "name": "source_path", "dataType": ["text"] },
            { "name": "chunk_index", "dataType": ["int"] },
            { "name": "overlap_with_previous", "dataType": ["int"] },
            { "name": "format", "dataType": ["text"] },
        ],
    })
}

#[derive(Serialize)]
struct BatchRequest<'a> {
    objects: Vec<BatchObject<'a>>,
}

#[derive(Serialize)]
struct BatchObject<'a> {
    class: &'a str,
    id: &'a str,
    properties: Value,
    vector: &'a [f32],
}

impl<'a> BatchObject<'a> {
    fn new(class: &'a str, chunk: &'a EmbeddedChunk) -> Self {
        let format = chunk.metadata.get("format").map(String::as_str).unwrap_or_default();
        Self {
            class,
            id: &chunk.id,
            properties: json!({
                "text": chunk.chunk.text,
                "source_path": chunk.chunk.source_path.to_string_lossy(),
                "chunk_index": chunk.chunk.chunk_index,
                "overlap_with_previous": chunk.chunk.overlap_with_previous,
                "format": format,
            }),
            vector: &chunk.vector,
        }
    }
}

#[derive(Deserialize)]
struct BatchObjectResult {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    result: Option<BatchResult>,
}

#[derive(Deserialize)]
struct BatchResult {
    #[serde(default)]
    errors: Option<BatchErrors>,
}

#[derive(Deserialize)]
struct BatchErrors {
    #[serde(default)]
    error: Vec<GraphQlError>,
}

#[derive(Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(default)]
    text: String,
    #[serde(default)]
    source_path: String,
    #[serde(default)]
    chunk_index: usize,
    #[serde(default)]
    overlap_with_previous: usize,
    #[serde(rename = "_additional", default)]
    additional: Additional,
}

#[derive(Deserialize, Default)]
struct Additional {
    #[serde(default)]
    distance: Option<f32>,
}

/// Collect per-object failures from a batch response.
fn batch_failures(results: Vec<BatchObjectResult>) -> Vec<String> {
    results
        .into_iter()
        .filter_map(|object| {
            let errors = object.result?.errors?;
            let message = errors.error.into_iter().map(|e| e.message).collect::<Vec<_>>().join("; ");
            Some(format!("{}: {message}", object.id.unwrap_or_default()))
        })
        .collect()
}

fn near_vector_query(class: &str, vector: &[f32], top_k: usize) -> Result<String> {
    let vector = serde_json::to_string(vector)
        .map_err(|e| WeaviateVectorIndex::map_err(format!("failed to encode vector: {e}")))?;
    Ok(format!(
        "{{ Get {{ {class}(nearVector: {{ vector: {vector} }}, limit: {top_k}) \
         {{ {RETURN_FIELDS} _additional {{ distance }} }} }} }}"
    ))
}

/// Turn `Get` hits into scored chunks. Cosine distance becomes `1 - distance`.
fn parse_hits(data: &Value, class: &str) -> Result<Vec<ScoredChunk>> {
    let hits = data.pointer(&format!("/Get/{class}")).cloned().unwrap_or(Value::Array(Vec::new()));
    let hits: Vec<Hit> = serde_json::from_value(hits)
        .map_err(|e| WeaviateVectorIndex::map_err(format!("unexpected Get response: {e}")))?;

    Ok(hits
        .into_iter()
        .map(|hit| ScoredChunk {
            score: 1.0 - hit.additional.distance.unwrap_or(1.0),
            chunk: Chunk {
                text: hit.text,
                overlap_with_previous: hit.overlap_with_previous,
                source_path: PathBuf::from(hit.source_path),
                chunk_index: hit.chunk_index,
            },
        })
        .collect())
}

fn parse_count(data: &Value, class: &str) -> Result<usize> {
    data.pointer(&format!("/Aggregate/{class}/0/meta/count"))
        .and_then(Value::as_u64)
        .map(|count| count as usize)
        .ok_or_else(|| WeaviateVectorIndex::map_err("Aggregate response contained no count"))
}

#[async_trait]
impl VectorIndex for WeaviateVectorIndex {
    async fn ensure_schema(&self, name: &str, dimension: usize) -> Result<SchemaStatus> {
        let class = class_name(name)?;

        let existing =
            self.send(self.request(reqwest::Method::GET, &format!("/v1/schema/{class}"))).await?;
        if existing.status().is_success() {
            debug!(class = %class, "weaviate class already exists, skipping creation");
            return Ok(SchemaStatus::AlreadyExists);
        }
        if existing.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(Self::map_err(error_body(existing).await));
        }

        let response = self
            .send(self.request(reqwest::Method::POST, "/v1/schema").json(&class_definition(&class)))
            .await?;

        if !response.status().is_success() {
            let message = error_body(response).await;
            // Another writer may have created the class between the two calls.
            if message.contains("already exists") {
                debug!(class = %class, "weaviate class created concurrently");
                return Ok(SchemaStatus::AlreadyExists);
            }
            error!(class = %class, %message, "failed to create weaviate class");
            return Err(Self::map_err(message));
        }

        info!(class = %class, dimension, "created weaviate class");
        Ok(SchemaStatus::Created)
    }

    async fn upsert(&self, name: &str, chunks: Vec<EmbeddedChunk>) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let class = class_name(name)?;

        let body = BatchRequest { objects: chunks.iter().map(|c| BatchObject::new(&class, c)).collect() };
        let response =
            self.send(self.request(reqwest::Method::POST, "/v1/batch/objects").json(&body)).await?;

        if !response.status().is_success() {
            return Err(Self::map_err(error_body(response).await));
        }

        let results: Vec<BatchObjectResult> = response
            .json()
            .await
            .map_err(|e| Self::map_err(format!("failed to parse batch response: {e}")))?;

        let failures = batch_failures(results);
        if !failures.is_empty() {
            error!(class = %class, failed = failures.len(), "weaviate rejected batch objects");
            return Err(Self::map_err(format!(
                "{} of {} objects rejected: {}",
                failures.len(),
                chunks.len(),
                failures.join(", ")
            )));
        }

        debug!(class = %class, count = chunks.len(), "upserted chunks to weaviate");
        Ok(())
    }

    async fn query(&self, name: &str, vector: &[f32], top_k: usize) -> Result<Vec<ScoredChunk>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }
        let class = class_name(name)?;

        let data = self.graphql(near_vector_query(&class, vector, top_k)?).await?;
        let results = parse_hits(&data, &class)?;

        debug!(class = %class, top_k, results = results.len(), "weaviate search complete");
        Ok(results)
    }

    async fn count(&self, name: &str) -> Result<usize> {
        let class = class_name(name)?;
        let data = self.graphql(format!("{{ Aggregate {{ {class} {{ meta {{ count }} }} }} }}")).await?;
        parse_count(&data, &class)
    }

    fn backend(&self) -> &str {
        BACKEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_names_are_capitalized_and_checked() {
        assert_eq!(class_name("documents").unwrap(), "Documents");
        assert_eq!(class_name("Sales_2024").unwrap(), "Sales_2024");
        assert!(class_name("").is_err());
        assert!(class_name("1docs").is_err());
        assert!(class_name("Docs { }").is_err());
    }

    #[test]
    fn rejects_unknown_scheme() {
        let config = WeaviateConfig::new("ftp", "localhost:8080");
        assert!(matches!(WeaviateVectorIndex::new(config), Err(RagError::Config(_))));
    }

    #[test]
    fn near_vector_query_embeds_limit_and_vector() {
        let query = near_vector_query("Documents", &[0.5, -1.0], 3).unwrap();
        assert!(query.contains("Documents(nearVector: { vector: [0.5,-1.0] }, limit: 3)"));
        assert!(query.contains("_additional { distance }"));
    }

    #[test]
    fn parses_get_hits_into_scored_chunks() {
        let data = json!({
            "Get": { "Documents": [
                { "text": "Many Season", "source_path": "/d/sales.csv", "chunk_index": 2,
                  "overlap_with_previous": 50, "format": "csv",
                  "_additional": { "distance": 0.25 } }
            ]}
        });
        let hits = parse_hits(&data, "Documents").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.text, "Many Season");
        assert_eq!(hits[0].chunk.chunk_index, 2);
        assert!((hits[0].score - 0.75).abs() < 1e-6);
    }

    #[test]
    fn parses_aggregate_count() {
        let data = json!({ "Aggregate": { "Documents": [ { "meta": { "count": 42 } } ] } });
        assert_eq!(parse_count(&data, "Documents").unwrap(), 42);
        assert!(parse_count(&json!({}), "Documents").is_err());
    }

    #[test]
    fn collects_per_object_batch_errors() {
        let results: Vec<BatchObjectResult> = serde_json::from_value(json!([
            { "id": "a", "result": {} },
            { "id": "b", "result": { "errors": { "error": [ { "message": "vector length mismatch" } ] } } }
        ]))
        .unwrap();
        assert_eq!(batch_failures(results), vec!["b: vector length mismatch".to_string()]);
    }
}
