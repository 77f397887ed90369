//! Embedding client abstraction and implementations.
//!
//! Defines the [`EmbeddingClient`] trait and two concrete backends:
//! - **[`GeminiEmbeddingClient`]** — calls the Gemini embedding API with
//!   batching; the retrieval intent is forwarded as the API's task type.
//! - **[`HashEmbeddingClient`]** — a deterministic token-bucket mapping
//!   with no network dependency, used in tests and keyless local runs.
//!
//! Also provides vector utilities shared with the store:
//! - [`cosine_similarity`] — compute similarity between two vectors
//! - [`vec_to_blob`] — encode a `Vec<f32>` as little-endian bytes for
//!   SQLite BLOB storage
//! - [`blob_to_vec`] — decode a SQLite BLOB back into a `Vec<f32>`
//!
//! # Intent
//!
//! Every call carries an [`EmbedIntent`]: some backends compute different
//! vectors for "this is a document to be retrieved" versus "this is a
//! query used to retrieve". Ingestion always embeds with
//! [`EmbedIntent::Document`]; query-time embedding always uses
//! [`EmbedIntent::Query`].
//!
//! # Failure
//!
//! A failed backend call surfaces as
//! [`ServiceError::EmbeddingService`](crate::error::ServiceError) and is
//! not retried here; retry policy, if any, belongs to the caller.

use async_trait::async_trait;
use std::time::Duration;

use crate::config::EmbeddingConfig;
use crate::error::{Result, ServiceError};

/// Whether a vector is computed for storage or for search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedIntent {
    /// Text that will be stored and later retrieved.
    Document,
    /// Text used to retrieve stored documents.
    Query,
}

/// Client for an embedding backend.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Embed a single text. Query-time callers use [`EmbedIntent::Query`].
    async fn embed(&self, text: &str, intent: EmbedIntent) -> Result<Vec<f32>>;

    /// Embed a batch of texts in input order; used for ingestion throughput.
    async fn embed_batch(&self, texts: &[String], intent: EmbedIntent) -> Result<Vec<Vec<f32>>>;

    /// Embedding vector dimensionality (e.g. `3072`).
    fn dims(&self) -> usize;
}

/// Create the configured [`EmbeddingClient`].
///
/// | Config value | Client |
/// |--------------|--------|
/// | `"gemini"` | [`GeminiEmbeddingClient`] |
/// | `"hash"` | [`HashEmbeddingClient`] |
pub fn create_embedding_client(
    config: &EmbeddingConfig,
) -> anyhow::Result<std::sync::Arc<dyn EmbeddingClient>> {
    match config.provider.as_str() {
        "gemini" => Ok(std::sync::Arc::new(GeminiEmbeddingClient::new(config)?)),
        "hash" => Ok(std::sync::Arc::new(HashEmbeddingClient::new(config.dims))),
        other => anyhow::bail!("Unknown embedding provider: {}", other),
    }
}

// ============ Gemini client ============

/// Embedding client for the Gemini embedding API.
///
/// Calls `POST /v1beta/models/{model}:batchEmbedContents` with the
/// configured model. Requires the `GEMINI_API_KEY` environment variable.
/// The [`EmbedIntent`] maps onto the API's `taskType`
/// (`RETRIEVAL_DOCUMENT` / `RETRIEVAL_QUERY`).
pub struct GeminiEmbeddingClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dims: usize,
    batch_size: usize,
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

impl GeminiEmbeddingClient {
    /// Create a new Gemini client from configuration.
    ///
    /// Fails if `embedding.model` is not set or `GEMINI_API_KEY` is not in
    /// the environment.
    pub fn new(config: &EmbeddingConfig) -> anyhow::Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("embedding.model required for the gemini provider"))?;
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| anyhow::anyhow!("GEMINI_API_KEY environment variable not set"))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            model,
            dims: config.dims,
            batch_size: config.batch_size.max(1),
        })
    }

    async fn embed_slice(&self, texts: &[String], intent: EmbedIntent) -> Result<Vec<Vec<f32>>> {
        let task_type = match intent {
            EmbedIntent::Document => "RETRIEVAL_DOCUMENT",
            EmbedIntent::Query => "RETRIEVAL_QUERY",
        };
        let requests: Vec<serde_json::Value> = texts
            .iter()
            .map(|text| {
                serde_json::json!({
                    "model": format!("models/{}", self.model),
                    "content": { "parts": [{ "text": text }] },
                    "taskType": task_type,
                })
            })
            .collect();

        let url = format!("{}/{}:batchEmbedContents", GEMINI_BASE_URL, self.model);
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&serde_json::json!({ "requests": requests }))
            .send()
            .await
            .map_err(|e| ServiceError::EmbeddingService(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::EmbeddingService(format!(
                "Gemini API error {}: {}",
                status, body
            )));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ServiceError::EmbeddingService(e.to_string()))?;
        let vectors = parse_batch_response(&json)?;
        check_dims(&vectors, self.dims)?;
        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingClient for GeminiEmbeddingClient {
    async fn embed(&self, text: &str, intent: EmbedIntent) -> Result<Vec<f32>> {
        let vectors = self.embed_slice(&[text.to_string()], intent).await?;
        vectors
            .into_iter()
            .next()
            .ok_or_else(|| ServiceError::EmbeddingService("empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String], intent: EmbedIntent) -> Result<Vec<Vec<f32>>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for slice in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_slice(slice, intent).await?);
        }
        Ok(vectors)
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

/// Parse a Gemini `batchEmbedContents` response into vectors in input order.
fn parse_batch_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| {
            ServiceError::EmbeddingService("invalid response: missing embeddings array".to_string())
        })?;

    let mut vectors = Vec::with_capacity(embeddings.len());
    for item in embeddings {
        let values = item.get("values").and_then(|v| v.as_array()).ok_or_else(|| {
            ServiceError::EmbeddingService("invalid response: missing values array".to_string())
        })?;
        let vec: Vec<f32> = values
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        vectors.push(vec);
    }

    Ok(vectors)
}

fn check_dims(vectors: &[Vec<f32>], dims: usize) -> Result<()> {
    for vec in vectors {
        if vec.len() != dims {
            return Err(ServiceError::EmbeddingService(format!(
                "dimensionality mismatch: backend returned {} values, expected {}",
                vec.len(),
                dims
            )));
        }
    }
    Ok(())
}

// ============ Hash client ============

/// Deterministic, offline embedding client.
///
/// Hashes each lowercased word token into one of `dims` buckets (FNV-1a)
/// and L2-normalizes the bucket counts. Texts sharing vocabulary land close
/// in vector space, which is enough for repeatable retrieval tests and
/// keyless local smoke runs. Both intents produce identical vectors.
pub struct HashEmbeddingClient {
    dims: usize,
}

impl HashEmbeddingClient {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dims];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = (fnv1a64(token.as_bytes()) % self.dims as u64) as usize;
            vec[bucket] += 1.0;
        }
        let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for v in &mut vec {
                *v /= norm;
            }
        }
        vec
    }
}

#[async_trait]
impl EmbeddingClient for HashEmbeddingClient {
    async fn embed(&self, text: &str, _intent: EmbedIntent) -> Result<Vec<f32>> {
        Ok(self.embed_text(text))
    }

    async fn embed_batch(&self, texts: &[String], _intent: EmbedIntent) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn dims(&self) -> usize {
        self.dims
    }
}

/// FNV-1a, 64-bit. Stable across platforms and releases, unlike the
/// standard library's default hasher.
fn fnv1a64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

// ============ Vector utilities ============

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// Each `f32` is stored as 4 bytes in little-endian order, producing a
/// BLOB of `vec.len() × 4` bytes.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
///
/// Reverses [`vec_to_blob`]: reads 4-byte little-endian `f32` values from
/// the byte slice.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Compute cosine similarity between two embedding vectors.
///
/// Returns a value in `[-1.0, 1.0]`, or `0.0` for empty vectors or
/// vectors of different lengths.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
