//! Embedding provider abstraction and implementations.
//!
//! The [`Embedder`] trait is the injected capability the pipeline depends on:
//! a deterministic mapping from text to a fixed-dimension float vector, with
//! the dimension agreed at construction time. Implementations:
//!
//! - **[`LocalEmbedder`]**: runs sentence-transformer models via fastembed;
//!   no network calls after the initial model download (feature
//!   `local-embeddings`, on by default).
//! - **[`OllamaEmbedder`]**: calls a local Ollama instance's `/api/embed`.
//! - **[`OpenAiEmbedder`]**: calls the OpenAI embeddings API.
//!
//! HTTP providers use explicit request timeouts and exponential backoff for
//! transient errors: 429 and 5xx are retried, other 4xx fail immediately,
//! network errors are retried, with delays of 1s, 2s, 4s, ... capped at 32s.
//!
//! Also provides the vector utilities shared by the stores:
//! [`cosine_similarity`], [`vec_to_blob`], and [`blob_to_vec`].

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::config::EmbeddingConfig;
use crate::error::{Error, Result};

/// Capability contract: map text to fixed-dimension vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier (e.g. `"all-minilm-l6-v2"`).
    fn model_name(&self) -> &str;

    /// Embedding dimensionality (384 for the reference model).
    fn dims(&self) -> usize;

    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single text (e.g. a search query).
    async fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        if vectors.is_empty() {
            return Err(Error::EmbeddingFailed("empty embedding response".into()));
        }
        Ok(vectors.remove(0))
    }
}

/// Create the configured [`Embedder`].
///
/// Supported providers: `local` (fastembed), `ollama`, `openai`. The
/// `disabled` provider is rejected here with a pointer to the config,
/// since every ingestion and search path needs embeddings.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.provider.as_str() {
        #[cfg(feature = "local-embeddings")]
        "local" => Ok(Box::new(LocalEmbedder::new(config)?)),
        #[cfg(not(feature = "local-embeddings"))]
        "local" => Err(Error::Config(
            "local embedding provider requires the local-embeddings feature".into(),
        )),
        "ollama" => Ok(Box::new(OllamaEmbedder::new(config)?)),
        "openai" => Ok(Box::new(OpenAiEmbedder::new(config)?)),
        "disabled" => Err(Error::Config(
            "embedding provider is disabled. Set [embedding] provider in config.".into(),
        )),
        other => Err(Error::Config(format!(
            "unknown embedding provider: '{}'",
            other
        ))),
    }
}

/// Backoff delay before retry `attempt` (1-based): 1s, 2s, 4s, ... capped at 32s.
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_secs(1 << (attempt - 1).min(5))
}

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| Error::EmbeddingFailed(e.to_string()))
}

/// POST a JSON body with the shared retry policy, returning the parsed
/// response JSON on success.
async fn post_json_with_retry(
    client: &reqwest::Client,
    url: &str,
    bearer: Option<&str>,
    body: &serde_json::Value,
    max_retries: u32,
) -> Result<serde_json::Value> {
    let mut last_err: Option<Error> = None;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            tokio::time::sleep(backoff_delay(attempt)).await;
        }

        let mut request = client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => {
                let status = response.status();
                if status.is_success() {
                    return response
                        .json()
                        .await
                        .map_err(|e| Error::EmbeddingFailed(e.to_string()));
                }

                let detail = response.text().await.unwrap_or_default();
                if status.as_u16() == 429 || status.is_server_error() {
                    last_err = Some(Error::EmbeddingFailed(format!(
                        "{} returned {}: {}",
                        url, status, detail
                    )));
                    continue;
                }
                // Client error other than rate limiting: retrying won't help.
                return Err(Error::EmbeddingFailed(format!(
                    "{} returned {}: {}",
                    url, status, detail
                )));
            }
            Err(e) => {
                last_err = Some(Error::EmbeddingFailed(format!("{}: {}", url, e)));
                continue;
            }
        }
    }

    Err(last_err
        .unwrap_or_else(|| Error::EmbeddingFailed("embedding failed after retries".into())))
}

// ============ Local provider (fastembed) ============

/// Local inference via fastembed. The model is downloaded on first use and
/// cached; afterwards embedding runs entirely offline.
#[cfg(feature = "local-embeddings")]
pub struct LocalEmbedder {
    model_name: String,
    dims: usize,
    model: std::sync::Arc<std::sync::Mutex<fastembed::TextEmbedding>>,
}

#[cfg(feature = "local-embeddings")]
impl LocalEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model_name = config
            .model
            .clone()
            .unwrap_or_else(|| "all-minilm-l6-v2".to_string());
        let (fastembed_model, default_dims) = resolve_local_model(&model_name)?;
        let dims = config.dims.unwrap_or(default_dims);

        let model = fastembed::TextEmbedding::try_new(
            fastembed::InitOptions::new(fastembed_model).with_show_download_progress(true),
        )
        .map_err(|e| Error::Config(format!("failed to initialize local embedding model: {}", e)))?;

        Ok(Self {
            model_name,
            dims,
            model: std::sync::Arc::new(std::sync::Mutex::new(model)),
        })
    }
}

#[cfg(feature = "local-embeddings")]
fn resolve_local_model(name: &str) -> Result<(fastembed::EmbeddingModel, usize)> {
    match name {
        "all-minilm-l6-v2" => Ok((fastembed::EmbeddingModel::AllMiniLML6V2, 384)),
        "bge-small-en-v1.5" => Ok((fastembed::EmbeddingModel::BGESmallENV15, 384)),
        "bge-base-en-v1.5" => Ok((fastembed::EmbeddingModel::BGEBaseENV15, 768)),
        "multilingual-e5-small" => Ok((fastembed::EmbeddingModel::MultilingualE5Small, 384)),
        other => Err(Error::Config(format!(
            "unknown local embedding model: '{}'. Supported: all-minilm-l6-v2, \
             bge-small-en-v1.5, bge-base-en-v1.5, multilingual-e5-small",
            other
        ))),
    }
}

#[cfg(feature = "local-embeddings")]
#[async_trait]
impl Embedder for LocalEmbedder {
    fn model_name(&self) -> &str {
        &self.model_name
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let model = self.model.clone();
        let texts = texts.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut guard = model
                .lock()
                .map_err(|_| Error::EmbeddingFailed("embedding model lock poisoned".into()))?;
            guard
                .embed(texts, None)
                .map_err(|e| Error::EmbeddingFailed(e.to_string()))
        })
        .await
        .map_err(|e| Error::EmbeddingFailed(e.to_string()))?
    }
}

// ============ Ollama provider ============

/// Embedding via a local Ollama instance's `POST /api/embed` endpoint.
/// Requires an embedding model pulled (e.g. `ollama pull nomic-embed-text`).
pub struct OllamaEmbedder {
    model: String,
    dims: usize,
    url: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| Error::Config("embedding.model required for Ollama provider".into()))?;
        let dims = config
            .dims
            .ok_or_else(|| Error::Config("embedding.dims required for Ollama provider".into()))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "http://localhost:11434".to_string());

        Ok(Self {
            model,
            dims,
            url,
            client: build_client(config.timeout_secs)?,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = json!({ "model": self.model, "input": texts });
        let endpoint = format!("{}/api/embed", self.url.trim_end_matches('/'));
        let response =
            post_json_with_retry(&self.client, &endpoint, None, &body, self.max_retries).await?;
        parse_vector_array(response.get("embeddings"), "embeddings")
    }
}

// ============ OpenAI provider ============

/// Embedding via `POST {url}/v1/embeddings` with the configured model.
/// The API key is read from the environment variable named by
/// `embedding.api_key_env` (default `OPENAI_API_KEY`).
pub struct OpenAiEmbedder {
    model: String,
    dims: usize,
    url: String,
    api_key: String,
    client: reqwest::Client,
    max_retries: u32,
}

impl OpenAiEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let model = config
            .model
            .clone()
            .ok_or_else(|| Error::Config("embedding.model required for OpenAI provider".into()))?;
        let dims = config
            .dims
            .ok_or_else(|| Error::Config("embedding.dims required for OpenAI provider".into()))?;
        let key_env = config
            .api_key_env
            .clone()
            .unwrap_or_else(|| "OPENAI_API_KEY".to_string());
        let api_key = std::env::var(&key_env)
            .map_err(|_| Error::Config(format!("{} environment variable not set", key_env)))?;
        let url = config
            .url
            .clone()
            .unwrap_or_else(|| "https://api.openai.com".to_string());

        Ok(Self {
            model,
            dims,
            url,
            api_key,
            client: build_client(config.timeout_secs)?,
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn dims(&self) -> usize {
        self.dims
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let body = json!({ "model": self.model, "input": texts });
        let endpoint = format!("{}/v1/embeddings", self.url.trim_end_matches('/'));
        let response = post_json_with_retry(
            &self.client,
            &endpoint,
            Some(&self.api_key),
            &body,
            self.max_retries,
        )
        .await?;

        let data = response
            .get("data")
            .and_then(|d| d.as_array())
            .ok_or_else(|| Error::EmbeddingFailed("response missing data array".into()))?;

        let mut embeddings = Vec::with_capacity(data.len());
        for item in data {
            embeddings.push(parse_vector(item.get("embedding"), "embedding")?);
        }
        Ok(embeddings)
    }
}

fn parse_vector_array(value: Option<&serde_json::Value>, field: &str) -> Result<Vec<Vec<f32>>> {
    let rows = value
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::EmbeddingFailed(format!("response missing {} array", field)))?;
    rows.iter()
        .map(|row| parse_vector(Some(row), field))
        .collect()
}

fn parse_vector(value: Option<&serde_json::Value>, field: &str) -> Result<Vec<f32>> {
    let row = value
        .and_then(|v| v.as_array())
        .ok_or_else(|| Error::EmbeddingFailed(format!("response {} is not an array", field)))?;
    Ok(row
        .iter()
        .map(|v| v.as_f64().unwrap_or(0.0) as f32)
        .collect())
}

// ============ Vector utilities ============

/// Encode a float vector as little-endian `f32` bytes for BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB produced by [`vec_to_blob`] back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity between two vectors, in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors, mismatched lengths, or zero magnitude.
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        let blob = vec_to_blob(&vec);
        assert_eq!(blob.len(), vec.len() * 4);
        assert_eq!(blob_to_vec(&blob), vec);
    }

    #[test]
    fn test_cosine_identical() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!(cosine_similarity(&a, &b).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_opposite() {
        let a = vec![1.0, 0.0];
        let b = vec![-1.0, 0.0];
        assert!((cosine_similarity(&a, &b) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[1.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_backoff_delay_caps() {
        assert_eq!(backoff_delay(1), Duration::from_secs(1));
        assert_eq!(backoff_delay(2), Duration::from_secs(2));
        assert_eq!(backoff_delay(6), Duration::from_secs(32));
        assert_eq!(backoff_delay(20), Duration::from_secs(32));
    }
}
