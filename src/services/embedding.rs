//! Embedding backends for turning text into vectors.
//!
//! [`RemoteEmbedder`] calls an OpenAI-compatible `/embeddings` endpoint and
//! never fails: transport errors, bad responses and timeouts all degrade to
//! the deterministic [`HashEmbedder`], so indexing and querying keep working
//! offline.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::hash::Hasher;
use std::sync::Arc;
use std::time::Duration;
use twox_hash::XxHash64;

use crate::error::{ConfigError, EmbeddingError};
use crate::models::{EmbeddingBackend, EmbeddingConfig, LocalScheme, is_demo_key};
use crate::utils::retry::{RetryConfig, with_retry};

/// Maps text to a fixed-length vector.
///
/// Every vector returned by one embedder has length [`Embedder::dimension`].
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Length of every vector this embedder produces.
    fn dimension(&self) -> usize;

    /// Embed a single text. May perform network I/O.
    async fn embed(&self, text: &str) -> Vec<f32>;

    /// Embed several texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await);
        }
        vectors
    }
}

/// Stable 64-bit hash of the UTF-8 bytes of `text` (XxHash64, seed 0).
pub fn stable_hash(text: &str) -> u64 {
    let mut hasher = XxHash64::with_seed(0);
    hasher.write(text.as_bytes());
    hasher.finish()
}

/// SplitMix64 generator; fully specified so vectors are reproducible anywhere.
struct SplitMix64(u64);

impl SplitMix64 {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in [0, 1) with 24 bits of precision.
    fn next_unit(&mut self) -> f32 {
        (self.next_u64() >> 40) as f32 / (1u64 << 24) as f32
    }
}

/// Deterministic embedder derived from a stable hash of the input.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
    scheme: LocalScheme,
    name: String,
}

impl HashEmbedder {
    pub fn new(dimension: usize, scheme: LocalScheme) -> Self {
        Self {
            dimension,
            scheme,
            name: format!("hash-{scheme}"),
        }
    }

    /// Synchronous embedding; identical input always yields identical bits.
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        match self.scheme {
            LocalScheme::Document => {
                let mut rng = SplitMix64(stable_hash(text));
                (0..self.dimension).map(|_| rng.next_unit()).collect()
            }
            LocalScheme::Lexical => self.lexical_vector(text),
        }
    }

    fn lexical_vector(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        let tokens = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .map(str::to_lowercase);

        for token in tokens {
            let mut rng = SplitMix64(stable_hash(&token));
            for value in &mut vector {
                *value += rng.next_unit() * 2.0 - 1.0;
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Vec<f32> {
        self.embed_text(text)
    }
}

/// Request body for the `/embeddings` endpoint.
#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    input: &'a str,
    model: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
}

/// Accepts the OpenAI envelope or a bare vector.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmbedResponse {
    Envelope { data: Vec<EmbeddingDatum> },
    Bare(Vec<f32>),
}

/// Parse an embeddings response body and check its dimensionality.
fn parse_embedding_response(body: &str, dimension: usize) -> Result<Vec<f32>, EmbeddingError> {
    let response: EmbedResponse =
        serde_json::from_str(body).map_err(|e| EmbeddingError::InvalidResponse(e.to_string()))?;

    let vector = match response {
        EmbedResponse::Envelope { data } => data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse("empty embedding response".to_string()))?,
        EmbedResponse::Bare(vector) => vector,
    };

    if vector.len() != dimension {
        return Err(EmbeddingError::InvalidResponse(format!(
            "expected {dimension} dimensions, got {}",
            vector.len()
        )));
    }
    Ok(vector)
}

/// Client for an OpenAI-compatible embeddings endpoint with local fallback.
#[derive(Debug, Clone)]
pub struct RemoteEmbedder {
    client: Client,
    base_url: String,
    model: String,
    api_key: String,
    dimension: usize,
    retry: RetryConfig,
    fallback: HashEmbedder,
}

impl RemoteEmbedder {
    /// Create a new embedding client with the given configuration.
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EmbeddingError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
            dimension: config.dimension,
            retry: RetryConfig::with_retries(config.max_retries),
            fallback: HashEmbedder::new(config.dimension, config.local_scheme),
        })
    }

    /// Get the base URL of the embedding server.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Call the endpoint (with retries) without falling back.
    pub async fn try_embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        with_retry(&self.retry, || self.request_embedding(text)).await
    }

    async fn request_embedding(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let url = format!("{}/embeddings", self.base_url);
        let request = EmbedRequest {
            input: text,
            model: &self.model,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    EmbeddingError::Timeout
                } else if e.is_connect() {
                    EmbeddingError::ConnectionError(e.to_string())
                } else {
                    EmbeddingError::RequestError(e)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingError::ServerError(format!(
                "status {}: {}",
                status, body
            )));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                EmbeddingError::Timeout
            } else {
                EmbeddingError::RequestError(e)
            }
        })?;

        parse_embedding_response(&body, self.dimension)
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
    fn name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Vec<f32> {
        match self.try_embed(text).await {
            Ok(vector) => vector,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    model = %self.model,
                    "remote embedding failed, using local fallback"
                );
                self.fallback.embed_text(text)
            }
        }
    }
}

/// Build the embedder selected by configuration.
pub fn create_embedder(config: &EmbeddingConfig) -> Result<Arc<dyn Embedder>, ConfigError> {
    if config.dimension == 0 {
        return Err(ConfigError::ValidationError(
            "embedding.dimension must be at least 1".to_string(),
        ));
    }

    match config.backend {
        EmbeddingBackend::Local => {
            Ok(Arc::new(HashEmbedder::new(config.dimension, config.local_scheme)))
        }
        EmbeddingBackend::Remote if is_demo_key(config.api_key.as_deref()) => {
            tracing::info!("demo API key detected, generating simulated embeddings locally");
            Ok(Arc::new(HashEmbedder::new(config.dimension, config.local_scheme)))
        }
        EmbeddingBackend::Remote => {
            if config.api_key.as_deref().is_none_or(|k| k.trim().is_empty()) {
                return Err(ConfigError::ValidationError(
                    "embedding.api_key is required for the remote backend".to_string(),
                ));
            }
            let embedder = RemoteEmbedder::new(config).map_err(|e| {
                ConfigError::ValidationError(format!("failed to build embedding client: {e}"))
            })?;
            tracing::info!(url = %embedder.base_url(), model = %config.model, "using remote embeddings");
            Ok(Arc::new(embedder))
        }
    }
}
