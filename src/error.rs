//! Error types for the retrieval pipeline and its CLI.

use std::path::PathBuf;

use thiserror::Error;

use crate::utils::retry::Retryable;

/// Errors related to embedding operations.
///
/// These never leave the embedder: a remote failure is absorbed by falling
/// back to the deterministic local embedding.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::ConnectionError(_) | EmbeddingError::Timeout => true,
            // 5xx gateway errors and rate limiting are worth another attempt
            EmbeddingError::ServerError(msg) => {
                msg.contains("503")
                    || msg.contains("502")
                    || msg.contains("504")
                    || msg.contains("429")
                    || msg.to_lowercase().contains("unavailable")
                    || msg.to_lowercase().contains("too many requests")
            }
            EmbeddingError::RequestError(e) => e.is_timeout() || e.is_connect(),
            EmbeddingError::InvalidResponse(_) => false,
        }
    }
}

/// Errors raised by the vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("dimension mismatch: index holds {expected}-dimensional vectors, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("cannot index an empty vector")]
    EmptyVector,

    #[error("index persistence error: {0}")]
    Persistence(String),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors surfaced by the retrieval pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no documents indexed; index documents before querying")]
    NotIndexed,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

/// Errors related to the generation step.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("failed to connect to chat server: {0}")]
    ConnectionError(String),

    #[error("chat server error: {0}")]
    ServerError(String),

    #[error("chat request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid chat response: {0}")]
    InvalidResponse(String),

    #[error("chat request timeout")]
    Timeout,
}

/// Errors raised while loading raw documents.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("document path not found: {}", .0.display())]
    DocumentNotFound(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("directory walk error: {0}")]
    WalkError(String),
}

/// Errors a single chat turn can hit.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("generation error: {0}")]
    Generation(#[from] GenerationError),
}
