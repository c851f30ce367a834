use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

use super::search::OutputFormat;
use crate::error::ConfigError;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_EMBEDDING_DIMENSION: usize = 384;

/// API keys with this prefix put a remote backend into offline demo mode.
pub const DEMO_KEY_PREFIX: &str = "demo_placeholder";

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "RAGLINE_";

/// Returns true for placeholder keys that enable demo mode.
pub fn is_demo_key(key: Option<&str>) -> bool {
    key.is_some_and(|k| k.starts_with(DEMO_KEY_PREFIX))
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub retrieval: RetrievalConfig,

    #[serde(default)]
    pub chat: ChatConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ragline").join("config.toml"))
    }

    /// Load the config file (if any), then apply `RAGLINE_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Self::default(),
        };
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Apply overrides using `lookup` to resolve variable names.
    ///
    /// Unset variables leave the field alone; unparseable values are rejected.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            let name = format!("{ENV_PREFIX}{key}");
            lookup(&name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|v| (name, v))
        };

        if let Some((name, v)) = get("EMBEDDING_BACKEND") {
            self.embedding.backend = parse_var(&name, &v)?;
        }
        if let Some((_, v)) = get("EMBEDDING_URL") {
            self.embedding.url = v;
        }
        if let Some((_, v)) = get("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some((_, v)) = get("EMBEDDING_API_KEY") {
            self.embedding.api_key = Some(v);
        }
        if let Some((name, v)) = get("EMBEDDING_DIMENSION") {
            self.embedding.dimension = parse_var(&name, &v)?;
        }
        if let Some((name, v)) = get("EMBEDDING_TIMEOUT_SECS") {
            self.embedding.timeout_secs = parse_var(&name, &v)?;
        }
        if let Some((name, v)) = get("EMBEDDING_MAX_RETRIES") {
            self.embedding.max_retries = parse_var(&name, &v)?;
        }
        if let Some((name, v)) = get("LOCAL_SCHEME") {
            self.embedding.local_scheme = parse_var(&name, &v)?;
        }
        if let Some((name, v)) = get("CHUNK_SIZE") {
            self.chunking.chunk_size = parse_var(&name, &v)?;
        }
        if let Some((name, v)) = get("CHUNK_OVERLAP") {
            self.chunking.chunk_overlap = parse_var(&name, &v)?;
        }
        if let Some((name, v)) = get("MAX_FILE_SIZE") {
            self.chunking.max_file_size = parse_var(&name, &v)?;
        }
        if let Some((name, v)) = get("TOP_K") {
            self.retrieval.top_k = parse_var(&name, &v)?;
        }
        if let Some((name, v)) = get("CHAT_PROVIDER") {
            self.chat.provider = parse_var(&name, &v)?;
        }
        if let Some((_, v)) = get("CHAT_URL") {
            self.chat.url = v;
        }
        if let Some((_, v)) = get("CHAT_MODEL") {
            self.chat.model = v;
        }
        if let Some((_, v)) = get("CHAT_API_KEY") {
            self.chat.api_key = Some(v);
        }

        Ok(())
    }

    /// Check every constraint the pipeline relies on, reporting all failures at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.chunking.chunk_size == 0 {
            errors.push("chunking.chunk_size must be at least 1".to_string());
        } else if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            errors.push(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            ));
        }
        if self.retrieval.top_k == 0 {
            errors.push("retrieval.top_k must be at least 1".to_string());
        }
        if self.embedding.dimension == 0 {
            errors.push("embedding.dimension must be at least 1".to_string());
        }
        if self.embedding.timeout_secs == 0 {
            errors.push("embedding.timeout_secs must be at least 1".to_string());
        }
        if self.chat.timeout_secs == 0 {
            errors.push("chat.timeout_secs must be at least 1".to_string());
        }
        if self.embedding.backend == EmbeddingBackend::Remote && !has_key(&self.embedding.api_key) {
            errors.push("embedding.api_key is required when embedding.backend = \"remote\"".to_string());
        }
        if self.chat.provider == ChatProvider::OpenAi && !has_key(&self.chat.api_key) {
            errors.push("chat.api_key is required when chat.provider = \"openai\"".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(errors.join("; ")))
        }
    }
}

fn has_key(key: &Option<String>) -> bool {
    key.as_deref().is_some_and(|k| !k.trim().is_empty())
}

fn parse_var<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| ConfigError::ValidationError(format!("invalid value for {name}: {e}")))
}

/// Which embedding implementation backs the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// HTTP embeddings endpoint with local fallback
    Remote,
    /// Deterministic hash-based vectors, no network
    #[default]
    Local,
}

impl FromStr for EmbeddingBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "remote" | "openai" => Ok(EmbeddingBackend::Remote),
            "local" | "hash" => Ok(EmbeddingBackend::Local),
            _ => Err(format!("unknown embedding backend: {s}")),
        }
    }
}

impl std::fmt::Display for EmbeddingBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmbeddingBackend::Remote => write!(f, "remote"),
            EmbeddingBackend::Local => write!(f, "local"),
        }
    }
}

/// How the local embedder turns text into a vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalScheme {
    /// Sum of per-token vectors; shared words raise cosine similarity
    #[default]
    Lexical,
    /// One vector seeded by the whole text; only identical text matches
    Document,
}

impl FromStr for LocalScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lexical" => Ok(LocalScheme::Lexical),
            "document" => Ok(LocalScheme::Document),
            _ => Err(format!("unknown local embedding scheme: {s}")),
        }
    }
}

impl std::fmt::Display for LocalScheme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LocalScheme::Lexical => write!(f, "lexical"),
            LocalScheme::Document => write!(f, "document"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default)]
    pub backend: EmbeddingBackend,

    #[serde(default = "default_api_base")]
    pub url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_dimension")]
    pub dimension: usize,

    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default)]
    pub local_scheme: LocalScheme,
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_dimension() -> usize {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_embedding_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    2
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: EmbeddingBackend::default(),
            url: default_api_base(),
            model: default_embedding_model(),
            api_key: None,
            dimension: default_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_max_retries(),
            local_scheme: LocalScheme::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_max_file_size() -> u64 {
    10 * 1024 * 1024
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_file_size: default_max_file_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub default_format: OutputFormat,
}

fn default_top_k() -> usize {
    3
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            default_format: OutputFormat::Text,
        }
    }
}

/// Which generator answers questions from retrieved context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatProvider {
    /// OpenAI-compatible chat completions endpoint
    #[serde(rename = "openai")]
    OpenAi,
    /// Offline extractive answers
    #[default]
    Local,
}

impl FromStr for ChatProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "remote" => Ok(ChatProvider::OpenAi),
            "local" => Ok(ChatProvider::Local),
            _ => Err(format!("unknown chat provider: {s}")),
        }
    }
}

impl std::fmt::Display for ChatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChatProvider::OpenAi => write!(f, "openai"),
            ChatProvider::Local => write!(f, "local"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default)]
    pub provider: ChatProvider,

    #[serde(default = "default_api_base")]
    pub url: String,

    #[serde(default = "default_chat_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_chat_timeout")]
    pub timeout_secs: u64,
}

fn default_chat_model() -> String {
    DEFAULT_CHAT_MODEL.to_string()
}

fn default_chat_timeout() -> u64 {
    60
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            provider: ChatProvider::default(),
            url: default_api_base(),
            model: default_chat_model(),
            api_key: None,
            timeout_secs: default_chat_timeout(),
        }
    }
}
