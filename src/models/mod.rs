mod config;
mod document;
mod search;

pub use config::{
    ChatConfig, ChatProvider, ChunkingConfig, Config, DEFAULT_API_BASE, DEFAULT_CHAT_MODEL,
    DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, DEMO_KEY_PREFIX, ENV_PREFIX,
    EmbeddingBackend, EmbeddingConfig, LocalScheme, RetrievalConfig, is_demo_key,
};
pub use document::{Chunk, ChunkPayload};
pub use search::{OutputFormat, RetrievalOutcome, SearchResult};
