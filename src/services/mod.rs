mod chunker;
mod embedding;
mod generation;
mod normalizer;
mod pipeline;
mod vector_index;

pub use chunker::TextChunker;
pub use embedding::{Embedder, HashEmbedder, RemoteEmbedder, create_embedder, stable_hash};
pub use generation::{
    ChatClient, ExtractiveGenerator, Generator, NO_CONTEXT_REPLY, create_generator,
};
pub use normalizer::normalize_query;
pub use pipeline::{IndexStats, RetrievalPipeline, format_context};
pub use vector_index::{
    IndexEntry, IndexPersistence, NoopPersistence, VectorIndex, cosine_similarity,
};
