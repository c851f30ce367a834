//! Chunk, embed, index and retrieve.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::chunker::TextChunker;
use super::embedding::{Embedder, create_embedder};
use super::normalizer::normalize_query;
use super::vector_index::{IndexPersistence, NoopPersistence, VectorIndex};
use crate::error::PipelineError;
use crate::models::{Config, RetrievalOutcome, SearchResult};

/// Counts reported after an indexing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IndexStats {
    pub documents: usize,
    pub chunks: usize,
}

/// Retrieval pipeline over an in-memory index.
///
/// A pipeline starts empty and becomes queryable after the first
/// [`RetrievalPipeline::index_documents`] that stores at least one chunk.
pub struct RetrievalPipeline {
    chunker: TextChunker,
    embedder: Arc<dyn Embedder>,
    index: VectorIndex,
    persistence: Arc<dyn IndexPersistence>,
    top_k: usize,
}

impl RetrievalPipeline {
    /// Build a pipeline from validated configuration.
    pub fn new(config: &Config) -> Result<Self, PipelineError> {
        config.validate()?;

        let chunker = TextChunker::from_config(&config.chunking)?;
        let embedder = create_embedder(&config.embedding)?;

        Ok(Self::with_components(
            chunker,
            embedder,
            config.retrieval.top_k,
        ))
    }

    /// Assemble a pipeline from explicit parts.
    pub fn with_components(
        chunker: TextChunker,
        embedder: Arc<dyn Embedder>,
        top_k: usize,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index: VectorIndex::new(),
            persistence: Arc::new(NoopPersistence),
            top_k,
        }
    }

    #[must_use]
    pub fn with_persistence(mut self, persistence: Arc<dyn IndexPersistence>) -> Self {
        self.persistence = persistence;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub async fn is_indexed(&self) -> bool {
        !self.index.is_empty().await
    }

    /// Number of indexed chunks.
    pub async fn len(&self) -> usize {
        self.index.len().await
    }

    /// Chunk, embed and store `documents`, numbering sources by position.
    pub async fn index_documents(&self, documents: &[String]) -> Result<IndexStats, PipelineError> {
        let chunks = self.chunker.split_all(documents);
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();

        debug!(
            documents = documents.len(),
            chunks = chunks.len(),
            embedder = self.embedder.name(),
            "embedding chunks"
        );
        let vectors = self.embedder.embed_batch(&texts).await;

        let items = vectors
            .into_iter()
            .zip(chunks)
            .map(|(vector, chunk)| (vector, chunk.into()))
            .collect();
        self.index.add_batch(items).await?;

        let stats = IndexStats {
            documents: documents.len(),
            chunks: texts.len(),
        };

        if let Err(e) = self.persistence.save(&self.index.entries().await).await {
            warn!(error = %e, "failed to persist index");
        }

        info!(
            documents = stats.documents,
            chunks = stats.chunks,
            total = self.index.len().await,
            "indexed documents"
        );
        Ok(stats)
    }

    /// Append previously persisted entries. Returns how many were loaded.
    pub async fn restore(&self) -> Result<usize, PipelineError> {
        let entries = self.persistence.load().await?;
        let count = entries.len();

        let items = entries
            .into_iter()
            .map(|entry| (entry.vector, entry.payload))
            .collect();
        self.index.add_batch(items).await?;

        if count > 0 {
            info!(entries = count, "restored index");
        }
        Ok(count)
    }

    /// Retrieve the passages most relevant to `raw` and format them as context.
    pub async fn query(&self, raw: &str) -> Result<RetrievalOutcome, PipelineError> {
        if !self.is_indexed().await {
            return Err(PipelineError::NotIndexed);
        }

        let query = normalize_query(raw);
        let vector = self.embedder.embed(&query).await;
        let results = self.index.search(&vector, self.top_k).await;

        debug!(query = %query, hits = results.len(), "retrieved context");

        Ok(RetrievalOutcome {
            context: format_context(&results),
            query,
            results,
        })
    }
}

/// Render ranked results as `[Document <rank> (Relevance: <score>)]: <text>`
/// blocks separated by blank lines.
pub fn format_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .enumerate()
        .map(|(i, r)| {
            format!(
                "[Document {} (Relevance: {:.4})]: {}",
                i + 1,
                r.score,
                r.payload.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}
