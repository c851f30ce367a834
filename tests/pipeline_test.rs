//! Integration tests for the full retrieval flow.
//!
//! Tests the complete flow: load → chunk → embed → index → query → generate.

use async_trait::async_trait;
use ragline::error::PipelineError;
use ragline::models::{Config, EmbeddingBackend, LocalScheme};
use ragline::services::{
    Embedder, ExtractiveGenerator, Generator, HashEmbedder, RetrievalPipeline, TextChunker,
    create_embedder,
};
use ragline::sources::load_documents;
use std::fs;
use std::sync::Arc;
use tempfile::tempdir;

const TEST_DIM: usize = 384;

/// Embedder that maps every text onto one of two axes by keyword.
struct KeywordEmbedder;

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn name(&self) -> &str {
        "keyword"
    }

    fn dimension(&self) -> usize {
        2
    }

    async fn embed(&self, text: &str) -> Vec<f32> {
        if text.contains("rust") {
            vec![1.0, 0.0]
        } else {
            vec![0.0, 1.0]
        }
    }
}

fn lexical_pipeline(top_k: usize) -> RetrievalPipeline {
    RetrievalPipeline::with_components(
        TextChunker::new(1000, 200).unwrap(),
        Arc::new(HashEmbedder::new(TEST_DIM, LocalScheme::Lexical)),
        top_k,
    )
}

#[tokio::test]
async fn test_directory_to_answer() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("01_cat.txt"), "the cat sat").unwrap();
    fs::write(dir.path().join("02_dog.txt"), "the dog ran").unwrap();
    fs::write(dir.path().join("notes.md"), "the cat is ignored here").unwrap();

    let documents = load_documents(dir.path(), 1024 * 1024).unwrap();
    assert_eq!(documents, vec!["the cat sat", "the dog ran"]);

    let pipeline = lexical_pipeline(2);
    let stats = pipeline.index_documents(&documents).await.unwrap();
    assert_eq!(stats.documents, 2);
    assert_eq!(stats.chunks, 2);

    let outcome = pipeline.query("Where is the CAT??").await.unwrap();
    assert_eq!(outcome.query, "where is the cat??");
    assert_eq!(outcome.results[0].payload.text, "the cat sat");
    assert_eq!(outcome.results[0].payload.source_index, 0);
    assert!(outcome.results[0].score > outcome.results[1].score);

    let blocks: Vec<&str> = outcome.context.split("\n\n").collect();
    assert_eq!(blocks.len(), 2);
    assert!(blocks[0].starts_with("[Document 1 (Relevance: "));
    assert!(blocks[1].starts_with("[Document 2 (Relevance: "));

    let answer = ExtractiveGenerator
        .generate(&outcome.query, &outcome.context)
        .await
        .unwrap();
    assert!(answer.ends_with("the cat sat"));
}

#[tokio::test]
async fn test_not_indexed_before_first_document() {
    let pipeline = lexical_pipeline(3);

    for raw in ["", "   ", "anything at all"] {
        assert!(matches!(
            pipeline.query(raw).await,
            Err(PipelineError::NotIndexed)
        ));
    }

    pipeline
        .index_documents(&["now there is something".to_string()])
        .await
        .unwrap();
    assert!(pipeline.query("").await.is_ok());
}

#[tokio::test]
async fn test_custom_embedder_and_incremental_indexing() {
    let pipeline = RetrievalPipeline::with_components(
        TextChunker::new(50, 10).unwrap(),
        Arc::new(KeywordEmbedder),
        1,
    );

    pipeline
        .index_documents(&["python is a language".to_string()])
        .await
        .unwrap();
    pipeline
        .index_documents(&["rust has ownership".to_string()])
        .await
        .unwrap();
    assert_eq!(pipeline.len().await, 2);

    let outcome = pipeline.query("Tell me about Rust").await.unwrap();
    assert_eq!(outcome.results[0].payload.text, "rust has ownership");
    assert_eq!(outcome.results[0].id, 1);
    assert!((outcome.results[0].score - 1.0).abs() < 1e-6);
}

#[tokio::test]
async fn test_chunk_overlap_survives_indexing() {
    let text: String = (0..2_500).map(|i| char::from(b'a' + (i % 26) as u8)).collect();
    let pipeline = lexical_pipeline(10);

    let stats = pipeline.index_documents(&[text]).await.unwrap();
    // windows start at 0, 800, 1600; the last one reaches the end
    assert_eq!(stats.chunks, 3);
}

#[tokio::test]
async fn test_unreachable_remote_falls_back_to_local() {
    let mut config = Config::default();
    config.embedding.backend = EmbeddingBackend::Remote;
    config.embedding.url = "http://127.0.0.1:1".to_string();
    config.embedding.api_key = Some("sk-unused".to_string());
    config.embedding.max_retries = 0;
    config.embedding.timeout_secs = 2;

    let remote = create_embedder(&config.embedding).unwrap();
    let local = HashEmbedder::new(config.embedding.dimension, config.embedding.local_scheme);

    assert_eq!(remote.embed("offline").await, local.embed_text("offline"));

    let pipeline = RetrievalPipeline::new(&config).unwrap();
    pipeline
        .index_documents(&["the cat sat".to_string(), "the dog ran".to_string()])
        .await
        .unwrap();
    let outcome = pipeline.query("cat").await.unwrap();
    assert_eq!(outcome.results[0].payload.text, "the cat sat");
}
