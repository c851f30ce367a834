//! Append-only in-memory vector index with brute-force cosine search.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::IndexError;
use crate::models::{ChunkPayload, SearchResult};

/// A stored vector together with the chunk it was computed from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: u64,
    pub vector: Vec<f32>,
    pub payload: ChunkPayload,
}

#[derive(Debug, Default)]
struct IndexState {
    entries: Vec<IndexEntry>,
    dimension: Option<usize>,
    next_id: u64,
}

impl IndexState {
    /// Append without validation; callers check dimensions first.
    fn push(&mut self, vector: Vec<f32>, payload: ChunkPayload) -> u64 {
        if self.dimension.is_none() {
            debug!(dimension = vector.len(), "index dimension established");
            self.dimension = Some(vector.len());
        }

        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(IndexEntry {
            id,
            vector,
            payload,
        });
        id
    }
}

fn check_dimension(expected: Option<usize>, actual: usize) -> Result<(), IndexError> {
    if actual == 0 {
        return Err(IndexError::EmptyVector);
    }
    match expected {
        Some(expected) if expected != actual => {
            Err(IndexError::DimensionMismatch { expected, actual })
        }
        _ => Ok(()),
    }
}

/// In-memory vector index.
///
/// The first successful [`VectorIndex::add`] fixes the dimensionality; every
/// later vector must match it. Entries are never removed.
#[derive(Debug, Default)]
pub struct VectorIndex {
    state: RwLock<IndexState>,
}

impl VectorIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a vector and return its id. On error the index is unchanged.
    pub async fn add(&self, vector: Vec<f32>, payload: ChunkPayload) -> Result<u64, IndexError> {
        let mut state = self.state.write().await;
        check_dimension(state.dimension, vector.len())?;
        Ok(state.push(vector, payload))
    }

    /// Append several vectors under one write lock.
    ///
    /// Every vector is checked before any is stored, so a batch is either
    /// appended whole or not at all. An empty index takes its dimension from
    /// the first vector of the batch.
    pub async fn add_batch(
        &self,
        items: Vec<(Vec<f32>, ChunkPayload)>,
    ) -> Result<Vec<u64>, IndexError> {
        let mut state = self.state.write().await;

        let mut expected = state.dimension;
        for (vector, _) in &items {
            check_dimension(expected, vector.len())?;
            expected.get_or_insert(vector.len());
        }

        Ok(items
            .into_iter()
            .map(|(vector, payload)| state.push(vector, payload))
            .collect())
    }

    /// Return the `k` entries most similar to `query`, best first.
    ///
    /// Equal scores are ordered by ascending id.
    pub async fn search(&self, query: &[f32], k: usize) -> Vec<SearchResult> {
        if k == 0 {
            return Vec::new();
        }

        let state = self.state.read().await;

        let mut scored: Vec<(f32, &IndexEntry)> = state
            .entries
            .iter()
            .map(|entry| (cosine_similarity(query, &entry.vector), entry))
            .collect();

        scored.sort_by(|(sa, a), (sb, b)| sb.total_cmp(sa).then(a.id.cmp(&b.id)));

        scored
            .into_iter()
            .take(k)
            .map(|(score, entry)| SearchResult {
                id: entry.id,
                score,
                payload: entry.payload.clone(),
            })
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.state.read().await.entries.is_empty()
    }

    /// Dimensionality fixed by the first add, if any.
    pub async fn dimension(&self) -> Option<usize> {
        self.state.read().await.dimension
    }

    /// Snapshot of all entries in insertion order.
    pub async fn entries(&self) -> Vec<IndexEntry> {
        self.state.read().await.entries.clone()
    }
}

/// Cosine similarity; zero-norm or mismatched inputs score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Hook for saving and restoring index contents.
#[async_trait]
pub trait IndexPersistence: Send + Sync {
    async fn save(&self, entries: &[IndexEntry]) -> Result<(), IndexError>;

    async fn load(&self) -> Result<Vec<IndexEntry>, IndexError>;
}

/// Persistence that keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopPersistence;

#[async_trait]
impl IndexPersistence for NoopPersistence {
    async fn save(&self, entries: &[IndexEntry]) -> Result<(), IndexError> {
        debug!(entries = entries.len(), "persistence disabled, skipping save");
        Ok(())
    }

    async fn load(&self) -> Result<Vec<IndexEntry>, IndexError> {
        debug!("persistence disabled, nothing to load");
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn payload(text: &str) -> ChunkPayload {
        ChunkPayload {
            text: text.to_string(),
            source_index: 0,
            offset: 0,
        }
    }

    #[test]
    fn test_cosine_similarity_edge_cases() {
        assert!((cosine_similarity(&[1.0, 2.0], &[2.0, 4.0]) - 1.0).abs() < 1e-6);
        assert!((cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]) + 1.0).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_ids_are_sequential() {
        let index = VectorIndex::new();
        assert_eq!(index.add(vec![1.0, 0.0], payload("a")).await.unwrap(), 0);
        assert_eq!(index.add(vec![0.0, 1.0], payload("b")).await.unwrap(), 1);
        assert_eq!(index.len().await, 2);
        assert_eq!(index.dimension().await, Some(2));
    }

    #[tokio::test]
    async fn test_search_orders_by_score() {
        let index = VectorIndex::new();
        index.add(vec![0.0, 1.0], payload("up")).await.unwrap();
        index.add(vec![1.0, 0.0], payload("right")).await.unwrap();
        index.add(vec![1.0, 1.0], payload("diagonal")).await.unwrap();

        let results = index.search(&[1.0, 0.1], 3).await;
        let texts: Vec<&str> = results.iter().map(|r| r.payload.text.as_str()).collect();
        assert_eq!(texts, vec!["right", "diagonal", "up"]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn test_ties_break_by_ascending_id() {
        let index = VectorIndex::new();
        for name in ["a", "b", "c"] {
            index.add(vec![2.0, 0.0], payload(name)).await.unwrap();
        }
        let ids: Vec<u64> = index.search(&[1.0, 0.0], 3).await.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_self_similarity_ranks_first() {
        let index = VectorIndex::new();
        let vectors = [
            vec![0.3, -0.2, 0.9],
            vec![-0.5, 0.5, 0.1],
            vec![0.7, 0.7, -0.1],
        ];
        for (i, v) in vectors.iter().enumerate() {
            index.add(v.clone(), payload(&i.to_string())).await.unwrap();
        }

        for (i, v) in vectors.iter().enumerate() {
            let top = &index.search(v, 1).await[0];
            assert_eq!(top.id, i as u64);
            assert!((top.score - 1.0).abs() < 1e-5);
        }
    }

    #[tokio::test]
    async fn test_k_larger_than_len_and_zero_k() {
        let index = VectorIndex::new();
        index.add(vec![1.0], payload("only")).await.unwrap();

        assert_eq!(index.search(&[1.0], 10).await.len(), 1);
        assert!(index.search(&[1.0], 0).await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_index_search() {
        let index = VectorIndex::new();
        assert!(index.is_empty().await);
        assert!(index.search(&[1.0, 2.0], 5).await.is_empty());
        assert_eq!(index.dimension().await, None);
    }

    #[tokio::test]
    async fn test_dimension_mismatch_leaves_index_unchanged() {
        let index = VectorIndex::new();
        index.add(vec![1.0, 0.0, 0.0], payload("a")).await.unwrap();

        let err = index.add(vec![1.0, 0.0], payload("b")).await.unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(index.len().await, 1);

        // the next successful add continues the id sequence
        assert_eq!(index.add(vec![0.0, 1.0, 0.0], payload("c")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_batch_assigns_sequential_ids() {
        let index = VectorIndex::new();
        index.add(vec![1.0, 0.0], payload("first")).await.unwrap();

        let ids = index
            .add_batch(vec![
                (vec![0.0, 1.0], payload("second")),
                (vec![1.0, 1.0], payload("third")),
            ])
            .await
            .unwrap();
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(index.len().await, 3);
    }

    #[tokio::test]
    async fn test_add_batch_with_mixed_lengths_is_rejected_whole() {
        let index = VectorIndex::new();

        let err = index
            .add_batch(vec![
                (vec![1.0, 0.0], payload("ok")),
                (vec![1.0, 0.0, 0.0], payload("too long")),
                (vec![0.0, 1.0], payload("ok too")),
            ])
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
        assert!(index.is_empty().await);
        assert_eq!(index.dimension().await, None);

        // a rejected batch does not consume ids
        assert_eq!(index.add(vec![1.0, 0.0, 0.0], payload("a")).await.unwrap(), 0);
        assert!(
            index
                .add_batch(vec![(vec![1.0, 0.0, 0.0], payload("b")), (Vec::new(), payload("c"))])
                .await
                .is_err()
        );
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn test_empty_vector_rejected() {
        let index = VectorIndex::new();
        assert!(matches!(
            index.add(Vec::new(), payload("nothing")).await,
            Err(IndexError::EmptyVector)
        ));
        assert_eq!(index.dimension().await, None);
    }

    #[tokio::test]
    async fn test_mismatched_query_scores_zero() {
        let index = VectorIndex::new();
        index.add(vec![1.0, 0.0], payload("a")).await.unwrap();

        let results = index.search(&[1.0, 0.0, 0.0], 1).await;
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 0.0);
    }

    #[tokio::test]
    async fn test_entries_snapshot() {
        let index = VectorIndex::new();
        index.add(vec![1.0, 2.0], payload("a")).await.unwrap();

        let entries = index.entries().await;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].vector, vec![1.0, 2.0]);
        assert_eq!(entries[0].payload.text, "a");
    }

    #[tokio::test]
    async fn test_concurrent_add_and_search() {
        let index = Arc::new(VectorIndex::new());
        let mut handles = Vec::new();

        for i in 0..8 {
            let index = Arc::clone(&index);
            handles.push(tokio::spawn(async move {
                for j in 0..25 {
                    let v = vec![(i * 25 + j) as f32 + 1.0, 1.0];
                    index.add(v, payload("x")).await.unwrap();
                    let hits = index.search(&[1.0, 1.0], 5).await;
                    assert!(!hits.is_empty() && hits.len() <= 5);
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let mut ids: Vec<u64> = index.entries().await.iter().map(|e| e.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, (0..200).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn test_noop_persistence() {
        let persistence = NoopPersistence;
        persistence.save(&[]).await.unwrap();
        assert!(persistence.load().await.unwrap().is_empty());
    }
}
