//! In-memory [`VectorStore`] for tests and embedded use.
//!
//! Chunks live in a `Vec` behind a `std::sync::RwLock`; search is brute-force
//! cosine similarity over every stored vector.

use std::collections::{BTreeMap, HashSet};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::error::{Error, Result};
use crate::models::{ContentChunk, ContentType, IndexStats, SearchResult};

use super::VectorStore;

/// Brute-force in-memory vector index.
#[derive(Default)]
pub struct InMemoryStore {
    chunks: RwLock<Vec<ContentChunk>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_poisoned() -> Error {
    Error::IndexUnavailable("in-memory store lock poisoned".into())
}

#[async_trait]
impl VectorStore for InMemoryStore {
    async fn upsert(&self, chunks: &[ContentChunk]) -> Result<()> {
        let mut stored = self.chunks.write().map_err(|_| lock_poisoned())?;
        for chunk in chunks {
            match stored.iter_mut().find(|c| c.id == chunk.id) {
                Some(existing) => *existing = chunk.clone(),
                None => stored.push(chunk.clone()),
            }
        }
        Ok(())
    }

    async fn search(
        &self,
        query_vec: &[f32],
        k: usize,
        filter: Option<ContentType>,
    ) -> Result<Vec<SearchResult>> {
        let stored = self.chunks.read().map_err(|_| lock_poisoned())?;
        let mut results: Vec<SearchResult> = stored
            .iter()
            .filter(|c| filter.map_or(true, |f| c.content_type == f))
            .map(|c| SearchResult {
                similarity: cosine_similarity(query_vec, &c.embedding) as f64,
                chunk: c.clone(),
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);
        Ok(results)
    }

    async fn delete_by_source_url(&self, url: &str) -> Result<u64> {
        let mut stored = self.chunks.write().map_err(|_| lock_poisoned())?;
        let before = stored.len();
        stored.retain(|c| c.source_url != url);
        Ok((before - stored.len()) as u64)
    }

    async fn stats(&self) -> Result<IndexStats> {
        let stored = self.chunks.read().map_err(|_| lock_poisoned())?;
        let sources: HashSet<&str> = stored.iter().map(|c| c.source_url.as_str()).collect();
        let mut counts: BTreeMap<String, i64> = BTreeMap::new();
        for chunk in stored.iter() {
            *counts.entry(chunk.content_type.as_str().to_string()).or_insert(0) += 1;
        }

        Ok(IndexStats {
            total_chunks: stored.len() as i64,
            unique_sources: sources.len() as i64,
            content_type_counts: counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn make_chunk(id: &str, url: &str, content_type: ContentType, embedding: Vec<f32>) -> ContentChunk {
        ContentChunk {
            id: id.to_string(),
            content: format!("content of {}", id),
            source_url: url.to_string(),
            title: "Test".to_string(),
            content_type,
            chunk_index: 0,
            total_chunks: 1,
            timestamp: Utc::now(),
            metadata: serde_json::json!({}),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_empty_search_returns_empty() {
        let store = InMemoryStore::new();
        let results = store.search(&[1.0, 0.0], 5, None).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn test_search_orders_by_similarity_desc() {
        let store = InMemoryStore::new();
        store
            .upsert(&[
                make_chunk("a", "u1", ContentType::Web, vec![1.0, 0.0]),
                make_chunk("b", "u2", ContentType::Web, vec![0.0, 1.0]),
                make_chunk("c", "u3", ContentType::Web, vec![0.7, 0.7]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 10, None).await.unwrap();
        assert_eq!(results.len(), 3);
        for pair in results.windows(2) {
            assert!(pair[0].similarity >= pair[1].similarity);
        }
        assert_eq!(results[0].chunk.id, "a");
    }

    #[tokio::test]
    async fn test_search_truncates_to_k() {
        let store = InMemoryStore::new();
        let chunks: Vec<ContentChunk> = (0..10)
            .map(|i| make_chunk(&format!("c{}", i), "u", ContentType::Web, vec![1.0, i as f32]))
            .collect();
        store.upsert(&chunks).await.unwrap();

        let results = store.search(&[1.0, 0.0], 4, None).await.unwrap();
        assert_eq!(results.len(), 4);
    }

    #[tokio::test]
    async fn test_content_type_filter() {
        let store = InMemoryStore::new();
        store
            .upsert(&[
                make_chunk("w", "u1", ContentType::Web, vec![1.0, 0.0]),
                make_chunk("y", "u2", ContentType::Youtube, vec![1.0, 0.0]),
            ])
            .await
            .unwrap();

        let results = store
            .search(&[1.0, 0.0], 10, Some(ContentType::Youtube))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, "y");
    }

    #[tokio::test]
    async fn test_upsert_same_id_replaces() {
        let store = InMemoryStore::new();
        let chunk = make_chunk("a", "u", ContentType::Web, vec![1.0, 0.0]);
        store.upsert(&[chunk.clone()]).await.unwrap();
        store.upsert(&[chunk]).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 1);
    }

    #[tokio::test]
    async fn test_delete_by_source_url_idempotent() {
        let store = InMemoryStore::new();
        store
            .upsert(&[
                make_chunk("a", "gone", ContentType::Web, vec![1.0, 0.0]),
                make_chunk("b", "gone", ContentType::Web, vec![0.5, 0.5]),
                make_chunk("c", "kept", ContentType::Web, vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete_by_source_url("gone").await.unwrap(), 2);
        assert_eq!(store.delete_by_source_url("gone").await.unwrap(), 0);

        let results = store.search(&[1.0, 0.0], 10, None).await.unwrap();
        assert!(results.iter().all(|r| r.chunk.source_url == "kept"));
    }

    #[tokio::test]
    async fn test_stats_counts() {
        let store = InMemoryStore::new();
        store
            .upsert(&[
                make_chunk("a", "u1", ContentType::Web, vec![1.0]),
                make_chunk("b", "u1", ContentType::Web, vec![1.0]),
                make_chunk("c", "u2", ContentType::Youtube, vec![1.0]),
            ])
            .await
            .unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 3);
        assert_eq!(stats.unique_sources, 2);
        assert_eq!(stats.content_type_counts.get("web"), Some(&2));
        assert_eq!(stats.content_type_counts.get("youtube"), Some(&1));
    }
}
