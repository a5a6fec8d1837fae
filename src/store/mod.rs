//! Storage abstraction for the vector index.
//!
//! The [`VectorStore`] trait defines the operations the retrieval pipeline
//! needs from a backing index, enabling pluggable backends (SQLite,
//! in-memory). Implementations must be `Send + Sync` so ingestion and search
//! can run concurrently from async tasks.
//!
//! # Operations
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`upsert`](VectorStore::upsert) | Insert-or-replace chunks by id |
//! | [`search`](VectorStore::search) | Cosine-similarity nearest neighbors |
//! | [`delete_by_source_url`](VectorStore::delete_by_source_url) | Remove all chunks of one source |
//! | [`stats`](VectorStore::stats) | Aggregate counts over the index |
//!
//! # Failure semantics
//!
//! Backing-store failures surface as [`Error::IndexUnavailable`]; a search
//! against an empty index returns an empty list, not an error. Result
//! ordering under equal similarity is implementation-defined.
//!
//! [`Error::IndexUnavailable`]: crate::error::Error::IndexUnavailable

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{ContentChunk, ContentType, IndexStats, SearchResult};

pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;

/// Abstract vector index over [`ContentChunk`] records.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert chunks, replacing any existing record with the same id.
    ///
    /// Chunk ids are content hashes, so re-ingesting identical content is
    /// idempotent at the record level. Changed content at the same logical
    /// position produces a new id; the old row stays until the caller
    /// deletes by source URL.
    async fn upsert(&self, chunks: &[ContentChunk]) -> Result<()>;

    /// Return up to `k` chunks ordered by descending cosine similarity to
    /// `query_vec`, optionally restricted to one content type.
    async fn search(
        &self,
        query_vec: &[f32],
        k: usize,
        filter: Option<ContentType>,
    ) -> Result<Vec<SearchResult>>;

    /// Remove all chunks for `url`, returning the removed count.
    /// Idempotent: an absent URL removes zero rows.
    async fn delete_by_source_url(&self, url: &str) -> Result<u64>;

    /// Aggregate counts over the index.
    async fn stats(&self) -> Result<IndexStats>;
}
