//! The retrieval service façade.
//!
//! [`ResourceService`] owns the two pipelines the rest of the system calls:
//! chunk → embed → upsert on ingestion, and embed → search on query. It is
//! constructed once with its collaborators injected (an [`Embedder`], a
//! [`VectorStore`], and optionally a [`Generator`]) and passed by reference
//! to callers; there is no process-wide state.
//!
//! Concurrency: ingestions of different source URLs and searches may run
//! concurrently; the service does not serialize concurrent ingestions of the
//! *same* URL; callers wanting that must hold their own per-URL lock. A
//! search is not guaranteed to observe writes that commit concurrently
//! with it.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use crate::answer;
use crate::chunk::{self, DEFAULT_CHUNK_SIZE, DEFAULT_OVERLAP};
use crate::error::Result;
use crate::extract::ContentExtractor;
use crate::generate::Generator;
use crate::models::{
    ContentChunk, ContentType, IndexStats, IngestOutcome, IngestStatus, SearchResult,
    MAX_CONTENT_CHARS,
};
use crate::embedding::Embedder;
use crate::store::VectorStore;

/// Façade over the chunking, embedding, indexing, and answering pipeline.
pub struct ResourceService {
    embedder: Arc<dyn Embedder>,
    store: Arc<dyn VectorStore>,
    generator: Option<Arc<dyn Generator>>,
    chunk_size: usize,
    overlap: usize,
}

impl ResourceService {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn VectorStore>,
        generator: Option<Arc<dyn Generator>>,
    ) -> Self {
        Self {
            embedder,
            store,
            generator,
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_OVERLAP,
        }
    }

    /// Override the chunking window; `overlap` must be below `chunk_size`.
    pub fn with_chunking(mut self, chunk_size: usize, overlap: usize) -> Self {
        assert!(overlap < chunk_size, "overlap must be smaller than chunk_size");
        self.chunk_size = chunk_size;
        self.overlap = overlap;
        self
    }

    /// Ingest raw text for `url`: chunk, embed, and store.
    ///
    /// Text below the minimum usable length for its content type yields a
    /// `ContentTooShort` outcome and stores nothing. Per-chunk embedding
    /// failures are skipped and counted, so a single bad chunk never fails
    /// the document; an unreachable index fails the whole operation.
    pub async fn ingest(
        &self,
        text: &str,
        url: &str,
        title: &str,
        content_type: ContentType,
        metadata: serde_json::Value,
    ) -> Result<IngestOutcome> {
        let text = text.trim();
        let minimum = content_type.min_text_len();
        if text.len() < minimum {
            warn!(url, length = text.len(), minimum, "content too short; not storing");
            return Ok(IngestOutcome {
                status: IngestStatus::ContentTooShort,
                stored_chunks: 0,
                skipped_chunks: 0,
            });
        }

        let pieces = chunk::split_text(text, self.chunk_size, self.overlap);
        let total = pieces.len() as i64;
        let now = Utc::now();
        let dims = self.embedder.dims();

        let mut chunks: Vec<ContentChunk> = Vec::with_capacity(pieces.len());
        let mut skipped = 0usize;

        for (i, piece) in pieces.iter().enumerate() {
            let embedding = match self.embedder.embed_one(piece).await {
                Ok(vector) if vector.len() == dims => vector,
                Ok(vector) => {
                    warn!(
                        url,
                        chunk = i,
                        got = vector.len(),
                        expected = dims,
                        "embedding dimension mismatch; skipping chunk"
                    );
                    skipped += 1;
                    continue;
                }
                Err(e) => {
                    warn!(url, chunk = i, error = %e, "embedding failed; skipping chunk");
                    skipped += 1;
                    continue;
                }
            };

            chunks.push(ContentChunk {
                id: chunk::chunk_id(url, i as i64, piece),
                content: bound_content(piece),
                source_url: url.to_string(),
                title: title.to_string(),
                content_type,
                chunk_index: i as i64,
                total_chunks: total,
                timestamp: now,
                metadata: metadata.clone(),
                embedding,
            });
        }

        if chunks.is_empty() {
            warn!(url, attempted = pieces.len(), "no chunks survived embedding");
            return Ok(IngestOutcome {
                status: IngestStatus::NothingStored,
                stored_chunks: 0,
                skipped_chunks: skipped,
            });
        }

        self.store.upsert(&chunks).await?;
        info!(url, stored = chunks.len(), skipped, "ingested content");

        Ok(IngestOutcome {
            status: IngestStatus::Stored,
            stored_chunks: chunks.len(),
            skipped_chunks: skipped,
        })
    }

    /// Extract a URL with `extractor` and ingest the result.
    ///
    /// Note: this does not delete previously stored chunks for the URL
    /// first. Edited content at the same chunk position gets a new id, so
    /// the old row lingers until `delete_source` is called; callers wanting
    /// clean re-ingestion should delete first.
    pub async fn ingest_url(
        &self,
        extractor: &dyn ContentExtractor,
        url: &str,
        title_override: Option<&str>,
    ) -> Result<IngestOutcome> {
        let extracted = extractor.extract(url).await?;
        let title = title_override.unwrap_or(&extracted.title);
        self.ingest(
            &extracted.text,
            &extracted.url,
            title,
            extracted.content_type,
            extracted.metadata.clone(),
        )
        .await
    }

    /// Semantic search: embed the query and rank stored chunks by cosine
    /// similarity, descending.
    ///
    /// Over-fetches `limit × 2` candidates and returns all of them so callers
    /// can apply their own relevance thresholds without a second round trip.
    /// An empty or whitespace query returns no results.
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        filter: Option<ContentType>,
    ) -> Result<Vec<SearchResult>> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let query_vec = self.embedder.embed_one(query).await?;
        let mut results = self
            .store
            .search(&query_vec, limit.saturating_mul(2), filter)
            .await?;

        // The store contract already orders by similarity; re-assert it so
        // the guarantee holds for any backend.
        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        Ok(results)
    }

    /// Answer a question from the stored corpus.
    ///
    /// Never returns an error: every failure mode resolves to a valid
    /// [`ChatResponse`](crate::models::ChatResponse) with `error` populated
    /// and a human-readable answer describing the degraded state.
    pub async fn ask(&self, question: &str, max_sources: usize) -> crate::models::ChatResponse {
        let trimmed = question.trim();
        if trimmed.is_empty() {
            return answer::invalid_question(question);
        }

        match self.search(trimmed, max_sources, None).await {
            Ok(candidates) => {
                answer::compose(trimmed, candidates, max_sources, self.generator.as_deref()).await
            }
            Err(e) => {
                warn!(error = %e, "ask pipeline failed");
                answer::failure(trimmed, &e)
            }
        }
    }

    /// Remove all chunks for `url`. Returns `true` iff anything was removed;
    /// deleting an absent URL is a no-op.
    pub async fn delete_source(&self, url: &str) -> Result<bool> {
        let removed = self.store.delete_by_source_url(url).await?;
        info!(url, removed, "deleted source");
        Ok(removed > 0)
    }

    /// Aggregate statistics over the index.
    pub async fn stats(&self) -> Result<IndexStats> {
        self.store.stats().await
    }
}

/// Enforce the storage bound on chunk content length.
fn bound_content(piece: &str) -> String {
    if piece.chars().count() <= MAX_CONTENT_CHARS {
        piece.to_string()
    } else {
        piece.chars().take(MAX_CONTENT_CHARS).collect()
    }
}
