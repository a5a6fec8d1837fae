//! SQLite-backed [`VectorStore`].
//!
//! Chunks are rows in a single `chunks` table with the embedding stored as a
//! little-endian `f32` BLOB. Similarity search fetches candidate rows
//! (optionally filtered by content type) and computes cosine similarity in
//! Rust, then sorts and truncates to `k`.

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::error::{Error, Result};
use crate::models::{ContentChunk, ContentType, IndexStats, SearchResult};

use super::VectorStore;

/// SQLite implementation of the [`VectorStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create the schema. Idempotent; safe to run on every startup.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chunks (
                id TEXT PRIMARY KEY,
                content TEXT NOT NULL,
                source_url TEXT NOT NULL,
                title TEXT NOT NULL,
                content_type TEXT NOT NULL,
                chunk_index INTEGER NOT NULL,
                total_chunks INTEGER NOT NULL,
                created_at INTEGER NOT NULL,
                metadata_json TEXT NOT NULL DEFAULT '{}',
                embedding BLOB NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_source_url ON chunks(source_url)")
            .execute(&self.pool)
            .await?;
        sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_content_type ON chunks(content_type)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

fn row_to_chunk(row: &sqlx::sqlite::SqliteRow) -> Result<ContentChunk> {
    let content_type_str: String = row.get("content_type");
    let metadata_json: String = row.get("metadata_json");
    let created_at: i64 = row.get("created_at");
    let blob: Vec<u8> = row.get("embedding");

    Ok(ContentChunk {
        id: row.get("id"),
        content: row.get("content"),
        source_url: row.get("source_url"),
        title: row.get("title"),
        content_type: ContentType::from_str(&content_type_str)
            .map_err(|e| Error::IndexUnavailable(format!("corrupt row: {}", e)))?,
        chunk_index: row.get("chunk_index"),
        total_chunks: row.get("total_chunks"),
        timestamp: chrono::DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
        metadata: serde_json::from_str(&metadata_json).unwrap_or(serde_json::json!({})),
        embedding: blob_to_vec(&blob),
    })
}

#[async_trait]
impl VectorStore for SqliteStore {
    async fn upsert(&self, chunks: &[ContentChunk]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        for chunk in chunks {
            sqlx::query(
                r#"
                INSERT INTO chunks (id, content, source_url, title, content_type,
                                    chunk_index, total_chunks, created_at,
                                    metadata_json, embedding)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    content = excluded.content,
                    source_url = excluded.source_url,
                    title = excluded.title,
                    content_type = excluded.content_type,
                    chunk_index = excluded.chunk_index,
                    total_chunks = excluded.total_chunks,
                    created_at = excluded.created_at,
                    metadata_json = excluded.metadata_json,
                    embedding = excluded.embedding
                "#,
            )
            .bind(&chunk.id)
            .bind(&chunk.content)
            .bind(&chunk.source_url)
            .bind(&chunk.title)
            .bind(chunk.content_type.as_str())
            .bind(chunk.chunk_index)
            .bind(chunk.total_chunks)
            .bind(chunk.timestamp.timestamp())
            .bind(chunk.metadata.to_string())
            .bind(vec_to_blob(&chunk.embedding))
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn search(
        &self,
        query_vec: &[f32],
        k: usize,
        filter: Option<ContentType>,
    ) -> Result<Vec<SearchResult>> {
        let rows = match filter {
            Some(content_type) => {
                sqlx::query("SELECT * FROM chunks WHERE content_type = ?")
                    .bind(content_type.as_str())
                    .fetch_all(&self.pool)
                    .await?
            }
            None => sqlx::query("SELECT * FROM chunks").fetch_all(&self.pool).await?,
        };

        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            let chunk = row_to_chunk(row)?;
            let similarity = cosine_similarity(query_vec, &chunk.embedding) as f64;
            results.push(SearchResult { chunk, similarity });
        }

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(k);
        Ok(results)
    }

    async fn delete_by_source_url(&self, url: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunks WHERE source_url = ?")
            .bind(url)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn stats(&self) -> Result<IndexStats> {
        let total_chunks: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunks")
            .fetch_one(&self.pool)
            .await?;

        let unique_sources: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT source_url) FROM chunks")
                .fetch_one(&self.pool)
                .await?;

        let rows = sqlx::query(
            "SELECT content_type, COUNT(*) AS n FROM chunks GROUP BY content_type",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut content_type_counts: BTreeMap<String, i64> = BTreeMap::new();
        for row in &rows {
            content_type_counts.insert(row.get("content_type"), row.get("n"));
        }

        Ok(IndexStats {
            total_chunks,
            unique_sources,
            content_type_counts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use chrono::Utc;
    use tempfile::TempDir;

    async fn test_store() -> (TempDir, SqliteStore) {
        let tmp = TempDir::new().unwrap();
        let pool = db::connect(&tmp.path().join("test.sqlite")).await.unwrap();
        let store = SqliteStore::new(pool);
        store.migrate().await.unwrap();
        (tmp, store)
    }

    fn make_chunk(id: &str, url: &str, embedding: Vec<f32>) -> ContentChunk {
        ContentChunk {
            id: id.to_string(),
            content: format!("content of {}", id),
            source_url: url.to_string(),
            title: "Test".to_string(),
            content_type: ContentType::Web,
            chunk_index: 0,
            total_chunks: 1,
            timestamp: Utc::now(),
            metadata: serde_json::json!({"domain": "example.com"}),
            embedding,
        }
    }

    #[tokio::test]
    async fn test_migrate_idempotent() {
        let (_tmp, store) = test_store().await;
        store.migrate().await.unwrap();
    }

    #[tokio::test]
    async fn test_upsert_search_roundtrip() {
        let (_tmp, store) = test_store().await;
        store
            .upsert(&[
                make_chunk("a", "u1", vec![1.0, 0.0]),
                make_chunk("b", "u2", vec![0.0, 1.0]),
            ])
            .await
            .unwrap();

        let results = store.search(&[1.0, 0.0], 10, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].chunk.id, "a");
        assert!(results[0].similarity > results[1].similarity);
        assert_eq!(results[0].chunk.metadata["domain"], "example.com");
        assert_eq!(results[0].chunk.embedding, vec![1.0, 0.0]);
    }

    #[tokio::test]
    async fn test_upsert_replaces_same_id() {
        let (_tmp, store) = test_store().await;
        let mut chunk = make_chunk("a", "u1", vec![1.0, 0.0]);
        store.upsert(&[chunk.clone()]).await.unwrap();

        chunk.content = "updated".to_string();
        store.upsert(&[chunk]).await.unwrap();

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 1);

        let results = store.search(&[1.0, 0.0], 1, None).await.unwrap();
        assert_eq!(results[0].chunk.content, "updated");
    }

    #[tokio::test]
    async fn test_delete_and_stats() {
        let (_tmp, store) = test_store().await;
        store
            .upsert(&[
                make_chunk("a", "gone", vec![1.0]),
                make_chunk("b", "gone", vec![1.0]),
                make_chunk("c", "kept", vec![1.0]),
            ])
            .await
            .unwrap();

        assert_eq!(store.delete_by_source_url("gone").await.unwrap(), 2);
        assert_eq!(store.delete_by_source_url("gone").await.unwrap(), 0);

        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total_chunks, 1);
        assert_eq!(stats.unique_sources, 1);
        assert_eq!(stats.content_type_counts.get("web"), Some(&1));
    }

    #[tokio::test]
    async fn test_empty_index_search() {
        let (_tmp, store) = test_store().await;
        let results = store.search(&[1.0, 0.0], 5, None).await.unwrap();
        assert!(results.is_empty());
    }
}
