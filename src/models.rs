//! Core data models used throughout learnbase.
//!
//! These types represent the extracted documents, content chunks, and search
//! results that flow through the ingestion and retrieval pipeline.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Maximum stored length of a chunk's content, in characters.
pub const MAX_CONTENT_CHARS: usize = 10_000;

/// Kind of source a piece of content was extracted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    /// A web page (tutorial, article, documentation).
    Web,
    /// A YouTube video transcript.
    Youtube,
    /// Text supplied directly by the caller.
    Manual,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Web => "web",
            ContentType::Youtube => "youtube",
            ContentType::Manual => "manual",
        }
    }

    /// Minimum usable text length for this kind of content. Web pages below
    /// 100 characters are boilerplate remnants; transcripts can be shorter.
    pub fn min_text_len(&self) -> usize {
        match self {
            ContentType::Web => 100,
            ContentType::Youtube | ContentType::Manual => 50,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "web" => Ok(ContentType::Web),
            "youtube" => Ok(ContentType::Youtube),
            "manual" => Ok(ContentType::Manual),
            other => Err(Error::Config(format!(
                "unknown content type '{}'. Use web, youtube, or manual.",
                other
            ))),
        }
    }
}

/// Normalized output of a content extractor, validated at the ingestion
/// boundary before anything is chunked or embedded.
#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub title: String,
    pub text: String,
    pub url: String,
    pub content_type: ContentType,
    pub metadata: serde_json::Value,
}

/// A unit of retrievable text with its embedding.
///
/// Chunks are immutable once stored: re-ingesting identical input produces
/// the same ids (upsert replaces in place), and updates are modeled as
/// delete-by-source-url followed by re-insert.
#[derive(Debug, Clone, Serialize)]
pub struct ContentChunk {
    /// Content-hash id derived from `(source_url, chunk_index, content prefix)`.
    pub id: String,
    pub content: String,
    pub source_url: String,
    pub title: String,
    pub content_type: ContentType,
    /// Position within the source document; `0 <= chunk_index < total_chunks`.
    pub chunk_index: i64,
    pub total_chunks: i64,
    /// Ingestion time.
    pub timestamp: DateTime<Utc>,
    /// Open key/value map (domain, video duration, language, ...).
    pub metadata: serde_json::Value,
    /// Fixed-dimension embedding, computed once at ingestion.
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
}

/// A search hit pairing a chunk with its cosine similarity to the query.
/// Ephemeral; never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub chunk: ContentChunk,
    pub similarity: f64,
}

/// How a single document ingestion ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    /// At least one chunk was embedded and stored.
    Stored,
    /// The input text was below the minimum usable length; nothing stored.
    ContentTooShort,
    /// Chunks were produced but none survived embedding; nothing stored.
    NothingStored,
}

/// Outcome of an ingestion, reporting stored vs. skipped chunk counts.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub status: IngestStatus,
    pub stored_chunks: usize,
    pub skipped_chunks: usize,
}

impl IngestOutcome {
    pub fn is_success(&self) -> bool {
        self.status == IngestStatus::Stored
    }
}

/// A chatbot answer with the sources that grounded it.
///
/// `ask()` always produces one of these; failure modes resolve to a valid
/// response with `error` populated rather than an `Err`.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub answer: String,
    pub sources: Vec<SearchResult>,
    /// In `[0.0, 1.0]`; 0.0 when nothing was found or composition failed.
    pub confidence: f64,
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate statistics over the vector index.
#[derive(Debug, Clone, Serialize)]
pub struct IndexStats {
    pub total_chunks: i64,
    pub unique_sources: i64,
    /// Chunk counts keyed by content type name, in stable order.
    pub content_type_counts: BTreeMap<String, i64>,
}
