//! Error taxonomy for the ingestion and retrieval pipeline.
//!
//! Per-chunk embedding failures are counted and skipped by the caller, never
//! raised for the whole batch; index-connectivity failures surface as a single
//! [`Error::IndexUnavailable`] for the operation that hit them.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("content from {url} too short: {length} chars (minimum {minimum})")]
    ContentTooShort {
        url: String,
        length: usize,
        minimum: usize,
    },

    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("query must not be empty")]
    InvalidQuery,

    #[error("content not extractable: {0}")]
    NotExtractable(String),

    #[error("extraction failed: {0}")]
    Extraction(String),

    #[error("answer generation failed: {0}")]
    GenerationFailed(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<sqlx::Error> for Error {
    fn from(e: sqlx::Error) -> Self {
        Error::IndexUnavailable(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
