//! # learnbase
//!
//! A learning-resource ingestion and retrieval-augmented answering pipeline.
//!
//! learnbase stores extracted web and video-transcript text in a vector
//! index (chunked with sentence-boundary snapping and embedded with a
//! pluggable model) and answers questions about the stored corpus via
//! semantic retrieval plus an optional LLM generation step.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌──────────────────┐   ┌─────────────┐
//! │ Extractor  │──▶│ ResourceService  │──▶│ VectorStore │
//! │ web / yt   │   │ chunk + embed    │   │ sqlite/mem  │
//! └────────────┘   └────────┬─────────┘   └──────┬──────┘
//!                           │ ask                │ search
//!                           ▼                    │
//!                  ┌──────────────────┐          │
//!                  │ Answer composer  │◀─────────┘
//!                  │ LLM or template  │
//!                  └──────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use learnbase::models::ContentType;
//! use learnbase::service::ResourceService;
//! use learnbase::store::InMemoryStore;
//!
//! # async fn example(embedder: Arc<dyn learnbase::embedding::Embedder>) -> learnbase::error::Result<()> {
//! let service = ResourceService::new(embedder, Arc::new(InMemoryStore::new()), None);
//!
//! service
//!     .ingest(
//!         "Pandas dataframes hold tabular data...",
//!         "https://example.com/pandas",
//!         "Pandas intro",
//!         ContentType::Web,
//!         serde_json::json!({}),
//!     )
//!     .await?;
//!
//! let response = service.ask("what is a dataframe?", 3).await;
//! println!("{}", response.answer);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`chunk`] | Overlapping sentence-snapped chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`extract`] | Web content extraction boundary |
//! | [`store`] | Vector index trait + SQLite / in-memory backends |
//! | [`service`] | Ingestion and retrieval façade |
//! | [`answer`] | RAG answer composition |
//! | [`generate`] | LLM generation collaborator |
//! | [`db`] | Database connection |
//! | [`error`] | Typed error taxonomy |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod extract;
pub mod generate;
pub mod models;
pub mod service;
pub mod store;
