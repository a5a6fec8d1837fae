//! # learnbase CLI (`lrn`)
//!
//! The `lrn` binary drives the library: database initialization, content
//! ingestion, semantic search, question answering, and index maintenance.
//!
//! ## Usage
//!
//! ```bash
//! lrn --config ./learnbase.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lrn init` | Create the SQLite database and schema |
//! | `lrn add <url>` | Extract a web page and ingest it |
//! | `lrn add <url> --file t.txt` | Ingest transcript/manual text for a URL |
//! | `lrn search "<query>"` | Rank stored chunks against a query |
//! | `lrn ask "<question>"` | Answer a question from the stored corpus |
//! | `lrn delete <url>` | Remove all chunks for a source URL |
//! | `lrn stats` | Show index statistics |

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};

use learnbase::config::{load_config, Config};
use learnbase::embedding::create_embedder;
use learnbase::extract::{classify_url, WebExtractor};
use learnbase::generate::create_generator;
use learnbase::models::ContentType;
use learnbase::service::ResourceService;
use learnbase::store::{SqliteStore, VectorStore};
use learnbase::db;

/// learnbase: a learning-resource ingestion and retrieval-augmented
/// answering pipeline.
#[derive(Parser)]
#[command(
    name = "lrn",
    about = "learnbase — ingest learning resources and ask questions about them",
    version
)]
struct Cli {
    /// Path to configuration file (TOML). Missing file = defaults.
    #[arg(long, global = true, default_value = "./learnbase.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Ingest a resource.
    ///
    /// Without `--file`, the URL is fetched and its main content extracted.
    /// With `--file`, the file's text is ingested for the URL; the path for
    /// YouTube transcripts and manual notes.
    Add {
        /// Source URL identifying the resource.
        url: String,

        /// Read the text from this file instead of fetching the URL.
        #[arg(long)]
        file: Option<PathBuf>,

        /// Override the resource title.
        #[arg(long)]
        title: Option<String>,

        /// Content type for `--file` ingestion: web, youtube, or manual.
        #[arg(long = "type")]
        content_type: Option<String>,
    },

    /// Rank stored chunks against a query.
    Search {
        /// The search query.
        query: String,

        /// Maximum number of results to display.
        #[arg(long)]
        limit: Option<usize>,

        /// Only search one content type: web, youtube, or manual.
        #[arg(long = "type")]
        content_type: Option<String>,
    },

    /// Answer a question from the stored corpus.
    Ask {
        /// The question.
        question: String,

        /// Maximum number of sources to ground the answer in.
        #[arg(long)]
        sources: Option<usize>,
    },

    /// Remove all chunks for a source URL.
    Delete {
        /// The source URL to remove.
        url: String,
    },

    /// Show index statistics.
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("learnbase=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Init => run_init(&config).await,
        Commands::Add {
            url,
            file,
            title,
            content_type,
        } => run_add(&config, &url, file, title, content_type).await,
        Commands::Search {
            query,
            limit,
            content_type,
        } => run_search(&config, &query, limit, content_type).await,
        Commands::Ask { question, sources } => run_ask(&config, &question, sources).await,
        Commands::Delete { url } => run_delete(&config, &url).await,
        Commands::Stats => run_stats(&config).await,
    }
}

async fn open_store(config: &Config) -> Result<SqliteStore> {
    let pool = db::connect(&config.db.path).await?;
    let store = SqliteStore::new(pool);
    store.migrate().await?;
    Ok(store)
}

fn build_service(config: &Config, store: SqliteStore, with_generator: bool) -> Result<ResourceService> {
    let embedder = create_embedder(&config.embedding)?;
    let generator = if with_generator {
        create_generator(&config.llm)?
    } else {
        None
    };
    Ok(ResourceService::new(
        Arc::from(embedder),
        Arc::new(store),
        generator.map(Arc::from),
    )
    .with_chunking(config.chunking.chunk_size, config.chunking.overlap))
}

fn parse_content_type(s: Option<String>) -> Result<Option<ContentType>> {
    Ok(match s {
        Some(value) => Some(ContentType::from_str(&value)?),
        None => None,
    })
}

async fn run_init(config: &Config) -> Result<()> {
    open_store(config).await?;
    println!("initialized {}", config.db.path.display());
    Ok(())
}

async fn run_add(
    config: &Config,
    url: &str,
    file: Option<PathBuf>,
    title: Option<String>,
    content_type: Option<String>,
) -> Result<()> {
    let store = open_store(config).await?;
    let service = build_service(config, store, false)?;

    let outcome = match file {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            let content_type = match parse_content_type(content_type)? {
                Some(ct) => ct,
                None => match classify_url(url) {
                    ContentType::Youtube => ContentType::Youtube,
                    _ => ContentType::Manual,
                },
            };
            let title = title.unwrap_or_else(|| url.to_string());
            let metadata = serde_json::json!({
                "source_file": path.display().to_string(),
            });
            service
                .ingest(&text, url, &title, content_type, metadata)
                .await?
        }
        None => {
            let extractor = WebExtractor::new(config.extraction.timeout_secs)?;
            service
                .ingest_url(&extractor, url, title.as_deref())
                .await?
        }
    };

    println!("add {}", url);
    println!("  status: {:?}", outcome.status);
    println!("  stored chunks: {}", outcome.stored_chunks);
    println!("  skipped chunks: {}", outcome.skipped_chunks);
    Ok(())
}

async fn run_search(
    config: &Config,
    query: &str,
    limit: Option<usize>,
    content_type: Option<String>,
) -> Result<()> {
    let store = open_store(config).await?;
    let service = build_service(config, store, false)?;
    let limit = limit.unwrap_or(config.retrieval.default_limit);
    let filter = parse_content_type(content_type)?;

    let results = service.search(query, limit, filter).await?;
    if results.is_empty() {
        println!("No results.");
        return Ok(());
    }

    for (i, result) in results.iter().take(limit).enumerate() {
        let chunk = &result.chunk;
        println!("{}. [{:.3}] {}", i + 1, result.similarity, chunk.title);
        println!("    url: {}", chunk.source_url);
        println!("    type: {}", chunk.content_type);
        println!(
            "    excerpt: \"{}\"",
            chunk.content.chars().take(200).collect::<String>().replace('\n', " ")
        );
        println!();
    }
    Ok(())
}

async fn run_ask(config: &Config, question: &str, sources: Option<usize>) -> Result<()> {
    let store = open_store(config).await?;
    let service = build_service(config, store, true)?;
    let max_sources = sources.unwrap_or(config.retrieval.max_sources);

    let response = service.ask(question, max_sources).await;

    println!("{}", response.answer);
    if response.confidence > 0.0 {
        println!();
        println!("confidence: {:.0}%", response.confidence * 100.0);
    }
    if !response.sources.is_empty() {
        println!("sources:");
        for (i, source) in response.sources.iter().enumerate() {
            println!(
                "  {}. {} ({:.0}% relevant) — {}",
                i + 1,
                source.chunk.title,
                source.similarity * 100.0,
                source.chunk.source_url
            );
        }
    }
    if let Some(error) = &response.error {
        eprintln!("error: {}", error);
    }
    Ok(())
}

async fn run_delete(config: &Config, url: &str) -> Result<()> {
    // Store-only operation: no embedding model needs to be initialized.
    let store = open_store(config).await?;
    let removed = store.delete_by_source_url(url).await?;
    if removed > 0 {
        println!("deleted {} chunks for {}", removed, url);
    } else {
        println!("nothing stored for {}", url);
    }
    Ok(())
}

async fn run_stats(config: &Config) -> Result<()> {
    let store = open_store(config).await?;
    let stats = store.stats().await?;

    println!("learnbase — index stats");
    println!("  chunks:  {}", stats.total_chunks);
    println!("  sources: {}", stats.unique_sources);
    if !stats.content_type_counts.is_empty() {
        println!("  by type:");
        for (content_type, count) in &stats.content_type_counts {
            println!("    {:<8} {}", content_type, count);
        }
    }
    Ok(())
}
