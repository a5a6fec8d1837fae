use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub db: DbConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/learnbase.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    /// Window width in characters.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Overlap between consecutive windows; must be below `chunk_size`.
    #[serde(default = "default_overlap")]
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            overlap: default_overlap(),
        }
    }
}

fn default_chunk_size() -> usize {
    500
}
fn default_overlap() -> usize {
    50
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Default result count for `search`.
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    /// Default source cap for `ask`.
    #[serde(default = "default_max_sources")]
    pub max_sources: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_sources: default_max_sources(),
        }
    }
}

fn default_limit() -> usize {
    5
}
fn default_max_sources() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `local`, `ollama`, `openai`, or `disabled`.
    #[serde(default = "default_embedding_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub dims: Option<usize>,
    /// Base URL for HTTP providers (Ollama host or OpenAI-compatible API).
    #[serde(default)]
    pub url: Option<String>,
    /// Environment variable holding the API key (OpenAI provider).
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            model: None,
            dims: None,
            url: None,
            api_key_env: None,
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_embedding_provider() -> String {
    "local".to_string()
}
fn default_max_retries() -> u32 {
    5
}
fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// `disabled`, `openai`, `together`, or `ollama`. When disabled, `ask`
    /// uses the deterministic templated answer.
    #[serde(default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Base URL override for OpenAI-compatible endpoints.
    #[serde(default)]
    pub url: Option<String>,
    /// Environment variable holding the API key, if the provider needs one.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: None,
            url: None,
            api_key_env: None,
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

fn default_llm_provider() -> String {
    "disabled".to_string()
}
fn default_max_tokens() -> u32 {
    1000
}
fn default_temperature() -> f32 {
    0.7
}
fn default_llm_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractionConfig {
    #[serde(default = "default_extraction_timeout")]
    pub timeout_secs: u64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_extraction_timeout(),
        }
    }
}

fn default_extraction_timeout() -> u64 {
    10
}

/// Load and validate configuration from a TOML file. A missing file yields
/// the defaults (local embeddings, generation disabled).
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))?;

    if config.chunking.chunk_size == 0 {
        return Err(Error::Config("chunking.chunk_size must be > 0".into()));
    }
    if config.chunking.overlap >= config.chunking.chunk_size {
        return Err(Error::Config(
            "chunking.overlap must be smaller than chunking.chunk_size".into(),
        ));
    }
    if config.retrieval.default_limit == 0 || config.retrieval.max_sources == 0 {
        return Err(Error::Config(
            "retrieval limits must be >= 1".into(),
        ));
    }

    match config.embedding.provider.as_str() {
        "local" | "ollama" | "openai" | "disabled" => {}
        other => {
            return Err(Error::Config(format!(
                "unknown embedding provider: '{}'. Must be local, ollama, openai, or disabled.",
                other
            )))
        }
    }
    if matches!(config.embedding.provider.as_str(), "ollama" | "openai") {
        if config.embedding.model.is_none() {
            return Err(Error::Config(format!(
                "embedding.model must be set when provider is '{}'",
                config.embedding.provider
            )));
        }
        if config.embedding.dims.unwrap_or(0) == 0 {
            return Err(Error::Config(format!(
                "embedding.dims must be > 0 when provider is '{}'",
                config.embedding.provider
            )));
        }
    }

    match config.llm.provider.as_str() {
        "disabled" | "openai" | "together" | "ollama" => {}
        other => {
            return Err(Error::Config(format!(
                "unknown llm provider: '{}'. Must be disabled, openai, together, or ollama.",
                other
            )))
        }
    }
    if config.llm.provider != "disabled" && config.llm.model.is_none() {
        return Err(Error::Config(
            "llm.model must be set when llm provider is enabled".into(),
        ));
    }

    Ok(config)
}
