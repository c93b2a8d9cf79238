use std::env;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_BASE_URL: &str = "https://api.mistral.ai/v1";
const DEFAULT_LLM_MODEL: &str = "mistral-small-latest";
const DEFAULT_EMBEDDING_MODEL: &str = "mistral-embed";
const DEFAULT_CHUNK_SIZE: usize = 512;
const DEFAULT_CHUNK_OVERLAP: usize = 200;
const DEFAULT_MAX_INDEXED_CHUNKS: usize = 10;
const DEFAULT_SIMILARITY_TOP_K: usize = 2;
const DEFAULT_SUMMARY_CONTEXT_TOKENS: usize = 3072;
const DEFAULT_INDEX_CACHE_CAPACITY: usize = 16;
const DEFAULT_UPLOAD_DIR: &str = "uploads";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
const DEFAULT_SESSION_IDLE_TTL_SECS: u64 = 3600;

/// Name of the environment variable holding the remote API key.
pub const API_KEY_VAR: &str = "MISTRAL_API_KEY";
/// Name of the environment variable pointing at a mounted secret file.
pub const API_KEY_FILE_VAR: &str = "MISTRAL_API_KEY_FILE";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
    /// Secret file referenced by `MISTRAL_API_KEY_FILE` could not be read.
    #[error("Failed to read secret file {path}: {source}")]
    SecretFile {
        /// Path that was configured.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
}

/// Runtime configuration for the Rusty Paper server.
#[derive(Clone, Debug)]
pub struct Config {
    /// API key presented to the remote model provider.
    pub api_key: String,
    /// Root URL of the remote model API.
    pub api_base_url: String,
    /// Generation model identifier.
    pub llm_model: String,
    /// Embedding model identifier.
    pub embedding_model: String,
    /// Token budget for each chunk.
    pub chunk_size: usize,
    /// Token overlap between adjacent chunks.
    pub chunk_overlap: usize,
    /// Maximum number of chunks indexed per upload; `None` indexes everything.
    pub max_indexed_chunks: Option<usize>,
    /// Number of chunks retrieved by the vector engine.
    pub similarity_top_k: usize,
    /// Token budget for each tree-summarize prompt.
    pub summary_context_tokens: usize,
    /// Number of built indexes kept in memory, keyed by content hash.
    pub index_cache_capacity: usize,
    /// Directory used for content-addressed upload storage.
    pub upload_dir: PathBuf,
    /// Request body limit applied to uploads.
    pub max_upload_bytes: usize,
    /// Timeout applied to every remote call.
    pub request_timeout: Duration,
    /// How long an untouched session survives; `None` keeps sessions until closed.
    pub session_idle_ttl: Option<Duration>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

impl Config {
    /// Load configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup, validating along the way.
    ///
    /// The secret is resolved first so that a missing key is reported before anything else.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_key = resolve_api_key(&lookup)?;
        let chunk_size: usize = parse_or(&lookup, "TEXT_SPLITTER_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?;
        if chunk_size == 0 {
            return Err(ConfigError::InvalidValue("TEXT_SPLITTER_CHUNK_SIZE".into()));
        }
        let chunk_overlap: usize = parse_or(
            &lookup,
            "TEXT_SPLITTER_CHUNK_OVERLAP",
            DEFAULT_CHUNK_OVERLAP.min(chunk_size - 1),
        )?;
        if chunk_overlap >= chunk_size {
            return Err(ConfigError::InvalidValue(
                "TEXT_SPLITTER_CHUNK_OVERLAP".into(),
            ));
        }
        let max_indexed_chunks: usize =
            parse_or(&lookup, "MAX_INDEXED_CHUNKS", DEFAULT_MAX_INDEXED_CHUNKS)?;
        let similarity_top_k: usize =
            parse_or(&lookup, "SIMILARITY_TOP_K", DEFAULT_SIMILARITY_TOP_K)?;
        if similarity_top_k == 0 {
            return Err(ConfigError::InvalidValue("SIMILARITY_TOP_K".into()));
        }
        let summary_context_tokens: usize = parse_or(
            &lookup,
            "SUMMARY_CONTEXT_TOKENS",
            DEFAULT_SUMMARY_CONTEXT_TOKENS,
        )?;
        if summary_context_tokens == 0 {
            return Err(ConfigError::InvalidValue("SUMMARY_CONTEXT_TOKENS".into()));
        }
        let timeout_secs: u64 =
            parse_or(&lookup, "REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS)?;
        let session_ttl_secs: u64 = parse_or(
            &lookup,
            "SESSION_IDLE_TTL_SECS",
            DEFAULT_SESSION_IDLE_TTL_SECS,
        )?;

        Ok(Self {
            api_key,
            api_base_url: lookup("MISTRAL_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into()),
            llm_model: lookup("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.into()),
            embedding_model: lookup("EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.into()),
            chunk_size,
            chunk_overlap,
            max_indexed_chunks: (max_indexed_chunks > 0).then_some(max_indexed_chunks),
            similarity_top_k,
            summary_context_tokens,
            index_cache_capacity: parse_or(
                &lookup,
                "INDEX_CACHE_CAPACITY",
                DEFAULT_INDEX_CACHE_CAPACITY,
            )?,
            upload_dir: lookup("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOAD_DIR)),
            max_upload_bytes: parse_or(&lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
            request_timeout: Duration::from_secs(timeout_secs.max(1)),
            session_idle_ttl: (session_ttl_secs > 0).then(|| Duration::from_secs(session_ttl_secs)),
            server_port: lookup("SERVER_PORT")
                .map(|value| {
                    value
                        .trim()
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

/// Read `.env` (when present) and load the configuration from the environment.
///
/// Runs before tracing is installed, so failures are reported by the caller.
pub fn load() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    Config::from_env()
}

fn resolve_api_key<F>(lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(key) = lookup(API_KEY_VAR) {
        return Ok(key.trim().to_string());
    }

    let Some(path) = lookup(API_KEY_FILE_VAR).map(PathBuf::from) else {
        return Err(ConfigError::MissingVariable(API_KEY_VAR.into()));
    };
    let contents = std::fs::read_to_string(&path)
        .map_err(|source| ConfigError::SecretFile { path, source })?;
    let key = contents.trim();
    if key.is_empty() {
        return Err(ConfigError::MissingVariable(API_KEY_VAR.into()));
    }
    Ok(key.to_string())
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue(key.to_string())),
        None => Ok(default),
    }
}
