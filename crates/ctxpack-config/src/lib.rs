//! Centralized configuration management for ctxpack
//!
//! This crate provides a unified configuration system with type-safe,
//! validated configuration loaded from a simple hierarchy:
//! 1. Safe defaults (defined as constants)
//! 2. Environment variable overrides (`CTXPACK_*`)
//! 3. Runtime validation

pub mod error;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use validation::Validate;

use std::path::PathBuf;
use std::time::Duration;

// =============================================================================
// SAFE DEFAULTS - Work for any environment (dev, staging, prod, test)
// =============================================================================

// Home directory layout
const DEFAULT_HOME_DIR_NAME: &str = ".ctxpack";

// Database Configuration (safe local defaults)
const DEFAULT_DB_HOST: &str = "localhost";
const DEFAULT_DB_PORT: u16 = 5432;
const DEFAULT_DB_NAME: &str = "ctxpack";
const DEFAULT_DB_USER: &str = "ctxpack";
const DEFAULT_DB_PASSWORD: &str = "localdev123";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_DB_MIN_CONNECTIONS: u32 = 2;
const DEFAULT_DB_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_AUTO_MIGRATE: bool = true;

// Embedding Configuration
const DEFAULT_EMBEDDING_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL_ID: &str = "text-embedding-3-small";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;
const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 100;
const DEFAULT_EMBEDDING_TIMEOUT_SECONDS: u64 = 60;

// Chat model Configuration
const DEFAULT_CHAT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_CHAT_MODEL_ID: &str = "gpt-4o-mini";
const DEFAULT_QUICK_STEP_BUDGET: usize = 1;
const DEFAULT_EXPLORE_STEP_BUDGET: usize = 20;
const DEFAULT_RESEARCH_STEP_BUDGET: usize = 50;

// Search Configuration
const DEFAULT_SEARCH_TOP_K: usize = 10;
const MAX_SEARCH_TOP_K: usize = 50;
const DEFAULT_SEARCH_ALPHA: f64 = 0.5;
const DEFAULT_SUBTRACK_TIMEOUT_SECONDS: u64 = 10;
const DEFAULT_MAX_HITS_PER_RESOURCE: usize = 400;

// Indexing Configuration
const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 1024 * 1024; // 1 MiB read cap
const DEFAULT_MAX_CHUNK_SIZE: usize = 1500;
const DEFAULT_GIT_TIMEOUT_SECONDS: u64 = 120;
const DEFAULT_GIT_LS_REMOTE_TIMEOUT_SECONDS: u64 = 30;

/// Core configuration for the entire ctxpack application
///
/// All settings have safe defaults and can be overridden via environment
/// variables. No profile/environment selection needed - same defaults work
/// everywhere.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ApplicationConfig {
    /// Home directory layout (repos/, data/, logs/, sandbox/)
    pub home: HomeConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Embedding provider configuration
    pub embedding: EmbeddingConfig,

    /// Chat model configuration
    pub chat: ChatConfig,

    /// Search configuration
    pub search: SearchConfig,

    /// Indexing pipeline configuration
    pub indexing: IndexingConfig,
}

impl ApplicationConfig {
    /// Load configuration from environment variables with safe defaults
    pub fn from_env() -> Self {
        Self {
            home: HomeConfig::from_env(),
            database: DatabaseConfig::from_env(),
            embedding: EmbeddingConfig::from_env(),
            chat: ChatConfig::from_env(),
            search: SearchConfig::from_env(),
            indexing: IndexingConfig::from_env(),
        }
    }
}

impl Validate for ApplicationConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.database.validate()?;
        self.embedding.validate()?;
        self.chat.validate()?;
        self.search.validate()?;
        self.indexing.validate()?;
        Ok(())
    }
}

/// Home directory configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct HomeConfig {
    /// Root of the managed filesystem region (default `<user-home>/.ctxpack`)
    pub root: PathBuf,
}

impl HomeConfig {
    /// Load from environment (`CTXPACK_HOME`), defaulting under the user home
    pub fn from_env() -> Self {
        let root = std::env::var("CTXPACK_HOME").map_or_else(
            |_| {
                dirs::home_dir()
                    .unwrap_or_else(|| PathBuf::from("."))
                    .join(DEFAULT_HOME_DIR_NAME)
            },
            PathBuf::from,
        );
        Self { root }
    }

    /// Materialized git resources, keyed by resource id
    pub fn repos_dir(&self) -> PathBuf {
        self.root.join("repos")
    }

    /// Durable application data
    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    /// Log files
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }

    /// Scratch space for tool executions
    pub fn sandbox_dir(&self) -> PathBuf {
        self.root.join("sandbox")
    }
}

/// Database connection configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Acquire/statement timeout applied to the pool
    pub timeout_seconds: u64,
    /// Run embedded migrations on startup
    pub auto_migrate: bool,
}

impl DatabaseConfig {
    /// Load from `CTXPACK_DB_*` environment variables
    pub fn from_env() -> Self {
        Self {
            host: env_or("CTXPACK_DB_HOST", DEFAULT_DB_HOST),
            port: env_parse("CTXPACK_DB_PORT", DEFAULT_DB_PORT),
            name: env_or("CTXPACK_DB_NAME", DEFAULT_DB_NAME),
            user: env_or("CTXPACK_DB_USER", DEFAULT_DB_USER),
            password: env_or("CTXPACK_DB_PASSWORD", DEFAULT_DB_PASSWORD),
            max_connections: env_parse("CTXPACK_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS),
            min_connections: env_parse("CTXPACK_DB_MIN_CONNECTIONS", DEFAULT_DB_MIN_CONNECTIONS),
            timeout_seconds: env_parse("CTXPACK_DB_TIMEOUT_SECONDS", DEFAULT_DB_TIMEOUT_SECONDS),
            auto_migrate: env_parse("CTXPACK_DB_AUTO_MIGRATE", DEFAULT_AUTO_MIGRATE),
        }
    }

    /// Postgres connection URL
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.name
        )
    }

    /// Pool acquire timeout
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Validate for DatabaseConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::ensure_present(&self.host, "database.host")?;
        validation::ensure_port(self.port, "database.port")?;
        validation::ensure_present(&self.name, "database.name")?;
        validation::ensure_within(
            u64::from(self.max_connections),
            1..=1000,
            "database.max_connections",
        )?;
        if self.min_connections > self.max_connections {
            return Err(ConfigError::Generic {
                message: format!(
                    "database.min_connections ({}) exceeds max_connections ({})",
                    self.min_connections, self.max_connections
                ),
            });
        }
        Ok(())
    }
}

/// Embedding provider configuration
///
/// The provider speaks the OpenAI-compatible `/embeddings` shape; per-request
/// overrides (key, base URL, model) take precedence over these process
/// defaults.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct EmbeddingConfig {
    /// Base URL of the embeddings endpoint
    pub base_url: String,

    /// API key; read from the environment, never persisted
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Model identifier (e.g. "text-embedding-3-small")
    pub model: String,

    /// Embedding dimensions produced by this model
    /// Must match the chunk store's vector column for consistency
    pub dimensions: usize,

    /// Chunks embedded per provider call
    pub batch_size: usize,

    /// Per-call timeout
    pub timeout_seconds: u64,
}

impl EmbeddingConfig {
    /// Load from `CTXPACK_EMBEDDING_*` environment variables
    pub fn from_env() -> Self {
        Self {
            base_url: env_or("CTXPACK_EMBEDDING_BASE_URL", DEFAULT_EMBEDDING_BASE_URL),
            api_key: std::env::var("CTXPACK_EMBEDDING_API_KEY").ok(),
            model: env_or("CTXPACK_EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL_ID),
            dimensions: env_parse("CTXPACK_EMBEDDING_DIMENSIONS", DEFAULT_EMBEDDING_DIMENSIONS),
            batch_size: env_parse("CTXPACK_EMBEDDING_BATCH_SIZE", DEFAULT_EMBEDDING_BATCH_SIZE),
            timeout_seconds: env_parse(
                "CTXPACK_EMBEDDING_TIMEOUT_SECONDS",
                DEFAULT_EMBEDDING_TIMEOUT_SECONDS,
            ),
        }
    }
}

impl Validate for EmbeddingConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::ensure_http_url(&self.base_url, "embedding.base_url")?;
        validation::ensure_present(&self.model, "embedding.model")?;
        validation::ensure_within(self.dimensions as u64, 1..=10_000, "embedding.dimensions")?;
        validation::ensure_within(self.batch_size as u64, 1..=1000, "embedding.batch_size")?;
        Ok(())
    }
}

/// Chat model configuration for the agent driver
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ChatConfig {
    /// Base URL of the chat completions endpoint
    pub base_url: String,

    /// API key; read from the environment, never persisted
    #[serde(skip_serializing)]
    pub api_key: Option<String>,

    /// Model identifier
    pub model: String,

    /// Step budget for the quick-answer mode
    pub quick_step_budget: usize,

    /// Step budget for the exploration mode
    pub explore_step_budget: usize,

    /// Step budget for the deep-research mode
    pub research_step_budget: usize,
}

impl ChatConfig {
    /// Load from `CTXPACK_CHAT_*` environment variables
    pub fn from_env() -> Self {
        Self {
            base_url: env_or("CTXPACK_CHAT_BASE_URL", DEFAULT_CHAT_BASE_URL),
            api_key: std::env::var("CTXPACK_CHAT_API_KEY").ok(),
            model: env_or("CTXPACK_CHAT_MODEL", DEFAULT_CHAT_MODEL_ID),
            quick_step_budget: DEFAULT_QUICK_STEP_BUDGET,
            explore_step_budget: env_parse(
                "CTXPACK_CHAT_EXPLORE_STEPS",
                DEFAULT_EXPLORE_STEP_BUDGET,
            ),
            research_step_budget: env_parse(
                "CTXPACK_CHAT_RESEARCH_STEPS",
                DEFAULT_RESEARCH_STEP_BUDGET,
            ),
        }
    }
}

impl Validate for ChatConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::ensure_http_url(&self.base_url, "chat.base_url")?;
        validation::ensure_present(&self.model, "chat.model")?;
        validation::ensure_within(
            self.explore_step_budget as u64,
            1..=200,
            "chat.explore_steps",
        )?;
        validation::ensure_within(
            self.research_step_budget as u64,
            1..=200,
            "chat.research_steps",
        )?;
        Ok(())
    }
}

/// Search configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SearchConfig {
    /// Default number of fused results returned
    pub default_top_k: usize,

    /// Hard ceiling for top-k (requests clamp to this)
    pub max_top_k: usize,

    /// Default vector weight for hybrid fusion
    pub default_alpha: f64,

    /// Independent deadline for each subtrack (text, vector)
    pub subtrack_timeout_seconds: u64,

    /// Lexical hit cap per resource
    pub max_hits_per_resource: usize,
}

impl SearchConfig {
    /// Load from `CTXPACK_SEARCH_*` environment variables
    pub fn from_env() -> Self {
        Self {
            default_top_k: env_parse("CTXPACK_SEARCH_TOP_K", DEFAULT_SEARCH_TOP_K),
            max_top_k: MAX_SEARCH_TOP_K,
            default_alpha: env_parse("CTXPACK_SEARCH_ALPHA", DEFAULT_SEARCH_ALPHA),
            subtrack_timeout_seconds: env_parse(
                "CTXPACK_SEARCH_SUBTRACK_TIMEOUT_SECONDS",
                DEFAULT_SUBTRACK_TIMEOUT_SECONDS,
            ),
            max_hits_per_resource: env_parse(
                "CTXPACK_SEARCH_MAX_HITS_PER_RESOURCE",
                DEFAULT_MAX_HITS_PER_RESOURCE,
            ),
        }
    }

    /// Subtrack deadline as a `Duration`
    pub const fn subtrack_timeout(&self) -> Duration {
        Duration::from_secs(self.subtrack_timeout_seconds)
    }
}

impl Validate for SearchConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::ensure_within(self.default_top_k as u64, 1..=50, "search.default_top_k")?;
        if !(0.0..=1.0).contains(&self.default_alpha) {
            return Err(ConfigError::Generic {
                message: format!(
                    "search.default_alpha ({}) must be within [0, 1]",
                    self.default_alpha
                ),
            });
        }
        Ok(())
    }
}

/// Indexing pipeline configuration
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct IndexingConfig {
    /// Files larger than this are skipped with a read-stage warning
    pub max_file_size_bytes: u64,

    /// Character budget per chunk
    pub max_chunk_size: usize,

    /// Subprocess timeout for clone/fetch/checkout
    pub git_timeout_seconds: u64,

    /// Subprocess timeout for ls-remote
    pub git_ls_remote_timeout_seconds: u64,
}

impl IndexingConfig {
    /// Load from `CTXPACK_INDEXING_*` environment variables
    pub fn from_env() -> Self {
        Self {
            max_file_size_bytes: env_parse(
                "CTXPACK_INDEXING_MAX_FILE_SIZE_BYTES",
                DEFAULT_MAX_FILE_SIZE_BYTES,
            ),
            max_chunk_size: env_parse("CTXPACK_INDEXING_MAX_CHUNK_SIZE", DEFAULT_MAX_CHUNK_SIZE),
            git_timeout_seconds: env_parse(
                "CTXPACK_GIT_TIMEOUT_SECONDS",
                DEFAULT_GIT_TIMEOUT_SECONDS,
            ),
            git_ls_remote_timeout_seconds: env_parse(
                "CTXPACK_GIT_LS_REMOTE_TIMEOUT_SECONDS",
                DEFAULT_GIT_LS_REMOTE_TIMEOUT_SECONDS,
            ),
        }
    }

    /// Clone/fetch/checkout deadline
    pub const fn git_timeout(&self) -> Duration {
        Duration::from_secs(self.git_timeout_seconds)
    }

    /// ls-remote deadline
    pub const fn git_ls_remote_timeout(&self) -> Duration {
        Duration::from_secs(self.git_ls_remote_timeout_seconds)
    }
}

impl Validate for IndexingConfig {
    fn validate(&self) -> ConfigResult<()> {
        validation::ensure_within(
            self.max_file_size_bytes,
            1..=100 * 1024 * 1024,
            "indexing.max_file_size_bytes",
        )?;
        validation::ensure_within(
            self.max_chunk_size as u64,
            100..=100_000,
            "indexing.max_chunk_size",
        )?;
        Ok(())
    }
}

/// Read an environment variable, falling back to a default string
fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Read and parse an environment variable, falling back on absence or parse
/// failure
fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
