//! Configuration management.
//!
//! Typed configuration assembled from a TOML file plus environment
//! overrides. Store credentials come from `NEO4J_*` variables by
//! default, matching the docker-compose setup; secrets are held as
//! [`SecretString`] and never logged.

use crate::{Error, Result};
use secrecy::SecretString;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Main configuration for suhoc.
#[derive(Debug, Clone, Default)]
pub struct SuhocConfig {
    /// Graph store connection settings.
    pub store: StoreConfig,
    /// Loader settings.
    pub load: LoadConfig,
    /// LLM provider settings.
    pub llm: LlmConfig,
    /// Embedding provider settings.
    pub embedding: EmbeddingConfig,
    /// Text chunking settings.
    pub chunking: ChunkingConfig,
    /// Retrieval limits.
    pub retrieval: RetrievalConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Graph store connection settings.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Bolt URI of the store.
    pub uri: String,
    /// Username.
    pub username: String,
    /// Password. Never logged.
    pub password: SecretString,
    /// Database name.
    pub database: String,
    /// Driver fetch size.
    pub fetch_size: usize,
    /// Connection pool size.
    pub max_connections: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            uri: "bolt://127.0.0.1:7687".to_string(),
            username: "neo4j".to_string(),
            password: SecretString::from(String::new()),
            database: "neo4j".to_string(),
            fetch_size: 500,
            max_connections: 10,
        }
    }
}

/// Loader settings.
#[derive(Debug, Clone, Copy)]
pub struct LoadConfig {
    /// Items per write batch.
    pub batch_size: usize,
    /// Connection attempts before giving up.
    pub reconnect_attempts: u32,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            batch_size: 100,
            reconnect_attempts: 3,
        }
    }
}

/// LLM provider settings.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Provider name: "ollama" or "openai".
    pub provider: String,
    /// Model name override.
    pub model: Option<String>,
    /// Endpoint override.
    pub endpoint: Option<String>,
    /// API key for hosted providers. Never logged.
    pub api_key: Option<SecretString>,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "ollama".to_string(),
            model: None,
            endpoint: None,
            api_key: None,
            timeout_ms: 30_000,
            connect_timeout_ms: 3_000,
        }
    }
}

/// Embedding provider settings.
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    /// Provider name: "none" or "ollama".
    pub provider: String,
    /// Model name override.
    pub model: Option<String>,
    /// Endpoint override.
    pub endpoint: Option<String>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "none".to_string(),
            model: None,
            endpoint: None,
        }
    }
}

/// Text chunking settings.
#[derive(Debug, Clone, Copy)]
pub struct ChunkingConfig {
    /// Chunk budget in characters.
    pub max_chars: usize,
    /// Overlap between consecutive window splits, in characters.
    pub overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: 1200,
            overlap: 150,
        }
    }
}

/// Retrieval limits.
#[derive(Debug, Clone, Copy)]
pub struct RetrievalConfig {
    /// Neighborhood expansion depth.
    pub max_depth: usize,
    /// Cap on collected triples.
    pub max_triples: usize,
    /// Cap on seed entities.
    pub max_seeds: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_triples: 40,
            max_seeds: 8,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. "suhoc=debug".
    pub level: Option<String>,
    /// Output format.
    pub format: LogFormat,
    /// Log file path; stderr when absent.
    pub file: Option<PathBuf>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// Line-delimited JSON.
    Json,
}

impl LogFormat {
    /// Parses a format string, defaulting to pretty.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Store section.
    pub store: Option<ConfigFileStore>,
    /// Load section.
    pub load: Option<ConfigFileLoad>,
    /// LLM section.
    pub llm: Option<ConfigFileLlm>,
    /// Embedding section.
    pub embedding: Option<ConfigFileEmbedding>,
    /// Chunking section.
    pub chunking: Option<ConfigFileChunking>,
    /// Retrieval section.
    pub retrieval: Option<ConfigFileRetrieval>,
    /// Logging section.
    pub logging: Option<ConfigFileLogging>,
}

/// Store section in config file.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFileStore {
    /// Bolt URI.
    pub uri: Option<String>,
    /// Username.
    pub username: Option<String>,
    /// Password.
    pub password: Option<String>,
    /// Database name.
    pub database: Option<String>,
    /// Driver fetch size.
    pub fetch_size: Option<usize>,
    /// Connection pool size.
    pub max_connections: Option<usize>,
}

/// Load section in config file.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFileLoad {
    /// Items per write batch.
    pub batch_size: Option<usize>,
    /// Connection attempts.
    pub reconnect_attempts: Option<u32>,
}

/// LLM section in config file.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFileLlm {
    /// Provider name.
    pub provider: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// Endpoint.
    pub endpoint: Option<String>,
    /// API key.
    pub api_key: Option<String>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Connect timeout in milliseconds.
    pub connect_timeout_ms: Option<u64>,
}

/// Embedding section in config file.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFileEmbedding {
    /// Provider name.
    pub provider: Option<String>,
    /// Model name.
    pub model: Option<String>,
    /// Endpoint.
    pub endpoint: Option<String>,
}

/// Chunking section in config file.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFileChunking {
    /// Chunk budget in characters.
    pub max_chars: Option<usize>,
    /// Window overlap in characters.
    pub overlap: Option<usize>,
}

/// Retrieval section in config file.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFileRetrieval {
    /// Expansion depth.
    pub max_depth: Option<usize>,
    /// Triple cap.
    pub max_triples: Option<usize>,
    /// Seed cap.
    pub max_seeds: Option<usize>,
}

/// Logging section in config file.
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFileLogging {
    /// Filter directive.
    pub level: Option<String>,
    /// Output format name.
    pub format: Option<String>,
    /// Log file path.
    pub file: Option<String>,
}

impl SuhocConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration with full precedence.
    ///
    /// An explicit path (CLI flag) wins over `SUHOC_CONFIG_PATH`, which
    /// wins over the default locations. Environment overrides apply
    /// last in every case.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicitly named file cannot be read or
    /// parsed. Missing default-location files are not errors.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = if let Some(path) = path {
            Self::load_from_file(path)?
        } else if let Ok(env_path) = std::env::var("SUHOC_CONFIG_PATH") {
            Self::load_from_file(Path::new(&env_path))?
        } else {
            Self::load_default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: e.to_string(),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self::from_config_file(file))
    }

    /// Loads configuration from the default location.
    ///
    /// Checks the following paths in order:
    /// 1. Platform-specific config dir (`~/Library/Application Support/suhoc/` on macOS)
    /// 2. XDG config dir (`~/.config/suhoc/` for Unix compatibility)
    ///
    /// Returns default configuration if no config file is found.
    #[must_use]
    pub fn load_default() -> Self {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Self::default();
        };

        let platform_config = base_dirs.config_dir().join("suhoc").join("config.toml");
        if platform_config.exists()
            && let Ok(config) = Self::load_from_file(&platform_config)
        {
            return config;
        }

        let xdg_config = base_dirs
            .home_dir()
            .join(".config")
            .join("suhoc")
            .join("config.toml");
        if xdg_config.exists()
            && let Ok(config) = Self::load_from_file(&xdg_config)
        {
            return config;
        }

        Self::default()
    }

    /// Converts a [`ConfigFile`] to a [`SuhocConfig`].
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(store) = file.store {
            if let Some(uri) = store.uri {
                config.store.uri = uri;
            }
            if let Some(username) = store.username {
                config.store.username = username;
            }
            if let Some(password) = store.password {
                config.store.password = SecretString::from(password);
            }
            if let Some(database) = store.database {
                config.store.database = database;
            }
            if let Some(fetch_size) = store.fetch_size {
                config.store.fetch_size = fetch_size;
            }
            if let Some(max_connections) = store.max_connections {
                config.store.max_connections = max_connections;
            }
        }
        if let Some(load) = file.load {
            if let Some(batch_size) = load.batch_size {
                config.load.batch_size = batch_size;
            }
            if let Some(reconnect_attempts) = load.reconnect_attempts {
                config.load.reconnect_attempts = reconnect_attempts;
            }
        }
        if let Some(llm) = file.llm {
            if let Some(provider) = llm.provider {
                config.llm.provider = provider;
            }
            config.llm.model = llm.model.or(config.llm.model);
            config.llm.endpoint = llm.endpoint.or(config.llm.endpoint);
            config.llm.api_key = llm.api_key.map(SecretString::from).or(config.llm.api_key);
            if let Some(timeout_ms) = llm.timeout_ms {
                config.llm.timeout_ms = timeout_ms;
            }
            if let Some(connect_timeout_ms) = llm.connect_timeout_ms {
                config.llm.connect_timeout_ms = connect_timeout_ms;
            }
        }
        if let Some(embedding) = file.embedding {
            if let Some(provider) = embedding.provider {
                config.embedding.provider = provider;
            }
            config.embedding.model = embedding.model.or(config.embedding.model);
            config.embedding.endpoint = embedding.endpoint.or(config.embedding.endpoint);
        }
        if let Some(chunking) = file.chunking {
            if let Some(max_chars) = chunking.max_chars {
                config.chunking.max_chars = max_chars;
            }
            if let Some(overlap) = chunking.overlap {
                config.chunking.overlap = overlap;
            }
        }
        if let Some(retrieval) = file.retrieval {
            if let Some(max_depth) = retrieval.max_depth {
                config.retrieval.max_depth = max_depth;
            }
            if let Some(max_triples) = retrieval.max_triples {
                config.retrieval.max_triples = max_triples;
            }
            if let Some(max_seeds) = retrieval.max_seeds {
                config.retrieval.max_seeds = max_seeds;
            }
        }
        if let Some(logging) = file.logging {
            config.logging.level = logging.level.or(config.logging.level);
            if let Some(format) = logging.format {
                config.logging.format = LogFormat::parse(&format);
            }
            config.logging.file = logging.file.map(PathBuf::from).or(config.logging.file);
        }

        config
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(uri) = std::env::var("NEO4J_URI") {
            self.store.uri = uri;
        }
        if let Ok(username) = std::env::var("NEO4J_USERNAME") {
            self.store.username = username;
        }
        if let Ok(password) = std::env::var("NEO4J_PASSWORD") {
            self.store.password = SecretString::from(password);
        }
        if let Ok(database) = std::env::var("NEO4J_DATABASE") {
            self.store.database = database;
        }
        if let Ok(v) = std::env::var("SUHOC_BATCH_SIZE")
            && let Ok(batch_size) = v.parse()
        {
            self.load.batch_size = batch_size;
        }
        if let Ok(provider) = std::env::var("SUHOC_LLM_PROVIDER") {
            self.llm.provider = provider;
        }
        if let Ok(model) = std::env::var("SUHOC_LLM_MODEL") {
            self.llm.model = Some(model);
        }
        if let Ok(endpoint) = std::env::var("SUHOC_LLM_ENDPOINT") {
            self.llm.endpoint = Some(endpoint);
        }
        if self.llm.api_key.is_none()
            && let Ok(api_key) = std::env::var("OPENAI_API_KEY")
        {
            self.llm.api_key = Some(SecretString::from(api_key));
        }
        if let Ok(v) = std::env::var("SUHOC_LLM_TIMEOUT_MS")
            && let Ok(timeout_ms) = v.parse()
        {
            self.llm.timeout_ms = timeout_ms;
        }
        if let Ok(v) = std::env::var("SUHOC_LLM_CONNECT_TIMEOUT_MS")
            && let Ok(connect_timeout_ms) = v.parse()
        {
            self.llm.connect_timeout_ms = connect_timeout_ms;
        }
        if let Ok(provider) = std::env::var("SUHOC_EMBEDDING_PROVIDER") {
            self.embedding.provider = provider;
        }
        if let Ok(model) = std::env::var("SUHOC_EMBEDDING_MODEL") {
            self.embedding.model = Some(model);
        }
        if let Ok(level) = std::env::var("SUHOC_LOG") {
            self.logging.level = Some(level);
        }
        if let Ok(format) = std::env::var("SUHOC_LOG_FORMAT") {
            self.logging.format = LogFormat::parse(&format);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = SuhocConfig::default();
        assert_eq!(config.store.uri, "bolt://127.0.0.1:7687");
        assert_eq!(config.store.username, "neo4j");
        assert_eq!(config.store.database, "neo4j");
        assert_eq!(config.store.fetch_size, 500);
        assert_eq!(config.load.batch_size, 100);
        assert_eq!(config.load.reconnect_attempts, 3);
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.timeout_ms, 30_000);
        assert_eq!(config.embedding.provider, "none");
        assert_eq!(config.chunking.max_chars, 1200);
        assert_eq!(config.chunking.overlap, 150);
        assert_eq!(config.retrieval.max_depth, 2);
        assert_eq!(config.retrieval.max_triples, 40);
        assert_eq!(config.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_partial_file_merges_over_defaults() {
        let file: ConfigFile = toml::from_str(
            r#"
            [store]
            uri = "bolt://graph.internal:7687"

            [llm]
            provider = "openai"
            model = "gpt-4o"

            [chunking]
            max_chars = 800
            "#,
        )
        .expect("valid toml");

        let config = SuhocConfig::from_config_file(file);
        assert_eq!(config.store.uri, "bolt://graph.internal:7687");
        assert_eq!(config.store.username, "neo4j");
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.llm.model.as_deref(), Some("gpt-4o"));
        assert_eq!(config.chunking.max_chars, 800);
        assert_eq!(config.chunking.overlap, 150);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[retrieval]\nmax_depth = 3\nmax_triples = 60\n",
        )
        .expect("write");

        let config = SuhocConfig::load_from_file(&path).expect("load");
        assert_eq!(config.retrieval.max_depth, 3);
        assert_eq!(config.retrieval.max_triples, 60);
        assert_eq!(config.retrieval.max_seeds, 8);
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let err = SuhocConfig::load_from_file(Path::new("/nonexistent/config.toml"))
            .expect_err("missing file should fail");
        assert!(err.to_string().contains("read_config_file"));
    }

    #[test]
    fn test_log_format_parse() {
        assert_eq!(LogFormat::parse("json"), LogFormat::Json);
        assert_eq!(LogFormat::parse("JSON"), LogFormat::Json);
        assert_eq!(LogFormat::parse("pretty"), LogFormat::Pretty);
        assert_eq!(LogFormat::parse("anything"), LogFormat::Pretty);
    }
}
