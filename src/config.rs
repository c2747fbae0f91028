use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = ".codeindex";
const CONFIG_FILE: &str = "config.toml";
const INDEX_FILE: &str = "index.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub indexer: IndexerConfig,

    #[serde(default)]
    pub symbols: SymbolsConfig,

    #[serde(default)]
    pub dependencies: DependenciesConfig,

    #[serde(default)]
    pub embeddings: EmbeddingsConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexerConfig {
    /// File extensions to track in snapshots
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Glob patterns to ignore (in addition to .gitignore)
    #[serde(default = "default_ignore_patterns")]
    pub ignore_patterns: Vec<String>,

    /// Maximum directory depth walked below the root
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Files larger than this are not tracked
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Compute a SHA-256 checksum for tracked source files
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,

    /// Number of parse worker threads (None = auto-detect)
    #[serde(default)]
    pub parallel_threads: Option<usize>,

    /// Lines of context kept above and below each symbol
    #[serde(default = "default_context_lines")]
    pub context_lines: usize,

    /// A ready index younger than this is reused by `build`
    #[serde(default = "default_index_ttl_secs")]
    pub index_ttl_secs: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            extensions: default_extensions(),
            ignore_patterns: default_ignore_patterns(),
            max_depth: default_max_depth(),
            max_file_size: default_max_file_size(),
            checksum_enabled: true,
            parallel_threads: None,
            context_lines: default_context_lines(),
            index_ttl_secs: default_index_ttl_secs(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_extensions() -> Vec<String> {
    [
        "ts", "tsx", "js", "jsx", "mjs", "py", "pyx", "java", "go", "rs", "cpp", "cc", "cxx",
        "c", "h", "hpp", "php", "rb", "swift", "kt", "dart",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_ignore_patterns() -> Vec<String> {
    [
        "node_modules/**",
        ".git/**",
        "dist/**",
        "build/**",
        "coverage/**",
        "target/**",
        ".codeindex/**",
        "*.log",
        ".DS_Store",
        "Thumbs.db",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_max_depth() -> usize {
    10
}

fn default_max_file_size() -> u64 {
    1024 * 1024
}

fn default_context_lines() -> usize {
    3
}

fn default_index_ttl_secs() -> u64 {
    300
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolsConfig {
    #[serde(default = "default_symbol_limit")]
    pub default_limit: usize,

    /// Fuzzy matching unless a query asks for exact mode
    #[serde(default = "default_true")]
    pub fuzzy: bool,

    #[serde(default)]
    pub case_sensitive: bool,
}

impl Default for SymbolsConfig {
    fn default() -> Self {
        Self {
            default_limit: default_symbol_limit(),
            fuzzy: true,
            case_sensitive: false,
        }
    }
}

fn default_symbol_limit() -> usize {
    50
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DependenciesConfig {
    /// Extensions tried, in order, when resolving an import specifier
    #[serde(default = "default_resolve_extensions")]
    pub resolve_extensions: Vec<String>,

    /// Keep bare module specifiers as external dependencies
    #[serde(default)]
    pub include_externals: bool,
}

impl Default for DependenciesConfig {
    fn default() -> Self {
        Self {
            resolve_extensions: default_resolve_extensions(),
            include_externals: false,
        }
    }
}

fn default_resolve_extensions() -> Vec<String> {
    [".ts", ".tsx", ".js", ".jsx", ".json"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Embedding provider type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingProviderKind {
    #[default]
    FastEmbed,
    OpenAI,
}

impl std::fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FastEmbed => write!(f, "fastembed"),
            Self::OpenAI => write!(f, "openai"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingsConfig {
    #[serde(default)]
    pub provider: EmbeddingProviderKind,

    /// Local model name (fastembed)
    #[serde(default = "default_model")]
    pub model: String,

    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Embedding batches in flight at once
    #[serde(default = "default_max_concurrent_batches")]
    pub max_concurrent_batches: usize,

    /// Eviction kicks in above 80% of this budget
    #[serde(default = "default_max_memory_mb")]
    pub max_memory_mb: usize,

    /// Minimum cosine similarity for a semantic search hit
    #[serde(default = "default_relevance_floor")]
    pub relevance_floor: f32,

    /// Time box for embedding a single search query
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,

    #[serde(default)]
    pub openai: OpenAIConfig,
}

impl Default for EmbeddingsConfig {
    fn default() -> Self {
        Self {
            provider: EmbeddingProviderKind::default(),
            model: default_model(),
            batch_size: default_batch_size(),
            max_concurrent_batches: default_max_concurrent_batches(),
            max_memory_mb: default_max_memory_mb(),
            relevance_floor: default_relevance_floor(),
            query_timeout_ms: default_query_timeout_ms(),
            openai: OpenAIConfig::default(),
        }
    }
}

fn default_model() -> String {
    "all-MiniLM-L6-v2".to_string()
}

fn default_batch_size() -> usize {
    32
}

fn default_max_concurrent_batches() -> usize {
    4
}

fn default_max_memory_mb() -> usize {
    500
}

fn default_relevance_floor() -> f32 {
    0.7
}

fn default_query_timeout_ms() -> u64 {
    10_000
}

/// OpenAI embedding settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIConfig {
    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_openai_model")]
    pub model: String,

    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_openai_model(),
            base_url: None,
            max_retries: default_max_retries(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_model() -> String {
    "text-embedding-3-small".to_string()
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    1000
}

fn default_max_backoff_ms() -> u64 {
    60_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Default number of semantic search results
    #[serde(default = "default_search_limit")]
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_search_limit(),
        }
    }
}

fn default_search_limit() -> usize {
    10
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Write logs to rotating files
    #[serde(default)]
    pub enabled: bool,

    /// Write logs to stderr
    #[serde(default = "default_true")]
    pub stderr: bool,

    /// File log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log directory, relative paths resolve against the project root
    #[serde(default = "default_log_directory")]
    pub directory: PathBuf,

    /// Rotation: hourly, daily, minutely, never
    #[serde(default = "default_rotation")]
    pub rotation: String,

    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            stderr: true,
            level: default_log_level(),
            directory: default_log_directory(),
            rotation: default_rotation(),
            file_prefix: default_file_prefix(),
        }
    }
}

fn default_log_level() -> String {
    "debug".to_string()
}

fn default_log_directory() -> PathBuf {
    PathBuf::from(CONFIG_DIR).join("logs")
}

fn default_rotation() -> String {
    "daily".to_string()
}

fn default_file_prefix() -> String {
    "codeindex.log".to_string()
}

impl Config {
    /// Load configuration from the .codeindex directory
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(CONFIG_DIR).join(CONFIG_FILE);

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config from {:?}", config_path))?;

            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config from {:?}", config_path))
        } else {
            Ok(Config::default())
        }
    }

    /// Save configuration to the .codeindex directory
    pub fn save(&self, root: &Path) -> Result<()> {
        let config_dir = root.join(CONFIG_DIR);
        let config_path = config_dir.join(CONFIG_FILE);

        std::fs::create_dir_all(&config_dir)
            .with_context(|| format!("Failed to create config directory {:?}", config_dir))?;

        let content =
            toml::to_string_pretty(self).with_context(|| "Failed to serialize config")?;

        std::fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config to {:?}", config_path))?;

        Ok(())
    }

    /// Get the path to the .codeindex directory
    pub fn state_dir(root: &Path) -> PathBuf {
        root.join(CONFIG_DIR)
    }

    /// Get the path to the persisted index
    pub fn index_path(root: &Path) -> PathBuf {
        Self::state_dir(root).join(INDEX_FILE)
    }
}
