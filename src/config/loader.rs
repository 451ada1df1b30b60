//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables
//! 3. `.prscribe.toml` in the working directory
//! 4. `~/.config/prscribe/config.toml` (global defaults)
//! 5. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::env::Env;
use crate::models::ProviderName;

/// Default character budget per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 8000;

/// Default number of characters repeated between size-based chunks.
pub const DEFAULT_OVERLAP_SIZE: usize = 200;

/// Default cap on chunks per request.
pub const DEFAULT_MAX_CHUNKS: usize = 10;

/// Default length a single-prompt diff is truncated to.
pub const DEFAULT_MAX_DIFF_LENGTH: usize = 12000;

/// Files that rarely say anything about the intent of a change.
const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "Cargo.lock",
    "composer.lock",
    "Gemfile.lock",
    "poetry.lock",
    "go.sum",
    "*.lock",
    "*.min.js",
    "*.min.css",
    "*.map",
    "*.snap",
    "dist/**",
    "build/**",
    "vendor/**",
    "node_modules/**",
];

/// Errors during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Invalid combinations of chunking parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkConfigError {
    #[error("chunk_size must be greater than zero (--chunk-size)")]
    ZeroChunkSize,

    #[error(
        "overlap_size ({overlap_size}) must be smaller than chunk_size ({chunk_size}); \
         lower it with --overlap-size or raise --chunk-size"
    )]
    OverlapTooLarge {
        overlap_size: usize,
        chunk_size: usize,
    },

    #[error("max_chunks must be greater than zero (--max-chunks)")]
    ZeroMaxChunks,
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub provider: ProviderConfig,
    pub filter: FilterConfig,
    pub chunking: ChunkConfig,
    pub prompt: PromptConfig,
    pub retry: RetryConfig,
}

/// LLM provider configuration.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: ProviderName,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub temperature: f64,
    pub max_tokens: u64,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: ProviderName::Anthropic,
            model: "claude-sonnet-4-20250514".to_string(),
            base_url: None,
            api_key: None,
            temperature: 0.2,
            max_tokens: 4096,
        }
    }
}

/// Which files to drop from the diff before prompting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub enabled: bool,
    /// Exact paths or glob patterns. Replaces the built-in list.
    pub ignore_patterns: Vec<String>,
    /// Patterns added on top of `ignore_patterns`.
    pub extra_ignore_patterns: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ignore_patterns: DEFAULT_IGNORE_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
            extra_ignore_patterns: Vec::new(),
        }
    }
}

impl FilterConfig {
    /// Every configured pattern, base list first.
    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.ignore_patterns
            .iter()
            .chain(&self.extra_ignore_patterns)
            .map(String::as_str)
    }
}

/// How oversized diffs are split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkConfig {
    pub enabled: bool,
    /// Character budget per chunk.
    pub chunk_size: usize,
    /// Characters repeated at the start of each size-based chunk.
    pub overlap_size: usize,
    pub max_chunks: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap_size: DEFAULT_OVERLAP_SIZE,
            max_chunks: DEFAULT_MAX_CHUNKS,
        }
    }
}

impl ChunkConfig {
    /// Build a validated, enabled chunking config.
    pub fn new(
        chunk_size: usize,
        overlap_size: usize,
        max_chunks: usize,
    ) -> Result<Self, ChunkConfigError> {
        let config = Self {
            enabled: true,
            chunk_size,
            overlap_size,
            max_chunks,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the parameter invariants.
    pub fn validate(&self) -> Result<(), ChunkConfigError> {
        if self.chunk_size == 0 {
            return Err(ChunkConfigError::ZeroChunkSize);
        }
        if self.overlap_size >= self.chunk_size {
            return Err(ChunkConfigError::OverlapTooLarge {
                overlap_size: self.overlap_size,
                chunk_size: self.chunk_size,
            });
        }
        if self.max_chunks == 0 {
            return Err(ChunkConfigError::ZeroMaxChunks);
        }
        Ok(())
    }
}

/// Single-prompt settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptConfig {
    /// Diffs longer than this (in characters) are truncated when not chunked.
    pub max_diff_length: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            max_diff_length: DEFAULT_MAX_DIFF_LENGTH,
        }
    }
}

/// Retry policy for transient provider errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Extra attempts after the first failure; `0` disables retries.
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 5_000,
            max_backoff_ms: 60_000,
        }
    }
}

impl Config {
    /// Load configuration with proper layering.
    ///
    /// Reads from global config, the local config in `work_dir`, then
    /// applies environment variable overrides. Chunking values are not
    /// checked here so CLI flags can still correct them; call
    /// [`ChunkConfig::validate`] once every layer is applied.
    pub fn load(work_dir: Option<&Path>, env: &Env) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Layer 4: global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                config.merge(global);
            }
        }

        // Layer 3: local config
        if let Some(dir) = work_dir {
            let local_path = dir.join(crate::constants::CONFIG_FILENAME);
            if local_path.exists() {
                let local = Self::load_file(&local_path)?;
                config.merge(local);
            }
        }

        // Layer 2: environment variables
        config.apply_env_vars(env);

        Ok(config)
    }

    /// Load a config from a specific file.
    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "loaded config file");
        toml::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the global config file path.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::constants::CONFIG_DIR).join("config.toml"))
    }

    /// Merge another config into this one (other takes precedence for non-default values).
    fn merge(&mut self, other: Config) {
        // Provider settings
        let default_provider = ProviderConfig::default();
        if other.provider.name != default_provider.name {
            self.provider.name = other.provider.name;
        }
        if other.provider.model != default_provider.model {
            self.provider.model = other.provider.model;
        }
        if other.provider.base_url.is_some() {
            self.provider.base_url = other.provider.base_url;
        }
        if other.provider.api_key.is_some() {
            self.provider.api_key = other.provider.api_key;
        }
        if other.provider.temperature != default_provider.temperature {
            self.provider.temperature = other.provider.temperature;
        }
        if other.provider.max_tokens != default_provider.max_tokens {
            self.provider.max_tokens = other.provider.max_tokens;
        }

        // Filter settings (disabled overrides enabled)
        let default_filter = FilterConfig::default();
        if !other.filter.enabled {
            self.filter.enabled = false;
        }
        if other.filter.ignore_patterns != default_filter.ignore_patterns {
            self.filter.ignore_patterns = other.filter.ignore_patterns;
        }
        self.filter
            .extra_ignore_patterns
            .extend(other.filter.extra_ignore_patterns);

        // Chunking settings (disabled overrides enabled)
        let default_chunking = ChunkConfig::default();
        if !other.chunking.enabled {
            self.chunking.enabled = false;
        }
        if other.chunking.chunk_size != default_chunking.chunk_size {
            self.chunking.chunk_size = other.chunking.chunk_size;
        }
        if other.chunking.overlap_size != default_chunking.overlap_size {
            self.chunking.overlap_size = other.chunking.overlap_size;
        }
        if other.chunking.max_chunks != default_chunking.max_chunks {
            self.chunking.max_chunks = other.chunking.max_chunks;
        }

        if other.prompt.max_diff_length != PromptConfig::default().max_diff_length {
            self.prompt.max_diff_length = other.prompt.max_diff_length;
        }

        let default_retry = RetryConfig::default();
        if other.retry.max_retries != default_retry.max_retries {
            self.retry.max_retries = other.retry.max_retries;
        }
        if other.retry.initial_backoff_ms != default_retry.initial_backoff_ms {
            self.retry.initial_backoff_ms = other.retry.initial_backoff_ms;
        }
        if other.retry.max_backoff_ms != default_retry.max_backoff_ms {
            self.retry.max_backoff_ms = other.retry.max_backoff_ms;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_vars(&mut self, env: &Env) {
        use crate::constants::*;

        if let Ok(val) = env.var(ENV_PROVIDER) {
            match val.parse::<ProviderName>() {
                Ok(name) => self.provider.name = name,
                Err(_) => tracing::warn!("ignoring invalid {ENV_PROVIDER} value: {val}"),
            }
        }
        if let Ok(val) = env.var(ENV_MODEL) {
            self.provider.model = val;
        }
        if let Ok(val) = env.var(ENV_BASE_URL) {
            self.provider.base_url = Some(val);
        }

        // Provider-specific API key resolution
        let api_key = env
            .var(ENV_API_KEY)
            .ok()
            .or_else(|| {
                self.provider
                    .name
                    .api_key_env_var()
                    .and_then(|name| env.var(name).ok())
            });
        if api_key.is_some() {
            self.provider.api_key = api_key;
        }

        if let Some(enabled) = env.flag(ENV_FILTER) {
            self.filter.enabled = enabled;
        }
        if let Ok(val) = env.var(ENV_IGNORE_PATTERNS) {
            self.filter.ignore_patterns = val
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(enabled) = env.flag(ENV_CHUNKING) {
            self.chunking.enabled = enabled;
        }
        if let Some(val) = parse_usize(env, ENV_CHUNK_SIZE) {
            self.chunking.chunk_size = val;
        }
        if let Some(val) = parse_usize(env, ENV_OVERLAP_SIZE) {
            self.chunking.overlap_size = val;
        }
        if let Some(val) = parse_usize(env, ENV_MAX_CHUNKS) {
            self.chunking.max_chunks = val;
        }
        if let Some(val) = parse_usize(env, ENV_MAX_DIFF_LENGTH) {
            self.prompt.max_diff_length = val;
        }
    }
}

/// Read a numeric variable, warning about values that don't parse.
fn parse_usize(env: &Env, name: &str) -> Option<usize> {
    let val = env.var(name).ok()?;
    match val.trim().parse() {
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!("ignoring invalid {name} value: {val}");
            None
        }
    }
}
