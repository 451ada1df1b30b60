//! App-wide constants.
//!
//! Centralises the tool name, config paths, environment variable names,
//! and fixed pipeline strings so a rename only requires changing this file.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "prscribe";

/// Crate version, as set by Cargo.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Local config filename (e.g. `.prscribe.toml` in the working directory).
pub const CONFIG_FILENAME: &str = ".prscribe.toml";

/// Directory name under `~/.config/` for global config.
pub const CONFIG_DIR: &str = "prscribe";

/// Appended to a diff cut down to `max_diff_length` characters.
pub const TRUNCATION_MARKER: &str = "\n\n[... diff truncated ...]";

/// Appended to an aggregated description when at least one chunk failed.
pub const PARTIAL_FAILURE_NOTE: &str =
    "_Note: some changes could not be processed and may be missing from this description._";

/// Error reported when no chunk produced a description.
pub const NO_SUCCESSFUL_CHUNKS: &str = "no successful chunks";

/// Shown under generated output.
pub const AI_DISCLOSURE: &str = "Drafted by an LLM. Review before publishing.";

/// Bitbucket Cloud REST API root.
pub const BITBUCKET_API_BASE: &str = "https://api.bitbucket.org/2.0";

// ── Environment variable names ──────────────────────────────────────

pub const ENV_PROVIDER: &str = "PRSCRIBE_PROVIDER";
pub const ENV_MODEL: &str = "PRSCRIBE_MODEL";
pub const ENV_API_KEY: &str = "PRSCRIBE_API_KEY";
pub const ENV_BASE_URL: &str = "PRSCRIBE_BASE_URL";
pub const ENV_CHUNK_SIZE: &str = "PRSCRIBE_CHUNK_SIZE";
pub const ENV_OVERLAP_SIZE: &str = "PRSCRIBE_OVERLAP_SIZE";
pub const ENV_MAX_CHUNKS: &str = "PRSCRIBE_MAX_CHUNKS";
pub const ENV_CHUNKING: &str = "PRSCRIBE_CHUNKING";
pub const ENV_FILTER: &str = "PRSCRIBE_FILTER";
pub const ENV_IGNORE_PATTERNS: &str = "PRSCRIBE_IGNORE_PATTERNS";
pub const ENV_MAX_DIFF_LENGTH: &str = "PRSCRIBE_MAX_DIFF_LENGTH";
pub const ENV_LOG: &str = "PRSCRIBE_LOG";
pub const ENV_BITBUCKET_TOKEN: &str = "BITBUCKET_TOKEN";
