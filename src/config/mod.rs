//! Configuration loading and layering.
//!
//! Handles `.prscribe.toml` loading, environment variable resolution,
//! and CLI flag merging with proper priority ordering.

pub mod loader;

pub use loader::{
    ChunkConfig, ChunkConfigError, Config, ConfigError, FilterConfig, PromptConfig,
    ProviderConfig, RetryConfig,
};
