//! Shared types used across all modules.
//!
//! This module defines the core data structures for PR prompt data, diff
//! chunks, and generation results. Other modules import from here rather
//! than reaching into each other's internals.

pub mod diff;
pub mod prompt;
pub mod result;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use diff::{ChangeType, ChunkContext, DiffChunk};
pub use prompt::PromptData;
pub use result::{AggregatedResult, ChunkResult, ProcessingStats};

/// Supported LLM provider backends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    #[default]
    Anthropic,
    #[serde(rename = "openai")]
    OpenAI,
    /// Local Ollama server, spoken to through its OpenAI-compatible endpoint.
    Ollama,
    /// Any OpenAI-compatible API (e.g. Together, vLLM, local servers).
    #[serde(rename = "openai-compatible")]
    OpenAICompatible,
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderName::Anthropic => write!(f, "anthropic"),
            ProviderName::OpenAI => write!(f, "openai"),
            ProviderName::Ollama => write!(f, "ollama"),
            ProviderName::OpenAICompatible => write!(f, "openai-compatible"),
        }
    }
}

impl std::str::FromStr for ProviderName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "anthropic" | "claude" => Ok(ProviderName::Anthropic),
            "openai" => Ok(ProviderName::OpenAI),
            "ollama" => Ok(ProviderName::Ollama),
            "openai-compatible" => Ok(ProviderName::OpenAICompatible),
            other => Err(format!(
                "unsupported provider: '{other}'. Supported: anthropic, openai, ollama, \
                 openai-compatible"
            )),
        }
    }
}

impl ProviderName {
    /// Returns the provider-specific environment variable name for the API key.
    ///
    /// `None` for providers that run without a key.
    pub fn api_key_env_var(self) -> Option<&'static str> {
        match self {
            ProviderName::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderName::OpenAI | ProviderName::OpenAICompatible => Some("OPENAI_API_KEY"),
            ProviderName::Ollama => None,
        }
    }

    /// Whether requests to this provider need an API key.
    pub fn requires_api_key(self) -> bool {
        matches!(self, ProviderName::Anthropic | ProviderName::OpenAI)
    }
}
