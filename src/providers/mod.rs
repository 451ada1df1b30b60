//! DescriptionProvider trait and LLM integration.
//!
//! Provides an abstraction layer over rig-core so the pipeline only
//! depends on a fallible `generate` capability.

pub mod rig;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ProviderConfig;
use crate::models::PromptData;

/// Errors from a description provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("LLM API error: {0}")]
    ApiError(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),

    #[error("generation failed: {0}")]
    Rejected(String),
}

/// Per-request knobs passed through to the provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    /// Overrides the configured model.
    pub model: Option<String>,
    pub temperature: Option<f64>,
    pub max_tokens: Option<u64>,
}

impl GenerationOptions {
    /// Options carrying the configured provider defaults.
    pub fn from_config(config: &ProviderConfig) -> Self {
        Self {
            model: Some(config.model.clone()),
            temperature: Some(config.temperature),
            max_tokens: Some(config.max_tokens),
        }
    }
}

/// One call to the generator: PR data whose `diff` is the text to describe
/// and whose `additional_context` is the hint for this call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: PromptData,
    pub options: GenerationOptions,
}

impl GenerationRequest {
    pub fn new(prompt: PromptData, options: GenerationOptions) -> Self {
        Self { prompt, options }
    }

    pub fn diff_text(&self) -> &str {
        &self.prompt.diff
    }

    pub fn context_hint(&self) -> Option<&str> {
        self.prompt.additional_context.as_deref()
    }
}

/// Trait for LLM-backed PR description generation.
///
/// `Ok` carries the generated description; any failure, whether reported
/// by the provider or raised while calling it, is an `Err`.
#[async_trait]
pub trait DescriptionProvider: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError>;
}
