//! rig-core integration for LLM-backed description generation.
//!
//! Uses rig-core's provider clients and Agent abstraction. Supports
//! Anthropic, OpenAI, a local Ollama server, and any OpenAI-compatible API.

use std::time::Duration;

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers;

use crate::config::{ProviderConfig, RetryConfig};
use crate::models::ProviderName;
use crate::prompt;

use super::{DescriptionProvider, GenerationRequest, ProviderError};

/// Ollama's OpenAI-compatible endpoint on the default port.
const OLLAMA_DEFAULT_BASE_URL: &str = "http://localhost:11434/v1";

/// Placeholder key for servers that ignore authentication.
const UNUSED_API_KEY: &str = "not-needed";

/// Build an agent from a rig-core client and prompt it for plain text.
macro_rules! prompt_text {
    ($client:expr, $model:expr, $system:expr, $user:expr, $temperature:expr, $max_tokens:expr, $label:expr) => {{
        let agent = $client
            .agent($model)
            .preamble($system)
            .temperature($temperature)
            .max_tokens($max_tokens)
            .build();
        agent
            .prompt($user)
            .await
            .map_err(|e| ProviderError::ApiError(format!("{} API error: {e}", $label)))
    }};
}

/// rig-core based description provider.
///
/// The provider name in config selects which rig-core client is used.
pub struct RigProvider {
    config: ProviderConfig,
}

impl RigProvider {
    /// Create a new RigProvider, checking that hosted providers have a key.
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        if config.name.requires_api_key() && config.api_key.is_none() {
            let hint = config
                .name
                .api_key_env_var()
                .map(|var| format!(" or {var}"))
                .unwrap_or_default();
            return Err(ProviderError::NotConfigured(format!(
                "no API key found for provider '{}'. Set {}{hint}.",
                config.name,
                crate::constants::ENV_API_KEY
            )));
        }
        if config.name == ProviderName::OpenAICompatible && config.base_url.is_none() {
            return Err(ProviderError::NotConfigured(
                "openai-compatible provider requires base_url to be set".to_string(),
            ));
        }
        Ok(Self { config })
    }

    /// Build an OpenAI-style client against `base_url` (or the OpenAI default).
    fn build_openai_client(
        &self,
        base_url: Option<&str>,
        label: &str,
    ) -> Result<providers::openai::CompletionsClient, ProviderError> {
        let api_key = self.config.api_key.as_deref().unwrap_or(UNUSED_API_KEY);
        let mut builder = providers::openai::CompletionsClient::builder().api_key(api_key);
        if let Some(base_url) = base_url {
            builder = builder.base_url(base_url);
        }
        builder
            .build()
            .map_err(|e| ProviderError::ApiError(format!("failed to create {label} client: {e}")))
    }

    /// Make a completion call through rig-core and return the raw response text.
    async fn call_rig(
        &self,
        model: &str,
        system_prompt: &str,
        user_prompt: &str,
        temperature: f64,
        max_tokens: u64,
    ) -> Result<String, ProviderError> {
        match self.config.name {
            ProviderName::Anthropic => {
                let api_key = self.config.api_key.as_deref().ok_or_else(|| {
                    ProviderError::NotConfigured("missing API key".to_string())
                })?;
                let client: providers::anthropic::Client = providers::anthropic::Client::builder()
                    .api_key(api_key)
                    .build()
                    .map_err(|e| {
                        ProviderError::ApiError(format!("failed to create Anthropic client: {e}"))
                    })?;
                prompt_text!(client, model, system_prompt, user_prompt, temperature, max_tokens, "Anthropic")
            }
            ProviderName::OpenAI => {
                let client = self.build_openai_client(self.config.base_url.as_deref(), "OpenAI")?;
                prompt_text!(client, model, system_prompt, user_prompt, temperature, max_tokens, "OpenAI")
            }
            ProviderName::Ollama => {
                let base_url = self.config.base_url.as_deref().unwrap_or(OLLAMA_DEFAULT_BASE_URL);
                let client = self.build_openai_client(Some(base_url), "Ollama")?;
                prompt_text!(client, model, system_prompt, user_prompt, temperature, max_tokens, "Ollama")
            }
            ProviderName::OpenAICompatible => {
                let client =
                    self.build_openai_client(self.config.base_url.as_deref(), "OpenAI-compatible")?;
                prompt_text!(
                    client,
                    model,
                    system_prompt,
                    user_prompt,
                    temperature,
                    max_tokens,
                    "OpenAI-compatible"
                )
            }
        }
    }
}

#[async_trait]
impl DescriptionProvider for RigProvider {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
        let model = request
            .options
            .model
            .as_deref()
            .unwrap_or(&self.config.model);
        let temperature = request.options.temperature.unwrap_or(self.config.temperature);
        let max_tokens = request.options.max_tokens.unwrap_or(self.config.max_tokens);
        let user_prompt = prompt::build_user_prompt(&request.prompt);

        tracing::debug!(
            provider = %self.config.name,
            model,
            prompt_chars = user_prompt.len(),
            "requesting description"
        );

        let response = self
            .call_rig(model, prompt::SYSTEM_PROMPT, &user_prompt, temperature, max_tokens)
            .await?;
        Ok(clean_response(&response))
    }
}

/// Regex for a response that is entirely wrapped in a markdown code fence.
static FENCE_RE: std::sync::LazyLock<regex::Regex> = std::sync::LazyLock::new(|| {
    regex::Regex::new(r"(?s)\A```(?:markdown|md)?[ \t]*\n(.*?)\n```\s*\z").unwrap()
});

/// Trim the response and unwrap a whole-response code fence.
///
/// Models sometimes wrap markdown output in ```markdown fences even when
/// asked not to.
fn clean_response(response: &str) -> String {
    let trimmed = response.trim();
    match FENCE_RE.captures(trimmed).and_then(|cap| cap.get(1)) {
        Some(inner) => inner.as_str().trim().to_string(),
        None => trimmed.to_string(),
    }
}

/// Classifies a provider error into a short, user-friendly message.
///
/// Returns `Some(message)` for transient/retryable errors, `None` otherwise.
pub fn classify_error(err: &ProviderError) -> Option<&'static str> {
    match err {
        ProviderError::ApiError(msg) => {
            let msg_lower = msg.to_lowercase();
            if msg_lower.contains("429")
                || msg_lower.contains("rate limit")
                || msg_lower.contains("too many requests")
            {
                Some("Rate limited by API")
            } else if msg_lower.contains("503")
                || msg_lower.contains("service unavailable")
                || msg_lower.contains("high demand")
            {
                Some("High model load")
            } else if msg_lower.contains("529") || msg_lower.contains("overloaded") {
                Some("API overloaded")
            } else if msg_lower.contains("502") {
                Some("API gateway error")
            } else if msg_lower.contains("timeout") || msg_lower.contains("timed out") {
                Some("Request timed out")
            } else if msg_lower.contains("connection") {
                Some("Connection error")
            } else if msg_lower.contains("temporarily") || msg_lower.contains("try again") {
                Some("Temporary API error")
            } else {
                None
            }
        }
        _ => None,
    }
}

/// Check whether a provider error is transient and worth retrying.
pub fn is_retryable(err: &ProviderError) -> bool {
    classify_error(err).is_some()
}

/// Compute the backoff duration for a retry attempt using exponential backoff.
pub fn retry_backoff(attempt: u32, policy: &RetryConfig) -> Duration {
    let initial = Duration::from_millis(policy.initial_backoff_ms);
    let max = Duration::from_millis(policy.max_backoff_ms);
    initial
        .saturating_mul(2u32.saturating_pow(attempt))
        .min(max)
}
