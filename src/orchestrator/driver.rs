//! Sequential per-chunk generation.
//!
//! Chunks are sent to the provider one at a time, in order. Each request
//! tells the model where it is in the batch. A failing chunk is recorded
//! and the next one is still processed.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::RetryConfig;
use crate::models::{ChunkResult, DiffChunk, PromptData};
use crate::providers::rig::{classify_error, is_retryable, retry_backoff};
use crate::providers::{DescriptionProvider, GenerationOptions, GenerationRequest};

/// Errors from the chunk driver.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DriverError {
    #[error("no chunks to process")]
    NoChunks,
}

/// Progress notifications emitted while a batch is processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkEvent {
    /// A chunk's first attempt is about to start.
    Started {
        index: usize,
        total: usize,
        files: Vec<String>,
    },
    /// A transient error occurred and the chunk will be retried.
    Retrying {
        index: usize,
        attempt: u32,
        max: u32,
        reason: String,
        backoff_secs: u64,
    },
    /// A chunk is done, successfully or not.
    Finished {
        index: usize,
        success: bool,
        error: Option<String>,
    },
}

/// Feeds chunks to a [`DescriptionProvider`] one after another.
pub struct ChunkedGenerator {
    provider: Arc<dyn DescriptionProvider>,
    options: GenerationOptions,
    retry: RetryConfig,
    events: Option<UnboundedSender<ChunkEvent>>,
}

impl ChunkedGenerator {
    pub fn new(
        provider: Arc<dyn DescriptionProvider>,
        options: GenerationOptions,
        retry: RetryConfig,
    ) -> Self {
        Self {
            provider,
            options,
            retry,
            events: None,
        }
    }

    /// Send [`ChunkEvent`]s to `sink` while processing.
    pub fn with_events(mut self, sink: UnboundedSender<ChunkEvent>) -> Self {
        self.events = Some(sink);
        self
    }

    /// Generate one result per chunk, in chunk order.
    ///
    /// `base` supplies the PR metadata; its diff is replaced by each
    /// chunk's content and its context gets a position prefix.
    pub async fn process_chunks(
        &self,
        chunks: &[DiffChunk],
        base: &PromptData,
    ) -> Result<Vec<ChunkResult>, DriverError> {
        if chunks.is_empty() {
            return Err(DriverError::NoChunks);
        }

        let total = chunks.len();
        let mut results = Vec::with_capacity(total);

        for (i, chunk) in chunks.iter().enumerate() {
            self.emit(ChunkEvent::Started {
                index: i,
                total,
                files: chunk.context.files.clone(),
            });
            tracing::info!(
                chunk = i + 1,
                total,
                files = chunk.context.files.len(),
                change_type = %chunk.context.change_type,
                "processing chunk"
            );

            let request = GenerationRequest::new(chunk_prompt(base, chunk, i, total), self.options.clone());
            let result = match self.generate_with_retry(i, &request).await {
                Ok(description) => ChunkResult::succeeded(i, description),
                Err(message) => {
                    tracing::warn!(chunk = i + 1, total, error = %message, "chunk failed");
                    ChunkResult::failed(i, message)
                }
            };

            self.emit(ChunkEvent::Finished {
                index: i,
                success: result.success,
                error: result.error.clone(),
            });
            results.push(result);
        }

        Ok(results)
    }

    /// Generate a description for an unchunked prompt.
    ///
    /// Reported as chunk 0 of 1 but the prompt is sent as given, without a
    /// position prefix.
    pub async fn generate_one(&self, prompt: &PromptData, files: Vec<String>) -> ChunkResult {
        self.emit(ChunkEvent::Started {
            index: 0,
            total: 1,
            files,
        });
        let request = GenerationRequest::new(prompt.clone(), self.options.clone());
        let result = match self.generate_with_retry(0, &request).await {
            Ok(description) => ChunkResult::succeeded(0, description),
            Err(message) => {
                tracing::warn!(error = %message, "generation failed");
                ChunkResult::failed(0, message)
            }
        };
        self.emit(ChunkEvent::Finished {
            index: 0,
            success: result.success,
            error: result.error.clone(),
        });
        result
    }

    /// Call the provider, retrying transient errors with backoff.
    async fn generate_with_retry(
        &self,
        index: usize,
        request: &GenerationRequest,
    ) -> Result<String, String> {
        let max_retries = self.retry.max_retries;
        let mut last_err = None;

        for attempt in 0..=max_retries {
            match self.provider.generate(request).await {
                Ok(description) => return Ok(description),
                Err(ref e) if is_retryable(e) && attempt < max_retries => {
                    let backoff = retry_backoff(attempt, &self.retry);
                    let reason = classify_error(e).unwrap_or("Transient error").to_string();
                    tracing::debug!(chunk = index + 1, attempt = attempt + 1, %reason, "retrying");
                    self.emit(ChunkEvent::Retrying {
                        index,
                        attempt: attempt + 1,
                        max: max_retries + 1,
                        reason,
                        backoff_secs: backoff.as_secs(),
                    });
                    tokio::time::sleep(backoff).await;
                    last_err = Some(e.to_string());
                }
                Err(e) => return Err(e.to_string()),
            }
        }

        Err(last_err.unwrap_or_else(|| "max retries exhausted".to_string()))
    }

    fn emit(&self, event: ChunkEvent) {
        if let Some(sink) = &self.events {
            // A closed receiver only means nobody is watching.
            let _ = sink.send(event);
        }
    }
}

/// Prompt data for chunk `index` of `total`.
fn chunk_prompt(base: &PromptData, chunk: &DiffChunk, index: usize, total: usize) -> PromptData {
    let original = base.additional_context.as_deref().unwrap_or("");
    let context = format!("Processing chunk {} of {total}. {original}", index + 1);
    PromptData {
        diff: chunk.content.clone(),
        additional_context: Some(context.trim_end().to_string()),
        ..base.clone()
    }
}
