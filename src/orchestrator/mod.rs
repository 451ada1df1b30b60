//! Description orchestrator: prompt preparation, generation, and aggregation.

pub mod aggregate;
pub mod driver;

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

use crate::config::{Config, RetryConfig};
use crate::models::{AggregatedResult, PromptData, ProcessingStats};
use crate::optimizer::{DiffPlan, OptimizedPrompt, OptimizerError, PromptOptimizer};
use crate::providers::{DescriptionProvider, GenerationOptions};

pub use aggregate::ResultAggregator;
pub use driver::{ChunkEvent, ChunkedGenerator, DriverError};

/// Errors from the orchestrator.
#[derive(Error, Debug)]
pub enum OrchestratorError {
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Final description plus how it was produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DraftReport {
    pub result: AggregatedResult,
    pub stats: ProcessingStats,
}

/// Runs the full pipeline for one pull request.
pub struct DescriptionOrchestrator {
    optimizer: PromptOptimizer,
    provider: Arc<dyn DescriptionProvider>,
    options: GenerationOptions,
    retry: RetryConfig,
    aggregator: ResultAggregator,
}

impl DescriptionOrchestrator {
    pub fn new(
        optimizer: PromptOptimizer,
        provider: Arc<dyn DescriptionProvider>,
        options: GenerationOptions,
        retry: RetryConfig,
    ) -> Self {
        Self {
            optimizer,
            provider,
            options,
            retry,
            aggregator: ResultAggregator::new(),
        }
    }

    /// Build the orchestrator from a loaded config.
    pub fn from_config(
        config: &Config,
        provider: Arc<dyn DescriptionProvider>,
    ) -> Result<Self, OrchestratorError> {
        Ok(Self::new(
            PromptOptimizer::from_config(config)?,
            provider,
            GenerationOptions::from_config(&config.provider),
            config.retry.clone(),
        ))
    }

    pub fn optimizer(&self) -> &PromptOptimizer {
        &self.optimizer
    }

    /// Clean, filter, and chunk or truncate without calling the provider.
    pub fn prepare(&self, data: &PromptData) -> OptimizedPrompt {
        self.optimizer.optimize(data)
    }

    /// Prepare `data`, generate a description, and merge the results.
    ///
    /// Per-chunk failures are reported in the result, not as an `Err`.
    pub async fn describe(
        &self,
        data: &PromptData,
        events: Option<UnboundedSender<ChunkEvent>>,
    ) -> Result<DraftReport, OrchestratorError> {
        let prepared = self.prepare(data);

        let mut generator = ChunkedGenerator::new(
            Arc::clone(&self.provider),
            self.options.clone(),
            self.retry.clone(),
        );
        if let Some(sink) = events {
            generator = generator.with_events(sink);
        }

        let result = match &prepared.plan {
            DiffPlan::Chunked(chunks) => {
                let results = generator.process_chunks(chunks, &prepared.prompt).await?;
                self.aggregator.aggregate(chunks, &results)
            }
            DiffPlan::Single { .. } => {
                let files = self
                    .optimizer
                    .filter()
                    .extract_modified_files(&prepared.prompt.diff);
                let single = generator.generate_one(&prepared.prompt, files).await;
                self.aggregator.aggregate(&[], &[single])
            }
        };

        let stats = ProcessingStats {
            chunked: prepared.requires_chunking(),
            chunks_processed: result.chunks_processed,
            failed_chunks: result.failed_chunks,
            truncated: prepared.truncated(),
            all_files_ignored: prepared.all_files_ignored,
            chunk_limit_reached: prepared.chunk_limit_reached,
            filtered_files: prepared.filtered_files,
        };

        if result.success {
            tracing::info!(
                chunks = stats.chunks_processed,
                failed = stats.failed_chunks,
                "description generated"
            );
        } else {
            tracing::warn!(chunks = stats.chunks_processed, "description generation failed");
        }

        Ok(DraftReport { result, stats })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ChunkConfig, FilterConfig, PromptConfig};
    use crate::diff::{DiffChunker, FileFilter};
    use crate::providers::{GenerationRequest, ProviderError};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct EchoProvider {
        prompts: Mutex<Vec<PromptData>>,
    }

    #[async_trait]
    impl DescriptionProvider for EchoProvider {
        async fn generate(&self, request: &GenerationRequest) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(request.prompt.clone());
            Ok(format!("{} chars", request.diff_text().chars().count()))
        }
    }

    fn block(path: &str, lines: usize) -> String {
        let mut out = format!("diff --git a/{path} b/{path}\n@@ -1 +1,{lines} @@\n");
        for i in 0..lines {
            out.push_str(&format!("+{path} line {i}\n"));
        }
        out
    }

    fn orchestrator(chunk: ChunkConfig) -> (DescriptionOrchestrator, Arc<EchoProvider>) {
        let provider = Arc::new(EchoProvider {
            prompts: Mutex::new(Vec::new()),
        });
        let optimizer = PromptOptimizer::new(
            FileFilter::new(&FilterConfig::default()).unwrap(),
            DiffChunker::new(chunk).unwrap(),
            PromptConfig::default(),
        );
        let orch = DescriptionOrchestrator::new(
            optimizer,
            provider.clone(),
            GenerationOptions::default(),
            RetryConfig::default(),
        );
        (orch, provider)
    }

    #[tokio::test]
    async fn small_diff_is_one_unbulleted_call() {
        let (orch, provider) = orchestrator(ChunkConfig::default());
        let data = PromptData {
            diff: block("app.js", 2),
            ..PromptData::default()
        };
        let report = orch.describe(&data, None).await.unwrap();
        assert!(report.result.success);
        assert!(!report.result.description.starts_with('•'));
        assert_eq!(report.result.chunks_processed, 1);
        assert!(!report.stats.chunked);
        assert_eq!(provider.prompts.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn large_diff_is_chunked_and_merged() {
        let (orch, provider) = orchestrator(ChunkConfig::new(250, 0, 10).unwrap());
        let data = PromptData {
            diff: format!("{}{}{}", block("a.rs", 10), block("b.rs", 10), block("yarn.lock", 3)),
            ..PromptData::default()
        };
        let report = orch.describe(&data, None).await.unwrap();
        assert!(report.stats.chunked);
        assert_eq!(report.stats.filtered_files, vec!["yarn.lock"]);
        assert_eq!(report.result.chunks_processed, 2);
        assert!(report.result.description.starts_with("• "));

        let prompts = provider.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts[0].diff.contains("a.rs"));
        assert!(prompts[1].diff.contains("b.rs"));
        assert!(prompts.iter().all(|p| !p.diff.contains("yarn.lock")));
    }

    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn single_prompt_logs_no_warnings() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let guard = tracing::subscriber::set_default(subscriber);

        let (orch, _) = orchestrator(ChunkConfig::default());
        let data = PromptData {
            diff: block("app.js", 2),
            ..PromptData::default()
        };
        let report = orch.describe(&data, None).await.unwrap();
        drop(guard);

        assert!(report.result.success);
        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(output.is_empty(), "unexpected log output: {output}");
    }

    #[test]
    fn prepare_does_not_call_provider() {
        let (orch, provider) = orchestrator(ChunkConfig::new(250, 0, 10).unwrap());
        let data = PromptData {
            diff: format!("{}{}", block("a.rs", 10), block("b.rs", 10)),
            ..PromptData::default()
        };
        let prepared = orch.prepare(&data);
        assert!(prepared.requires_chunking());
        assert!(provider.prompts.lock().unwrap().is_empty());
    }
}
