//! Prompt preparation: text cleanup, file filtering, and chunk-or-truncate.
//!
//! Turns raw PR prompt data into either one ready-to-send prompt or a
//! batch of diff chunks, never both.

use thiserror::Error;

use crate::config::{ChunkConfigError, Config, PromptConfig};
use crate::constants::TRUNCATION_MARKER;
use crate::diff::chunker::char_len;
use crate::diff::{DiffChunker, FileFilter, FilterError};
use crate::models::{DiffChunk, PromptData};

/// Errors building the optimizer from configuration.
#[derive(Error, Debug)]
pub enum OptimizerError {
    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("invalid chunking config: {0}")]
    Chunking(#[from] ChunkConfigError),
}

/// What to send to the generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffPlan {
    /// One prompt with the (possibly truncated) diff.
    Single { truncated: bool },
    /// One prompt per chunk, in order.
    Chunked(Vec<DiffChunk>),
}

/// Prompt data after cleanup, plus the plan for its diff.
#[derive(Debug, Clone)]
pub struct OptimizedPrompt {
    /// Trimmed prompt data. For a chunked plan `diff` holds the filtered,
    /// unchunked text as a fallback reference.
    pub prompt: PromptData,
    pub plan: DiffPlan,
    /// Paths removed by the file filter.
    pub filtered_files: Vec<String>,
    /// The diff had files and every one of them was filtered out.
    pub all_files_ignored: bool,
    /// Chunking stopped at `max_chunks` before the end of the diff.
    pub chunk_limit_reached: bool,
}

impl OptimizedPrompt {
    pub fn requires_chunking(&self) -> bool {
        matches!(self.plan, DiffPlan::Chunked(_))
    }

    /// The chunk batch, if the diff was chunked.
    pub fn chunks(&self) -> Option<&[DiffChunk]> {
        match &self.plan {
            DiffPlan::Chunked(chunks) => Some(chunks),
            DiffPlan::Single { .. } => None,
        }
    }

    pub fn truncated(&self) -> bool {
        matches!(self.plan, DiffPlan::Single { truncated: true })
    }
}

/// Runs cleanup, filtering, and chunking in a fixed order.
#[derive(Debug, Clone)]
pub struct PromptOptimizer {
    filter: FileFilter,
    chunker: DiffChunker,
    prompt: PromptConfig,
}

impl PromptOptimizer {
    pub fn new(filter: FileFilter, chunker: DiffChunker, prompt: PromptConfig) -> Self {
        Self {
            filter,
            chunker,
            prompt,
        }
    }

    /// Build all parts from a loaded config.
    pub fn from_config(config: &Config) -> Result<Self, OptimizerError> {
        Ok(Self::new(
            FileFilter::new(&config.filter)?,
            DiffChunker::new(config.chunking)?,
            config.prompt.clone(),
        ))
    }

    pub fn filter(&self) -> &FileFilter {
        &self.filter
    }

    pub fn chunker(&self) -> &DiffChunker {
        &self.chunker
    }

    /// Prepare prompt data for generation.
    pub fn optimize(&self, data: &PromptData) -> OptimizedPrompt {
        let mut prompt = data.trimmed();

        let mut filtered_files = Vec::new();
        let mut all_files_ignored = false;
        if self.filter.is_enabled() {
            let had_files = !self.filter.extract_modified_files(&prompt.diff).is_empty();
            let outcome = self.filter.filter(&prompt.diff);
            all_files_ignored = had_files && outcome.diff.trim().is_empty();
            filtered_files = outcome.removed_files;
            prompt.diff = outcome.diff;
        }

        if self.chunker.config().enabled && !prompt.diff.trim().is_empty() && !all_files_ignored {
            let plan = self.chunker.plan(&prompt.diff);
            if plan.chunks.len() > 1 {
                tracing::info!(
                    chunks = plan.chunks.len(),
                    strategy = ?plan.strategy,
                    "diff requires chunking"
                );
                return OptimizedPrompt {
                    prompt,
                    chunk_limit_reached: plan.limit_reached,
                    plan: DiffPlan::Chunked(plan.chunks),
                    filtered_files,
                    all_files_ignored,
                };
            }
        }

        let truncated = truncate_diff(&mut prompt.diff, self.prompt.max_diff_length);
        if truncated {
            tracing::info!(
                max_diff_length = self.prompt.max_diff_length,
                "diff truncated for single prompt"
            );
        }

        OptimizedPrompt {
            prompt,
            plan: DiffPlan::Single { truncated },
            filtered_files,
            all_files_ignored,
            chunk_limit_reached: false,
        }
    }
}

/// Cut `diff` to `max_len` characters and append the truncation marker.
///
/// Returns whether anything was cut.
fn truncate_diff(diff: &mut String, max_len: usize) -> bool {
    if char_len(diff) <= max_len {
        return false;
    }
    let cut = diff
        .char_indices()
        .nth(max_len)
        .map(|(i, _)| i)
        .unwrap_or(diff.len());
    diff.truncate(cut);
    diff.push_str(TRUNCATION_MARKER);
    true
}
