//! Generation results: per-chunk outcomes, the merged result, and run statistics.

use serde::{Deserialize, Serialize};

/// Outcome of generating a description for one chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkResult {
    pub chunk_index: usize,
    /// Generated text; empty when the chunk failed.
    pub description: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ChunkResult {
    /// A successful result.
    pub fn succeeded(chunk_index: usize, description: impl Into<String>) -> Self {
        Self {
            chunk_index,
            description: description.into(),
            success: true,
            error: None,
        }
    }

    /// A failed result carrying the error message.
    pub fn failed(chunk_index: usize, error: impl Into<String>) -> Self {
        Self {
            chunk_index,
            description: String::new(),
            success: false,
            error: Some(error.into()),
        }
    }
}

/// The merged description for a whole pull request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedResult {
    pub success: bool,
    pub description: String,
    /// Number of chunk results considered.
    pub chunks_processed: usize,
    pub failed_chunks: usize,
    /// Set only when `success` is false.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// How the diff was prepared before generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStats {
    /// Whether the diff was split into several chunks.
    pub chunked: bool,
    pub chunks_processed: usize,
    pub failed_chunks: usize,
    /// Paths removed by the file filter.
    pub filtered_files: Vec<String>,
    pub all_files_ignored: bool,
    /// Whether the single-prompt diff was cut to `max_diff_length`.
    pub truncated: bool,
    /// Whether size-based chunking stopped at `max_chunks` before the end of the diff.
    pub chunk_limit_reached: bool,
}
