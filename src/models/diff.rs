//! Diff chunk types produced by the chunker.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Dominant kind of change in a chunk or diff, by `+`/`-` line counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    /// Only added lines.
    Add,
    /// Both added and removed lines.
    Modify,
    /// Only removed lines.
    Delete,
    /// No added or removed lines (headers, renames, mode changes).
    Mixed,
}

impl ChangeType {
    /// Classify from the number of added and removed lines.
    pub fn from_counts(added: usize, removed: usize) -> Self {
        match (added > 0, removed > 0) {
            (true, true) => ChangeType::Modify,
            (true, false) => ChangeType::Add,
            (false, true) => ChangeType::Delete,
            (false, false) => ChangeType::Mixed,
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeType::Add => write!(f, "add"),
            ChangeType::Modify => write!(f, "modify"),
            ChangeType::Delete => write!(f, "delete"),
            ChangeType::Mixed => write!(f, "mixed"),
        }
    }
}

/// What a chunk touches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkContext {
    /// Post-change paths of the files in this chunk, in diff order, without repeats.
    pub files: Vec<String>,
    /// Dominant change kind in this chunk.
    pub change_type: ChangeType,
}

/// A bounded slice of a (possibly multi-file) diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffChunk {
    /// Raw diff text of this chunk.
    pub content: String,
    /// 0-based position within the batch.
    pub index: usize,
    /// Number of chunks in the batch; identical across all chunks of a batch.
    pub total_chunks: usize,
    pub context: ChunkContext,
    /// Whether the leading lines repeat the tail of the previous chunk.
    pub has_overlap: bool,
}
