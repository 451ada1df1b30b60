//! Rendering of the filter/chunk plan for `prscribe plan`.

use colored::Colorize;
use serde::Serialize;

use crate::diff::chunker::char_len;
use crate::models::ChangeType;
use crate::optimizer::{DiffPlan, OptimizedPrompt};

/// One planned generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedChunk {
    pub index: usize,
    pub chars: usize,
    pub files: Vec<String>,
    pub change_type: ChangeType,
    pub has_overlap: bool,
}

/// What `describe` would send, without sending it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanReport {
    pub chunked: bool,
    pub truncated: bool,
    /// Characters of diff after filtering (and truncation, when unchunked).
    pub diff_chars: usize,
    pub filtered_files: Vec<String>,
    pub all_files_ignored: bool,
    pub chunk_limit_reached: bool,
    pub chunks: Vec<PlannedChunk>,
}

impl PlanReport {
    pub fn from_prepared(prepared: &OptimizedPrompt) -> Self {
        let chunks = match &prepared.plan {
            DiffPlan::Chunked(chunks) => chunks
                .iter()
                .map(|c| PlannedChunk {
                    index: c.index,
                    chars: char_len(&c.content),
                    files: c.context.files.clone(),
                    change_type: c.context.change_type,
                    has_overlap: c.has_overlap,
                })
                .collect(),
            DiffPlan::Single { .. } => Vec::new(),
        };
        Self {
            chunked: prepared.requires_chunking(),
            truncated: prepared.truncated(),
            diff_chars: char_len(&prepared.prompt.diff),
            filtered_files: prepared.filtered_files.clone(),
            all_files_ignored: prepared.all_files_ignored,
            chunk_limit_reached: prepared.chunk_limit_reached,
            chunks,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn render_terminal(&self) -> String {
        let mut output = String::new();

        if self.chunked {
            output.push_str(&format!(
                " {} {} chars in {} chunks\n",
                "▸".cyan().bold(),
                self.diff_chars,
                self.chunks.len().to_string().bold()
            ));
            for chunk in &self.chunks {
                let overlap = if chunk.has_overlap { " (overlap)" } else { "" };
                output.push_str(&format!(
                    "   [{}] {} chars, {}{}\n",
                    chunk.index + 1,
                    chunk.chars,
                    chunk.change_type,
                    overlap.dimmed()
                ));
                for file in &chunk.files {
                    output.push_str(&format!("       {}\n", file.dimmed()));
                }
            }
        } else {
            let note = if self.truncated { ", truncated" } else { "" };
            output.push_str(&format!(
                " {} single prompt, {} chars{note}\n",
                "▸".cyan().bold(),
                self.diff_chars
            ));
        }

        if !self.filtered_files.is_empty() {
            output.push_str(&format!(
                " {} {}\n",
                "filtered:".dimmed(),
                self.filtered_files.join(", ").dimmed()
            ));
        }
        if self.all_files_ignored {
            output.push_str(&format!(
                " {} {}\n",
                "⚠".yellow().bold(),
                "Every changed file matched an ignore pattern.".yellow()
            ));
        }
        if self.chunk_limit_reached {
            output.push_str(&format!(
                " {} {}\n",
                "⚠".yellow().bold(),
                "The chunk limit was reached; the rest of the diff would be dropped.".yellow()
            ));
        }

        output
    }
}
