//! Merging per-chunk descriptions into one PR description.
//!
//! Descriptions are compared by a normalized form (lowercase, punctuation
//! stripped, whitespace collapsed). Later duplicates are dropped and the
//! first occurrence keeps its original text.

use std::collections::HashSet;

use crate::constants::{NO_SUCCESSFUL_CHUNKS, PARTIAL_FAILURE_NOTE};
use crate::models::{AggregatedResult, ChunkResult, DiffChunk};

/// Prefix of every line in a merged description.
pub const BULLET: &str = "• ";

/// Reassembles chunk results into an [`AggregatedResult`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn new() -> Self {
        Self
    }

    /// Merge `results` (one per chunk, in chunk order) into a single result.
    ///
    /// `chunks` is only consulted for diagnostics and is empty when the
    /// diff went out as a single prompt.
    pub fn aggregate(&self, chunks: &[DiffChunk], results: &[ChunkResult]) -> AggregatedResult {
        if counts_disagree(chunks, results) {
            tracing::warn!(
                chunks = chunks.len(),
                results = results.len(),
                "chunk and result counts differ"
            );
        }

        let (succeeded, failed): (Vec<&ChunkResult>, Vec<&ChunkResult>) =
            results.iter().partition(|r| r.success);

        tracing::debug!(
            succeeded = succeeded.len(),
            failed = failed.len(),
            "aggregating chunk results"
        );

        if succeeded.is_empty() {
            return AggregatedResult {
                success: false,
                description: String::new(),
                chunks_processed: results.len(),
                failed_chunks: failed.len(),
                error: Some(NO_SUCCESSFUL_CHUNKS.to_string()),
            };
        }

        let description = if succeeded.len() == 1 && failed.is_empty() {
            succeeded[0].description.clone()
        } else {
            let mut merged = deduplicate(succeeded.iter().map(|r| r.description.as_str()))
                .into_iter()
                .map(|text| format!("{BULLET}{text}"))
                .collect::<Vec<_>>()
                .join("\n");
            if !failed.is_empty() {
                if !merged.is_empty() {
                    merged.push_str("\n\n");
                }
                merged.push_str(PARTIAL_FAILURE_NOTE);
            }
            merged
        };

        AggregatedResult {
            success: true,
            description,
            chunks_processed: results.len(),
            failed_chunks: failed.len(),
            error: None,
        }
    }
}

fn counts_disagree(chunks: &[DiffChunk], results: &[ChunkResult]) -> bool {
    !chunks.is_empty() && chunks.len() != results.len()
}

/// Keep the first of each group of descriptions with the same normalized
/// form, in input order. Blank descriptions are skipped; survivors keep
/// their text exactly as given.
pub fn deduplicate<'a>(descriptions: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut unique = Vec::new();

    for text in descriptions {
        if text.trim().is_empty() {
            continue;
        }
        if seen.insert(normalize(text)) {
            unique.push(text);
        }
    }

    unique
}

/// Lowercase, drop punctuation, and collapse runs of whitespace.
fn normalize(text: &str) -> String {
    let stripped: String = text
        .chars()
        .filter(|c| !c.is_ascii_punctuation() && !is_typographic_punctuation(*c))
        .flat_map(char::to_lowercase)
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Non-ASCII punctuation models commonly emit.
fn is_typographic_punctuation(c: char) -> bool {
    matches!(
        c,
        '‘' | '’' | '“' | '”' | '–' | '—' | '…' | '•' | '«' | '»'
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn aggregate(results: &[ChunkResult]) -> AggregatedResult {
        ResultAggregator::new().aggregate(&[], results)
    }

    #[test]
    fn single_success_passes_through() {
        let result = aggregate(&[ChunkResult::succeeded(0, "X")]);
        assert!(result.success);
        assert_eq!(result.description, "X");
        assert_eq!(result.chunks_processed, 1);
        assert_eq!(result.failed_chunks, 0);
        assert!(result.error.is_none());
    }

    #[test]
    fn duplicates_collapse_to_one_bullet() {
        let result = aggregate(&[
            ChunkResult::succeeded(0, "Fixed bug A"),
            ChunkResult::succeeded(1, "Fixed bug A"),
        ]);
        assert!(result.success);
        assert_eq!(result.description, "• Fixed bug A");
        assert_eq!(result.chunks_processed, 2);
    }

    #[test]
    fn normalization_ignores_case_and_punctuation() {
        let result = aggregate(&[
            ChunkResult::succeeded(0, "Fixed bug A."),
            ChunkResult::succeeded(1, "fixed   BUG a"),
            ChunkResult::succeeded(2, "Added tests"),
        ]);
        assert_eq!(result.description, "• Fixed bug A.\n• Added tests");
    }

    #[test]
    fn partial_failure_appends_note() {
        let result = aggregate(&[
            ChunkResult::succeeded(0, "Adds login"),
            ChunkResult::failed(1, "timeout"),
        ]);
        assert!(result.success);
        assert_eq!(result.failed_chunks, 1);
        assert_eq!(result.chunks_processed, 2);
        assert!(result.description.contains("Adds login"));
        assert!(result.description.ends_with(PARTIAL_FAILURE_NOTE));
        assert!(result.error.is_none());
    }

    #[test]
    fn all_failures_report_error() {
        let result = aggregate(&[
            ChunkResult::failed(0, "timeout"),
            ChunkResult::failed(1, "rate limited"),
        ]);
        assert!(!result.success);
        assert_eq!(result.failed_chunks, 2);
        assert_eq!(result.chunks_processed, 2);
        assert_eq!(result.error.as_deref(), Some(NO_SUCCESSFUL_CHUNKS));
    }

    #[test]
    fn empty_results_are_a_failure() {
        let result = aggregate(&[]);
        assert!(!result.success);
        assert_eq!(result.chunks_processed, 0);
        assert_eq!(result.failed_chunks, 0);
    }

    #[test]
    fn blank_descriptions_add_no_bullet() {
        let result = aggregate(&[
            ChunkResult::succeeded(0, "Adds login"),
            ChunkResult::succeeded(1, "   "),
        ]);
        assert_eq!(result.description, "• Adds login");
    }

    #[test]
    fn order_follows_chunk_order() {
        let unique = deduplicate(["Third change", "First change", "third change!"]);
        assert_eq!(unique, vec!["Third change", "First change"]);
    }

    #[test]
    fn survivors_keep_original_text() {
        let unique = deduplicate(["  Adds login ", "adds login", "Updates *docs*"]);
        assert_eq!(unique, vec!["  Adds login ", "Updates *docs*"]);
    }

    #[test]
    fn single_prompt_has_no_chunk_count_mismatch() {
        let single = [ChunkResult::succeeded(0, "Adds login")];
        assert!(!counts_disagree(&[], &single));

        let chunk = DiffChunk {
            content: "+x\n".into(),
            index: 0,
            total_chunks: 2,
            context: crate::models::ChunkContext {
                files: vec![],
                change_type: crate::models::ChangeType::Add,
            },
            has_overlap: false,
        };
        assert!(counts_disagree(&[chunk.clone(), chunk.clone()], &single));
        assert!(!counts_disagree(&[chunk], &single));
    }

    #[test]
    fn normalize_collapses_whitespace() {
        assert_eq!(normalize("  Fixed,\n\tbug   “A”  "), "fixed bug a");
    }
}
