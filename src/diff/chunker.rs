//! Chunk splitter for large diffs.
//!
//! Splits an oversized unified diff into bounded chunks so each fits in a
//! provider's context window. Whole files are grouped together when that
//! works; otherwise the diff is cut by size, preferring hunk boundaries
//! and repeating a few lines between chunks for continuity.

use indexmap::IndexSet;

use crate::config::{ChunkConfig, ChunkConfigError};
use crate::models::diff::{ChunkContext, DiffChunk};

use super::parser::{self, split_file_blocks, FILE_HEADER_PREFIX, HUNK_HEADER_PREFIX};

/// How a diff ended up being split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkStrategy {
    /// Chunking disabled or the diff already fits.
    Single,
    /// Consecutive whole files packed per chunk.
    ByFile,
    /// Line-based cutting with overlap.
    BySize,
}

/// The chunks for one diff plus how they were made.
#[derive(Debug, Clone)]
pub struct ChunkPlan {
    pub chunks: Vec<DiffChunk>,
    pub strategy: ChunkStrategy,
    /// Size-based splitting hit `max_chunks` and dropped the rest of the diff.
    pub limit_reached: bool,
}

/// A chunk before its position in the batch is known.
struct Draft {
    content: String,
    files: Vec<String>,
    has_overlap: bool,
}

/// Splits diffs according to a validated [`ChunkConfig`].
#[derive(Debug, Clone)]
pub struct DiffChunker {
    config: ChunkConfig,
}

impl DiffChunker {
    /// Create a chunker, rejecting invalid size combinations up front.
    pub fn new(config: ChunkConfig) -> Result<Self, ChunkConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ChunkConfig {
        &self.config
    }

    /// Split a diff into an ordered batch of chunks.
    pub fn chunk(&self, diff: &str) -> Vec<DiffChunk> {
        self.plan(diff).chunks
    }

    /// Split a diff and report which strategy was used.
    pub fn plan(&self, diff: &str) -> ChunkPlan {
        if !self.config.enabled || char_len(diff) <= self.config.chunk_size {
            let files = parser::extract_file_paths(diff).into_iter().collect();
            return finish(
                vec![Draft {
                    content: diff.to_string(),
                    files,
                    has_overlap: false,
                }],
                ChunkStrategy::Single,
                false,
            );
        }

        let by_file = self.chunk_by_file(diff);
        if by_file.len() > 1 && by_file.len() <= self.config.max_chunks {
            tracing::debug!(chunks = by_file.len(), "split diff by file");
            return finish(by_file, ChunkStrategy::ByFile, false);
        }

        let (by_size, limit_reached) = self.chunk_by_size(diff);
        if limit_reached {
            tracing::warn!(
                max_chunks = self.config.max_chunks,
                "diff exceeds chunk limit; remaining content is not described"
            );
        }
        tracing::debug!(chunks = by_size.len(), "split diff by size");
        finish(by_size, ChunkStrategy::BySize, limit_reached)
    }

    /// Greedily pack consecutive file blocks into chunks.
    fn chunk_by_file(&self, diff: &str) -> Vec<Draft> {
        let split = split_file_blocks(diff);
        if split.blocks.is_empty() {
            return Vec::new();
        }

        let mut drafts = Vec::new();
        let mut buffer = String::from(split.preamble);
        let mut buffer_len = char_len(split.preamble);
        let mut files: IndexSet<String> = IndexSet::new();

        for block in &split.blocks {
            let block_len = block.char_len();
            if buffer_len > 0 && buffer_len + block_len > self.config.chunk_size {
                drafts.push(Draft {
                    content: std::mem::take(&mut buffer),
                    files: std::mem::take(&mut files).into_iter().collect(),
                    has_overlap: false,
                });
                buffer_len = 0;
            }
            buffer.push_str(block.text);
            buffer_len += block_len;
            files.insert(block.new_path.clone());
        }

        if !buffer.is_empty() {
            drafts.push(Draft {
                content: buffer,
                files: files.into_iter().collect(),
                has_overlap: false,
            });
        }

        drafts
    }

    /// Cut the diff line by line, avoiding breaks inside a hunk.
    ///
    /// A break inside a hunk is allowed only once the chunk would grow past
    /// twice the budget. Every chunk after the first reaches at least one
    /// line past the end of the previous one. Returns the drafts and whether
    /// `max_chunks` cut the diff short.
    fn chunk_by_size(&self, diff: &str) -> (Vec<Draft>, bool) {
        let lines: Vec<&str> = diff.split_inclusive('\n').collect();
        let layout = LineLayout::scan(&lines);
        let chunk_size = self.config.chunk_size;
        let hard_limit = chunk_size.saturating_mul(2);

        let mut drafts = Vec::new();
        let mut start = 0;
        let mut overlap_lines = 0;
        // Exclusive end of the previous chunk.
        let mut previous_end = 0;
        let mut limit_reached = false;

        while start < lines.len() {
            if drafts.len() >= self.config.max_chunks {
                limit_reached = true;
                break;
            }

            let mut content = String::new();
            let mut content_len = 0;
            let mut end = start;

            while end < lines.len() {
                let line = lines[end];
                let line_len = char_len(line);
                if end > previous_end && content_len + line_len > chunk_size {
                    let at_boundary = line.starts_with(FILE_HEADER_PREFIX)
                        || line.starts_with(HUNK_HEADER_PREFIX)
                        || !layout.in_hunk[end - 1];
                    if at_boundary || content_len + line_len > hard_limit {
                        break;
                    }
                }
                content.push_str(line);
                content_len += line_len;
                end += 1;
            }

            drafts.push(Draft {
                content,
                files: layout.files_between(start, end),
                has_overlap: overlap_lines > 0,
            });

            if end >= lines.len() {
                break;
            }

            overlap_lines = self.overlap_lines(&lines[start..end]);
            previous_end = end;
            start = end - overlap_lines;
        }

        (drafts, limit_reached)
    }

    /// How many trailing lines of `chunk` fit in `overlap_size` characters.
    ///
    /// Never the whole chunk, so the next start always moves forward.
    fn overlap_lines(&self, chunk: &[&str]) -> usize {
        let mut count = 0;
        let mut len = 0;
        for line in chunk.iter().skip(1).rev() {
            let line_len = char_len(line);
            if len + line_len > self.config.overlap_size {
                break;
            }
            len += line_len;
            count += 1;
        }
        count
    }
}

/// Per-line file and hunk membership, computed once per diff.
struct LineLayout {
    paths: Vec<String>,
    /// Index into `paths` of the file each line belongs to.
    file_at: Vec<Option<usize>>,
    /// Whether a hunk has started in the current file at or before each line.
    in_hunk: Vec<bool>,
}

impl LineLayout {
    fn scan(lines: &[&str]) -> Self {
        let mut paths = Vec::new();
        let mut file_at = Vec::with_capacity(lines.len());
        let mut in_hunk = Vec::with_capacity(lines.len());
        let mut current_file = None;
        let mut hunk = false;

        for line in lines {
            if line.starts_with(FILE_HEADER_PREFIX) {
                paths.push(parser::parse_diff_header(line).1);
                current_file = Some(paths.len() - 1);
                hunk = false;
            } else if line.starts_with(HUNK_HEADER_PREFIX) {
                hunk = true;
            }
            file_at.push(current_file);
            in_hunk.push(hunk);
        }

        Self {
            paths,
            file_at,
            in_hunk,
        }
    }

    /// Files touched by lines `start..end`, in order.
    fn files_between(&self, start: usize, end: usize) -> Vec<String> {
        let indices: IndexSet<usize> = self.file_at[start..end].iter().flatten().copied().collect();
        indices
            .into_iter()
            .map(|i| self.paths[i].clone())
            .filter(|p| !p.is_empty())
            .collect()
    }
}

/// Number the drafts and attach their change context.
fn finish(drafts: Vec<Draft>, strategy: ChunkStrategy, limit_reached: bool) -> ChunkPlan {
    let total_chunks = drafts.len();
    let chunks = drafts
        .into_iter()
        .enumerate()
        .map(|(index, draft)| DiffChunk {
            context: ChunkContext {
                files: draft.files,
                change_type: parser::detect_change_type(&draft.content),
            },
            content: draft.content,
            index,
            total_chunks,
            has_overlap: draft.has_overlap,
        })
        .collect();

    ChunkPlan {
        chunks,
        strategy,
        limit_reached,
    }
}

/// Length in characters, the unit of every chunk budget.
pub(crate) fn char_len(s: &str) -> usize {
    s.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::diff::ChangeType;
    use pretty_assertions::assert_eq;

    /// A single-hunk file block of exactly `len` characters.
    fn file_block(path: &str, len: usize) -> String {
        let head = format!("diff --git a/{path} b/{path}\n@@ -0,0 +1 @@\n");
        let pad = len - head.len() - 2;
        let block = format!("{head}+{}\n", "x".repeat(pad));
        assert_eq!(block.len(), len);
        block
    }

    /// A file with `hunks` hunks of `lines` added lines each.
    fn hunked_file(path: &str, hunks: usize, lines: usize) -> String {
        let mut out = format!("diff --git a/{path} b/{path}\n");
        for h in 0..hunks {
            out.push_str(&format!("@@ -{h},0 +{h},{lines} @@\n"));
            for l in 0..lines {
                out.push_str(&format!("+line {h:02}-{l:02}\n"));
            }
        }
        out
    }

    fn chunker(chunk_size: usize, overlap_size: usize, max_chunks: usize) -> DiffChunker {
        DiffChunker::new(ChunkConfig::new(chunk_size, overlap_size, max_chunks).unwrap()).unwrap()
    }

    fn assert_batch_consistent(chunks: &[DiffChunk]) {
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i);
            assert_eq!(chunk.total_chunks, chunks.len());
            assert!(!chunk.content.is_empty());
        }
        assert!(!chunks[0].has_overlap);
    }

    #[test]
    fn small_diff_not_chunked() {
        let diff = file_block("a.rs", 60);
        let chunks = chunker(100, 10, 5).chunk(&diff);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].total_chunks, 1);
        assert!(!chunks[0].has_overlap);
        assert_eq!(chunks[0].content, diff);
        assert_eq!(chunks[0].context.files, vec!["a.rs"]);
        assert_eq!(chunks[0].context.change_type, ChangeType::Add);
    }

    #[test]
    fn disabled_chunking_returns_whole_diff() {
        let diff = format!("{}{}", file_block("a.rs", 80), file_block("b.rs", 80));
        let mut config = ChunkConfig::new(100, 10, 5).unwrap();
        config.enabled = false;
        let plan = DiffChunker::new(config).unwrap().plan(&diff);
        assert_eq!(plan.strategy, ChunkStrategy::Single);
        assert_eq!(plan.chunks.len(), 1);
        assert_eq!(plan.chunks[0].context.files, vec!["a.rs", "b.rs"]);
    }

    #[test]
    fn two_files_split_by_file() {
        let a = file_block("a.js", 80);
        let b = file_block("b.js", 80);
        let plan = chunker(100, 10, 5).plan(&format!("{a}{b}"));
        assert_eq!(plan.strategy, ChunkStrategy::ByFile);
        assert_eq!(plan.chunks.len(), 2);
        assert_batch_consistent(&plan.chunks);
        assert_eq!(plan.chunks[0].content, a);
        assert_eq!(plan.chunks[1].content, b);
        assert_eq!(plan.chunks[0].context.files, vec!["a.js"]);
        assert_eq!(plan.chunks[1].context.files, vec!["b.js"]);
        assert!(plan.chunks.iter().all(|c| !c.has_overlap));
    }

    #[test]
    fn small_files_are_packed_together() {
        let diff = format!(
            "{}{}{}",
            file_block("a.rs", 80),
            file_block("b.rs", 80),
            file_block("c.rs", 80)
        );
        let chunks = chunker(200, 10, 5).chunk(&diff);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].context.files, vec!["a.rs", "b.rs"]);
        assert_eq!(chunks[1].context.files, vec!["c.rs"]);
        let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt, diff);
    }

    #[test]
    fn too_many_file_chunks_falls_back_to_size() {
        let diff = format!(
            "{}{}{}",
            file_block("a.rs", 80),
            file_block("b.rs", 80),
            file_block("c.rs", 80)
        );
        let plan = chunker(100, 10, 2).plan(&diff);
        assert_eq!(plan.strategy, ChunkStrategy::BySize);
        assert_eq!(plan.chunks.len(), 2);
        assert!(plan.limit_reached);
        assert_batch_consistent(&plan.chunks);
    }

    #[test]
    fn single_large_file_split_at_hunk_boundaries() {
        // header 29 chars, each hunk 16 + 4 * 12 = 64 chars
        let diff = hunked_file("big.rs", 2, 4);
        let plan = chunker(100, 0, 5).plan(&diff);
        assert_eq!(plan.strategy, ChunkStrategy::BySize);
        assert_eq!(plan.chunks.len(), 2);
        assert_batch_consistent(&plan.chunks);
        assert!(plan.chunks[1].content.starts_with("@@ -1,0"));
        assert_eq!(plan.chunks[1].context.files, vec!["big.rs"]);
        let rebuilt: String = plan.chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt, diff);
    }

    #[test]
    fn size_chunks_overlap_after_the_first() {
        let diff = hunked_file("big.rs", 6, 4);
        let chunks = chunker(100, 30, 10).chunk(&diff);
        assert!(chunks.len() > 2);
        assert_batch_consistent(&chunks);
        for pair in chunks.windows(2) {
            assert!(pair[1].has_overlap);
            let first_line = pair[1].content.lines().next().unwrap();
            assert!(
                pair[0].content.lines().any(|l| l == first_line),
                "chunk {} should repeat the tail of chunk {}",
                pair[1].index,
                pair[0].index
            );
        }
    }

    #[test]
    fn overlap_never_stalls_on_long_tail_lines() {
        let mut diff = "a\n".repeat(10);
        for i in 0..8 {
            diff.push_str(&format!("{i}{}\n", "b".repeat(38)));
        }
        let lines: Vec<&str> = diff.split_inclusive('\n').collect();

        let plan = chunker(100, 90, 10).plan(&diff);
        assert!(!plan.limit_reached);
        assert_batch_consistent(&plan.chunks);

        let mut previous_end = 0;
        for chunk in &plan.chunks {
            let chunk_lines: Vec<&str> = chunk.content.split_inclusive('\n').collect();
            let start = (0..lines.len())
                .find(|&s| lines[s..].starts_with(&chunk_lines))
                .unwrap();
            let end = start + chunk_lines.len();
            assert!(
                end > previous_end,
                "chunk {} adds no new lines over the previous chunk",
                chunk.index
            );
            previous_end = end;
        }
        assert_eq!(previous_end, lines.len());
    }

    #[test]
    fn overlap_is_bounded_by_characters() {
        let diff = hunked_file("big.rs", 6, 4);
        let chunks = chunker(100, 30, 10).chunk(&diff);
        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            let prev: Vec<&str> = pair[0].content.split_inclusive('\n').collect();
            let next: Vec<&str> = pair[1].content.split_inclusive('\n').collect();
            let shared = (1..=prev.len().min(next.len()))
                .rev()
                .find(|&k| prev[prev.len() - k..] == next[..k])
                .unwrap_or(0);
            assert!(shared > 0);
            let repeated: usize = next[..shared].iter().map(|l| char_len(l)).sum();
            assert!(repeated <= 30, "repeated {repeated} chars");
        }
    }

    #[test]
    fn giant_hunk_is_cut_at_twice_the_budget() {
        let diff = hunked_file("huge.rs", 1, 30);
        let chunks = chunker(50, 0, 20).chunk(&diff);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(char_len(&chunk.content) <= 100, "chunk too big: {}", chunk.content);
        }
        let rebuilt: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(rebuilt, diff);
    }

    #[test]
    fn max_chunks_drops_the_remainder() {
        let diff = hunked_file("huge.rs", 20, 3);
        let plan = chunker(100, 0, 3).plan(&diff);
        assert_eq!(plan.chunks.len(), 3);
        assert!(plan.limit_reached);
        assert!(!plan.chunks.last().unwrap().content.contains("line 19-02"));
    }

    #[test]
    fn malformed_diff_is_one_opaque_blob_per_chunk() {
        let text = "plain text line\n".repeat(20);
        let chunks = chunker(100, 0, 10).chunk(&text);
        assert!(chunks.len() > 1);
        assert_batch_consistent(&chunks);
        for chunk in &chunks {
            assert!(chunk.context.files.is_empty());
            assert_eq!(chunk.context.change_type, ChangeType::Mixed);
        }
    }

    #[test]
    fn counts_characters_not_bytes() {
        let diff = format!("diff --git a/é.rs b/é.rs\n+{}\n", "é".repeat(60));
        assert!(diff.len() > 100);
        assert!(char_len(&diff) <= 100);
        assert_eq!(chunker(100, 0, 5).chunk(&diff).len(), 1);
    }

    #[test]
    fn new_rejects_invalid_config() {
        let bad = ChunkConfig {
            enabled: true,
            chunk_size: 10,
            overlap_size: 10,
            max_chunks: 1,
        };
        assert!(DiffChunker::new(bad).is_err());
    }
}
