//! Unified diff block splitting.
//!
//! Splits the output of `git diff` (unified format) into per-file blocks
//! that borrow from the input. Each block starts at a `diff --git` header
//! and runs to the next header or end of input, so concatenating the
//! preamble and all blocks reproduces the input byte for byte.

use indexmap::IndexSet;

use crate::models::diff::ChangeType;

/// Prefix of the line that opens every file block.
pub const FILE_HEADER_PREFIX: &str = "diff --git ";

/// Prefix of a hunk header line.
pub const HUNK_HEADER_PREFIX: &str = "@@";

/// One file's slice of a unified diff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileBlock<'a> {
    /// Pre-change path from the header.
    pub old_path: String,
    /// Post-change path from the header; the path used for matching.
    pub new_path: String,
    /// Header line, extended headers and hunks, including trailing newline.
    pub text: &'a str,
}

impl FileBlock<'_> {
    /// Length of the block in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A diff split into its file blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplitDiff<'a> {
    /// Text before the first `diff --git` header (usually empty).
    pub preamble: &'a str,
    pub blocks: Vec<FileBlock<'a>>,
}

/// Split a unified diff into file blocks.
///
/// Input without any `diff --git` header yields no blocks; the whole text
/// is then the preamble.
pub fn split_file_blocks(input: &str) -> SplitDiff<'_> {
    let mut starts: Vec<usize> = Vec::new();
    let mut offset = 0;
    for line in input.split_inclusive('\n') {
        if line.starts_with(FILE_HEADER_PREFIX) {
            starts.push(offset);
        }
        offset += line.len();
    }

    let Some(&first) = starts.first() else {
        return SplitDiff {
            preamble: input,
            blocks: Vec::new(),
        };
    };

    let mut blocks = Vec::with_capacity(starts.len());
    for (i, &start) in starts.iter().enumerate() {
        let end = starts.get(i + 1).copied().unwrap_or(input.len());
        let text = &input[start..end];
        let header = text.lines().next().unwrap_or_default();
        let (old_path, new_path) = parse_diff_header(header);
        blocks.push(FileBlock {
            old_path,
            new_path,
            text,
        });
    }

    SplitDiff {
        preamble: &input[..first],
        blocks,
    }
}

/// Post-change paths of every file in the diff, in order, without repeats.
pub fn extract_file_paths(input: &str) -> IndexSet<String> {
    input
        .lines()
        .filter(|line| line.starts_with(FILE_HEADER_PREFIX))
        .map(|line| parse_diff_header(line).1)
        .filter(|path| !path.is_empty())
        .collect()
}

/// Count added and removed lines, ignoring the `+++`/`---` file markers.
pub fn count_changes(input: &str) -> (usize, usize) {
    let mut added = 0;
    let mut removed = 0;
    for line in input.lines() {
        if line.starts_with('+') && !line.starts_with("+++") {
            added += 1;
        } else if line.starts_with('-') && !line.starts_with("---") {
            removed += 1;
        }
    }
    (added, removed)
}

/// Classify the dominant change kind of a piece of diff text.
pub fn detect_change_type(input: &str) -> ChangeType {
    let (added, removed) = count_changes(input);
    ChangeType::from_counts(added, removed)
}

/// Parse the "diff --git a/path b/path" header line.
pub fn parse_diff_header(line: &str) -> (String, String) {
    let rest = line.strip_prefix(FILE_HEADER_PREFIX).unwrap_or(line).trim_end();

    // Handle paths with spaces by finding the second prefix separator.
    // Paths are prefixed with a/ and b/ (default), or c/w/i/o/ when
    // git's diff.mnemonicPrefix is enabled.
    if let Some(b_idx) = find_second_prefix(rest) {
        let a_part = &rest[..b_idx];
        let b_part = &rest[b_idx + 1..];

        let old_path = strip_diff_prefix(a_part).to_string();
        let new_path = strip_diff_prefix(b_part).to_string();
        (old_path, new_path)
    } else {
        let parts: Vec<&str> = rest.splitn(2, ' ').collect();
        let old_path = strip_diff_prefix(parts.first().unwrap_or(&"")).to_string();
        let new_path = strip_diff_prefix(parts.get(1).unwrap_or(&"")).to_string();
        (old_path, new_path)
    }
}

/// Strip a single-character git diff prefix (`a/`, `b/`, `c/`, `w/`, `i/`, `o/`).
fn strip_diff_prefix(path: &str) -> &str {
    if path.len() >= 2 {
        let bytes = path.as_bytes();
        if bytes[1] == b'/' && matches!(bytes[0], b'a' | b'b' | b'c' | b'w' | b'i' | b'o') {
            return &path[2..];
        }
    }
    path
}

/// Find the position of the second path prefix separator in a diff header.
///
/// Looks for ` X/` where X is any known single-letter prefix.
fn find_second_prefix(s: &str) -> Option<usize> {
    let bytes = s.as_bytes();
    for i in 1..bytes.len().saturating_sub(1) {
        if bytes[i] == b' '
            && bytes.get(i + 2) == Some(&b'/')
            && matches!(bytes.get(i + 1), Some(b'a' | b'b' | b'c' | b'w' | b'i' | b'o'))
        {
            return Some(i);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_FILES: &str = "diff --git a/a.rs b/a.rs\n\
index 1234567..abcdefg 100644\n\
--- a/a.rs\n\
+++ b/a.rs\n\
@@ -1,3 +1,3 @@\n \
fn a() {\n\
-    1\n\
+    2\n \
}\n\
diff --git a/b.rs b/b.rs\n\
new file mode 100644\n\
--- /dev/null\n\
+++ b/b.rs\n\
@@ -0,0 +1 @@\n\
+fn b() {}\n";

    #[test]
    fn split_two_files() {
        let split = split_file_blocks(TWO_FILES);
        assert_eq!(split.preamble, "");
        assert_eq!(split.blocks.len(), 2);
        assert_eq!(split.blocks[0].new_path, "a.rs");
        assert_eq!(split.blocks[1].new_path, "b.rs");
        assert!(split.blocks[0].text.starts_with("diff --git a/a.rs"));
        assert!(split.blocks[0].text.ends_with(" }\n"));
        assert!(split.blocks[1].text.ends_with("+fn b() {}\n"));
    }

    #[test]
    fn blocks_reassemble_to_input() {
        let input = format!("preamble line\n{TWO_FILES}");
        let split = split_file_blocks(&input);
        assert_eq!(split.preamble, "preamble line\n");
        let rebuilt: String = std::iter::once(split.preamble)
            .chain(split.blocks.iter().map(|b| b.text))
            .collect();
        assert_eq!(rebuilt, input);
    }

    #[test]
    fn split_without_headers_is_all_preamble() {
        let split = split_file_blocks("just some text\n+not a diff\n");
        assert!(split.blocks.is_empty());
        assert_eq!(split.preamble, "just some text\n+not a diff\n");
    }

    #[test]
    fn split_without_trailing_newline() {
        let split = split_file_blocks("diff --git a/x b/x\n+y");
        assert_eq!(split.blocks.len(), 1);
        assert_eq!(split.blocks[0].text, "diff --git a/x b/x\n+y");
    }

    #[test]
    fn rename_uses_new_path() {
        let split = split_file_blocks(
            "diff --git a/old_name.rs b/new_name.rs\nsimilarity index 95%\nrename from old_name.rs\nrename to new_name.rs\n",
        );
        assert_eq!(split.blocks[0].old_path, "old_name.rs");
        assert_eq!(split.blocks[0].new_path, "new_name.rs");
    }

    #[test]
    fn extract_paths_dedups_in_order() {
        let input = format!("{TWO_FILES}diff --git a/a.rs b/a.rs\n+again\n");
        let paths: Vec<_> = extract_file_paths(&input).into_iter().collect();
        assert_eq!(paths, vec!["a.rs", "b.rs"]);
    }

    #[test]
    fn extract_paths_from_malformed_input() {
        assert!(extract_file_paths("no headers here").is_empty());
        assert!(extract_file_paths("").is_empty());
    }

    #[test]
    fn change_counts_skip_file_markers() {
        assert_eq!(count_changes(TWO_FILES), (2, 1));
        assert_eq!(detect_change_type(TWO_FILES), ChangeType::Modify);
        assert_eq!(detect_change_type("--- a/x\n+++ b/x\n"), ChangeType::Mixed);
        assert_eq!(detect_change_type("+++ b/x\n+new\n"), ChangeType::Add);
        assert_eq!(detect_change_type("--- a/x\n-old\n"), ChangeType::Delete);
    }

    #[test]
    fn parse_header_with_spaces_in_path() {
        let (old, new) = parse_diff_header("diff --git a/my file.rs b/my file.rs");
        assert_eq!(old, "my file.rs");
        assert_eq!(new, "my file.rs");
    }

    #[test]
    fn parse_header_mnemonic_prefix() {
        let (old, new) = parse_diff_header("diff --git c/auth.rs w/auth.rs");
        assert_eq!(old, "auth.rs");
        assert_eq!(new, "auth.rs");
    }

    #[test]
    fn parse_header_ignores_carriage_return() {
        let (_, new) = parse_diff_header("diff --git a/win.rs b/win.rs\r");
        assert_eq!(new, "win.rs");
    }

    #[test]
    fn strip_diff_prefix_all_variants() {
        assert_eq!(strip_diff_prefix("a/file.rs"), "file.rs");
        assert_eq!(strip_diff_prefix("b/file.rs"), "file.rs");
        assert_eq!(strip_diff_prefix("c/file.rs"), "file.rs");
        assert_eq!(strip_diff_prefix("w/file.rs"), "file.rs");
        assert_eq!(strip_diff_prefix("i/file.rs"), "file.rs");
        assert_eq!(strip_diff_prefix("o/file.rs"), "file.rs");
        assert_eq!(strip_diff_prefix("x/file.rs"), "x/file.rs");
        assert_eq!(strip_diff_prefix("src/file.rs"), "src/file.rs");
        assert_eq!(strip_diff_prefix("a"), "a");
        assert_eq!(strip_diff_prefix(""), "");
    }
}
