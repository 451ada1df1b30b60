//! Whole-file filtering of unified diffs by ignore patterns.
//!
//! A file is either kept with all of its lines or removed with all of its
//! lines; there is no line-level filtering.

use std::collections::HashSet;

use globset::{Glob, GlobBuilder, GlobSet, GlobSetBuilder};
use thiserror::Error;

use crate::config::FilterConfig;

use super::parser::{self, split_file_blocks};

/// Errors building a file filter.
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("invalid ignore pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: globset::Error,
    },
}

/// Result of filtering a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterOutcome {
    /// The diff with ignored file blocks removed.
    pub diff: String,
    /// Post-change paths of the removed files, in diff order.
    pub removed_files: Vec<String>,
}

/// Removes whole files matching ignore patterns from a diff.
#[derive(Debug, Clone)]
pub struct FileFilter {
    enabled: bool,
    exact: HashSet<String>,
    /// Globs matched against the full path.
    path_globs: GlobSet,
    /// Slash-free globs, also matched against the file name alone.
    name_globs: GlobSet,
}

impl FileFilter {
    /// Compile a filter from its configuration.
    pub fn new(config: &FilterConfig) -> Result<Self, FilterError> {
        let mut exact = HashSet::new();
        let mut path_globs = GlobSetBuilder::new();
        let mut name_globs = GlobSetBuilder::new();

        for pattern in config.patterns() {
            let pattern = pattern.trim();
            if pattern.is_empty() {
                continue;
            }
            exact.insert(pattern.to_string());
            if !is_glob(pattern) {
                continue;
            }
            let glob = compile(pattern)?;
            if !pattern.contains('/') {
                name_globs.add(glob.clone());
            }
            path_globs.add(glob);
        }

        Ok(Self {
            enabled: config.enabled,
            exact,
            path_globs: build_set(path_globs)?,
            name_globs: build_set(name_globs)?,
        })
    }

    /// A filter that keeps every file.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            exact: HashSet::new(),
            path_globs: GlobSet::empty(),
            name_globs: GlobSet::empty(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Whether a file path matches any ignore pattern.
    pub fn should_ignore(&self, path: &str) -> bool {
        if self.exact.contains(path) || self.path_globs.is_match(path) {
            return true;
        }
        let name = path.rsplit('/').next().unwrap_or(path);
        self.name_globs.is_match(name)
    }

    /// Remove ignored file blocks from a diff.
    pub fn filter_diff(&self, diff: &str) -> String {
        self.filter(diff).diff
    }

    /// Remove ignored file blocks and report which files went.
    ///
    /// Retained blocks keep their order and the result loses its trailing
    /// blank lines. When nothing is removed (or the filter is disabled)
    /// the input comes back unchanged.
    pub fn filter(&self, diff: &str) -> FilterOutcome {
        if !self.enabled {
            return FilterOutcome {
                diff: diff.to_string(),
                removed_files: Vec::new(),
            };
        }

        let split = split_file_blocks(diff);
        let (removed, kept): (Vec<_>, Vec<_>) = split
            .blocks
            .iter()
            .partition(|block| self.should_ignore(&block.new_path));

        if removed.is_empty() {
            return FilterOutcome {
                diff: diff.to_string(),
                removed_files: Vec::new(),
            };
        }

        let mut filtered = String::with_capacity(diff.len());
        filtered.push_str(split.preamble);
        for block in &kept {
            filtered.push_str(block.text);
        }
        let filtered = filtered.trim_end_matches(['\n', '\r']).to_string();

        let removed_files: Vec<String> = removed.iter().map(|b| b.new_path.clone()).collect();
        tracing::debug!(
            removed = removed_files.len(),
            kept = kept.len(),
            "filtered ignored files from diff"
        );

        FilterOutcome {
            diff: filtered,
            removed_files,
        }
    }

    /// Post-change paths of every file in the diff, in order, without repeats.
    pub fn extract_modified_files(&self, diff: &str) -> Vec<String> {
        parser::extract_file_paths(diff).into_iter().collect()
    }
}

fn is_glob(pattern: &str) -> bool {
    pattern.contains(['*', '?', '[', '{'])
}

fn compile(pattern: &str) -> Result<Glob, FilterError> {
    GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|source| FilterError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

fn build_set(builder: GlobSetBuilder) -> Result<GlobSet, FilterError> {
    builder.build().map_err(|source| FilterError::InvalidPattern {
        pattern: "<set>".to_string(),
        source,
    })
}
