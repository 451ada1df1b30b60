//! Pull request prompt data.

use serde::{Deserialize, Serialize};

/// Everything the generator is told about a pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptData {
    pub title: String,
    /// Existing PR description written by the author (often empty).
    pub description: String,
    /// Unified diff of the PR.
    pub diff: String,
    pub author: String,
    pub source_branch: String,
    pub target_branch: String,
    /// Repository name, e.g. `workspace/repo-slug`.
    pub repository: String,
    /// Free-form hint from the requester, also used to carry chunk position.
    pub additional_context: Option<String>,
}

impl PromptData {
    /// Return a copy with every free-text field trimmed.
    ///
    /// The diff is left untouched. An additional context that trims to
    /// nothing becomes `None`.
    pub fn trimmed(&self) -> Self {
        Self {
            title: self.title.trim().to_string(),
            description: self.description.trim().to_string(),
            diff: self.diff.clone(),
            author: self.author.trim().to_string(),
            source_branch: self.source_branch.trim().to_string(),
            target_branch: self.target_branch.trim().to_string(),
            repository: self.repository.trim().to_string(),
            additional_context: self
                .additional_context
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }
}
