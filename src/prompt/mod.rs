//! Prompt construction for description generation.
//!
//! The system prompt is embedded via `include_str!` so it ships with the
//! binary. The user prompt is rendered from [`PromptData`].

use crate::models::PromptData;

/// Instructions sent as the system preamble on every request.
pub const SYSTEM_PROMPT: &str = include_str!("system.md");

/// Build the user prompt for one generation request.
///
/// Empty metadata fields are omitted. The diff always goes last, inside a
/// fenced block.
pub fn build_user_prompt(data: &PromptData) -> String {
    let mut prompt = String::new();

    prompt.push_str("## Pull Request\n\n");
    push_field(&mut prompt, "Title", &data.title);
    push_field(&mut prompt, "Repository", &data.repository);
    push_field(&mut prompt, "Author", &data.author);
    if !data.source_branch.is_empty() || !data.target_branch.is_empty() {
        let source = or_unknown(&data.source_branch);
        let target = or_unknown(&data.target_branch);
        prompt.push_str(&format!("- **Branches:** {source} → {target}\n"));
    }
    prompt.push('\n');

    if !data.description.is_empty() {
        prompt.push_str(&format!(
            "## Existing Description\n\n{}\n\n",
            data.description
        ));
    }

    if let Some(context) = data.additional_context.as_deref().filter(|c| !c.is_empty()) {
        prompt.push_str(&format!("## Additional Context\n\n{context}\n\n"));
    }

    if data.diff.trim().is_empty() {
        prompt.push_str("## Diff\n\nNo reviewable file changes remain after filtering.\n\n");
    } else {
        // A diff may itself contain ``` lines, so use a longer fence.
        let fence = fence_for(&data.diff);
        prompt.push_str(&format!("## Diff\n\n{fence}diff\n{}", data.diff));
        if !data.diff.ends_with('\n') {
            prompt.push('\n');
        }
        prompt.push_str(&format!("{fence}\n\n"));
    }

    prompt.push_str(
        "## Instructions\n\n\
        Write the pull request description for the changes above.\n",
    );

    prompt
}

fn push_field(prompt: &mut String, label: &str, value: &str) {
    if !value.is_empty() {
        prompt.push_str(&format!("- **{label}:** {value}\n"));
    }
}

fn or_unknown(branch: &str) -> &str {
    if branch.is_empty() { "(unknown)" } else { branch }
}

/// A backtick fence longer than any backtick run in `text`.
fn fence_for(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}
