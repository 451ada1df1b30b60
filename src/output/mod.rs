//! Output renderers: terminal, JSON, and raw Markdown, plus the chunk plan view.

pub mod json;
pub mod markdown;
pub mod plan;
pub mod terminal;

use crate::orchestrator::DraftReport;

/// Trait for rendering a drafted description to an output format.
pub trait OutputRenderer {
    /// Render the report to a string.
    fn render(&self, report: &DraftReport) -> String;
}
