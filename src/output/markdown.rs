//! Raw Markdown renderer: the description alone, ready to paste into a PR.

use crate::orchestrator::DraftReport;
use crate::output::OutputRenderer;

pub struct MarkdownRenderer;

impl OutputRenderer for MarkdownRenderer {
    fn render(&self, report: &DraftReport) -> String {
        if !report.result.success {
            return String::new();
        }
        let mut out = report.result.description.trim_end().to_string();
        out.push('\n');
        out
    }
}
