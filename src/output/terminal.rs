//! Terminal renderer: the description followed by a dimmed stats footer.

use colored::Colorize;

use crate::constants::AI_DISCLOSURE;
use crate::orchestrator::DraftReport;
use crate::output::OutputRenderer;

/// Terminal output renderer with colored status lines.
pub struct TerminalRenderer;

impl OutputRenderer for TerminalRenderer {
    fn render(&self, report: &DraftReport) -> String {
        let result = &report.result;
        let stats = &report.stats;
        let mut output = String::new();

        if !result.success {
            let reason = result.error.as_deref().unwrap_or("generation failed");
            output.push_str(&format!(
                " {} {}\n",
                "✖".red().bold(),
                format!("Could not draft a description: {reason}").red()
            ));
        } else {
            output.push_str(result.description.trim_end());
            output.push_str("\n\n");
        }

        output.push_str(&format!("{}\n", "───────────────────────────────────".dimmed()));

        let mode = if stats.chunked {
            format!(
                "{} {}",
                stats.chunks_processed.to_string().bold(),
                if stats.chunks_processed == 1 { "chunk" } else { "chunks" }
            )
        } else {
            "single prompt".to_string()
        };
        output.push_str(&format!(" {mode}"));
        if result.failed_chunks > 0 {
            output.push_str(&format!(
                ", {} {}",
                result.failed_chunks.to_string().red().bold(),
                "failed".red()
            ));
        }
        output.push('\n');

        if !stats.filtered_files.is_empty() {
            output.push_str(&format!(
                " {} {}\n",
                "filtered:".dimmed(),
                stats.filtered_files.join(", ").dimmed()
            ));
        }
        if stats.all_files_ignored {
            output.push_str(&format!(
                " {} {}\n",
                "⚠".yellow().bold(),
                "Every changed file matched an ignore pattern.".yellow()
            ));
        }
        if stats.truncated {
            output.push_str(&format!(
                " {} {}\n",
                "⚠".yellow().bold(),
                "The diff was truncated before generation.".yellow()
            ));
        }
        if stats.chunk_limit_reached {
            output.push_str(&format!(
                " {} {}\n",
                "⚠".yellow().bold(),
                "The chunk limit was reached; the end of the diff was not described.".yellow()
            ));
        }
        output.push_str(&format!(" {}\n", AI_DISCLOSURE.dimmed()));

        output
    }
}
