//! JSON output renderer.
//!
//! Outputs `{"result": {...}, "stats": {...}}` format.

use crate::orchestrator::DraftReport;
use crate::output::OutputRenderer;

/// JSON output renderer.
pub struct JsonRenderer;

impl OutputRenderer for JsonRenderer {
    fn render(&self, report: &DraftReport) -> String {
        let output = serde_json::json!({
            "result": report.result,
            "stats": report.stats,
        });

        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }
}
