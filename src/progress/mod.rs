//! Progress reporting for terminal output.
//!
//! Renders a live per-chunk status list on stderr with colored checkmarks,
//! retry notices, and failure indicators. Fed from the driver's
//! [`ChunkEvent`] channel; silenced with `--no-progress`.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::{Mutex, MutexGuard};

use colored::Colorize;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::orchestrator::ChunkEvent;

/// How many file names a chunk label lists before summarizing.
const LABEL_FILES: usize = 3;

/// Status of a single chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChunkStatus {
    /// Request in flight.
    InProgress,
    Done,
    /// Failed after retries.
    Failed(String),
    /// Retrying after transient error.
    Retrying {
        attempt: u32,
        max: u32,
        reason: String,
        backoff_secs: u64,
    },
}

/// Tracks and renders live progress for chunk generation.
pub struct ProgressTracker {
    inner: Mutex<ProgressState>,
    /// If false, all output is suppressed.
    enabled: bool,
}

#[derive(Default)]
struct ProgressState {
    /// chunk index → (label, status).
    chunks: BTreeMap<usize, (String, ChunkStatus)>,
    total: usize,
    /// Number of lines we last printed (for clearing).
    rendered_lines: usize,
}

impl ProgressTracker {
    pub fn new(enabled: bool) -> Self {
        Self {
            inner: Mutex::new(ProgressState::default()),
            enabled,
        }
    }

    fn state(&self) -> MutexGuard<'_, ProgressState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record an event and re-render.
    pub fn apply(&self, event: ChunkEvent) {
        let mut state = self.state();
        match event {
            ChunkEvent::Started { index, total, files } => {
                state.total = total;
                state
                    .chunks
                    .insert(index, (chunk_label(index, total, &files), ChunkStatus::InProgress));
            }
            ChunkEvent::Retrying {
                index,
                attempt,
                max,
                reason,
                backoff_secs,
            } => set_status(
                &mut state,
                index,
                ChunkStatus::Retrying {
                    attempt,
                    max,
                    reason,
                    backoff_secs,
                },
            ),
            ChunkEvent::Finished { index, success, error } => {
                let status = if success {
                    ChunkStatus::Done
                } else {
                    ChunkStatus::Failed(error.unwrap_or_else(|| "failed".to_string()))
                };
                set_status(&mut state, index, status);
            }
        }
        if self.enabled {
            Self::render(&mut state);
        }
    }

    /// Apply events until every sender is dropped.
    pub async fn run(&self, mut events: UnboundedReceiver<ChunkEvent>) {
        while let Some(event) = events.recv().await {
            self.apply(event);
        }
    }

    /// Clear progress lines and print the final status of each chunk.
    pub fn finish(&self) {
        if !self.enabled {
            return;
        }
        let mut state = self.state();
        Self::clear_lines(state.rendered_lines);
        state.rendered_lines = 0;

        let stderr = io::stderr();
        let mut handle = stderr.lock();
        for (label, status) in state.chunks.values() {
            let (icon, status_text) = match status {
                ChunkStatus::Failed(reason) => {
                    ("✖".red().bold().to_string(), reason.red().to_string())
                }
                _ => ("✔".green().bold().to_string(), "done".green().to_string()),
            };
            let _ = writeln!(handle, "  {icon} {} {status_text}", label.dimmed());
        }
        let _ = writeln!(handle);
    }

    /// Render the current state to stderr, clearing previous output.
    fn render(state: &mut ProgressState) {
        let stderr = io::stderr();
        let mut handle = stderr.lock();

        Self::clear_lines(state.rendered_lines);

        let mut lines = 0;
        let noun = if state.total == 1 { "chunk" } else { "chunks" };
        let _ = writeln!(
            handle,
            "  {} Describing {} {noun}",
            "▸".cyan().bold(),
            state.total
        );
        lines += 1;

        for (label, status) in state.chunks.values() {
            let (icon, status_text) = match status {
                ChunkStatus::InProgress => (
                    "◌".cyan().bold().to_string(),
                    "generating…".cyan().to_string(),
                ),
                ChunkStatus::Done => ("✔".green().bold().to_string(), "done".green().to_string()),
                ChunkStatus::Failed(reason) => {
                    ("✖".red().bold().to_string(), reason.red().to_string())
                }
                ChunkStatus::Retrying {
                    attempt,
                    max,
                    reason,
                    backoff_secs,
                } => (
                    "⟳".yellow().bold().to_string(),
                    format!("{reason}, retrying in {backoff_secs}s ({attempt}/{max})")
                        .yellow()
                        .to_string(),
                ),
            };
            let _ = writeln!(handle, "    {icon} {} {status_text}", label.dimmed());
            lines += 1;
        }

        let _ = handle.flush();
        state.rendered_lines = lines;
    }

    /// Move cursor up and clear `n` lines.
    fn clear_lines(n: usize) {
        if n == 0 {
            return;
        }
        let stderr = io::stderr();
        let mut handle = stderr.lock();
        for _ in 0..n {
            let _ = write!(handle, "\x1b[1A\x1b[2K");
        }
        let _ = handle.flush();
    }
}

fn set_status(state: &mut ProgressState, index: usize, status: ChunkStatus) {
    if let Some(entry) = state.chunks.get_mut(&index) {
        entry.1 = status;
    }
}

/// `[2/5] a.rs, b.rs +3 more`
fn chunk_label(index: usize, total: usize, files: &[String]) -> String {
    let mut label = format!("[{}/{total}]", index + 1);
    if !files.is_empty() {
        let shown: Vec<&str> = files.iter().take(LABEL_FILES).map(String::as_str).collect();
        label.push(' ');
        label.push_str(&shown.join(", "));
        if files.len() > LABEL_FILES {
            label.push_str(&format!(" +{} more", files.len() - LABEL_FILES));
        }
    }
    label
}
