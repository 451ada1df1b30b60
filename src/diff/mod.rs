//! Diff engine: input reading, file-block parsing, filtering, and chunk splitting.

pub mod chunker;
pub mod file;
pub mod filter;
pub mod parser;

use thiserror::Error;

pub use chunker::{ChunkPlan, ChunkStrategy, DiffChunker};
pub use filter::{FileFilter, FilterError, FilterOutcome};

/// Errors from the diff engine.
#[derive(Error, Debug)]
pub enum DiffError {
    #[error("failed to read diff file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("path not found: {0}")]
    PathNotFound(String),
}

/// Read a unified diff from stdin.
pub async fn read_diff_stdin() -> Result<String, DiffError> {
    use tokio::io::AsyncReadExt;
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .map_err(DiffError::FileReadError)?;
    Ok(buf)
}
