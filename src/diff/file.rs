//! Read a unified diff from a file.

use std::path::Path;

use super::DiffError;

/// Read a unified diff from a file path.
pub async fn read_diff_file(path: &Path) -> Result<String, DiffError> {
    if !path.exists() {
        return Err(DiffError::PathNotFound(path.display().to_string()));
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(DiffError::FileReadError)?;
    tracing::debug!(path = %path.display(), bytes = content.len(), "read diff file");
    Ok(content)
}
