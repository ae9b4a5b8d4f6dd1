//! Atomic Persistence
//!
//! Writes go to a temp file in the destination directory and are renamed into
//! place, so a reader never observes a half-written artifact.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{CoreError, CoreResult};

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Atomically write raw text to `path`, creating parent directories.
pub fn write_text_atomic(path: &Path, text: &str) -> CoreResult<()> {
    let parent = parent_dir(path);
    std::fs::create_dir_all(&parent)?;

    let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
    tmp.write_all(text.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| CoreError::Io(e.error))?;

    tracing::debug!(path = %path.display(), bytes = text.len(), "wrote file atomically");
    Ok(())
}

/// Atomically write `value` as pretty-printed JSON.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> CoreResult<()> {
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    write_text_atomic(path, &text)
}

/// Read and deserialize a JSON file.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> CoreResult<T> {
    if !path.exists() {
        return Err(CoreError::not_found(format!(
            "File not found: {}",
            path.display()
        )));
    }
    let content = std::fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| CoreError::parse(format!("Invalid JSON in {}: {}", path.display(), e)))
}
