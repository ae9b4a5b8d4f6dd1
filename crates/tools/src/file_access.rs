//! Sandboxed File Access
//!
//! Path-contained reads from a source tree and writes into an output tree.
//! Every caller-supplied path is treated as relative to its root (a leading
//! `/` is stripped), normalized lexically, and then checked again against the
//! real filesystem so `..` segments and symlinks cannot escape the root.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Directory names never included in a source snapshot.
pub const DEFAULT_EXCLUDED_DIRS: &[&str] = &[
    "__pycache__",
    ".git",
    "node_modules",
    ".venv",
    "venv",
    "target",
    "build",
    "dist",
    ".pytest_cache",
    ".coverage",
    "logs",
    "tmp",
    "temp",
];

/// Which sandbox root a path was resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootKind {
    Source,
    Output,
}

impl std::fmt::Display for RootKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RootKind::Source => write!(f, "source"),
            RootKind::Output => write!(f, "output"),
        }
    }
}

/// Errors raised by the file sandbox.
#[derive(Error, Debug)]
pub enum FileAccessError {
    #[error("Access denied: Path {path} is outside {root} directory")]
    AccessDenied { path: String, root: RootKind },

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Path is not a file: {0}")]
    NotAFile(String),

    #[error("Path is not a directory: {0}")]
    NotADirectory(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FileAccessError {
    fn io(path: &str, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_string(),
            source,
        }
    }
}

pub type FileAccessResult<T> = Result<T, FileAccessError>;

/// Entry type reported by `list`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Directory,
    File,
}

/// One item of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirEntryInfo {
    pub name: String,
    /// Path relative to the source root, `/`-separated
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// Confirmation of a completed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WrittenFile {
    pub path: String,
    pub bytes: usize,
}

/// Sandbox over a source root (read-only) and an output root (write).
#[derive(Debug, Clone)]
pub struct FileAccess {
    source_root: PathBuf,
    output_root: PathBuf,
}

impl FileAccess {
    /// Open a sandbox. The source root must exist; the output root is created.
    pub fn new(source_root: impl AsRef<Path>, output_root: impl AsRef<Path>) -> FileAccessResult<Self> {
        let source = source_root.as_ref();
        let source_display = source.display().to_string();
        if !source.exists() {
            return Err(FileAccessError::NotFound(source_display));
        }
        if !source.is_dir() {
            return Err(FileAccessError::NotADirectory(source_display));
        }
        let source_root = source
            .canonicalize()
            .map_err(|e| FileAccessError::io(&source_display, e))?;

        let output = output_root.as_ref();
        let output_display = output.display().to_string();
        std::fs::create_dir_all(output).map_err(|e| FileAccessError::io(&output_display, e))?;
        let output_root = output
            .canonicalize()
            .map_err(|e| FileAccessError::io(&output_display, e))?;

        tracing::info!(
            source = %source_root.display(),
            output = %output_root.display(),
            "file sandbox opened"
        );

        Ok(Self {
            source_root,
            output_root,
        })
    }

    pub fn source_root(&self) -> &Path {
        &self.source_root
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// Read a text file from the source tree.
    pub fn read(&self, relative_path: &str) -> FileAccessResult<String> {
        let path = resolve(&self.source_root, RootKind::Source, relative_path)?;
        if !path.exists() {
            return Err(FileAccessError::NotFound(relative_path.to_string()));
        }
        if !path.is_file() {
            return Err(FileAccessError::NotAFile(relative_path.to_string()));
        }
        std::fs::read_to_string(&path).map_err(|e| FileAccessError::io(relative_path, e))
    }

    /// Write a file into the output tree, creating parent directories.
    pub fn write(&self, relative_path: &str, content: &str) -> FileAccessResult<WrittenFile> {
        let path = resolve(&self.output_root, RootKind::Output, relative_path)?;
        if path == self.output_root {
            return Err(FileAccessError::NotAFile(relative_path.to_string()));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| FileAccessError::io(relative_path, e))?;
        }
        std::fs::write(&path, content).map_err(|e| FileAccessError::io(relative_path, e))?;

        tracing::debug!(path = relative_path, bytes = content.len(), "wrote output file");
        Ok(WrittenFile {
            path: relative_path.trim_start_matches('/').to_string(),
            bytes: content.len(),
        })
    }

    /// List a directory of the source tree, sorted by name.
    pub fn list(&self, relative_path: &str) -> FileAccessResult<Vec<DirEntryInfo>> {
        let dir = resolve(&self.source_root, RootKind::Source, relative_path)?;
        if !dir.exists() {
            return Err(FileAccessError::NotFound(relative_path.to_string()));
        }
        if !dir.is_dir() {
            return Err(FileAccessError::NotADirectory(relative_path.to_string()));
        }

        let reader = std::fs::read_dir(&dir).map_err(|e| FileAccessError::io(relative_path, e))?;
        let mut items = Vec::new();
        for entry in reader {
            let entry = entry.map_err(|e| FileAccessError::io(relative_path, e))?;
            let metadata = entry
                .metadata()
                .map_err(|e| FileAccessError::io(relative_path, e))?;
            let entry_path = entry.path();
            let rel = entry_path
                .strip_prefix(&self.source_root)
                .map(to_slash_path)
                .unwrap_or_default();
            let (kind, size) = if metadata.is_dir() {
                (EntryKind::Directory, None)
            } else {
                (EntryKind::File, Some(metadata.len()))
            };
            items.push(DirEntryInfo {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: rel,
                kind,
                size,
            });
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(items)
    }
}

/// Render a relative path with `/` separators.
pub fn to_slash_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Resolve `relative` under `root`, rejecting anything that leaves it.
fn resolve(root: &Path, kind: RootKind, relative: &str) -> FileAccessResult<PathBuf> {
    let denied = || FileAccessError::AccessDenied {
        path: relative.to_string(),
        root: kind,
    };

    let trimmed = relative.trim_start_matches('/');
    let mut resolved = root.to_path_buf();
    for component in Path::new(trimmed).components() {
        match component {
            Component::Normal(part) => resolved.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() || !resolved.starts_with(root) {
                    return Err(denied());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(denied()),
        }
    }
    if !resolved.starts_with(root) {
        return Err(denied());
    }

    // Symlinks: the deepest existing ancestor must really live under the root.
    let mut probe: &Path = &resolved;
    loop {
        if std::fs::symlink_metadata(probe).is_ok() {
            let real = probe.canonicalize().map_err(|_| denied())?;
            if real.starts_with(root) {
                return Ok(resolved);
            }
            return Err(denied());
        }
        match probe.parent() {
            Some(parent) => probe = parent,
            None => return Err(denied()),
        }
    }
}

// ============================================================================
// Source Snapshot
// ============================================================================

/// A text file captured from the source tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub relative_path: String,
    pub content: String,
}

/// Every readable text file under a root, plus the paths that were skipped.
#[derive(Debug, Clone, Default)]
pub struct SourceSnapshot {
    pub files: Vec<SourceFile>,
    pub skipped: Vec<String>,
}

/// Walk `root`, skipping excluded directory names, and read every file as
/// UTF-8 text. Unreadable files are recorded in `skipped` with a warning.
pub fn collect_source_files(root: &Path, excluded_dirs: &[&str]) -> FileAccessResult<SourceSnapshot> {
    let root_display = root.display().to_string();
    if !root.is_dir() {
        return Err(FileAccessError::NotADirectory(root_display));
    }

    let excluded: Vec<String> = excluded_dirs.iter().map(|d| d.to_string()).collect();
    let walker = ignore::WalkBuilder::new(root)
        .hidden(false)
        .ignore(false)
        .git_ignore(false)
        .git_global(false)
        .git_exclude(false)
        .parents(false)
        .filter_entry(move |entry| {
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            !(is_dir
                && entry.depth() > 0
                && excluded
                    .iter()
                    .any(|name| entry.file_name().to_string_lossy() == name.as_str()))
        })
        .build();

    let mut snapshot = SourceSnapshot::default();
    for result in walker {
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(root)
            .map(to_slash_path)
            .unwrap_or_else(|_| entry.path().display().to_string());

        match std::fs::read_to_string(entry.path()) {
            Ok(content) => snapshot.files.push(SourceFile {
                relative_path: relative,
                content,
            }),
            Err(e) => {
                tracing::warn!(path = %relative, error = %e, "skipping file that is not valid text");
                snapshot.skipped.push(relative);
            }
        }
    }

    snapshot
        .files
        .sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    snapshot.skipped.sort();
    Ok(snapshot)
}
