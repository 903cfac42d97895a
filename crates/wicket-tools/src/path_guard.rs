//! Workspace confinement for filesystem tools.
//!
//! Symlink escapes and literal `..` traversal are both caught by a single
//! canonicalization step: the candidate path (or, for paths that do not
//! exist yet, its nearest existing ancestor) is resolved to a real path and
//! must remain under the canonical workspace root. Percent-encoded traversal
//! sequences are not decoded; they resolve to literal file names inside the
//! workspace.

use crate::error::ToolError;
use std::path::{Component, Path, PathBuf};

/// Resolve a tool-supplied path and ensure it stays within the workspace.
///
/// Works for existing and to-be-created paths alike, so reads and writes
/// share one confinement check.
pub fn confine(raw: &str, workspace_dir: &Path) -> Result<PathBuf, ToolError> {
    let sanitized: String = raw.replace('\0', "");
    let sanitized = sanitized.trim();
    if sanitized.is_empty() {
        return Err(ToolError::InvalidInput("Invalid path".to_string()));
    }

    let workspace = workspace_dir
        .canonicalize()
        .map_err(|e| ToolError::Execution(format!("Cannot resolve workspace dir: {e}")))?;

    let candidate = absolutize(Path::new(sanitized), &workspace);

    let resolved = if candidate.exists() {
        candidate
            .canonicalize()
            .map_err(|e| ToolError::Execution(format!("Cannot resolve path: {e}")))?
    } else {
        let (existing_base, tail) = split_existing_ancestor(&candidate)?;
        existing_base.join(tail)
    };

    if !resolved.starts_with(&workspace) {
        return Err(ToolError::PathOutsideWorkspace);
    }
    Ok(resolved)
}

fn absolutize(path: &Path, workspace: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        normalize_path(&workspace.join(path))
    }
}

/// Walk up to the nearest existing ancestor, canonicalize it, and re-attach
/// the non-existing tail.
fn split_existing_ancestor(path: &Path) -> Result<(PathBuf, PathBuf), ToolError> {
    let mut existing = path.to_path_buf();
    let mut tail = PathBuf::new();

    while !existing.exists() {
        let name = existing.file_name().ok_or_else(|| {
            ToolError::Execution(format!("Cannot resolve path: {}", path.display()))
        })?;
        if tail.as_os_str().is_empty() {
            tail = PathBuf::from(name);
        } else {
            tail = PathBuf::from(name).join(&tail);
        }
        existing = existing
            .parent()
            .ok_or_else(|| {
                ToolError::Execution(format!("Cannot resolve path: {}", path.display()))
            })?
            .to_path_buf();
    }

    let canonical_existing = existing
        .canonicalize()
        .map_err(|e| ToolError::Execution(format!("Cannot resolve path: {e}")))?;

    Ok((canonical_existing, tail))
}

fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::RootDir => out.push(component.as_os_str()),
            Component::Prefix(prefix) => out.push(prefix.as_os_str()),
            Component::Normal(seg) => out.push(seg),
        }
    }
    out
}
