//! `write_file`: writes content to a file, creating parent directories as needed.

use std::fs;

use super::{CapabilityError, PathGuard};

/// Writes `content` to `path` under the project root.
///
/// The path is checked before any directory is created, so a denied write
/// leaves the filesystem untouched.
pub fn execute(guard: &PathGuard, path: &str, content: &str) -> Result<String, CapabilityError> {
    let resolved = guard.resolve(path)?;
    if resolved.is_dir() {
        return Err(CapabilityError::Rejected(format!("'{}' is a directory.", path)));
    }

    let io_err = |source| CapabilityError::Io {
        context: format!("writing '{}'", path),
        source,
    };

    if let Some(parent) = resolved.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(&resolved, content).map_err(io_err)?;

    Ok(format!("Wrote {} bytes to {}", content.len(), path))
}
