//! `list_directory`: sorted entries of a directory under the project root.

use std::fs;

use super::{CapabilityError, PathGuard};

pub fn execute(guard: &PathGuard, path: &str) -> Result<String, CapabilityError> {
    let dir = guard.resolve(path)?;
    if !dir.exists() {
        return Err(CapabilityError::Missing(path.to_string()));
    }
    if !dir.is_dir() {
        return Err(CapabilityError::Rejected(format!("'{}' is not a directory.", path)));
    }

    let entries = fs::read_dir(&dir).map_err(|source| CapabilityError::Io {
        context: format!("listing '{}'", path),
        source,
    })?;

    let mut names: Vec<String> = entries
        .filter_map(|e| e.ok())
        .map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            if e.path().is_dir() {
                format!("{}/", name)
            } else {
                name
            }
        })
        .collect();
    names.sort();

    if names.is_empty() {
        Ok("The directory is empty.".into())
    } else {
        Ok(names.join("\n"))
    }
}
