use std::fs;

use super::{CapabilityError, PathGuard};

pub fn execute(guard: &PathGuard, path: &str) -> Result<String, CapabilityError> {
    let resolved = guard.resolve(path)?;
    if resolved.is_dir() {
        return Err(CapabilityError::Rejected(format!(
            "'{}' is a directory; only files can be deleted.",
            path
        )));
    }
    if !resolved.exists() {
        return Err(CapabilityError::Missing(path.to_string()));
    }

    fs::remove_file(&resolved).map_err(|source| CapabilityError::Io {
        context: format!("deleting '{}'", path),
        source,
    })?;
    Ok(format!("Deleted {}", path))
}
