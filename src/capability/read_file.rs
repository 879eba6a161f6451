use std::fs;

use super::{CapabilityError, PathGuard};

use crate::constants::{BINARY_DETECTION_BYTES, READ_FILE_MAX_SIZE};

pub fn execute(guard: &PathGuard, path: &str) -> Result<String, CapabilityError> {
    let resolved = guard.resolve(path)?;
    if !resolved.is_file() {
        return Err(CapabilityError::Missing(path.to_string()));
    }

    let io_err = |source| CapabilityError::Io {
        context: format!("reading '{}'", path),
        source,
    };

    let metadata = fs::metadata(&resolved).map_err(io_err)?;
    if metadata.len() > READ_FILE_MAX_SIZE {
        return Err(CapabilityError::Rejected(format!(
            "File too large: {} bytes (max {}).",
            metadata.len(),
            READ_FILE_MAX_SIZE
        )));
    }

    let content = fs::read(&resolved).map_err(io_err)?;
    // Null bytes in the first block mean binary content.
    let check_len = content.len().min(BINARY_DETECTION_BYTES);
    if content[..check_len].contains(&0) {
        return Err(CapabilityError::Rejected(
            "Binary file detected. Cannot display binary content.".into(),
        ));
    }

    String::from_utf8(content)
        .map_err(|_| CapabilityError::Rejected(format!("'{}' is not valid UTF-8.", path)))
}
