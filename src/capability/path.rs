//! Project-root confinement for path-taking capabilities.
//!
//! Paths are first normalized lexically and checked against the root without
//! touching the filesystem, so an escape like `../../etc/passwd` is denied
//! before any I/O happens. Paths that pass are then walked component by
//! component so that a symlink anywhere along the way, dangling or not, cannot
//! point outside the root.

use std::collections::VecDeque;
use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::CapabilityError;

/// Links followed before a path is treated as a loop and denied.
const MAX_SYMLINK_HOPS: usize = 40;

/// Resolves capability paths relative to a fixed, canonical project root.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// Create a guard rooted at `root`, which must exist.
    pub fn new(root: &Path) -> std::io::Result<Self> {
        Ok(Self {
            root: root.canonicalize()?,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `path` under the root, or deny it.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, CapabilityError> {
        let candidate = if Path::new(path).is_absolute() {
            PathBuf::from(path)
        } else {
            self.root.join(path)
        };

        let normalized = normalize(&candidate);
        if !normalized.starts_with(&self.root) {
            return Err(CapabilityError::PathEscape(path.to_string()));
        }

        self.follow_links(path, &normalized)?;
        Ok(normalized)
    }

    /// Walks `normalized` one component at a time from the root, following
    /// every symlink (dangling ones included) and denying any link whose
    /// target lands outside the root.
    fn follow_links(&self, path: &str, normalized: &Path) -> Result<(), CapabilityError> {
        let io_error = |source: io::Error| CapabilityError::Io {
            context: format!("resolving '{}'", path),
            source,
        };

        let mut current = self.root.clone();
        let mut pending: VecDeque<OsString> = components_below(&self.root, normalized);
        let mut hops = 0;

        while let Some(part) = pending.pop_front() {
            let next = current.join(&part);
            let metadata = match fs::symlink_metadata(&next) {
                Ok(metadata) => metadata,
                // nothing below a missing component can be a link
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => return Err(io_error(e)),
            };
            if !metadata.file_type().is_symlink() {
                current = next;
                continue;
            }

            hops += 1;
            if hops > MAX_SYMLINK_HOPS {
                return Err(CapabilityError::PathEscape(path.to_string()));
            }
            let target = normalize(&current.join(fs::read_link(&next).map_err(io_error)?));
            if !target.starts_with(&self.root) {
                return Err(CapabilityError::PathEscape(path.to_string()));
            }
            let mut rest = components_below(&self.root, &target);
            rest.extend(pending);
            pending = rest;
            current = self.root.clone();
        }
        Ok(())
    }

    /// Path relative to the root, for display in previews and diffs.
    pub fn display_path(&self, resolved: &Path) -> String {
        resolved
            .strip_prefix(&self.root)
            .unwrap_or(resolved)
            .to_string_lossy()
            .into_owned()
    }
}

/// Normal components of `path` below `root`, in order.
fn components_below(root: &Path, path: &Path) -> VecDeque<OsString> {
    path.strip_prefix(root)
        .map(|rel| rel.components().map(|c| c.as_os_str().to_os_string()).collect())
        .unwrap_or_default()
}

/// Lexically folds `.` and `..` components without consulting the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            Component::Normal(part) => out.push(part),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard(name: &str) -> (PathGuard, PathBuf) {
        let dir = std::env::temp_dir().join(format!("tiller_guard_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        (PathGuard::new(&dir).unwrap(), dir)
    }

    #[test]
    fn test_normalize_folds_dots() {
        assert_eq!(normalize(Path::new("/a/b/./c/../d")), PathBuf::from("/a/b/d"));
        assert_eq!(normalize(Path::new("/a/../../b")), PathBuf::from("/b"));
    }

    #[test]
    fn test_resolve_relative_inside_root() {
        let (guard, dir) = guard("inside");
        let resolved = guard.resolve("src/lib.rs").unwrap();
        assert_eq!(resolved, guard.root().join("src/lib.rs"));
        assert_eq!(guard.display_path(&resolved), "src/lib.rs");
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_resolve_denies_parent_escape() {
        let (guard, dir) = guard("escape");
        let err = guard.resolve("../../etc/passwd").unwrap_err();
        assert!(matches!(err, CapabilityError::PathEscape(_)));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_resolve_denies_absolute_outside() {
        let (guard, dir) = guard("absolute");
        assert!(guard.resolve("/etc/passwd").is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_resolve_allows_dotdot_that_stays_inside() {
        let (guard, dir) = guard("stays");
        let resolved = guard.resolve("a/../b.txt").unwrap();
        assert_eq!(resolved, guard.root().join("b.txt"));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_denies_symlink_escape() {
        let (guard, dir) = guard("symlink");
        let outside = std::env::temp_dir().join(format!("tiller_guard_outside_{}", std::process::id()));
        std::fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, dir.join("link")).unwrap();

        let err = guard.resolve("link/secret.txt").unwrap_err();
        assert!(matches!(err, CapabilityError::PathEscape(_)));

        std::fs::remove_dir_all(&dir).unwrap();
        std::fs::remove_dir_all(&outside).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_denies_dangling_symlink_escape() {
        let (guard, dir) = guard("dangling");
        let outside = std::env::temp_dir().join(format!("tiller_guard_planted_{}.txt", std::process::id()));
        std::os::unix::fs::symlink(&outside, dir.join("link")).unwrap();

        let err = guard.resolve("link").unwrap_err();
        assert!(matches!(err, CapabilityError::PathEscape(_)));
        assert!(!outside.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_follows_chained_links_inside_root() {
        let (guard, dir) = guard("chain");
        std::fs::create_dir_all(dir.join("real")).unwrap();
        std::os::unix::fs::symlink("real", dir.join("hop")).unwrap();
        std::os::unix::fs::symlink("hop/new.txt", dir.join("alias")).unwrap();

        assert_eq!(guard.resolve("alias").unwrap(), guard.root().join("alias"));
        std::os::unix::fs::symlink("../../escape", dir.join("real/up")).unwrap();
        assert!(guard.resolve("hop/up/x.txt").is_err());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_resolve_denies_symlink_loop() {
        let (guard, dir) = guard("loop");
        std::os::unix::fs::symlink("b", dir.join("a")).unwrap();
        std::os::unix::fs::symlink("a", dir.join("b")).unwrap();

        let err = guard.resolve("a/file.txt").unwrap_err();
        assert!(matches!(err, CapabilityError::PathEscape(_)));
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
