use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

use crate::error::{AppError, Result};

/// An absolute path that has passed [`PathGuard::resolve`].
///
/// Only the guard can construct one, so disk operations that take a
/// `ConfinedPath` cannot be handed an unchecked path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfinedPath(PathBuf);

impl ConfinedPath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }
}

impl AsRef<Path> for ConfinedPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

/// Confines stored filenames to a single flat directory.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// Create a guard for `root`. The root must exist; it is canonicalized once here.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = std::fs::canonicalize(root.as_ref())?;
        if !root.is_dir() {
            return Err(AppError::Internal(
                "storage root is not a directory".to_string(),
            ));
        }
        Ok(Self { root })
    }

    /// Canonical storage root
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `storage_name` to an absolute path inside the root.
    ///
    /// The name check rejects separators, null bytes and `..`; the prefix check
    /// catches anything that still escapes after symlinks are followed.
    pub async fn resolve(&self, storage_name: &str) -> Result<ConfinedPath> {
        check_name(storage_name)?;

        let candidate = self.root.join(storage_name);
        let resolved = match fs::canonicalize(&candidate).await {
            Ok(real) => real,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // Not written yet, unless it is a dangling symlink
                if fs::symlink_metadata(&candidate).await.is_ok() {
                    return Err(AppError::PathViolation(format!(
                        "{:?} is a dangling link",
                        storage_name
                    )));
                }
                candidate
            }
            Err(e) => return Err(e.into()),
        };

        if resolved.parent() != Some(self.root.as_path()) {
            return Err(AppError::PathViolation(format!(
                "{:?} resolves outside the storage root",
                storage_name
            )));
        }

        Ok(ConfinedPath(resolved))
    }
}

fn check_name(storage_name: &str) -> Result<()> {
    let reason = if storage_name.is_empty() {
        Some("empty name")
    } else if storage_name == "." {
        Some("current directory")
    } else if storage_name.contains('\0') {
        Some("null byte")
    } else if storage_name.contains('/') || storage_name.contains('\\') {
        Some("path separator")
    } else if storage_name.contains("..") {
        Some("parent directory sequence")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(AppError::PathViolation(format!(
            "rejected storage name {:?}: {}",
            storage_name, reason
        ))),
        None => Ok(()),
    }
}
