//! Staging directory management.
//!
//! The staging directory is a scratch copy of `manifest.json` plus the
//! manifest's scope subtree. Conversions write into it and the archive is
//! built from it, so the project sources are never modified by a build.

use crate::manifest::MANIFEST_FILENAME;
use std::fs;
use std::path::{Path, PathBuf};

/// Error while preparing or removing the staging directory.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StageError {
    /// The staging directory (or a directory inside it) could not be created
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The manifest's scope does not exist or is not a directory
    #[error("Scope directory {} does not exist", .path.display())]
    MissingScope { path: PathBuf },
    /// A file or directory could not be copied
    #[error("Failed to copy {} to {}: {source}", .from.display(), .to.display())]
    Copy {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The staging directory could not be deleted
    #[error("Failed to delete staging directory {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Create an empty staging directory.
///
/// A directory left by an earlier build (`--keep-staging`, or a failed
/// archive step) is deleted first.
pub fn create_staging(staging: &Path) -> Result<(), StageError> {
    if staging.exists() {
        tracing::debug!(path = %staging.display(), "clearing leftover staging directory");
        remove_staging(staging)?;
    }
    fs::create_dir_all(staging)
        .map_err(|source| StageError::CreateDir { path: staging.to_path_buf(), source })
}

/// Copy the manifest file and the scope subtree into the staging directory.
///
/// Paths in `exclude` (the staging directory itself and the archive) are
/// never copied, which matters when the scope is the project root.
pub fn copy_project(
    project_root: &Path,
    scope: &str,
    staging: &Path,
    exclude: &[&Path],
) -> Result<(), StageError> {
    let manifest_src = project_root.join(MANIFEST_FILENAME);
    let manifest_dst = staging.join(MANIFEST_FILENAME);
    fs::copy(&manifest_src, &manifest_dst).map_err(|source| StageError::Copy {
        from: manifest_src,
        to: manifest_dst,
        source,
    })?;

    let scope_src = project_root.join(scope);
    if !scope_src.is_dir() {
        return Err(StageError::MissingScope { path: scope_src });
    }

    let scope_dst = staging.join(scope);
    fs::create_dir_all(&scope_dst)
        .map_err(|source| StageError::CreateDir { path: scope_dst.clone(), source })?;

    copy_dir_recursive(&scope_src, &scope_dst, exclude)
}

/// Recursively copy the contents of `src` into the existing directory `dst`.
fn copy_dir_recursive(src: &Path, dst: &Path, exclude: &[&Path]) -> Result<(), StageError> {
    let copy_err = |from: &Path, to: &Path, source| StageError::Copy {
        from: from.to_path_buf(),
        to: to.to_path_buf(),
        source,
    };

    let entries = fs::read_dir(src).map_err(|e| copy_err(src, dst, e))?;
    for entry in entries {
        let entry = entry.map_err(|e| copy_err(src, dst, e))?;
        let from = entry.path();
        if exclude.iter().any(|excluded| *excluded == from) {
            tracing::debug!(path = %from.display(), "skipping excluded path");
            continue;
        }

        let to = dst.join(entry.file_name());
        if from.is_dir() {
            fs::create_dir_all(&to)
                .map_err(|source| StageError::CreateDir { path: to.clone(), source })?;
            copy_dir_recursive(&from, &to, exclude)?;
        } else if from.is_file() {
            fs::copy(&from, &to).map_err(|e| copy_err(&from, &to, e))?;
        }
    }

    Ok(())
}

/// Delete the staging directory and everything in it.
pub fn remove_staging(staging: &Path) -> Result<(), StageError> {
    match fs::remove_dir_all(staging) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(StageError::Remove { path: staging.to_path_buf(), source }),
    }
}
