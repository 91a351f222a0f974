//! Package archive writer.
//!
//! The archive is a zip file holding every file under the staging
//! directory, named by its path relative to the staging root with `/`
//! separators.

use glob::Pattern;
use std::fs::{self, File};
use std::io::{self, Seek, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Error while writing the archive.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ArchiveError {
    /// A previous archive at the target path could not be deleted
    #[error("Failed to delete existing archive {}: {source}", .path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// IO error on the archive or one of the staged files
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The zip writer failed
    #[error("Failed to write archive {}: {source}", .path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },
    /// The staging directory could not be enumerated
    #[error("Invalid staging path pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}

/// Write the archive at `archive` from the contents of `staging`.
///
/// Any existing file at `archive` is deleted first. Returns the number of
/// files stored.
pub fn write_archive(staging: &Path, archive: &Path) -> Result<usize, ArchiveError> {
    match fs::remove_file(archive) {
        Ok(()) => tracing::debug!(path = %archive.display(), "removed previous archive"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => return Err(ArchiveError::Remove { path: archive.to_path_buf(), source }),
    }

    if let Some(parent) = archive.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|source| ArchiveError::Io { path: parent.to_path_buf(), source })?;
    }

    let file = File::create(archive)
        .map_err(|source| ArchiveError::Io { path: archive.to_path_buf(), source })?;
    let mut zip = ZipWriter::new(file);

    let count = add_tree(&mut zip, staging, archive)?;
    zip.finish().map_err(|source| ArchiveError::Zip { path: archive.to_path_buf(), source })?;

    Ok(count)
}

/// Add every directory and file under `base` to `zip`, in sorted order.
fn add_tree<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    base: &Path,
    archive: &Path,
) -> Result<usize, ArchiveError> {
    let pattern = format!("{}/**/*", Pattern::escape(&base.to_string_lossy()));
    let mut paths = Vec::new();
    for entry in glob::glob(&pattern)? {
        let path = entry.map_err(|e| ArchiveError::Io {
            path: e.path().to_path_buf(),
            source: io::Error::from(e),
        })?;
        paths.push(path);
    }
    paths.sort();

    let zip_err = |source| ArchiveError::Zip { path: archive.to_path_buf(), source };
    let mut count = 0;

    for path in paths {
        let Some(name) = entry_name(base, &path) else {
            continue;
        };

        if path.is_dir() {
            zip.add_directory(format!("{}/", name), file_options()).map_err(zip_err)?;
        } else if path.is_file() {
            zip.start_file(name, file_options()).map_err(zip_err)?;
            let mut source = File::open(&path)
                .map_err(|source| ArchiveError::Io { path: path.clone(), source })?;
            io::copy(&mut source, zip)
                .map_err(|source| ArchiveError::Io { path: path.clone(), source })?;
            count += 1;
        }
    }

    Ok(count)
}

fn file_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// Archive entry name of `path`: relative to `base`, `/`-separated.
fn entry_name(base: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(base).ok()?;
    let parts: Vec<String> =
        rel.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}
