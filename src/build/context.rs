//! Build context containing configuration and state for a build.

use crate::progress::{NullProgress, ProgressReporter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default name of the staging directory, created in the project root.
pub const DEFAULT_STAGING_DIR: &str = "ClockworkPackageTemp";

/// Default extension of the produced archive.
pub const DEFAULT_ARCHIVE_EXTENSION: &str = "cw";

/// Default number of parallel conversion jobs (uses available parallelism).
fn default_jobs() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// Build context containing configuration and paths for a build operation.
///
/// Every build entry point takes one of these instead of reading global
/// state: it names the project root, where scratch files and the archive
/// go, and the sink that receives progress, warnings and errors.
#[derive(Clone)]
pub struct BuildContext {
    /// Project root directory (where manifest.json is located)
    project_root: PathBuf,
    /// Staging directory name, relative to the project root
    staging_dir_name: String,
    /// Archive file extension (without the dot)
    archive_extension: String,
    /// Directory the archive is written to, if not the project root
    out_dir: Option<PathBuf>,
    /// Number of parallel conversion jobs
    jobs: usize,
    /// Whether to leave the staging directory after a successful build
    keep_staging: bool,
    /// Progress and diagnostics sink
    reporter: Arc<dyn ProgressReporter>,
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("project_root", &self.project_root)
            .field("staging_dir_name", &self.staging_dir_name)
            .field("archive_extension", &self.archive_extension)
            .field("out_dir", &self.out_dir)
            .field("jobs", &self.jobs)
            .field("keep_staging", &self.keep_staging)
            .finish_non_exhaustive()
    }
}

impl BuildContext {
    /// Create a new build context for a project root.
    pub fn new(project_root: impl Into<PathBuf>) -> Self {
        Self {
            project_root: project_root.into(),
            staging_dir_name: DEFAULT_STAGING_DIR.to_string(),
            archive_extension: DEFAULT_ARCHIVE_EXTENSION.to_string(),
            out_dir: None,
            jobs: default_jobs(),
            keep_staging: false,
            reporter: Arc::new(NullProgress),
        }
    }

    /// Get the project root directory.
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Absolute path of the staging directory.
    pub fn staging_dir(&self) -> PathBuf {
        self.project_root.join(&self.staging_dir_name)
    }

    /// Path of the archive for a package name.
    pub fn archive_path(&self, name: &str) -> PathBuf {
        let dir = self.out_dir.as_deref().map(|d| self.resolve_path(d));
        dir.unwrap_or_else(|| self.project_root.clone())
            .join(format!("{}.{}", name, self.archive_extension))
    }

    /// Number of parallel conversion jobs.
    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Whether the staging directory survives a successful build.
    pub fn keep_staging(&self) -> bool {
        self.keep_staging
    }

    /// The progress reporter.
    pub fn reporter(&self) -> &dyn ProgressReporter {
        self.reporter.as_ref()
    }

    /// Set the staging directory name.
    pub fn with_staging_dir_name(mut self, name: impl Into<String>) -> Self {
        self.staging_dir_name = name.into();
        self
    }

    /// Set the archive extension.
    pub fn with_archive_extension(mut self, extension: impl Into<String>) -> Self {
        self.archive_extension = extension.into();
        self
    }

    /// Write the archive into another directory.
    pub fn with_out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = Some(dir.into());
        self
    }

    /// Set the number of parallel conversion jobs.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Keep the staging directory after a successful build.
    pub fn with_keep_staging(mut self, keep: bool) -> Self {
        self.keep_staging = keep;
        self
    }

    /// Set the progress reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Resolve a path relative to the project root.
    ///
    /// If the path is absolute, returns it unchanged.
    /// If relative, joins it with the project root.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.project_root.join(path)
        }
    }
}
