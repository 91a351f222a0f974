//! Build pipeline orchestration.
//!
//! The pipeline runs the package build as a sequence of phases. Each phase
//! completes before the next one starts:
//!
//! 1. create the staging directory
//! 2. copy `manifest.json` and the scope into it
//! 3. compile legacy level and sprite-sheet files (in parallel)
//! 4. write the rewritten manifest into the staging directory
//! 5. write the archive
//! 6. delete the staging directory

use crate::build::archive::{write_archive, ArchiveError};
use crate::build::convert::{convert_entries, rewrite_manifest};
use crate::build::stage::{copy_project, create_staging, remove_staging, StageError};
use crate::build::{BuildContext, BuildResult};
use crate::manifest::{Manifest, ManifestError, ManifestIssue};
use crate::progress::{BuildStage, ProgressEvent};
use std::path::PathBuf;
use std::time::Instant;

/// Error during build execution.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BuildError {
    /// The manifest failed validation
    #[error("Invalid manifest:\n{}", format_issues(.0))]
    InvalidManifest(Vec<ManifestIssue>),
    /// The manifest could not be loaded or written
    #[error(transparent)]
    Manifest(#[from] ManifestError),
    /// Staging failed
    #[error(transparent)]
    Stage(#[from] StageError),
    /// A staged file could not be read or written
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The archive could not be written; the staging directory is kept
    #[error("{source} (staged files kept in {})", .staging.display())]
    Archive {
        staging: PathBuf,
        #[source]
        source: ArchiveError,
    },
    /// The conversion thread pool could not be started
    #[error("Failed to start conversion workers: {0}")]
    Workers(#[from] rayon::ThreadPoolBuildError),
}

fn format_issues(issues: &[ManifestIssue]) -> String {
    issues.iter().map(|i| format!("  - {}", i)).collect::<Vec<_>>().join("\n")
}

/// Build pipeline for packaging a project.
pub struct BuildPipeline {
    /// Build context
    context: BuildContext,
}

impl BuildPipeline {
    /// Create a new build pipeline.
    pub fn new(context: BuildContext) -> Self {
        Self { context }
    }

    /// Get the build context.
    pub fn context(&self) -> &BuildContext {
        &self.context
    }

    /// Load the project's manifest and build it.
    pub fn build_project(&self) -> Result<BuildResult, BuildError> {
        let manifest = Manifest::load_from_dir(self.context.project_root())?;
        self.build(&manifest)
    }

    /// Build the package for `manifest`.
    ///
    /// Returns the absolute archive path with per-entry results. Compile
    /// failures do not fail the build; they leave the entry unconverted.
    pub fn build(&self, manifest: &Manifest) -> Result<BuildResult, BuildError> {
        let start = Instant::now();
        let ctx = &self.context;
        let reporter = ctx.reporter();

        let issues = manifest.validate();
        if !issues.is_empty() {
            return Err(BuildError::InvalidManifest(issues));
        }

        let staging = ctx.staging_dir();
        let archive = ctx.archive_path(&manifest.name);
        tracing::debug!(
            staging = %staging.display(),
            archive = %archive.display(),
            jobs = ctx.jobs(),
            "starting build"
        );

        reporter.report(ProgressEvent::BuildStarted {
            project: manifest.name.clone(),
            total_files: manifest.levels.len() + manifest.spritesheets.len(),
        });

        reporter.report(ProgressEvent::StageStarted { stage: BuildStage::Staging });
        create_staging(&staging)?;
        let exclude = [staging.as_path(), archive.as_path()];
        copy_project(ctx.project_root(), &manifest.scope, &staging, &exclude)?;

        reporter.report(ProgressEvent::StageStarted { stage: BuildStage::Converting });
        let files = convert_entries(ctx, manifest, &staging.join(&manifest.scope))?;

        reporter.report(ProgressEvent::StageStarted { stage: BuildStage::WritingManifest });
        rewrite_manifest(manifest, &files).save_to_dir(&staging)?;

        reporter.report(ProgressEvent::StageStarted { stage: BuildStage::Archiving });
        let stored = write_archive(&staging, &archive).map_err(|source| {
            reporter.report(ProgressEvent::Error {
                subject: Some(archive.display().to_string()),
                message: source.to_string(),
            });
            BuildError::Archive { staging: staging.clone(), source }
        })?;
        tracing::debug!(files = stored, "archive written");

        if ctx.keep_staging() {
            reporter.report(ProgressEvent::Info {
                message: format!("Staged files kept in {}", staging.display()),
            });
        } else {
            reporter.report(ProgressEvent::StageStarted { stage: BuildStage::Cleanup });
            remove_staging(&staging)?;
        }

        let archive = archive
            .canonicalize()
            .map_err(|source| BuildError::Io { path: archive.clone(), source })?;

        let result = BuildResult { archive, files, total_duration: start.elapsed() };
        reporter.report(ProgressEvent::BuildCompleted {
            archive: result.archive.display().to_string(),
            converted: result.converted_count(),
            unchanged: result.passed_through_count(),
            failed: result.failed_count(),
            duration_ms: result.total_duration.as_millis() as u64,
        });

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::MANIFEST_FILENAME;
    use crate::progress::MemoryProgress;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn create_project(manifest: &Manifest) -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join(&manifest.scope)).unwrap();
        manifest.save(&temp.path().join(MANIFEST_FILENAME)).unwrap();
        temp
    }

    #[test]
    fn test_build_empty_project() {
        let manifest = Manifest::new("empty", "gameFiles");
        let temp = create_project(&manifest);
        let pipeline = BuildPipeline::new(BuildContext::new(temp.path()));

        let result = pipeline.build_project().unwrap();
        assert!(result.archive.is_absolute());
        assert!(result.archive.ends_with("empty.cw"));
        assert!(result.files.is_empty());
        assert!(!pipeline.context().staging_dir().exists());
    }

    #[test]
    fn test_build_rejects_invalid_manifest() {
        let manifest = Manifest::new("", "../outside");
        let temp = create_project(&Manifest::new("x", "gameFiles"));
        let pipeline = BuildPipeline::new(BuildContext::new(temp.path()));

        let err = pipeline.build(&manifest).unwrap_err();
        match err {
            BuildError::InvalidManifest(issues) => assert_eq!(issues.len(), 2),
            other => panic!("unexpected error: {}", other),
        }
        assert!(!pipeline.context().staging_dir().exists());
    }

    #[test]
    fn test_build_without_manifest_is_not_a_project() {
        let temp = TempDir::new().unwrap();
        let pipeline = BuildPipeline::new(BuildContext::new(temp.path()));

        match pipeline.build_project().unwrap_err() {
            BuildError::Manifest(e) => assert!(e.is_not_a_project()),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_build_missing_scope_is_fatal() {
        let manifest = Manifest::new("game", "gameFiles");
        let temp = create_project(&manifest);
        fs::remove_dir_all(temp.path().join("gameFiles")).unwrap();
        let pipeline = BuildPipeline::new(BuildContext::new(temp.path()));

        let err = pipeline.build(&manifest).unwrap_err();
        assert!(matches!(err, BuildError::Stage(StageError::MissingScope { .. })));
    }

    #[test]
    fn test_build_reports_stages_in_order() {
        let manifest = Manifest::new("game", "gameFiles");
        let temp = create_project(&manifest);
        let reporter = Arc::new(MemoryProgress::new());
        let ctx = BuildContext::new(temp.path()).with_reporter(reporter.clone());

        BuildPipeline::new(ctx).build(&manifest).unwrap();

        let stages: Vec<BuildStage> = reporter
            .events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::StageStarted { stage } => Some(stage),
                _ => None,
            })
            .collect();
        assert_eq!(
            stages,
            vec![
                BuildStage::Staging,
                BuildStage::Converting,
                BuildStage::WritingManifest,
                BuildStage::Archiving,
                BuildStage::Cleanup,
            ]
        );
        assert!(matches!(reporter.events().last(), Some(ProgressEvent::BuildCompleted { .. })));
    }

    #[test]
    fn test_build_keep_staging() {
        let manifest = Manifest::new("game", "gameFiles");
        let temp = create_project(&manifest);
        let ctx = BuildContext::new(temp.path()).with_keep_staging(true);
        let pipeline = BuildPipeline::new(ctx);

        pipeline.build(&manifest).unwrap();
        assert!(pipeline.context().staging_dir().join(MANIFEST_FILENAME).is_file());
    }
}
