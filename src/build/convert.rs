//! Parallel conversion of legacy level and sprite-sheet files.
//!
//! Every manifest entry ending in `.xml` is read from the staged scope,
//! compiled and written next to its source as `.json`. Conversions run on
//! a rayon pool and are fully joined before the manifest is rewritten, so
//! the staged manifest only names files that exist.

use crate::build::{BuildContext, BuildError, FileResult};
use crate::compile::{compile_to_json, AssetKind};
use crate::manifest::{legacy_json_name, Manifest};
use crate::progress::ProgressEvent;
use rayon::prelude::*;
use std::fs;
use std::path::Path;
use std::time::Instant;

/// One planned entry.
#[derive(Debug, Clone)]
struct Job {
    entry: String,
    kind: AssetKind,
    /// Compiled name, or `None` to pass the entry through
    output: Option<String>,
}

fn plan(manifest: &Manifest) -> Vec<Job> {
    let levels = manifest.levels.iter().map(|e| (e, AssetKind::Level));
    let sheets = manifest.spritesheets.iter().map(|e| (e, AssetKind::Spritesheet));

    levels
        .chain(sheets)
        .map(|(entry, kind)| Job { entry: entry.clone(), kind, output: legacy_json_name(entry) })
        .collect()
}

/// Convert every legacy entry of `manifest` inside `scope_dir`.
///
/// Returns the per-entry results in manifest order (levels first). Compile
/// failures are recorded in the results; read and write failures abort
/// the build once all conversions have finished.
pub fn convert_entries(
    context: &BuildContext,
    manifest: &Manifest,
    scope_dir: &Path,
) -> Result<Vec<FileResult>, BuildError> {
    let jobs = plan(manifest);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(context.jobs()).build()?;

    let outcomes: Vec<Result<FileResult, BuildError>> =
        pool.install(|| jobs.par_iter().map(|job| run_job(context, scope_dir, job)).collect());

    outcomes.into_iter().collect()
}

fn run_job(context: &BuildContext, scope_dir: &Path, job: &Job) -> Result<FileResult, BuildError> {
    let reporter = context.reporter();
    let Some(output) = &job.output else {
        let result = FileResult::passed_through(job.entry.clone(), job.kind);
        reporter.report(ProgressEvent::FileCompleted {
            file: job.entry.clone(),
            status: (&result.status).into(),
            duration_ms: 0,
        });
        return Ok(result);
    };

    let start = Instant::now();
    let source = scope_dir.join(&job.entry);
    let bytes = fs::read(&source).map_err(|e| BuildError::Io { path: source.clone(), source: e })?;

    let result = match compile_to_json(job.kind, &bytes) {
        Ok(compiled) => {
            let target = scope_dir.join(output);
            fs::write(&target, compiled.value)
                .map_err(|e| BuildError::Io { path: target.clone(), source: e })?;

            let warnings: Vec<String> = compiled.warnings.iter().map(|w| w.to_string()).collect();
            for warning in &warnings {
                reporter.report(ProgressEvent::Warning {
                    subject: Some(job.entry.clone()),
                    message: warning.clone(),
                });
            }
            tracing::debug!(entry = %job.entry, output = %output, "converted");
            FileResult::converted(job.entry.clone(), job.kind, output.clone(), start.elapsed())
                .with_warnings(warnings)
        }
        Err(e) => {
            reporter.report(ProgressEvent::Error {
                subject: Some(job.entry.clone()),
                message: format!("{} skipped: {}", job.kind, e),
            });
            FileResult::failed(job.entry.clone(), job.kind, e.to_string(), start.elapsed())
        }
    };

    reporter.report(ProgressEvent::FileCompleted {
        file: job.entry.clone(),
        status: (&result.status).into(),
        duration_ms: result.duration.as_millis() as u64,
    });

    Ok(result)
}

/// Copy of `manifest` with every entry replaced by its output name.
pub fn rewrite_manifest(manifest: &Manifest, results: &[FileResult]) -> Manifest {
    let outputs = |kind: AssetKind| {
        results.iter().filter(|r| r.kind == kind).map(|r| r.output.clone()).collect::<Vec<_>>()
    };

    Manifest {
        levels: outputs(AssetKind::Level),
        spritesheets: outputs(AssetKind::Spritesheet),
        ..manifest.clone()
    }
}
