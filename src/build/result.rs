//! Build result types.
//!
//! Contains types for representing the outcome of a package build.

use crate::compile::AssetKind;
use crate::progress::FileStatus;
use std::path::PathBuf;
use std::time::Duration;

/// What happened to one manifest entry during conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionStatus {
    /// Compiled to JSON; the manifest entry was renamed
    Converted,
    /// Not a legacy file, copied as-is
    PassedThrough,
    /// The file did not compile; the entry keeps its legacy name
    Failed(String),
}

impl ConversionStatus {
    /// Check if the status indicates failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, ConversionStatus::Failed(_))
    }
}

impl std::fmt::Display for ConversionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConversionStatus::Converted => write!(f, "converted"),
            ConversionStatus::PassedThrough => write!(f, "passed through"),
            ConversionStatus::Failed(err) => write!(f, "failed: {}", err),
        }
    }
}

impl From<&ConversionStatus> for FileStatus {
    fn from(status: &ConversionStatus) -> Self {
        match status {
            ConversionStatus::Converted => FileStatus::Converted,
            ConversionStatus::PassedThrough => FileStatus::Unchanged,
            ConversionStatus::Failed(e) => FileStatus::Failed(e.clone()),
        }
    }
}

/// Result of processing one manifest entry.
#[derive(Debug, Clone)]
pub struct FileResult {
    /// Entry as declared in the manifest
    pub entry: String,
    /// Level or sprite-sheet
    pub kind: AssetKind,
    /// Entry as written to the staged manifest
    pub output: String,
    pub status: ConversionStatus,
    /// Compiler warnings
    pub warnings: Vec<String>,
    pub duration: Duration,
}

impl FileResult {
    /// An entry that was not a legacy file.
    pub fn passed_through(entry: String, kind: AssetKind) -> Self {
        Self {
            output: entry.clone(),
            entry,
            kind,
            status: ConversionStatus::PassedThrough,
            warnings: vec![],
            duration: Duration::ZERO,
        }
    }

    /// An entry compiled to `output`.
    pub fn converted(entry: String, kind: AssetKind, output: String, duration: Duration) -> Self {
        Self { entry, kind, output, status: ConversionStatus::Converted, warnings: vec![], duration }
    }

    /// An entry that failed to compile.
    pub fn failed(entry: String, kind: AssetKind, error: String, duration: Duration) -> Self {
        Self {
            output: entry.clone(),
            entry,
            kind,
            status: ConversionStatus::Failed(error),
            warnings: vec![],
            duration,
        }
    }

    /// Add warnings to the result.
    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

/// Result of a complete package build.
#[derive(Debug, Default)]
pub struct BuildResult {
    /// Absolute path of the archive
    pub archive: PathBuf,
    /// Results for each level and sprite-sheet entry, in manifest order
    pub files: Vec<FileResult>,
    /// Total build duration
    pub total_duration: Duration,
}

impl BuildResult {
    /// Get the number of converted entries.
    pub fn converted_count(&self) -> usize {
        self.files.iter().filter(|r| r.status == ConversionStatus::Converted).count()
    }

    /// Get the number of entries copied unchanged.
    pub fn passed_through_count(&self) -> usize {
        self.files.iter().filter(|r| r.status == ConversionStatus::PassedThrough).count()
    }

    /// Get the number of entries that failed to compile.
    pub fn failed_count(&self) -> usize {
        self.files.iter().filter(|r| r.status.is_failure()).count()
    }

    /// Check if every entry was processed without failure.
    pub fn is_clean(&self) -> bool {
        self.failed_count() == 0
    }

    /// Get all warnings, prefixed with their entry.
    pub fn all_warnings(&self) -> Vec<String> {
        self.files
            .iter()
            .flat_map(|r| r.warnings.iter().map(move |w| format!("{}: {}", r.entry, w)))
            .collect()
    }

    /// Get failed entry results.
    pub fn failures(&self) -> Vec<&FileResult> {
        self.files.iter().filter(|r| r.status.is_failure()).collect()
    }

    /// Format a summary of the build result.
    pub fn summary(&self) -> String {
        let mut lines = vec![format!(
            "Package written to {}: {} converted, {} unchanged, {} failed ({} total) in {:?}",
            self.archive.display(),
            self.converted_count(),
            self.passed_through_count(),
            self.failed_count(),
            self.files.len(),
            self.total_duration
        )];

        for file in self.failures() {
            lines.push(format!("  - {} ({}): {}", file.entry, file.kind, file.status));
        }

        let warnings = self.all_warnings();
        if !warnings.is_empty() {
            lines.push(format!("Warnings ({}): ", warnings.len()));
            for warning in warnings.iter().take(5) {
                lines.push(format!("  - {}", warning));
            }
            if warnings.len() > 5 {
                lines.push(format!("  ... and {} more", warnings.len() - 5));
            }
        }

        lines.join("\n")
    }
}
