//! Project manifest (`manifest.json`).
//!
//! The manifest names the project's asset scope, the level and sprite-sheet
//! files the runtime loads, and the package dependencies of the project.
//!
//! # Manifest Format
//!
//! ```json
//! {
//!   "name": "my-game",
//!   "scope": "gameFiles",
//!   "components": ["components.js"],
//!   "levels": ["levels.xml"],
//!   "spritesheets": ["spritesheets.xml"],
//!   "dependencies": {
//!     "physics": "1.1.0"
//!   }
//! }
//! ```
//!
//! Keys this crate does not model (such as `components`) are kept as-is and
//! written back on save.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Manifest filename at the project root.
pub const MANIFEST_FILENAME: &str = "manifest.json";

/// Extension of the legacy XML authoring formats.
pub const LEGACY_EXTENSION: &str = "xml";

/// Extension of compiled level and sprite-sheet files.
pub const COMPILED_EXTENSION: &str = "json";

/// Error during manifest operations.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ManifestError {
    /// The manifest is missing or unreadable, so the directory is not a project
    #[error("{} does not contain a Clockwork project: {reason}", .path.display())]
    NotAProject { path: PathBuf, reason: String },
    /// IO error while writing
    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// JSON serialization error
    #[error("Failed to serialize manifest: {0}")]
    Json(#[from] serde_json::Error),
}

impl ManifestError {
    /// Whether the error means "this is not a project directory".
    pub fn is_not_a_project(&self) -> bool {
        matches!(self, ManifestError::NotAProject { .. })
    }
}

/// A problem found by [`Manifest::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestIssue {
    /// Field the issue refers to
    pub field: String,
    /// Description of the problem
    pub message: String,
}

impl std::fmt::Display for ManifestIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Typed view of a project's `manifest.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    /// Base name of the produced archive
    pub name: String,
    /// Asset root, relative to the project root
    pub scope: String,
    /// Level files, relative to the scope
    #[serde(default)]
    pub levels: Vec<String>,
    /// Sprite-sheet files, relative to the scope
    #[serde(default)]
    pub spritesheets: Vec<String>,
    /// Package name to version
    #[serde(default)]
    pub dependencies: BTreeMap<String, String>,
    /// Keys not modelled above, preserved across load/save
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    /// Create a manifest with no levels, sprite-sheets or dependencies.
    pub fn new(name: impl Into<String>, scope: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            scope: scope.into(),
            levels: Vec::new(),
            spritesheets: Vec::new(),
            dependencies: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    /// Load a manifest from a file.
    ///
    /// A missing or unparsable file yields [`ManifestError::NotAProject`].
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let contents = fs::read_to_string(path).map_err(|e| ManifestError::NotAProject {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&contents).map_err(|e| ManifestError::NotAProject {
            path: path.to_path_buf(),
            reason: format!("invalid {}: {}", MANIFEST_FILENAME, e),
        })
    }

    /// Load the manifest from a project root directory.
    pub fn load_from_dir(project_root: &Path) -> Result<Self, ManifestError> {
        Self::load(&project_root.join(MANIFEST_FILENAME))
    }

    /// Save the manifest to a file.
    ///
    /// The content is serialized in full and written to a sibling temporary
    /// file first; the target is only replaced by the final rename.
    pub fn save(&self, path: &Path) -> Result<(), ManifestError> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json)
            .map_err(|source| ManifestError::Io { path: tmp.clone(), source })?;
        fs::rename(&tmp, path)
            .map_err(|source| ManifestError::Io { path: path.to_path_buf(), source })?;

        Ok(())
    }

    /// Save the manifest into a project root directory.
    pub fn save_to_dir(&self, project_root: &Path) -> Result<(), ManifestError> {
        self.save(&project_root.join(MANIFEST_FILENAME))
    }

    /// Check the manifest for problems that would break a build.
    pub fn validate(&self) -> Vec<ManifestIssue> {
        let mut issues = Vec::new();
        let mut issue = |field: &str, message: String| {
            issues.push(ManifestIssue { field: field.to_string(), message })
        };

        if self.name.trim().is_empty() {
            issue("name", "must not be empty".to_string());
        } else if self.name.contains(['/', '\\']) {
            issue("name", format!("'{}' must not contain path separators", self.name));
        }

        let scope = Path::new(&self.scope);
        if scope.is_absolute() {
            issue("scope", format!("'{}' must be relative to the project root", self.scope));
        } else if scope.components().any(|c| matches!(c, Component::ParentDir)) {
            issue("scope", format!("'{}' must not leave the project root", self.scope));
        }

        for (field, entries) in [("levels", &self.levels), ("spritesheets", &self.spritesheets)] {
            for (i, entry) in entries.iter().enumerate() {
                if entry.trim().is_empty() {
                    issue(field, format!("entry {} is empty", i));
                } else if Path::new(entry).is_absolute() {
                    issue(field, format!("'{}' must be relative to the scope", entry));
                }
            }
        }

        issues
    }

    /// Set a dependency, returning the previous version if there was one.
    pub fn set_dependency(&mut self, name: &str, version: &str) -> Option<String> {
        self.dependencies.insert(name.to_string(), version.to_string())
    }
}

/// Map a legacy XML entry to the name of its compiled JSON sibling.
///
/// Returns `None` for entries that do not use the legacy extension.
///
/// ```
/// use clockwork::manifest::legacy_json_name;
///
/// assert_eq!(legacy_json_name("levels/a.xml").as_deref(), Some("levels/a.json"));
/// assert_eq!(legacy_json_name("b.json"), None);
/// ```
pub fn legacy_json_name(entry: &str) -> Option<String> {
    let dot = entry.rfind('.')?;
    let (stem, ext) = (&entry[..dot], &entry[dot + 1..]);
    if stem.is_empty() || stem.ends_with('/') || !ext.eq_ignore_ascii_case(LEGACY_EXTENSION) {
        return None;
    }
    Some(format!("{}.{}", stem, COMPILED_EXTENSION))
}

/// Find a project root by walking up from a directory.
///
/// Returns the first directory containing `manifest.json`.
pub fn find_project_from(start: &Path) -> Option<PathBuf> {
    let mut current = start.to_path_buf();

    loop {
        if current.join(MANIFEST_FILENAME).is_file() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}
