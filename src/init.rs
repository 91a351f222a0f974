//! Project initialization for Clockwork
//!
//! Creates the starter layout of a new project:
//!
//! ```text
//! manifest.json
//! .gitignore
//! gameFiles/
//!   components.js
//!   levels.xml
//!   spritesheets.xml
//!   images/
//! ```

use crate::build::{DEFAULT_ARCHIVE_EXTENSION, DEFAULT_STAGING_DIR};
use crate::manifest::{Manifest, ManifestError, MANIFEST_FILENAME};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};

/// Scope directory of new projects.
pub const DEFAULT_SCOPE: &str = "gameFiles";

/// Error during project initialization
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum InitError {
    /// The project name is empty or not usable as a file name
    #[error("Invalid project name '{0}'")]
    InvalidName(String),
    /// A project already exists at the path
    #[error("{} already contains a Clockwork project", .0.display())]
    ProjectExists(PathBuf),
    /// Failed to create directory
    #[error("Failed to create directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Failed to write file
    #[error("Failed to write {}: {source}", .path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Failed to write the manifest
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// Initialize a new Clockwork project in `path`.
///
/// The directory is created if needed. Existing files other than a
/// manifest are left alone; an existing `manifest.json` is an error.
///
/// # Example
/// ```no_run
/// use clockwork::init::init_project;
/// use std::path::Path;
///
/// init_project(Path::new("my-game"), "my-game")?;
/// # Ok::<(), clockwork::init::InitError>(())
/// ```
pub fn init_project(path: &Path, name: &str) -> Result<Manifest, InitError> {
    let name = name.trim();
    if name.is_empty() || name.contains(['/', '\\']) {
        return Err(InitError::InvalidName(name.to_string()));
    }
    if path.join(MANIFEST_FILENAME).exists() {
        return Err(InitError::ProjectExists(path.to_path_buf()));
    }

    let scope = path.join(DEFAULT_SCOPE);
    create_dir(&scope.join("images"))?;

    write_file(&scope.join("components.js"), COMPONENTS_TEMPLATE)?;
    write_file(&scope.join("levels.xml"), LEVELS_TEMPLATE)?;
    write_file(&scope.join("spritesheets.xml"), SPRITESHEETS_TEMPLATE)?;
    write_file(&path.join(".gitignore"), &generate_gitignore(name))?;

    let manifest = generate_manifest(name);
    manifest.save_to_dir(path)?;
    tracing::debug!(path = %path.display(), name, "initialized project");

    Ok(manifest)
}

/// Create a directory and all parent directories.
fn create_dir(path: &Path) -> Result<(), InitError> {
    fs::create_dir_all(path)
        .map_err(|source| InitError::CreateDir { path: path.to_path_buf(), source })
}

/// Write content to a file.
fn write_file(path: &Path, content: &str) -> Result<(), InitError> {
    fs::write(path, content)
        .map_err(|source| InitError::WriteFile { path: path.to_path_buf(), source })
}

fn generate_manifest(name: &str) -> Manifest {
    let mut manifest = Manifest::new(name, DEFAULT_SCOPE);
    manifest.levels.push("levels.xml".to_string());
    manifest.spritesheets.push("spritesheets.xml".to_string());
    manifest.extra.insert("components".to_string(), json!(["components.js"]));
    manifest
}

fn generate_gitignore(name: &str) -> String {
    format!(
        "# Clockwork build output\n{}/\n{}.{}\n",
        DEFAULT_STAGING_DIR, name, DEFAULT_ARCHIVE_EXTENSION
    )
}

const COMPONENTS_TEMPLATE: &str = r##"CLOCKWORKRT.components.push([
    {
        name: "talkingDog",
        sprite: "dog",
        events: [
            {
                name: "#setup", code: function (event) {
                    this.var.$text = "";
                    this.var.timer = 0;
                }
            },
            {
                name: "#loop", code: function (event) {
                    this.var.timer++;
                    if (this.var.timer == 100) {
                        this.var.$text = "Hello World";
                        this.var.$state = "BarkL";
                    }
                    if (this.var.timer == 150) {
                        this.var.$text = "";
                        this.var.$state = "RunR";
                    }
                    if (this.var.timer > 150) {
                        this.var.$x += 5;
                    }
                }
            }]
    }]);
"##;

const LEVELS_TEMPLATE: &str = r#"<levels>
  <level id="level1">
    <object name="dog" type="talkingDog" spritesheet="dog" x="100" y="200" vars='{"$text": ""}'/>
  </level>
</levels>
"#;

const SPRITESHEETS_TEMPLATE: &str = r#"<spritesheets>
  <spritesheet name="dog" src="images/dog.png">
    <frames>
      <frame name="run0" x="0" y="0" w="64" h="64" t="100"/>
      <frame name="run1" x="64" y="0" w="64" h="64" t="100"/>
      <frame name="bark0" x="0" y="64" w="64" h="64" t="200"/>
    </frames>
    <layers>
      <layer name="run">
        <frame name="run0"/>
        <frame name="run1"/>
      </layer>
      <layer name="bark">
        <frame name="bark0"/>
      </layer>
    </layers>
    <states>
      <state name="RunR">
        <layer name="run"/>
      </state>
      <state name="BarkL" flip="1">
        <layer name="bark"/>
      </state>
    </states>
  </spritesheet>
</spritesheets>
"#;
