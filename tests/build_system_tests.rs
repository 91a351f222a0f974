//! Build System Test Suite
//!
//! Integration tests for the package build:
//!
//! - Pipeline orchestration (stage, convert, rewrite, archive, cleanup)
//! - Per-file compile failures
//! - Archive failures keeping the staging directory
//! - Progress reporting

use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use clockwork::build::{BuildContext, BuildError, BuildPipeline, ConversionStatus};
use clockwork::init::init_project;
use clockwork::manifest::Manifest;
use clockwork::progress::{BuildStage, MemoryProgress, ProgressEvent};

// ============================================================================
// Test Utilities
// ============================================================================

const LEVELS: &str = r#"<levels>
  <level id="1">
    <object name="dog" type="Dog" spritesheet="dog" x="10" y="20" vars='{"speed": 3}'/>
  </level>
</levels>"#;

const SHEETS: &str = r#"<spritesheets>
  <spritesheet name="dog" src="images/dog.png">
    <frames><frame name="f0" x="0" y="0" w="32" h="32" t="100"/></frames>
    <layers><layer name="run"><frame name="f0"/></layer></layers>
    <states><state name="Run"><layer name="run"/></state></states>
  </spritesheet>
</spritesheets>"#;

/// Create a test file with content.
fn create_test_file(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Create a project with one level file and one sprite-sheet file.
fn create_test_project(scope: &str) -> (TempDir, Manifest) {
    let temp = TempDir::new().unwrap();
    let mut manifest = Manifest::new("game", scope);
    manifest.levels.push("a.xml".to_string());
    manifest.spritesheets.push("sheets/dog.xml".to_string());
    manifest.save_to_dir(temp.path()).unwrap();

    let scope_dir = temp.path().join(scope);
    create_test_file(&scope_dir, "a.xml", LEVELS);
    create_test_file(&scope_dir, "sheets/dog.xml", SHEETS);
    create_test_file(&scope_dir, "components.js", "CLOCKWORKRT.components.push([]);");
    (temp, manifest)
}

fn test_context(root: &Path, reporter: Arc<MemoryProgress>) -> BuildContext {
    BuildContext::new(root).with_jobs(2).with_reporter(reporter)
}

/// Read one entry of a zip archive as text.
fn read_entry(archive: &Path, name: &str) -> String {
    let mut zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut entry = zip.by_name(name).unwrap();
    let mut text = String::new();
    entry.read_to_string(&mut text).unwrap();
    text
}

fn entry_names(archive: &Path) -> Vec<String> {
    let zip = zip::ZipArchive::new(File::open(archive).unwrap()).unwrap();
    zip.file_names().map(str::to_string).collect()
}

// ============================================================================
// Pipeline Integration Tests
// ============================================================================

#[test]
fn test_build_pipeline_complete_workflow() {
    let (temp, _) = create_test_project("gameFiles");
    let progress = Arc::new(MemoryProgress::new());

    let result = BuildPipeline::new(test_context(temp.path(), progress.clone()))
        .build_project()
        .unwrap();

    assert!(result.is_clean());
    assert_eq!(result.converted_count(), 2);
    assert_eq!(result.archive, temp.path().join("game.cw").canonicalize().unwrap());
    assert!(!temp.path().join("ClockworkPackageTemp").exists());

    let staged: Manifest = serde_json::from_str(&read_entry(&result.archive, "manifest.json")).unwrap();
    assert_eq!(staged.levels, vec!["a.json"]);
    assert_eq!(staged.spritesheets, vec!["sheets/dog.json"]);

    let names = entry_names(&result.archive);
    assert!(names.contains(&"gameFiles/a.json".to_string()));
    assert!(names.contains(&"gameFiles/a.xml".to_string()));
    assert!(names.contains(&"gameFiles/sheets/dog.json".to_string()));
    assert!(names.contains(&"gameFiles/components.js".to_string()));

    let level: serde_json::Value =
        serde_json::from_str(&read_entry(&result.archive, "gameFiles/a.json")).unwrap();
    assert_eq!(level[0]["objects"][0]["name"], "dog");
    assert_eq!(level[0]["objects"][0]["vars"]["speed"], 3);

    // The project's own manifest is untouched
    let original = Manifest::load_from_dir(temp.path()).unwrap();
    assert_eq!(original.levels, vec!["a.xml"]);
}

#[test]
fn test_build_reports_stages_in_order() {
    let (temp, _) = create_test_project("gameFiles");
    let progress = Arc::new(MemoryProgress::new());

    BuildPipeline::new(test_context(temp.path(), progress.clone())).build_project().unwrap();

    let stages: Vec<BuildStage> = progress
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
    assert!(matches!(progress.events().last(), Some(ProgressEvent::BuildCompleted { .. })));
}

#[test]
fn test_build_with_failing_level_keeps_xml_entry() {
    let (temp, _) = create_test_project("gameFiles");
    create_test_file(
        &temp.path().join("gameFiles"),
        "a.xml",
        r#"<levels><level id="1"><object name="dog" type="Dog" y="2"/></level></levels>"#,
    );
    let progress = Arc::new(MemoryProgress::new());

    let result = BuildPipeline::new(test_context(temp.path(), progress.clone()))
        .build_project()
        .unwrap();

    assert_eq!(result.failed_count(), 1);
    assert_eq!(result.converted_count(), 1);
    assert!(matches!(result.files[0].status, ConversionStatus::Failed(_)));
    assert!(!progress.errors().is_empty());

    let staged: Manifest = serde_json::from_str(&read_entry(&result.archive, "manifest.json")).unwrap();
    assert_eq!(staged.levels, vec!["a.xml"]);
    assert_eq!(staged.spritesheets, vec!["sheets/dog.json"]);
    assert!(!entry_names(&result.archive).contains(&"gameFiles/a.json".to_string()));
}

#[test]
fn test_build_passes_json_entries_through() {
    let (temp, mut manifest) = create_test_project("gameFiles");
    create_test_file(&temp.path().join("gameFiles"), "b.json", "[]");
    manifest.levels.push("b.json".to_string());
    manifest.save_to_dir(temp.path()).unwrap();

    let result = BuildPipeline::new(test_context(temp.path(), Arc::new(MemoryProgress::new())))
        .build_project()
        .unwrap();

    assert_eq!(result.passed_through_count(), 1);
    let staged: Manifest = serde_json::from_str(&read_entry(&result.archive, "manifest.json")).unwrap();
    assert_eq!(staged.levels, vec!["a.json", "b.json"]);
}

#[test]
fn test_archive_failure_keeps_staging() {
    let (temp, _) = create_test_project("gameFiles");
    // A directory where the archive should go cannot be replaced
    fs::create_dir_all(temp.path().join("game.cw")).unwrap();
    let progress = Arc::new(MemoryProgress::new());

    let err = BuildPipeline::new(test_context(temp.path(), progress.clone()))
        .build_project()
        .unwrap_err();

    assert!(matches!(err, BuildError::Archive { .. }));
    let staging = temp.path().join("ClockworkPackageTemp");
    assert!(staging.join("gameFiles/a.json").is_file());
    assert!(!progress.errors().is_empty());
}

#[test]
fn test_build_with_project_root_scope() {
    let (temp, _) = create_test_project(".");

    let result = BuildPipeline::new(test_context(temp.path(), Arc::new(MemoryProgress::new())))
        .build_project()
        .unwrap();

    let names = entry_names(&result.archive);
    assert!(names.contains(&"a.json".to_string()));
    assert!(names.contains(&"manifest.json".to_string()));
    assert!(names.iter().all(|n| !n.starts_with("ClockworkPackageTemp")));
    assert!(names.iter().all(|n| n != "game.cw"));

    // A second build must not pick up the first archive
    let again = BuildPipeline::new(test_context(temp.path(), Arc::new(MemoryProgress::new())))
        .build_project()
        .unwrap();
    assert!(entry_names(&again.archive).iter().all(|n| n != "game.cw"));
}

#[test]
fn test_build_into_out_dir() {
    let (temp, _) = create_test_project("gameFiles");
    let out = temp.path().join("dist");

    let context = test_context(temp.path(), Arc::new(MemoryProgress::new())).with_out_dir(&out);
    let result = BuildPipeline::new(context).build_project().unwrap();

    assert!(out.join("game.cw").is_file());
    assert_eq!(result.archive, out.join("game.cw").canonicalize().unwrap());
}

#[test]
fn test_build_keep_staging() {
    let (temp, _) = create_test_project("gameFiles");

    let context =
        test_context(temp.path(), Arc::new(MemoryProgress::new())).with_keep_staging(true);
    BuildPipeline::new(context).build_project().unwrap();

    assert!(temp.path().join("ClockworkPackageTemp/manifest.json").is_file());
}

#[test]
fn test_rebuild_ignores_leftover_staging() {
    let (temp, _) = create_test_project("gameFiles");
    let scope = temp.path().join("gameFiles");
    create_test_file(&scope, "secret.txt", "draft");

    let context =
        test_context(temp.path(), Arc::new(MemoryProgress::new())).with_keep_staging(true);
    BuildPipeline::new(context).build_project().unwrap();
    assert!(temp.path().join("ClockworkPackageTemp/gameFiles/a.json").is_file());

    fs::remove_file(scope.join("secret.txt")).unwrap();
    create_test_file(&scope, "a.xml", "<levels><level id=\"1\"><object name=\"x\"/></level></levels>");

    let result = BuildPipeline::new(test_context(temp.path(), Arc::new(MemoryProgress::new())))
        .build_project()
        .unwrap();

    assert_eq!(result.failed_count(), 1);
    let names = entry_names(&result.archive);
    assert!(!names.contains(&"gameFiles/secret.txt".to_string()));
    assert!(!names.contains(&"gameFiles/a.json".to_string()));
    let staged: Manifest = serde_json::from_str(&read_entry(&result.archive, "manifest.json")).unwrap();
    assert_eq!(staged.levels, vec!["a.xml"]);
}

#[test]
fn test_build_rejects_missing_scope() {
    let temp = TempDir::new().unwrap();
    Manifest::new("game", "missing").save_to_dir(temp.path()).unwrap();

    let err = BuildPipeline::new(test_context(temp.path(), Arc::new(MemoryProgress::new())))
        .build_project()
        .unwrap_err();
    assert!(matches!(err, BuildError::Stage(_)));
}

#[test]
fn test_build_outside_project() {
    let temp = TempDir::new().unwrap();

    let err = BuildPipeline::new(test_context(temp.path(), Arc::new(MemoryProgress::new())))
        .build_project()
        .unwrap_err();
    match err {
        BuildError::Manifest(e) => assert!(e.is_not_a_project()),
        other => panic!("expected manifest error, got {:?}", other),
    }
}

// ============================================================================
// Init + Build
// ============================================================================

#[test]
fn test_init_then_build() {
    let temp = TempDir::new().unwrap();
    let project = temp.path().join("dog-game");
    init_project(&project, "dog-game").unwrap();

    let progress = Arc::new(MemoryProgress::new());
    let result =
        BuildPipeline::new(test_context(&project, progress.clone())).build_project().unwrap();

    assert!(result.is_clean());
    assert!(progress.warnings().is_empty());
    let names = entry_names(&result.archive);
    assert!(names.contains(&"gameFiles/levels.json".to_string()));
    assert!(names.contains(&"gameFiles/spritesheets.json".to_string()));
    assert!(names.contains(&"gameFiles/images/".to_string()));

    let staged: serde_json::Value =
        serde_json::from_str(&read_entry(&result.archive, "manifest.json")).unwrap();
    assert_eq!(staged["components"][0], "components.js");
}
