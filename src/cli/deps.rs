//! Dependency command implementations (list, add, update)

use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use super::{run_async, EXIT_ERROR, EXIT_SUCCESS};
use crate::deps::{
    AddOutcome, AssumeYes, Confirm, DependencyResolver, HttpRegistry, Registry, RegistryConfig,
    StdinConfirm, UpdateOutcome,
};
use crate::manifest::Manifest;
use crate::progress::ConsoleProgress;

fn open_registry() -> Result<HttpRegistry, ExitCode> {
    HttpRegistry::new(&RegistryConfig::from_env()).map_err(|e| {
        eprintln!("Error: {}", e);
        ExitCode::from(EXIT_ERROR)
    })
}

fn load_manifest(project_root: &Path) -> Result<Manifest, ExitCode> {
    Manifest::load_from_dir(project_root).map_err(|e| {
        if e.is_not_a_project() {
            eprintln!("There is no Clockwork project in {}", project_root.display());
        } else {
            eprintln!("Error: {}", e);
        }
        ExitCode::from(EXIT_ERROR)
    })
}

fn resolver(
    yes: bool,
    verbose: bool,
) -> Result<DependencyResolver<HttpRegistry, Box<dyn Confirm>>, ExitCode> {
    let confirm: Box<dyn Confirm> = if yes { Box::new(AssumeYes) } else { Box::new(StdinConfirm) };
    let reporter = ConsoleProgress::new()
        .with_colors(std::io::stderr().is_terminal())
        .with_verbose(verbose);
    Ok(DependencyResolver::new(open_registry()?, confirm).with_reporter(Arc::new(reporter)))
}

/// Run the list command
pub fn run_list(package: Option<&str>) -> ExitCode {
    let registry = match open_registry() {
        Ok(r) => r,
        Err(code) => return code,
    };

    let outcome = run_async(async {
        match package {
            Some(name) => registry.list_versions(name).await.map(|versions| {
                if versions.is_empty() {
                    println!("No versions of {} have been found in the registry", name);
                } else {
                    println!("Versions of {}:", name);
                    for v in versions {
                        println!(" {} published at {}", v.version, v.date);
                    }
                }
            }),
            None => registry.list_packages().await.map(|packages| {
                println!("Packages published:");
                for p in packages {
                    println!(" {} by {}", p.id, p.by);
                }
            }),
        }
    });

    match outcome {
        Ok(Ok(())) => ExitCode::from(EXIT_SUCCESS),
        Ok(Err(e)) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the add command
pub fn run_add(
    project_root: &Path,
    package: &str,
    version: Option<&str>,
    yes: bool,
    verbose: bool,
) -> ExitCode {
    let mut manifest = match load_manifest(project_root) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let resolver = match resolver(yes, verbose) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let outcome = match run_async(resolver.add_dependency(&mut manifest, package, version)) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let version = match outcome {
        Ok(AddOutcome::Added { version }) | Ok(AddOutcome::Replaced { version, .. }) => version,
        Ok(AddOutcome::Declined { current }) => {
            println!("Keeping version {} of {}", current, package);
            return ExitCode::from(EXIT_SUCCESS);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if let Err(e) = manifest.save_to_dir(project_root) {
        eprintln!("An error happened while trying to update the manifest: {}", e);
        return ExitCode::from(EXIT_ERROR);
    }
    println!("Version {} of {} added to the dependencies", version, package);
    ExitCode::from(EXIT_SUCCESS)
}

/// Run the update command
pub fn run_update(project_root: &Path, package: Option<&str>, verbose: bool) -> ExitCode {
    let mut manifest = match load_manifest(project_root) {
        Ok(m) => m,
        Err(code) => return code,
    };
    let resolver = match resolver(false, verbose) {
        Ok(r) => r,
        Err(code) => return code,
    };

    let report = match run_async(resolver.update_dependencies(&mut manifest, package)) {
        Ok(Ok(report)) => report,
        Ok(Err(e)) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
        Err(e) => {
            eprintln!("Error: failed to start async runtime: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    if report.results.is_empty() {
        println!("The project has no dependencies");
    }

    if report.changed() {
        if let Err(e) = manifest.save_to_dir(project_root) {
            eprintln!("An error happened while trying to update the manifest: {}", e);
            return ExitCode::from(EXIT_ERROR);
        }
    }

    let updated = report
        .results
        .iter()
        .filter(|(_, o)| matches!(o, UpdateOutcome::Updated { .. }))
        .count();
    println!(
        "{} updated, {} up to date, {} failed",
        updated,
        report.results.len() - updated - report.failed_count(),
        report.failed_count()
    );

    if report.failed_count() > 0 {
        ExitCode::from(EXIT_ERROR)
    } else {
        ExitCode::from(EXIT_SUCCESS)
    }
}
