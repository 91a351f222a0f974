//! Build command implementations (build, init)

use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use super::{EXIT_ERROR, EXIT_SUCCESS};
use crate::build::{BuildContext, BuildError, BuildPipeline};
use crate::progress::{ConsoleProgress, JsonProgress, ProgressReporter};

/// Run the build command
pub fn run_build(
    project_root: &Path,
    out: Option<&Path>,
    jobs: Option<usize>,
    json: bool,
    keep_staging: bool,
    verbose: bool,
) -> ExitCode {
    let reporter: Arc<dyn ProgressReporter> = if json {
        Arc::new(JsonProgress::new())
    } else {
        Arc::new(
            ConsoleProgress::new()
                .with_colors(std::io::stderr().is_terminal())
                .with_verbose(verbose),
        )
    };

    let mut context =
        BuildContext::new(project_root).with_keep_staging(keep_staging).with_reporter(reporter);
    if let Some(out) = out {
        context = context.with_out_dir(out);
    }
    if let Some(jobs) = jobs {
        context = context.with_jobs(jobs);
    }

    match BuildPipeline::new(context).build_project() {
        Ok(result) => {
            if !json {
                println!("{}", result.summary());
            }
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(BuildError::Manifest(e)) if e.is_not_a_project() => {
            eprintln!("Error: {}", e);
            eprintln!("Run 'clockwork init <name>' to create a project");
            ExitCode::from(EXIT_ERROR)
        }
        Err(e) => {
            eprintln!("Build error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Run the init command
pub fn run_init(name: &str, path: Option<&Path>) -> ExitCode {
    use crate::init::{init_project, InitError};

    let project_path = match path {
        Some(p) => p.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    };

    match init_project(&project_path, name) {
        Ok(manifest) => {
            println!("Created Clockwork project '{}' at {}", manifest.name, project_path.display());
            println!();
            println!("Project structure:");
            println!("  {}/", project_path.display());
            println!("  ├── manifest.json");
            println!("  └── {}/", manifest.scope);
            println!("      ├── components.js");
            println!("      ├── levels.xml");
            println!("      ├── spritesheets.xml");
            println!("      └── images/");
            println!();
            println!("Next steps:");
            println!("  cd {}", project_path.display());
            println!("  clockwork build");
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(InitError::ProjectExists(dir)) => {
            eprintln!("Error: {} already contains a manifest.json", dir.display());
            eprintln!("Use an empty directory or specify a different path with --path");
            ExitCode::from(EXIT_ERROR)
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_ERROR)
        }
    }
}
