//! Command-line interface implementation
//!
//! This module provides the CLI entry point and dispatches to submodules
//! for specific command implementations.

mod build;
mod deps;
mod registry;

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use crate::manifest::find_project_from;

/// Process exit codes
pub(crate) const EXIT_SUCCESS: u8 = 0;
pub(crate) const EXIT_ERROR: u8 = 1;
pub(crate) const EXIT_INVALID_ARGS: u8 = 2;

/// Environment variable holding the diagnostic log filter.
pub const LOG_ENV: &str = "CLOCKWORK_LOG";

/// Clockwork - build and package Clockwork game projects
#[derive(Parser)]
#[command(name = "clockwork")]
#[command(about = "Clockwork - build, package and manage dependencies of Clockwork game projects")]
#[command(version)]
pub struct Cli {
    /// Project directory (default: nearest directory with a manifest.json)
    #[arg(long, global = true, value_name = "DIR")]
    pub project: Option<PathBuf>,

    /// Show detailed output and debug logs
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a new project
    Init {
        /// Project name (used for the manifest and the package file)
        name: String,

        /// Directory to create the project in (default: current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },

    /// Compile levels and spritesheets and package the project
    Build {
        /// Directory for the package file (default: project root)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Number of parallel conversions (default: number of CPUs)
        #[arg(short, long)]
        jobs: Option<usize>,

        /// Report progress as JSON lines
        #[arg(long)]
        json: bool,

        /// Keep the staging directory after a successful build
        #[arg(long)]
        keep_staging: bool,
    },

    /// List published packages, or the versions of one package
    List {
        /// Package to list versions of
        package: Option<String>,
    },

    /// Add a package to the project's dependencies
    Add {
        /// Package name
        package: String,

        /// Version to depend on (default: latest published)
        version: Option<String>,

        /// Change an existing dependency without asking
        #[arg(short, long)]
        yes: bool,
    },

    /// Update dependencies to their latest published versions
    Update {
        /// Only update this dependency
        package: Option<String>,
    },

    /// Register a developer account
    Register,

    /// Publish a package to the registry
    Publish {
        /// Source file to upload
        #[arg(long)]
        source: Option<PathBuf>,

        /// Package name
        #[arg(long)]
        package: Option<String>,

        /// Package version
        #[arg(long)]
        version: Option<String>,

        /// Overwrite an existing version without asking
        #[arg(short, long)]
        yes: bool,
    },
}

/// Install the diagnostic log subscriber.
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Locate the project root: `--project`, or the nearest directory with a
/// manifest, or the working directory.
fn project_root(project: Option<&Path>) -> PathBuf {
    if let Some(dir) = project {
        return dir.to_path_buf();
    }
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    find_project_from(&cwd).unwrap_or(cwd)
}

/// Run a future to completion on a single-threaded runtime.
fn run_async<F: std::future::Future>(future: F) -> Result<F::Output, std::io::Error> {
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    Ok(runtime.block_on(future))
}

/// Run the CLI application
pub fn run() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let project = cli.project.as_deref();
    match cli.command {
        Commands::Init { name, path } => build::run_init(&name, path.as_deref().or(project)),
        Commands::Build { out, jobs, json, keep_staging } => {
            if jobs == Some(0) {
                eprintln!("Error: --jobs must be at least 1");
                return ExitCode::from(EXIT_INVALID_ARGS);
            }
            build::run_build(
                &project_root(project),
                out.as_deref(),
                jobs,
                json,
                keep_staging,
                cli.verbose,
            )
        }
        Commands::List { package } => deps::run_list(package.as_deref()),
        Commands::Add { package, version, yes } => {
            deps::run_add(&project_root(project), &package, version.as_deref(), yes, cli.verbose)
        }
        Commands::Update { package } => {
            deps::run_update(&project_root(project), package.as_deref(), cli.verbose)
        }
        Commands::Register => registry::run_register(),
        Commands::Publish { source, package, version, yes } => registry::run_publish(
            source.as_deref(),
            package.as_deref(),
            version.as_deref(),
            yes,
        ),
    }
}
