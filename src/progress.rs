//! Progress and diagnostics reporting.
//!
//! Build and dependency operations never print directly. They send
//! [`ProgressEvent`]s to a [`ProgressReporter`] held by the caller's context,
//! so the CLI can choose between colored console output, JSON lines or
//! nothing at all, and tests can inspect exactly what was reported.
//!
//! # Example
//!
//! ```
//! use clockwork::progress::{MemoryProgress, ProgressEvent, ProgressReporter};
//!
//! let reporter = MemoryProgress::new();
//! reporter.report(ProgressEvent::Warning {
//!     subject: Some("levels.xml".to_string()),
//!     message: "malformed vars".to_string(),
//! });
//! assert_eq!(reporter.warnings().len(), 1);
//! ```

use serde_json::json;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Phases of a package build, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildStage {
    /// Copying the manifest and scope into the staging directory
    Staging,
    /// Compiling level and sprite-sheet files
    Converting,
    /// Writing the rewritten manifest into the staging directory
    WritingManifest,
    /// Writing the archive
    Archiving,
    /// Removing the staging directory
    Cleanup,
}

impl std::fmt::Display for BuildStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            BuildStage::Staging => "Copying project files",
            BuildStage::Converting => "Processing levels and spritesheets",
            BuildStage::WritingManifest => "Updating manifest",
            BuildStage::Archiving => "Creating package",
            BuildStage::Cleanup => "Deleting temporary files",
        };
        f.write_str(text)
    }
}

/// Outcome of one manifest entry in progress events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    /// Compiled to JSON
    Converted,
    /// Not a legacy file, left as-is
    Unchanged,
    /// Compilation failed; the entry keeps its legacy name
    Failed(String),
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileStatus::Converted => write!(f, "converted"),
            FileStatus::Unchanged => write!(f, "unchanged"),
            FileStatus::Failed(e) => write!(f, "failed: {}", e),
        }
    }
}

/// Events reported during builds and dependency operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// A package build started
    BuildStarted {
        /// Project name from the manifest
        project: String,
        /// Number of level and sprite-sheet entries
        total_files: usize,
    },
    /// A build phase started
    StageStarted { stage: BuildStage },
    /// A manifest entry was processed
    FileCompleted {
        /// Manifest entry (relative to the scope)
        file: String,
        status: FileStatus,
        duration_ms: u64,
    },
    /// A package build finished and the archive was written
    BuildCompleted {
        /// Path of the produced archive
        archive: String,
        converted: usize,
        unchanged: usize,
        failed: usize,
        duration_ms: u64,
    },
    /// A dependency was added, updated or checked
    DependencyResolved {
        /// Package name
        package: String,
        /// What happened to it
        message: String,
    },
    /// Informational message
    Info { message: String },
    /// A non-fatal problem
    Warning {
        /// File or package the warning is about (if applicable)
        subject: Option<String>,
        message: String,
    },
    /// An error
    Error {
        /// File or package the error is about (if applicable)
        subject: Option<String>,
        message: String,
    },
}

/// Trait for progress reporters.
pub trait ProgressReporter: Send + Sync {
    /// Report a progress event.
    fn report(&self, event: ProgressEvent);

    /// Check if this reporter wants verbose output.
    fn is_verbose(&self) -> bool {
        false
    }
}

/// A progress reporter that discards all events.
#[derive(Debug, Default)]
pub struct NullProgress;

impl NullProgress {
    /// Create a new null progress reporter.
    pub fn new() -> Self {
        Self
    }
}

impl ProgressReporter for NullProgress {
    fn report(&self, _event: ProgressEvent) {}
}

/// Console progress reporter with optional colors.
pub struct ConsoleProgress {
    /// Whether to use colors
    use_colors: bool,
    /// Whether to show verbose output
    verbose: bool,
    /// Files processed so far
    current: AtomicUsize,
    /// Files in the current build
    total: AtomicUsize,
    /// Output writer (for testing)
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for ConsoleProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleProgress")
            .field("use_colors", &self.use_colors)
            .field("verbose", &self.verbose)
            .field("current", &self.current)
            .field("total", &self.total)
            .finish()
    }
}

impl ConsoleProgress {
    /// Create a new console progress reporter writing to stderr.
    pub fn new() -> Self {
        Self {
            use_colors: true,
            verbose: false,
            current: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            output: Mutex::new(Box::new(std::io::stderr())),
        }
    }

    /// Create a console progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self {
            use_colors: false,
            verbose: false,
            current: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            output: Mutex::new(Box::new(output)),
        }
    }

    /// Set whether to use colors.
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    /// Set verbose mode.
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    fn color(&self, text: &str, color: &str) -> String {
        if self.use_colors {
            format!("{}{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn green(&self, text: &str) -> String {
        self.color(text, "\x1b[32m")
    }

    fn yellow(&self, text: &str) -> String {
        self.color(text, "\x1b[33m")
    }

    fn red(&self, text: &str) -> String {
        self.color(text, "\x1b[31m")
    }

    fn cyan(&self, text: &str) -> String {
        self.color(text, "\x1b[36m")
    }

    fn writeln(&self, line: &str) {
        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", line);
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for ConsoleProgress {
    fn report(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::BuildStarted { project, total_files } => {
                self.total.store(total_files, Ordering::SeqCst);
                self.current.store(0, Ordering::SeqCst);
                self.writeln(&format!(
                    "{} Packaging {} ({} file{})...",
                    self.cyan("[build]"),
                    project,
                    total_files,
                    if total_files == 1 { "" } else { "s" }
                ));
            }
            ProgressEvent::StageStarted { stage } => {
                self.writeln(&format!("{} {}...", self.cyan("[build]"), stage));
            }
            ProgressEvent::FileCompleted { file, status, duration_ms } => {
                let current = self.current.fetch_add(1, Ordering::SeqCst) + 1;
                let total = self.total.load(Ordering::SeqCst);

                if status == FileStatus::Unchanged && !self.verbose {
                    return;
                }

                let status_str = match &status {
                    FileStatus::Converted => self.green("ok"),
                    FileStatus::Unchanged => self.yellow("unchanged"),
                    FileStatus::Failed(_) => self.red("FAILED"),
                };

                self.writeln(&format!(
                    "{} [{}/{}] {} {} ({})",
                    self.cyan("[build]"),
                    current,
                    total,
                    status_str,
                    file,
                    format_duration(duration_ms)
                ));

                if let FileStatus::Failed(err) = status {
                    self.writeln(&format!("        {}", self.red(&err)));
                }
            }
            ProgressEvent::BuildCompleted { archive, converted, unchanged, failed, duration_ms } => {
                let label = if failed == 0 { self.green("[done]") } else { self.yellow("[done]") };
                self.writeln(&format!(
                    "\n{} {}: {} converted, {} unchanged, {} failed in {}",
                    label,
                    archive,
                    converted,
                    unchanged,
                    failed,
                    format_duration(duration_ms)
                ));
            }
            ProgressEvent::DependencyResolved { package, message } => {
                self.writeln(&format!("{} {}: {}", self.cyan("[deps]"), package, message));
            }
            ProgressEvent::Info { message } => {
                if self.verbose {
                    self.writeln(&format!("{} {}", self.cyan("[info]"), message));
                }
            }
            ProgressEvent::Warning { subject, message } => {
                let prefix = subject.map(|s| format!("{}: ", s)).unwrap_or_default();
                self.writeln(&format!("{} {}{}", self.yellow("[warn]"), prefix, message));
            }
            ProgressEvent::Error { subject, message } => {
                let prefix = subject.map(|s| format!("{}: ", s)).unwrap_or_default();
                self.writeln(&format!("{} {}{}", self.red("[error]"), prefix, message));
            }
        }
    }

    fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// JSON progress reporter for machine-readable output, one object per line.
pub struct JsonProgress {
    output: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for JsonProgress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonProgress").finish()
    }
}

impl JsonProgress {
    /// Create a new JSON progress reporter writing to stderr.
    pub fn new() -> Self {
        Self { output: Mutex::new(Box::new(std::io::stderr())) }
    }

    /// Create a JSON progress reporter that writes to a custom output.
    pub fn with_output<W: Write + Send + 'static>(output: W) -> Self {
        Self { output: Mutex::new(Box::new(output)) }
    }
}

impl Default for JsonProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for JsonProgress {
    fn report(&self, event: ProgressEvent) {
        let value = match event {
            ProgressEvent::BuildStarted { project, total_files } => {
                json!({"event": "build_started", "project": project, "total_files": total_files})
            }
            ProgressEvent::StageStarted { stage } => {
                json!({"event": "stage_started", "stage": format!("{:?}", stage).to_lowercase()})
            }
            ProgressEvent::FileCompleted { file, status, duration_ms } => {
                let mut value = json!({
                    "event": "file_completed",
                    "file": file,
                    "status": match &status {
                        FileStatus::Converted => "converted",
                        FileStatus::Unchanged => "unchanged",
                        FileStatus::Failed(_) => "failed",
                    },
                    "duration_ms": duration_ms,
                });
                if let FileStatus::Failed(e) = status {
                    value["error"] = json!(e);
                }
                value
            }
            ProgressEvent::BuildCompleted { archive, converted, unchanged, failed, duration_ms } => {
                json!({
                    "event": "build_completed",
                    "archive": archive,
                    "converted": converted,
                    "unchanged": unchanged,
                    "failed": failed,
                    "duration_ms": duration_ms,
                })
            }
            ProgressEvent::DependencyResolved { package, message } => {
                json!({"event": "dependency", "package": package, "message": message})
            }
            ProgressEvent::Info { message } => json!({"event": "info", "message": message}),
            ProgressEvent::Warning { subject, message } => {
                json!({"event": "warning", "subject": subject, "message": message})
            }
            ProgressEvent::Error { subject, message } => {
                json!({"event": "error", "subject": subject, "message": message})
            }
        };

        if let Ok(mut output) = self.output.lock() {
            let _ = writeln!(output, "{}", value);
        }
    }
}

/// Reporter that keeps every event in memory.
#[derive(Debug, Default)]
pub struct MemoryProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl MemoryProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// All events reported so far.
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Messages of all reported warnings.
    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Warning { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }

    /// Messages of all reported errors.
    pub fn errors(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Error { message, .. } => Some(message),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for MemoryProgress {
    fn report(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Format a duration in milliseconds to a human-readable string.
fn format_duration(ms: u64) -> String {
    if ms < 1000 {
        format!("{}ms", ms)
    } else if ms < 60_000 {
        format!("{:.1}s", ms as f64 / 1000.0)
    } else {
        let minutes = ms / 60_000;
        let seconds = (ms % 60_000) / 1000;
        format!("{}m {}s", minutes, seconds)
    }
}
