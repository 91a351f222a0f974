//! Dependency resolution against a [`Registry`].
//!
//! The resolver mutates the in-memory [`Manifest`]; persisting it is left to
//! the caller so that a whole `update` run results in a single write.

use crate::deps::confirm::Confirm;
use crate::deps::registry::{PackageVersion, Registry, RegistryError};
use crate::manifest::Manifest;
use crate::progress::{NullProgress, ProgressEvent, ProgressReporter};
use futures::future::join_all;
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

/// Resolver settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Upper bound for each registry call
    pub timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self { timeout: Duration::from_secs(10) }
    }
}

/// Error resolving a single dependency.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ResolveError {
    /// The registry has no versions of the package
    #[error("Package '{package}' can't be found in the registry")]
    PackageNotFound { package: String },
    /// The requested version is not published
    #[error("Version {version} of '{package}' can't be found; run 'clockwork list {package}' to see the published versions")]
    VersionNotFound { package: String, version: String },
    /// `update` was asked for a package the manifest does not depend on
    #[error("'{package}' is not a dependency of this project")]
    NotADependency { package: String },
    /// The registry call failed
    #[error("Could not query '{package}': {source}")]
    Registry {
        package: String,
        #[source]
        source: RegistryError,
    },
    /// The registry call did not finish in time
    #[error("Timed out after {timeout:?} querying '{package}'")]
    Timeout { package: String, timeout: Duration },
}

/// Result of [`DependencyResolver::add_dependency`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddOutcome {
    /// New dependency recorded
    Added { version: String },
    /// Existing dependency changed after confirmation
    Replaced { previous: String, version: String },
    /// Existing dependency kept because the change was not confirmed
    Declined { current: String },
}

/// What happened to one dependency during an update.
#[derive(Debug)]
pub enum UpdateOutcome {
    Updated { from: String, to: String },
    UpToDate { version: String },
    /// The dependency was left untouched
    Failed(ResolveError),
}

/// Per-dependency results of an update, sorted by package name.
#[derive(Debug, Default)]
pub struct UpdateReport {
    pub results: Vec<(String, UpdateOutcome)>,
}

impl UpdateReport {
    /// Whether any dependency version changed.
    pub fn changed(&self) -> bool {
        self.results.iter().any(|(_, o)| matches!(o, UpdateOutcome::Updated { .. }))
    }

    /// Number of dependencies that could not be resolved.
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|(_, o)| matches!(o, UpdateOutcome::Failed(_))).count()
    }

    /// Look up the outcome for a package.
    pub fn outcome(&self, package: &str) -> Option<&UpdateOutcome> {
        self.results.iter().find(|(name, _)| name == package).map(|(_, o)| o)
    }
}

/// Compare version strings segment by segment, numerically where both
/// segments are numbers (`1.10.0` > `1.9.0`).
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    let split = |v: &str| v.split(['.', '-']).map(str::to_string).collect::<Vec<_>>();
    let (a, b) = (split(a), split(b));

    for (x, y) in a.iter().zip(&b) {
        let ord = match (x.parse::<u64>(), y.parse::<u64>()) {
            (Ok(x), Ok(y)) => x.cmp(&y),
            _ => x.cmp(y),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    a.len().cmp(&b.len())
}

/// The most recently published version.
///
/// Equal dates are decided by [`compare_versions`]; versions without a
/// readable date rank below dated ones.
pub fn latest_version(versions: &[PackageVersion]) -> Option<&PackageVersion> {
    versions.iter().max_by(|a, b| {
        a.published_at()
            .cmp(&b.published_at())
            .then_with(|| compare_versions(&a.version, &b.version))
    })
}

/// Adds and updates manifest dependencies using a registry.
pub struct DependencyResolver<R, C> {
    registry: R,
    confirm: C,
    config: ResolverConfig,
    reporter: Arc<dyn ProgressReporter>,
}

impl<R: Registry, C: Confirm> DependencyResolver<R, C> {
    pub fn new(registry: R, confirm: C) -> Self {
        Self { registry, confirm, config: ResolverConfig::default(), reporter: Arc::new(NullProgress) }
    }

    /// Set the resolver configuration.
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the progress reporter.
    pub fn with_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// The underlying registry.
    pub fn registry(&self) -> &R {
        &self.registry
    }

    /// Fetch the published versions of `package`, bounded by the timeout.
    pub async fn versions(&self, package: &str) -> Result<Vec<PackageVersion>, ResolveError> {
        let timeout = self.config.timeout;
        match tokio::time::timeout(timeout, self.registry.list_versions(package)).await {
            Ok(Ok(versions)) => Ok(versions),
            Ok(Err(source)) => Err(ResolveError::Registry { package: package.to_string(), source }),
            Err(_) => Err(ResolveError::Timeout { package: package.to_string(), timeout }),
        }
    }

    async fn latest(&self, package: &str) -> Result<String, ResolveError> {
        let versions = self.versions(package).await?;
        latest_version(&versions)
            .map(|v| v.version.clone())
            .ok_or_else(|| ResolveError::PackageNotFound { package: package.to_string() })
    }

    /// Add `package` to the manifest's dependencies.
    ///
    /// Without `version` the most recently published version is used.
    /// If the package is already a dependency, the change must be
    /// confirmed first. Nothing is changed on error.
    pub async fn add_dependency(
        &self,
        manifest: &mut Manifest,
        package: &str,
        version: Option<&str>,
    ) -> Result<AddOutcome, ResolveError> {
        if let Some(current) = manifest.dependencies.get(package) {
            let question = format!(
                "{} is already a dependency (version {}), do you want to change the version?",
                package, current
            );
            if !self.confirm.confirm(&question) {
                return Ok(AddOutcome::Declined { current: current.clone() });
            }
        }

        let versions = self.versions(package).await?;
        if versions.is_empty() {
            return Err(ResolveError::PackageNotFound { package: package.to_string() });
        }

        let chosen = match version {
            Some(wanted) => versions
                .iter()
                .find(|v| v.version == wanted)
                .map(|v| v.version.clone())
                .ok_or_else(|| ResolveError::VersionNotFound {
                    package: package.to_string(),
                    version: wanted.to_string(),
                })?,
            None => latest_version(&versions)
                .map(|v| v.version.clone())
                .ok_or_else(|| ResolveError::PackageNotFound { package: package.to_string() })?,
        };

        tracing::debug!(package, version = %chosen, "adding dependency");
        self.reporter.report(ProgressEvent::DependencyResolved {
            package: package.to_string(),
            message: format!("version {} added to the dependencies", chosen),
        });

        Ok(match manifest.set_dependency(package, &chosen) {
            Some(previous) => AddOutcome::Replaced { previous, version: chosen },
            None => AddOutcome::Added { version: chosen },
        })
    }

    /// Move dependencies to their latest published version.
    ///
    /// With `package`, only that dependency is updated; otherwise every
    /// dependency is resolved concurrently. A failure for one dependency
    /// is recorded in the report and leaves the others unaffected.
    pub async fn update_dependencies(
        &self,
        manifest: &mut Manifest,
        package: Option<&str>,
    ) -> Result<UpdateReport, ResolveError> {
        let names: Vec<String> = match package {
            Some(name) if !manifest.dependencies.contains_key(name) => {
                return Err(ResolveError::NotADependency { package: name.to_string() });
            }
            Some(name) => vec![name.to_string()],
            None => manifest.dependencies.keys().cloned().collect(),
        };

        let lookups = names.iter().map(|name| async move { (name, self.latest(name).await) });
        let resolved = join_all(lookups).await;

        let mut report = UpdateReport::default();
        for (name, result) in resolved {
            let outcome = match result {
                Ok(latest) => match manifest.dependencies.get(name.as_str()) {
                    Some(current) if *current == latest => {
                        UpdateOutcome::UpToDate { version: latest }
                    }
                    _ => {
                        let from = manifest.set_dependency(name, &latest).unwrap_or_default();
                        UpdateOutcome::Updated { from, to: latest }
                    }
                },
                Err(e) => UpdateOutcome::Failed(e),
            };
            self.report_update(name, &outcome);
            report.results.push((name.clone(), outcome));
        }

        Ok(report)
    }

    fn report_update(&self, package: &str, outcome: &UpdateOutcome) {
        let event = match outcome {
            UpdateOutcome::Updated { from, to } => ProgressEvent::DependencyResolved {
                package: package.to_string(),
                message: format!("updated from {} to {}", from, to),
            },
            UpdateOutcome::UpToDate { .. } => ProgressEvent::DependencyResolved {
                package: package.to_string(),
                message: "already up to date".to_string(),
            },
            UpdateOutcome::Failed(e) => ProgressEvent::Error {
                subject: Some(package.to_string()),
                message: e.to_string(),
            },
        };
        self.reporter.report(event);
    }

    /// Decide whether `version` of `package` may be published.
    ///
    /// Returns `true` when the version is new, or when overwriting the
    /// existing upload was confirmed.
    pub async fn confirm_publish(&self, package: &str, version: &str) -> Result<bool, ResolveError> {
        let versions = self.versions(package).await?;
        if versions.iter().all(|v| v.version != version) {
            return Ok(true);
        }
        Ok(self.confirm.confirm(&format!(
            "Version {} of {} is already published, do you want to overwrite it?",
            version, package
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.10.0", "1.9.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.0", "1.0.0"), Ordering::Less);
        assert_eq!(compare_versions("2.0.0", "2.0.0"), Ordering::Equal);
        assert_eq!(compare_versions("1.0.0-beta", "1.0.0-alpha"), Ordering::Greater);
    }

    #[test]
    fn test_latest_version_by_date() {
        let versions = vec![
            PackageVersion::new("1.0.0", "2023-01-01"),
            PackageVersion::new("1.1.0", "2023-06-01"),
            PackageVersion::new("0.9.0", "2022-01-01"),
        ];
        assert_eq!(latest_version(&versions).map(|v| v.version.as_str()), Some("1.1.0"));
    }

    #[test]
    fn test_latest_version_is_not_highest_number() {
        let versions = vec![
            PackageVersion::new("2.0.0", "2023-01-01"),
            PackageVersion::new("1.5.0", "2023-02-01"),
        ];
        assert_eq!(latest_version(&versions).map(|v| v.version.as_str()), Some("1.5.0"));
    }

    #[test]
    fn test_latest_version_tie_break() {
        let versions = vec![
            PackageVersion::new("1.2.0", "2023-01-01"),
            PackageVersion::new("1.10.0", "2023-01-01"),
            PackageVersion::new("9.0.0", "unknown"),
        ];
        assert_eq!(latest_version(&versions).map(|v| v.version.as_str()), Some("1.10.0"));
        assert!(latest_version(&[]).is_none());
    }

    #[test]
    fn test_update_report_helpers() {
        let report = UpdateReport {
            results: vec![
                ("a".to_string(), UpdateOutcome::UpToDate { version: "1.0.0".to_string() }),
                (
                    "b".to_string(),
                    UpdateOutcome::Failed(ResolveError::PackageNotFound { package: "b".to_string() }),
                ),
            ],
        };
        assert!(!report.changed());
        assert_eq!(report.failed_count(), 1);
        assert!(matches!(report.outcome("a"), Some(UpdateOutcome::UpToDate { .. })));
        assert!(report.outcome("c").is_none());
    }
}
