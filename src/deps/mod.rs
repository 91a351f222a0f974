//! Package dependencies.
//!
//! - [`registry`]: the registry capability and its HTTP client
//! - [`resolver`]: adding and updating manifest dependencies
//! - [`confirm`]: yes/no prompts before overwriting anything

pub mod confirm;
pub mod registry;
pub mod resolver;

pub use confirm::{AssumeNo, AssumeYes, Confirm, StdinConfirm};
pub use registry::{
    Credentials, HttpRegistry, PackageSummary, PackageVersion, Registry, RegistryConfig,
    RegistryError,
};
pub use resolver::{
    compare_versions, latest_version, AddOutcome, DependencyResolver, ResolveError,
    ResolverConfig, UpdateOutcome, UpdateReport,
};
