//! Package registry client.
//!
//! The [`Registry`] trait is the only capability the dependency resolver
//! needs. [`HttpRegistry`] implements it against the Clockwork package
//! service and also exposes the account and publishing endpoints used by
//! the `list`, `register` and `publish` commands.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use reqwest::{StatusCode, Url};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

/// Default registry endpoint.
pub const DEFAULT_REGISTRY_URL: &str = "http://cwpm.azurewebsites.net/api";

/// Environment variable overriding the registry endpoint.
pub const REGISTRY_URL_ENV: &str = "CLOCKWORK_REGISTRY";

/// One published version of a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageVersion {
    pub version: String,
    /// Publish date as sent by the registry
    #[serde(default)]
    pub date: String,
}

impl PackageVersion {
    pub fn new(version: impl Into<String>, date: impl Into<String>) -> Self {
        Self { version: version.into(), date: date.into() }
    }

    /// Publish date, if the registry sent one this crate can read.
    ///
    /// Accepts RFC 3339 timestamps, naive `YYYY-MM-DDTHH:MM:SS[.fff]`
    /// timestamps (taken as UTC) and plain `YYYY-MM-DD` dates.
    pub fn published_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.date.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt.with_timezone(&Utc));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
            return Some(dt.and_utc());
        }
        NaiveDate::parse_from_str(raw, "%Y-%m-%d")
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .map(|dt| dt.and_utc())
    }
}

/// A package in the registry listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageSummary {
    pub id: String,
    /// Publishing developer
    #[serde(default)]
    pub by: String,
}

/// Account credentials for publishing.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Error talking to the registry.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// The configured endpoint is not a usable URL
    #[error("Invalid registry URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
    /// Network or protocol failure
    #[error("Request to {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The registry answered with a non-success status
    #[error("Registry returned {status} for {url}: {body}")]
    Status { url: String, status: u16, body: String },
    /// The registry answered with something this crate cannot read
    #[error("Unexpected response from {url}: {message}")]
    Response { url: String, message: String },
    /// The user name is already registered
    #[error("Could not register '{0}'; the user name may already be taken")]
    Taken(String),
    /// A local file could not be read
    #[error("Failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The registry could not be reached or did not answer in time
    #[error("Registry unavailable: {0}")]
    Unavailable(String),
}

/// Source of published package versions.
pub trait Registry: Send + Sync {
    /// List every published version of `package`. An unknown package
    /// yields an empty list.
    fn list_versions(
        &self,
        package: &str,
    ) -> impl Future<Output = Result<Vec<PackageVersion>, RegistryError>> + Send;
}

/// Registry endpoint configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Base URL, e.g. `http://cwpm.azurewebsites.net/api`
    pub base_url: String,
    /// Timeout for each HTTP request
    pub timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { base_url: DEFAULT_REGISTRY_URL.to_string(), timeout: Duration::from_secs(30) }
    }
}

impl RegistryConfig {
    /// Default configuration with `CLOCKWORK_REGISTRY` applied.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(url) = std::env::var(REGISTRY_URL_ENV).ok().filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        config
    }
}

/// [`Registry`] over the Clockwork package service HTTP API.
#[derive(Debug, Clone)]
pub struct HttpRegistry {
    base: Url,
    client: reqwest::Client,
}

impl HttpRegistry {
    /// Create a client for the configured endpoint.
    pub fn new(config: &RegistryConfig) -> Result<Self, RegistryError> {
        let base = Url::parse(&config.base_url).map_err(|e| RegistryError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(RegistryError::InvalidUrl {
                url: config.base_url.clone(),
                reason: "not a hierarchical URL".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|source| RegistryError::Http { url: config.base_url.clone(), source })?;

        Ok(Self { base, client })
    }

    /// Endpoint URL for path segments under the base URL.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: Url,
    ) -> Result<Option<T>, RegistryError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| request_error(&url, source))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check_status(&url, response).await?;
        let value = response.json().await.map_err(|e| RegistryError::Response {
            url: url.to_string(),
            message: e.to_string(),
        })?;
        Ok(Some(value))
    }

    /// List all published packages.
    pub async fn list_packages(&self) -> Result<Vec<PackageSummary>, RegistryError> {
        let url = self.endpoint(&["packages"]);
        Ok(self.get_json(url).await?.unwrap_or_default())
    }

    /// Register a developer account.
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<(), RegistryError> {
        #[derive(Deserialize)]
        struct Reply {
            res: Option<String>,
        }

        let url = self.endpoint(&["developers"]);
        let response = self
            .client
            .post(url.clone())
            .form(&[("name", username), ("email", email), ("password", password)])
            .send()
            .await
            .map_err(|source| request_error(&url, source))?;

        let reply: Reply = response.json().await.map_err(|e| RegistryError::Response {
            url: url.to_string(),
            message: e.to_string(),
        })?;

        match reply.res.as_deref() {
            Some("OK") => Ok(()),
            _ => Err(RegistryError::Taken(username.to_string())),
        }
    }

    /// Upload `source` as `version` of `package`.
    pub async fn publish(
        &self,
        package: &str,
        version: &str,
        source: &str,
        credentials: &Credentials,
    ) -> Result<(), RegistryError> {
        let url = self.endpoint(&["packages", package, version]);
        let response = self
            .client
            .post(url.clone())
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
                ("source", source),
            ])
            .send()
            .await
            .map_err(|source| request_error(&url, source))?;

        check_status(&url, response).await?;
        Ok(())
    }
}

impl Registry for HttpRegistry {
    async fn list_versions(&self, package: &str) -> Result<Vec<PackageVersion>, RegistryError> {
        let url = self.endpoint(&["packages", package]);
        tracing::debug!(%url, "listing versions");
        Ok(self.get_json(url).await?.unwrap_or_default())
    }
}

/// Map a failed request: unreachable hosts and timeouts are `Unavailable`.
fn request_error(url: &Url, source: reqwest::Error) -> RegistryError {
    if source.is_connect() || source.is_timeout() {
        RegistryError::Unavailable(format!("{}: {}", url, source))
    } else {
        RegistryError::Http { url: url.to_string(), source }
    }
}

async fn check_status(
    url: &Url,
    response: reqwest::Response,
) -> Result<reqwest::Response, RegistryError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RegistryError::Status { url: url.to_string(), status: status.as_u16(), body })
}
