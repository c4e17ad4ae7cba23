// src/registry.rs

//! Package registry client
//!
//! Depwarden only needs two things from the registry: the list of published
//! versions for a package, and the per-version metadata (peer constraints,
//! deprecation notices) used during conflict resolution. Fetch failures are
//! transient by contract; callers treat them as empty results and keep the
//! batch going.

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Maximum retry attempts for failed registry requests
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// Per-version registry metadata
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    #[serde(default)]
    pub peer_dependencies: BTreeMap<String, String>,
    #[serde(default)]
    pub deprecated: Option<String>,
}

/// Package-level registry metadata
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PackageMetadata {
    #[serde(default)]
    pub versions: BTreeMap<String, VersionInfo>,
}

/// Registry collaborator contract
///
/// `Send + Sync` so resolution can fan out across packages.
pub trait Registry: Send + Sync {
    /// All published version strings for a package
    fn list_versions(&self, name: &str) -> Result<Vec<String>>;

    /// Per-version metadata for a package
    fn fetch_metadata(&self, name: &str) -> Result<PackageMetadata>;
}

/// HTTP registry client with retry support
pub struct HttpRegistry {
    client: Client,
    base_url: String,
    max_retries: u32,
}

impl HttpRegistry {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| Error::Registry(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries: MAX_RETRIES,
        })
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.client.get(url).send() {
                Ok(response) => {
                    if !response.status().is_success() {
                        return Err(Error::Registry(format!(
                            "HTTP {} from {}",
                            response.status(),
                            url
                        )));
                    }

                    return response
                        .json()
                        .map_err(|e| Error::Registry(format!("Failed to parse JSON from {}: {}", url, e)));
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::Registry(format!(
                            "Request failed after {} attempts: {}",
                            attempt, e
                        )));
                    }
                    warn!("Registry request attempt {} failed: {}, retrying...", attempt, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }
}

impl Registry for HttpRegistry {
    fn list_versions(&self, name: &str) -> Result<Vec<String>> {
        let url = format!("{}/{}", self.base_url, name);
        debug!("Fetching version list for '{}' from {}", name, url);

        let metadata: PackageMetadata = self.get_json(&url)?;
        Ok(metadata.versions.keys().cloned().collect())
    }

    fn fetch_metadata(&self, name: &str) -> Result<PackageMetadata> {
        let url = format!("{}/{}", self.base_url, name);
        debug!("Fetching metadata for '{}' from {}", name, url);
        self.get_json(&url)
    }
}
