// src/config.rs

//! Runtime configuration for Depwarden
//!
//! Configuration lives in an optional `.depwarden/config.json` under the
//! project root. A missing file yields the defaults; a present but
//! unparsable file is an error rather than a silent fallback.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Default staleness threshold before a dependency is pruned (hours)
const DEFAULT_STALE_AFTER_HOURS: u64 = 5;

/// Default size of the allowed-version window
const DEFAULT_ALLOWED_WINDOW: usize = 3;

/// Default per-request HTTP timeout (seconds)
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default timeout for captured subprocess calls (seconds)
const DEFAULT_SUBPROCESS_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Hours of inactivity after which a dependency is pruned
    pub stale_after_hours: u64,
    /// How many of the most recent published versions are installable
    pub allowed_window: usize,
    /// Base URL of the package registry
    pub registry_url: String,
    /// Per-request HTTP timeout in seconds
    pub http_timeout_secs: u64,
    /// Timeout for captured subprocess calls in seconds
    pub subprocess_timeout_secs: u64,
    /// Package-manager executable name
    pub manager_program: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stale_after_hours: DEFAULT_STALE_AFTER_HOURS,
            allowed_window: DEFAULT_ALLOWED_WINDOW,
            registry_url: "https://registry.npmjs.org".to_string(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            subprocess_timeout_secs: DEFAULT_SUBPROCESS_TIMEOUT_SECS,
            manager_program: "npm".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `<root>/.depwarden/config.json`
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load(root: &Path) -> Result<Self> {
        let path = root.join(".depwarden").join("config.json");

        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let data = std::fs::read_to_string(&path)?;
        serde_json::from_str(&data)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", path.display(), e)))
    }

    /// Staleness threshold in milliseconds
    pub fn stale_after_ms(&self) -> i64 {
        self.stale_after_hours as i64 * 60 * 60 * 1000
    }
}
