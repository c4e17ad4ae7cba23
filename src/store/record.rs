// src/store/record.rs

//! Dependency entity and its persisted record form
//!
//! A dependency is either `Mutable` or `Locked`. Only the mutable state
//! exposes a version setter; locking consumes the value, so a forgotten
//! read-only check cannot compile. The flat `DependencyRecord` mirror is
//! what goes to disk.

use serde::{Deserialize, Serialize};

/// Fields shared by both dependency states
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyMeta {
    pub name: String,
    pub version: String,
    pub maintainer: Option<String>,
    /// Non-registry (local/path) pointer; dropped on the next scan pass
    pub is_local: bool,
    /// Epoch milliseconds of the last observed activity
    pub last_used: i64,
    /// Version was written by the remediation or resolution machinery
    pub resolved_by_automation: bool,
}

/// A tracked third-party dependency
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dependency {
    Mutable(DependencyMeta),
    Locked(DependencyMeta),
}

impl Dependency {
    /// Create a new mutable dependency
    pub fn new(name: impl Into<String>, version: impl Into<String>, now_ms: i64) -> Self {
        Dependency::Mutable(DependencyMeta {
            name: name.into(),
            version: version.into(),
            maintainer: None,
            is_local: false,
            last_used: now_ms,
            resolved_by_automation: false,
        })
    }

    pub fn meta(&self) -> &DependencyMeta {
        match self {
            Dependency::Mutable(meta) | Dependency::Locked(meta) => meta,
        }
    }

    pub fn name(&self) -> &str {
        &self.meta().name
    }

    pub fn version(&self) -> &str {
        &self.meta().version
    }

    pub fn is_locked(&self) -> bool {
        matches!(self, Dependency::Locked(_))
    }

    pub fn is_local(&self) -> bool {
        self.meta().is_local
    }

    pub fn last_used(&self) -> i64 {
        self.meta().last_used
    }

    /// Convert to the locked state; idempotent
    pub fn lock(self) -> Self {
        match self {
            Dependency::Mutable(meta) | Dependency::Locked(meta) => Dependency::Locked(meta),
        }
    }

    /// Set the version while still mutable
    ///
    /// Returns the new state on success; a locked dependency is returned
    /// unchanged as the error value so the caller keeps ownership.
    pub fn set_version(self, version: impl Into<String>, by_automation: bool) -> Result<Self, Self> {
        match self {
            Dependency::Mutable(mut meta) => {
                meta.version = version.into();
                meta.resolved_by_automation = by_automation;
                Ok(Dependency::Mutable(meta))
            }
            locked @ Dependency::Locked(_) => Err(locked),
        }
    }

    /// Refresh the activity timestamp; valid in either state
    pub fn touch(&mut self, now_ms: i64) {
        match self {
            Dependency::Mutable(meta) | Dependency::Locked(meta) => meta.last_used = now_ms,
        }
    }

    pub fn with_maintainer(mut self, maintainer: impl Into<String>) -> Self {
        match &mut self {
            Dependency::Mutable(meta) | Dependency::Locked(meta) => {
                meta.maintainer = Some(maintainer.into());
            }
        }
        self
    }

    pub fn with_local(mut self, is_local: bool) -> Self {
        match &mut self {
            Dependency::Mutable(meta) | Dependency::Locked(meta) => meta.is_local = is_local,
        }
        self
    }
}

/// Flat serde mirror of a dependency, as stored in the record file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyRecord {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub maintainer: Option<String>,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default)]
    pub is_local: bool,
    #[serde(default)]
    pub last_used: i64,
    #[serde(default)]
    pub resolved_by_automation: bool,
}

impl From<&Dependency> for DependencyRecord {
    fn from(dep: &Dependency) -> Self {
        let meta = dep.meta();
        Self {
            name: meta.name.clone(),
            version: meta.version.clone(),
            maintainer: meta.maintainer.clone(),
            read_only: dep.is_locked(),
            is_local: meta.is_local,
            last_used: meta.last_used,
            resolved_by_automation: meta.resolved_by_automation,
        }
    }
}

impl From<DependencyRecord> for Dependency {
    fn from(record: DependencyRecord) -> Self {
        let meta = DependencyMeta {
            name: record.name,
            version: record.version,
            maintainer: record.maintainer,
            is_local: record.is_local,
            last_used: record.last_used,
            resolved_by_automation: record.resolved_by_automation,
        };

        if record.read_only {
            Dependency::Locked(meta)
        } else {
            Dependency::Mutable(meta)
        }
    }
}
