// src/lifecycle.rs

//! Dependency lifecycle orchestrator
//!
//! `Warden` is the domain service behind every command: manifest sync, the
//! five-step check pipeline, maintainer-gated mutations, pruning, the
//! allowed-version gate, and delegation to the package-manager process.
//!
//! The check pipeline order is fixed: prune, remediate, resolve, re-sync,
//! lock. Pruning runs first so stale records are never scanned; locking
//! runs last so the remediation window has closed by the time the pass
//! ends.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::identity::Identity;
use crate::process::ManagerProcess;
use crate::project::manifest::ManifestSource;
use crate::registry::Registry;
use crate::remediation::{remediate, RemediationSummary};
use crate::resolver::{parse_strict_version, ConflictResolver, Resolution};
use crate::scanner::CveScanner;
use crate::store::record::Dependency;
use crate::store::DependencyStore;
use semver::Version;
use std::fmt;
use tracing::{info, warn};

/// Outcome of one check pipeline run
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    pub project: String,
    pub pruned: Vec<String>,
    pub remediation: RemediationSummary,
    pub resolution: Resolution,
    pub manifest_updated: bool,
    pub synced: usize,
    pub locked: usize,
}

impl fmt::Display for CheckReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "RESULTS FOR PROJECT \"{}\":", self.project)?;
        writeln!(f, "  PRUNED: {}", self.pruned.len())?;
        writeln!(
            f,
            "  CVE: {}",
            if self.remediation.found_vulnerabilities() {
                "YES"
            } else {
                "NO"
            }
        )?;
        for name in &self.remediation.downgraded {
            writeln!(f, "    downgraded {}", name)?;
        }
        for name in &self.remediation.upgraded {
            writeln!(f, "    upgraded {}", name)?;
        }
        for name in &self.remediation.warnings {
            writeln!(f, "    locked, left unchanged: {}", name)?;
        }
        writeln!(
            f,
            "  CONFLICTS: {}",
            if self.resolution.conflicts.is_empty() && self.resolution.unresolvable.is_empty() {
                "NO"
            } else {
                "YES"
            }
        )?;
        for (name, conflict) in &self.resolution.conflicts {
            writeln!(f, "    {}: {}", name, conflict.suggestion)?;
        }
        for name in &self.resolution.unresolvable {
            writeln!(f, "    unresolvable: {}", name)?;
        }
        writeln!(f, "  MANIFEST UPDATED: {}", if self.manifest_updated { "YES" } else { "NO" })?;
        write!(f, "  LOCKED: {}", self.locked)
    }
}

pub struct Warden {
    identity: Identity,
    config: Config,
    store: DependencyStore,
    manifest: Box<dyn ManifestSource>,
    registry: Box<dyn Registry>,
    scanner: Box<dyn CveScanner>,
    process: Box<dyn ManagerProcess>,
}

impl Warden {
    pub fn new(
        identity: Identity,
        config: Config,
        store: DependencyStore,
        manifest: Box<dyn ManifestSource>,
        registry: Box<dyn Registry>,
        scanner: Box<dyn CveScanner>,
        process: Box<dyn ManagerProcess>,
    ) -> Self {
        Self {
            identity,
            config,
            store,
            manifest,
            registry,
            scanner,
            process,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn store(&self) -> &DependencyStore {
        &self.store
    }

    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }

    fn require_maintainer(&self, command: &str) -> Result<()> {
        if !self.identity.is_maintainer() {
            return Err(Error::RestrictedAccess {
                command: command.to_string(),
            });
        }
        Ok(())
    }

    /// Synchronize the store from the manifest's direct dependencies
    ///
    /// New entries enter mutable; existing names are no-ops, so running
    /// this twice against an unchanged manifest adds nothing.
    pub fn sync_from_manifest(&mut self) -> Result<usize> {
        let manifest = self.manifest.read()?;
        let now = self.now_ms();

        self.store.set_manifest_pins(manifest.dependencies.clone());

        let deps: Vec<Dependency> = manifest
            .dependencies
            .iter()
            .map(|(name, version)| {
                Dependency::new(name.clone(), version.clone(), now)
                    .with_maintainer(self.identity.name())
                    .with_local(version.starts_with("file:") || version.starts_with("link:"))
            })
            .collect();

        let added = self.store.sync_entries(deps)?;
        info!("Manifest sync added {} new dependencies", added);
        Ok(added)
    }

    /// Initialize the record set from the manifest
    pub fn init(&mut self) -> Result<usize> {
        self.sync_from_manifest()
    }

    /// Remove every dependency unused beyond the staleness threshold
    pub fn prune_unused(&mut self) -> Result<Vec<String>> {
        let now = self.now_ms();
        let threshold = self.config.stale_after_ms();

        let pruned = self
            .store
            .prune(|dep| now - dep.last_used() > threshold)?;
        for name in &pruned {
            info!(
                "Dependency '{}' unused for over {} hours; removed",
                name, self.config.stale_after_hours
            );
        }
        Ok(pruned)
    }

    /// The five-step check pipeline, in fixed order
    pub fn common_check(&mut self) -> Result<CheckReport> {
        let mut report = CheckReport::default();
        report.project = self
            .manifest
            .read()
            .ok()
            .and_then(|m| m.name)
            .unwrap_or_else(|| "unnamed".to_string());

        // 1. Prune stale and local records before scanning anything
        report.pruned = self.prune_unused()?;

        // 2. Vulnerability remediation over the survivors
        let now_ms = self.now_ms();
        report.remediation = remediate(&mut self.store, self.scanner.as_ref(), now_ms)?;

        // 3. Conflict resolution; write-back only on a clean result
        let mut manifest = self.manifest.read()?;
        report.resolution = ConflictResolver::new(self.registry.as_ref()).resolve(&manifest);

        if report.resolution.clean() && !report.resolution.recommended.is_empty() {
            let mut changed = false;
            for (name, version) in &report.resolution.recommended {
                for section in [
                    &mut manifest.dependencies,
                    &mut manifest.dev_dependencies,
                    &mut manifest.peer_dependencies,
                ] {
                    if let Some(range) = section.get_mut(name) {
                        if range != version {
                            *range = version.clone();
                            changed = true;
                        }
                    }
                }
            }
            if changed {
                self.manifest.write(&manifest)?;
                report.manifest_updated = true;
                info!("Wrote resolved versions back to the manifest");
            }
        } else if !report.resolution.clean() {
            warn!(
                "Resolution not clean ({} conflicts, {} unresolvable); manifest untouched",
                report.resolution.conflicts.len(),
                report.resolution.unresolvable.len()
            );
        }

        // 4. Re-sync against the possibly-updated manifest
        report.synced = self.sync_from_manifest()?;

        // 5. Close the remediation window
        report.locked = self.store.lock_all()?;

        Ok(report)
    }

    /// Register a new dependency; maintainer only
    pub fn add(&mut self, name: &str, version: &str) -> Result<CheckReport> {
        self.require_maintainer("add")?;
        let report = self.common_check()?;

        let dep = Dependency::new(name, version, self.now_ms())
            .with_maintainer(self.identity.name());
        self.store.insert(dep)?;
        Ok(report)
    }

    /// Remove a dependency; maintainer only
    pub fn remove(&mut self, name: &str) -> Result<CheckReport> {
        self.require_maintainer("remove")?;
        let report = self.common_check()?;

        self.store.remove(name)?;
        Ok(report)
    }

    /// Remove-then-add as one logical step; maintainer only
    pub fn replace(&mut self, name: &str, version: &str) -> Result<CheckReport> {
        self.require_maintainer("replace")?;
        let report = self.common_check()?;

        self.store.remove(name)?;
        let dep = Dependency::new(name, version, self.now_ms())
            .with_maintainer(self.identity.name());
        self.store.insert(dep)?;
        Ok(report)
    }

    /// The allowed-version window for a package, most recent first
    ///
    /// Registry failures degrade to an empty window with a log; the batch
    /// semantics match every other transient fetch.
    pub fn allowed_versions(&self, name: &str) -> Result<Vec<String>> {
        info!(
            "Fetching allowed versions for '{}' ({} most recent)",
            name, self.config.allowed_window
        );

        let published = match self.registry.list_versions(name) {
            Ok(versions) => versions,
            Err(e) => {
                warn!("Version list fetch failed for '{}': {}", name, e);
                return Ok(Vec::new());
            }
        };

        let mut versions: Vec<Version> = published
            .iter()
            .filter_map(|v| parse_strict_version(v))
            .collect();
        versions.sort();

        Ok(versions
            .iter()
            .rev()
            .take(self.config.allowed_window)
            .map(Version::to_string)
            .collect())
    }

    /// Replace a dependency's version after checking the allowed window
    pub fn change_to_allowed_version(&mut self, name: &str, version: &str) -> Result<CheckReport> {
        let allowed = self.allowed_versions(name)?;
        if !allowed.iter().any(|v| v == version) {
            return Err(Error::VersionNotAllowed {
                name: name.to_string(),
                version: version.to_string(),
                allowed,
            });
        }

        self.replace(name, version)
    }

    /// Run the resolver without touching the manifest
    pub fn resolve_conflicts(&mut self) -> Result<Resolution> {
        let manifest = self.manifest.read()?;
        let resolution = ConflictResolver::new(self.registry.as_ref()).resolve(&manifest);

        if !resolution.unresolvable.is_empty() {
            return Err(Error::UnresolvableConflict(resolution.unresolvable));
        }
        Ok(resolution)
    }

    /// Manifest-only install; extra arguments are refused by policy
    pub fn install(&mut self, args: &[String]) -> Result<i32> {
        if !args.is_empty() {
            return Err(Error::OperationBlocked(
                "install-changing operations are blocked; manage dependencies through depwarden"
                    .to_string(),
            ));
        }

        self.common_check()?;
        self.process.run("install", &[])
    }

    /// Clean install from the lockfile
    pub fn clean_install(&mut self) -> Result<i32> {
        self.common_check()?;
        self.process.run("ci", &[])
    }

    /// Run the project build through the package manager
    pub fn build(&mut self) -> Result<i32> {
        self.common_check()?;
        self.process.run("run", &["build".to_string()])
    }

    /// Start the application
    pub fn start(&mut self) -> Result<i32> {
        self.process.run("start", &[])
    }
}
