// src/scanner.rs

//! CVE scan source
//!
//! The audit-backed implementation shells out to the package manager's
//! audit subcommand once per run and answers per-dependency queries from
//! the cached report. A failed audit is remembered so a broken toolchain
//! does not re-spawn the subprocess for every dependency in the batch.

use crate::error::{Error, Result};
use crate::process::ManagerProcess;
use crate::registry::Registry;
use crate::resolver::{parse_range, parse_strict_version};
use crate::store::record::DependencyMeta;
use semver::Version;
use serde::Deserialize;
use std::cell::OnceCell;
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Vulnerability severity signal for one dependency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    None,
    High,
    Critical,
    /// A patched version exists that the current version predates
    Fixed,
}

/// Scan result for one dependency
#[derive(Debug, Clone)]
pub struct ScanReport {
    pub severity: Severity,
    pub fixed_version: Option<String>,
}

impl ScanReport {
    pub fn none() -> Self {
        Self {
            severity: Severity::None,
            fixed_version: None,
        }
    }
}

/// CVE scan collaborator contract
pub trait CveScanner {
    fn scan(&self, dep: &DependencyMeta) -> Result<ScanReport>;
    fn is_deprecated(&self, name: &str, version: &str) -> Result<bool>;
}

/// One advisory entry from the audit report
#[derive(Debug, Clone, Deserialize)]
struct Advisory {
    module_name: String,
    severity: String,
    #[serde(default)]
    patched_versions: Option<String>,
}

/// Parsed audit output
#[derive(Debug, Clone, Default, Deserialize)]
struct AuditReport {
    #[serde(default)]
    advisories: BTreeMap<String, Advisory>,
}

/// Scanner backed by the package manager's audit subcommand
pub struct AuditScanner {
    process: Box<dyn ManagerProcess>,
    registry: Box<dyn Registry>,
    cache: OnceCell<Option<AuditReport>>,
}

impl AuditScanner {
    pub fn new(process: Box<dyn ManagerProcess>, registry: Box<dyn Registry>) -> Self {
        Self {
            process,
            registry,
            cache: OnceCell::new(),
        }
    }

    fn audit_report(&self) -> Result<&AuditReport> {
        let cached = self.cache.get_or_init(|| {
            let output = match self
                .process
                .run_captured("audit", &["--json".to_string()])
            {
                Ok(output) => output,
                Err(e) => {
                    warn!("Audit subprocess failed: {}", e);
                    return None;
                }
            };

            match serde_json::from_str::<AuditReport>(&output) {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!("Audit output unparsable: {}", e);
                    None
                }
            }
        });

        cached
            .as_ref()
            .ok_or_else(|| Error::Process("audit report unavailable".to_string()))
    }

    /// Highest strict-semver version published for a package
    fn latest_version(&self, name: &str) -> Option<String> {
        let versions = self.registry.list_versions(name).ok()?;
        versions
            .iter()
            .filter_map(|v| parse_strict_version(v))
            .max()
            .map(|v: Version| v.to_string())
    }
}

impl CveScanner for AuditScanner {
    fn scan(&self, dep: &DependencyMeta) -> Result<ScanReport> {
        let report = self.audit_report()?;

        for advisory in report.advisories.values() {
            if advisory.module_name != dep.name {
                continue;
            }

            let severity = match advisory.severity.as_str() {
                "high" => Severity::High,
                "critical" => Severity::Critical,
                _ => continue,
            };

            // A patched range the current version predates means the fix
            // already shipped; report it as an upgrade target instead.
            if let Some(patched) = advisory.patched_versions.as_deref() {
                let already_patched = parse_range(patched)
                    .ok()
                    .zip(parse_strict_version(&dep.version))
                    .map(|(range, current)| range.matches(&current))
                    .unwrap_or(false);

                if !already_patched {
                    if let Some(fixed_version) = self.latest_version(&dep.name) {
                        return Ok(ScanReport {
                            severity: Severity::Fixed,
                            fixed_version: Some(fixed_version),
                        });
                    }
                }
            }

            return Ok(ScanReport {
                severity,
                fixed_version: None,
            });
        }

        debug!("No advisory for '{}'", dep.name);
        Ok(ScanReport::none())
    }

    fn is_deprecated(&self, name: &str, version: &str) -> Result<bool> {
        let metadata = self.registry.fetch_metadata(name)?;
        Ok(metadata
            .versions
            .get(version)
            .map(|info| info.deprecated.is_some())
            .unwrap_or(false))
    }
}
