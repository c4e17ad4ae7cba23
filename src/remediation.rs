// src/remediation.rs

//! Vulnerability remediation policy
//!
//! Applies the per-dependency decision table over a scan report: local
//! pointers are dropped outright, high/critical findings trigger a secure
//! downgrade, fixed findings trigger an upgrade, and locked records are
//! never overridden. Scanning counts as activity, so every scanned record
//! gets its timestamp refreshed; a scan failure skips the item and the
//! batch continues.

use crate::error::Result;
use crate::scanner::{CveScanner, Severity};
use crate::store::DependencyStore;
use tracing::{error, info, warn};

/// Outcome counts and names for one remediation pass
#[derive(Debug, Clone, Default)]
pub struct RemediationSummary {
    pub scanned: usize,
    pub downgraded: Vec<String>,
    pub upgraded: Vec<String>,
    pub removed_local: Vec<String>,
    pub warnings: Vec<String>,
    pub failures: Vec<String>,
}

impl RemediationSummary {
    pub fn found_vulnerabilities(&self) -> bool {
        !self.downgraded.is_empty() || !self.upgraded.is_empty() || !self.warnings.is_empty()
    }
}

/// Compute the secure downgrade for a version string
///
/// Reduces the minor component by one, keeping major and patch; a minor
/// already at zero leaves the version unchanged. Versions missing a patch
/// component are completed with `.0`, so `"1.2"` becomes `"1.1.0"`.
pub fn secure_downgrade(current: &str) -> String {
    let parts: Vec<&str> = current.split('.').collect();
    if parts.len() < 2 {
        return current.to_string();
    }

    let major = parts[0];
    let Ok(mut minor) = parts[1].parse::<u64>() else {
        return current.to_string();
    };
    let patch = parts.get(2).copied().unwrap_or("0");

    if minor > 0 {
        minor -= 1;
    }

    format!("{}.{}.{}", major, minor, patch)
}

/// Run the remediation pass over every stored dependency
pub fn remediate(
    store: &mut DependencyStore,
    scanner: &dyn CveScanner,
    now_ms: i64,
) -> Result<RemediationSummary> {
    let mut summary = RemediationSummary::default();

    for name in store.names() {
        let Some(dep) = store.get(&name) else {
            continue;
        };

        if dep.is_local() {
            info!("Local dependency pointer detected for '{}'; removing immediately", name);
            store.remove(&name)?;
            summary.removed_local.push(name);
            continue;
        }

        let locked = dep.is_locked();
        let report = match scanner.scan(dep.meta()) {
            Ok(report) => report,
            Err(e) => {
                error!("Error scanning '{}': {}", name, e);
                summary.failures.push(name);
                continue;
            }
        };
        summary.scanned += 1;

        let new_version = match report.severity {
            Severity::High | Severity::Critical => {
                let target = secure_downgrade(dep.version());
                if locked {
                    warn!("Dependency '{}' is read-only; cannot downgrade", name);
                    summary.warnings.push(name.clone());
                    None
                } else {
                    info!(
                        "High/critical vulnerability in '{}'; downgrading {} -> {}",
                        name,
                        dep.version(),
                        target
                    );
                    summary.downgraded.push(name.clone());
                    Some(target)
                }
            }
            Severity::Fixed => match report.fixed_version {
                Some(fixed) if !locked => {
                    info!(
                        "Vulnerability fixed for '{}'; upgrading {} -> {}",
                        name,
                        dep.version(),
                        fixed
                    );
                    summary.upgraded.push(name.clone());
                    Some(fixed)
                }
                Some(_) => {
                    warn!("Dependency '{}' is read-only; cannot upgrade", name);
                    summary.warnings.push(name.clone());
                    None
                }
                None => None,
            },
            Severity::None => None,
        };

        store.update(&name, |dep| {
            let mut dep = match new_version {
                Some(version) => match dep.set_version(version, true) {
                    Ok(updated) => updated,
                    // Lock state changed underneath us; keep it intact
                    Err(kept) => kept,
                },
                None => dep,
            };
            dep.touch(now_ms);
            dep
        })?;
    }

    Ok(summary)
}
