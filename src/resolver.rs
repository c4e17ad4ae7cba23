// src/resolver.rs

//! Version-range conflict resolution
//!
//! For every package the resolver gathers all declared constraints (the
//! manifest's three sections, plus the peer constraints declared by the
//! concrete resolved version of each direct dependency) and computes one
//! version per package satisfying the intersection. When the intersection
//! is empty it retries with only the user's own direct declarations and
//! records a conflict entry; a package that still has no satisfying
//! version marks the whole result unresolvable.

use crate::error::{Error, Result};
use crate::project::manifest::{Manifest, Section};
use crate::registry::Registry;
use rayon::prelude::*;
use semver::{Version, VersionReq};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Parse a version string, accepting only strict `major.minor.patch`
pub fn parse_strict_version(version: &str) -> Option<Version> {
    let parsed = Version::parse(version.trim()).ok()?;
    if !parsed.pre.is_empty() || !parsed.build.is_empty() {
        return None;
    }
    Some(parsed)
}

/// Parse an npm-style range into a `VersionReq`
///
/// npm separates AND-ed comparators with spaces and treats a bare version
/// as an exact pin, so spaces become commas and a leading digit gets an
/// equals operator. Caret and tilde carry the same meaning in both worlds.
pub fn parse_range(range: &str) -> Result<VersionReq> {
    let trimmed = range.trim();
    if trimmed.is_empty() || trimmed == "*" || trimmed == "latest" {
        return Ok(VersionReq::STAR);
    }

    let comparators: Vec<String> = trimmed
        .split_whitespace()
        .map(|part| {
            let bare = part.chars().next().is_some_and(|c| c.is_ascii_digit());
            let wildcard = part.contains(['x', 'X', '*']);
            if bare && !wildcard {
                format!("={}", part)
            } else {
                part.to_string()
            }
        })
        .collect();

    VersionReq::parse(&comparators.join(", "))
        .map_err(|e| Error::InvalidRecord(format!("unparsable range '{}': {}", range, e)))
}

/// Where a constraint was declared
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintSource {
    /// One of the manifest's own sections
    Direct(Section),
    /// Peer requirement declared by the named direct dependency
    Peer(String),
}

impl ConstraintSource {
    pub fn is_direct(&self) -> bool {
        matches!(self, ConstraintSource::Direct(_))
    }
}

/// A single version-range constraint on a package
#[derive(Debug, Clone)]
pub struct Constraint {
    pub range: String,
    pub req: VersionReq,
    pub source: ConstraintSource,
}

/// Conflict entry for a package resolved only after relaxation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    /// The full original constraint set
    pub current: String,
    /// Range the relaxed recommendation satisfies
    pub suggested_range: String,
    /// Human-readable manifest edit
    pub suggestion: String,
}

/// Aggregate resolution result
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    pub recommended: BTreeMap<String, String>,
    pub conflicts: BTreeMap<String, Conflict>,
    pub unresolvable: Vec<String>,
}

impl Resolution {
    /// Whether the recommended set may be written back to the manifest
    pub fn clean(&self) -> bool {
        self.conflicts.is_empty() && self.unresolvable.is_empty()
    }
}

pub struct ConflictResolver<'a> {
    registry: &'a dyn Registry,
}

impl<'a> ConflictResolver<'a> {
    pub fn new(registry: &'a dyn Registry) -> Self {
        Self { registry }
    }

    /// Gather every constraint declared for every package
    ///
    /// Transitive peers come from the concrete version each direct
    /// dependency resolves to against the registry; a metadata fetch
    /// failure drops that dependency's peers with a log, not the batch.
    fn collect_constraints(&self, manifest: &Manifest) -> BTreeMap<String, Vec<Constraint>> {
        let mut constraints: BTreeMap<String, Vec<Constraint>> = BTreeMap::new();

        for (section, name, range) in manifest.all_declarations() {
            match parse_range(range) {
                Ok(req) => constraints.entry(name.to_string()).or_default().push(Constraint {
                    range: range.to_string(),
                    req,
                    source: ConstraintSource::Direct(section),
                }),
                Err(e) => warn!("Skipping declaration {} {}: {}", name, range, e),
            }
        }

        let peers: Vec<(String, BTreeMap<String, String>)> = manifest
            .dependencies
            .par_iter()
            .filter_map(|(name, range)| {
                let req = parse_range(range).ok()?;
                let metadata = match self.registry.fetch_metadata(name) {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        warn!("Metadata fetch failed for '{}': {}", name, e);
                        return None;
                    }
                };

                // Concrete version this declaration resolves to
                let resolved = metadata
                    .versions
                    .keys()
                    .filter_map(|v| parse_strict_version(v))
                    .filter(|v| req.matches(v))
                    .max()?;

                let info = metadata.versions.get(&resolved.to_string())?;
                if info.peer_dependencies.is_empty() {
                    return None;
                }
                Some((name.clone(), info.peer_dependencies.clone()))
            })
            .collect();

        for (origin, peer_map) in peers {
            for (peer_name, peer_range) in peer_map {
                match parse_range(&peer_range) {
                    Ok(req) => {
                        constraints.entry(peer_name).or_default().push(Constraint {
                            range: peer_range,
                            req,
                            source: ConstraintSource::Peer(origin.clone()),
                        });
                    }
                    Err(e) => warn!("Skipping peer range from '{}': {}", origin, e),
                }
            }
        }

        constraints
    }

    /// Resolve one package against its collected constraints
    fn resolve_package(&self, name: &str, constraints: &[Constraint]) -> PackageOutcome {
        let published = match self.registry.list_versions(name) {
            Ok(versions) => versions,
            Err(e) => {
                warn!("Version list fetch failed for '{}': {}", name, e);
                Vec::new()
            }
        };

        let candidates: Vec<Version> = published
            .iter()
            .filter_map(|v| parse_strict_version(v))
            .collect();

        // Highest version satisfying every constraint
        if let Some(best) = candidates
            .iter()
            .filter(|v| constraints.iter().all(|c| c.req.matches(v)))
            .max()
        {
            return PackageOutcome::Resolved(best.to_string());
        }

        // Relax: keep only the user's own direct declarations and retry
        let direct: Vec<&Constraint> = constraints.iter().filter(|c| c.source.is_direct()).collect();
        if let Some(best) = candidates
            .iter()
            .filter(|v| direct.iter().all(|c| c.req.matches(v)))
            .max()
        {
            let current = constraints
                .iter()
                .map(|c| c.range.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            let suggested_range = format!("^{}", best);

            return PackageOutcome::Conflicted {
                version: best.to_string(),
                conflict: Conflict {
                    current,
                    suggested_range: suggested_range.clone(),
                    suggestion: format!(
                        "Set \"{}\": \"{}\" in dependencies and align peer declarations",
                        name, suggested_range
                    ),
                },
            };
        }

        PackageOutcome::Unresolvable
    }

    /// Resolve every constrained package
    pub fn resolve(&self, manifest: &Manifest) -> Resolution {
        let constraints = self.collect_constraints(manifest);
        debug!("Resolving {} constrained packages", constraints.len());

        let outcomes: Vec<(String, PackageOutcome)> = constraints
            .par_iter()
            .map(|(name, list)| (name.clone(), self.resolve_package(name, list)))
            .collect();

        let mut resolution = Resolution::default();
        for (name, outcome) in outcomes {
            match outcome {
                PackageOutcome::Resolved(version) => {
                    resolution.recommended.insert(name, version);
                }
                PackageOutcome::Conflicted { version, conflict } => {
                    resolution.recommended.insert(name.clone(), version);
                    resolution.conflicts.insert(name, conflict);
                }
                PackageOutcome::Unresolvable => resolution.unresolvable.push(name),
            }
        }

        resolution
    }
}

enum PackageOutcome {
    Resolved(String),
    Conflicted { version: String, conflict: Conflict },
    Unresolvable,
}
