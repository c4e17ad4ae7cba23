// src/store/mod.rs

//! Dependency store
//!
//! A keyed collection of dependency records persisted through the injected
//! record file on every mutation. The store enforces the protection rules:
//! lock-on-insert for explicit adds, no new inserts of ignored names, and
//! ignored-but-manifest-declared names are never silently dropped from the
//! persisted set.

pub mod record;

use crate::error::{Error, Result};
use crate::project::depfile::DependencyFile;
use record::{Dependency, DependencyRecord};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, warn};

pub struct DependencyStore {
    entries: BTreeMap<String, Dependency>,
    ignore: BTreeSet<String>,
    /// Manifest declarations captured at the last sync, name -> range
    manifest_pins: BTreeMap<String, String>,
    file: Box<dyn DependencyFile>,
}

impl DependencyStore {
    /// Load the store from the record file
    ///
    /// Records with an empty name are skipped with a warning rather than
    /// poisoning the whole load.
    pub fn load(
        file: Box<dyn DependencyFile>,
        ignore: impl IntoIterator<Item = String>,
    ) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for record in file.read()? {
            if record.name.is_empty() {
                warn!("Skipping persisted record with empty name");
                continue;
            }
            entries.insert(record.name.clone(), Dependency::from(record));
        }

        Ok(Self {
            entries,
            ignore: ignore.into_iter().collect(),
            manifest_pins: BTreeMap::new(),
            file,
        })
    }

    /// Remember the manifest declarations backing the ignore protection
    pub fn set_manifest_pins(&mut self, pins: BTreeMap<String, String>) {
        self.manifest_pins = pins;
    }

    pub fn is_ignored(&self, name: &str) -> bool {
        self.ignore.contains(name)
    }

    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Explicitly register a dependency; locks on insert
    ///
    /// Returns false (with a log) when the name already exists or is
    /// ignored. An empty name is a hard error.
    pub fn insert(&mut self, dep: Dependency) -> Result<bool> {
        if dep.name().is_empty() {
            return Err(Error::InvalidRecord("dependency name is empty".to_string()));
        }

        if self.is_ignored(dep.name()) {
            warn!("'{}' is on the ignore list; not inserting", dep.name());
            return Ok(false);
        }

        if self.entries.contains_key(dep.name()) {
            info!("Dependency '{}' already exists", dep.name());
            return Ok(false);
        }

        let dep = dep.lock();
        info!(
            "Dependency '{}' added with version {} as read-only",
            dep.name(),
            dep.version()
        );
        self.entries.insert(dep.name().to_string(), dep);
        self.save()
    }

    /// Bulk add from a manifest sync; entries stay mutable
    ///
    /// This is the remediation window: synced records are only locked by
    /// the final step of the check pipeline. Existing names are no-ops, so
    /// re-syncing an unchanged manifest adds nothing. Returns how many
    /// entries were genuinely new.
    pub fn sync_entries(&mut self, deps: Vec<Dependency>) -> Result<usize> {
        let mut added = 0;
        for dep in deps {
            if dep.name().is_empty() {
                return Err(Error::InvalidRecord("dependency name is empty".to_string()));
            }
            if self.is_ignored(dep.name()) {
                warn!("'{}' is on the ignore list; not inserting", dep.name());
                continue;
            }
            if self.entries.contains_key(dep.name()) {
                debug!("Dependency '{}' already exists", dep.name());
                continue;
            }
            self.entries.insert(dep.name().to_string(), dep);
            added += 1;
        }

        if added > 0 {
            self.save()?;
        }
        Ok(added)
    }

    /// Remove a dependency by name
    pub fn remove(&mut self, name: &str) -> Result<()> {
        if self.entries.remove(name).is_none() {
            return Err(Error::NotFound(name.to_string()));
        }
        info!("Dependency '{}' removed", name);
        self.save().map(|_| ())
    }

    /// Apply a state transition to one entry and persist
    ///
    /// The closure receives the owned value and returns its successor, so
    /// the mutable/locked conversion rules of [`Dependency`] apply.
    pub fn update<F>(&mut self, name: &str, f: F) -> Result<()>
    where
        F: FnOnce(Dependency) -> Dependency,
    {
        let dep = self
            .entries
            .remove(name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        self.entries.insert(name.to_string(), f(dep));
        self.save().map(|_| ())
    }

    /// Remove every entry matching the predicate; returns removed names
    pub fn prune<F>(&mut self, predicate: F) -> Result<Vec<String>>
    where
        F: Fn(&Dependency) -> bool,
    {
        let doomed: Vec<String> = self
            .entries
            .values()
            .filter(|dep| predicate(dep))
            .map(|dep| dep.name().to_string())
            .collect();

        for name in &doomed {
            self.entries.remove(name);
        }

        if !doomed.is_empty() {
            self.save()?;
        }
        Ok(doomed)
    }

    /// Lock every currently-unlocked dependency; returns how many changed
    pub fn lock_all(&mut self) -> Result<usize> {
        let unlocked: Vec<String> = self
            .entries
            .values()
            .filter(|dep| !dep.is_locked())
            .map(|dep| dep.name().to_string())
            .collect();

        for name in &unlocked {
            if let Some(dep) = self.entries.remove(name) {
                self.entries.insert(name.clone(), dep.lock());
            }
        }

        if !unlocked.is_empty() {
            info!("Locked {} dependencies", unlocked.len());
            self.save()?;
        }
        Ok(unlocked.len())
    }

    /// Snapshot of all entries, name-ordered
    pub fn all(&self) -> Vec<Dependency> {
        self.entries.values().cloned().collect()
    }

    /// Persist the current set through the record file
    ///
    /// Enforced here on every write: an ignored name that the manifest
    /// declares is re-added from the manifest's own record rather than
    /// being allowed to disappear.
    fn save(&mut self) -> Result<bool> {
        for name in &self.ignore {
            if self.entries.contains_key(name) {
                continue;
            }
            if let Some(range) = self.manifest_pins.get(name) {
                warn!(
                    "Ignored dependency '{}' missing from store; restoring from manifest",
                    name
                );
                let restored = Dependency::new(name.clone(), range.clone(), now_ms()).lock();
                self.entries.insert(name.clone(), restored);
            }
        }

        let records: Vec<DependencyRecord> =
            self.entries.values().map(DependencyRecord::from).collect();
        self.file.write(&records)?;
        Ok(true)
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
