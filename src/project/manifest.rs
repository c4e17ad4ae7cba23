// src/project/manifest.rs

//! Project manifest reader/writer
//!
//! The manifest is the project's declarative dependency file: name,
//! author, and the three version-range sections. Unknown fields round-trip
//! untouched so a write-back never destroys scripts, engines, and friends.

use crate::error::{Error, Result};
use crate::project::write_atomic;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dev_dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub peer_dependencies: BTreeMap<String, String>,
    /// Everything else in the file, preserved verbatim on write-back
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Manifest {
    /// All declared sections flattened to (section, name, range) triples
    pub fn all_declarations(&self) -> impl Iterator<Item = (Section, &str, &str)> {
        let direct = self
            .dependencies
            .iter()
            .map(|(name, range)| (Section::Dependencies, name.as_str(), range.as_str()));
        let dev = self
            .dev_dependencies
            .iter()
            .map(|(name, range)| (Section::DevDependencies, name.as_str(), range.as_str()));
        let peer = self
            .peer_dependencies
            .iter()
            .map(|(name, range)| (Section::PeerDependencies, name.as_str(), range.as_str()));
        direct.chain(dev).chain(peer)
    }

    /// Range declared for `name` in the direct dependencies section
    pub fn declared_version(&self, name: &str) -> Option<&str> {
        self.dependencies.get(name).map(String::as_str)
    }
}

/// Manifest section a declaration came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Dependencies,
    DevDependencies,
    PeerDependencies,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Section::Dependencies => "dependencies",
            Section::DevDependencies => "devDependencies",
            Section::PeerDependencies => "peerDependencies",
        }
    }
}

/// Reader/writer contract for the manifest
pub trait ManifestSource {
    fn read(&self) -> Result<Manifest>;
    fn write(&self, manifest: &Manifest) -> Result<()>;
}

/// Manifest stored as `package.json` under the project root
pub struct FsManifest {
    path: PathBuf,
}

impl FsManifest {
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join("package.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ManifestSource for FsManifest {
    fn read(&self) -> Result<Manifest> {
        let data = std::fs::read_to_string(&self.path)
            .map_err(|e| Error::InvalidManifest(format!("{}: {}", self.path.display(), e)))?;

        serde_json::from_str(&data)
            .map_err(|e| Error::InvalidManifest(format!("{}: {}", self.path.display(), e)))
    }

    fn write(&self, manifest: &Manifest) -> Result<()> {
        let mut json = serde_json::to_string_pretty(manifest)?;
        json.push('\n');

        write_atomic(&self.path, &json)?;
        debug!("Wrote manifest to {}", self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "name": "demo-app",
        "author": "alice",
        "dependencies": { "lodash": "^4.17.0" },
        "devDependencies": { "jest": "~29.0.0" },
        "peerDependencies": { "react": ">=17" },
        "scripts": { "build": "tsc" }
    }"#;

    #[test]
    fn test_read_manifest_sections() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), SAMPLE).unwrap();

        let manifest = FsManifest::new(dir.path()).read().unwrap();
        assert_eq!(manifest.author.as_deref(), Some("alice"));
        assert_eq!(manifest.dependencies["lodash"], "^4.17.0");
        assert_eq!(manifest.dev_dependencies["jest"], "~29.0.0");
        assert_eq!(manifest.peer_dependencies["react"], ">=17");
    }

    #[test]
    fn test_missing_manifest_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let result = FsManifest::new(dir.path()).read();
        assert!(matches!(result, Err(Error::InvalidManifest(_))));
    }

    #[test]
    fn test_unparsable_manifest_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), "{ nope").unwrap();

        let result = FsManifest::new(dir.path()).read();
        assert!(matches!(result, Err(Error::InvalidManifest(_))));
    }

    #[test]
    fn test_write_back_preserves_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), SAMPLE).unwrap();

        let source = FsManifest::new(dir.path());
        let mut manifest = source.read().unwrap();
        manifest
            .dependencies
            .insert("lodash".to_string(), "4.17.21".to_string());
        source.write(&manifest).unwrap();

        let reread = source.read().unwrap();
        assert_eq!(reread.dependencies["lodash"], "4.17.21");
        assert!(reread.extra.contains_key("scripts"));
    }

    #[test]
    fn test_all_declarations_covers_every_section() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("package.json"), SAMPLE).unwrap();

        let manifest = FsManifest::new(dir.path()).read().unwrap();
        let declarations: Vec<_> = manifest.all_declarations().collect();
        assert_eq!(declarations.len(), 3);
        assert!(declarations
            .iter()
            .any(|(section, name, _)| *section == Section::PeerDependencies && *name == "react"));
    }
}
