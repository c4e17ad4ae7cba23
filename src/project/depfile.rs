// src/project/depfile.rs

//! Dependency record-file persistence
//!
//! Records are kept in `.depwarden/dependencies.json` under the project
//! root, separate from the manifest. Writes are atomic so a concurrently
//! starting process never observes a partial file.

use crate::error::Result;
use crate::project::write_atomic;
use crate::store::record::DependencyRecord;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Reader/writer contract for the record file
pub trait DependencyFile {
    fn read(&self) -> Result<Vec<DependencyRecord>>;
    fn write(&self, records: &[DependencyRecord]) -> Result<()>;
}

/// Record file stored under `<root>/.depwarden/dependencies.json`
pub struct FsDependencyFile {
    path: PathBuf,
}

impl FsDependencyFile {
    pub fn new(root: &Path) -> Self {
        Self {
            path: root.join(".depwarden").join("dependencies.json"),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DependencyFile for FsDependencyFile {
    fn read(&self) -> Result<Vec<DependencyRecord>> {
        if !self.path.exists() {
            debug!("No record file at {}", self.path.display());
            return Ok(Vec::new());
        }

        let data = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&data)?)
    }

    fn write(&self, records: &[DependencyRecord]) -> Result<()> {
        let mut json = serde_json::to_string_pretty(records)?;
        json.push('\n');

        write_atomic(&self.path, &json)?;
        debug!("Wrote {} records to {}", records.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::record::Dependency;

    #[test]
    fn test_missing_file_reads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = FsDependencyFile::new(dir.path());
        assert!(file.read().unwrap().is_empty());
    }

    #[test]
    fn test_round_trip_preserves_name_version_pairs() {
        let dir = tempfile::tempdir().unwrap();
        let file = FsDependencyFile::new(dir.path());

        let records: Vec<DependencyRecord> = [
            Dependency::new("lodash", "4.17.21", 100).lock(),
            Dependency::new("react", "18.2.0", 200),
        ]
        .iter()
        .map(DependencyRecord::from)
        .collect();

        file.write(&records).unwrap();
        let reread = file.read().unwrap();

        let pairs: Vec<(String, String)> = reread
            .iter()
            .map(|r| (r.name.clone(), r.version.clone()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("lodash".to_string(), "4.17.21".to_string()),
                ("react".to_string(), "18.2.0".to_string())
            ]
        );
        assert!(reread[0].read_only);
        assert!(!reread[1].read_only);
    }

    #[test]
    fn test_write_creates_tool_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let file = FsDependencyFile::new(dir.path());
        file.write(&[]).unwrap();
        assert!(dir.path().join(".depwarden").join("dependencies.json").exists());
    }
}
