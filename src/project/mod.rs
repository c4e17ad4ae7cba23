// src/project/mod.rs

//! Project file collaborators
//!
//! Everything Depwarden reads from or writes to the project directory lives
//! behind the interfaces in this module:
//! - the manifest (`package.json`)
//! - the ignore list (`.dwignore`)
//! - the dependency record file (`.depwarden/dependencies.json`)

pub mod depfile;
pub mod ignore;
pub mod manifest;

pub use depfile::{DependencyFile, FsDependencyFile};
pub use ignore::{parse_ignore_list, read_ignore_file};
pub use manifest::{FsManifest, Manifest, ManifestSource};

use crate::error::Result;
use std::fs;
use std::path::Path;

/// Atomically write `data` to `path` via a sibling temp file and rename
pub(crate) fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension("tmp");
    fs::write(&temp_path, data)?;
    fs::rename(&temp_path, path)?;
    Ok(())
}
