// src/project/ignore.rs

//! Ignore-list parsing
//!
//! The ignore file is a line-oriented list of package names exempt from
//! automated removal. Both Unix and Windows line endings are accepted;
//! blank lines and surrounding whitespace are stripped.

use crate::error::Result;
use std::path::Path;
use tracing::debug;

/// Parse ignore-list content into an ordered list of package names
pub fn parse_ignore_list(data: &str) -> Vec<String> {
    data.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the ignore file at `path`; a missing file yields an empty list
pub fn read_ignore_file(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        debug!("No ignore file at {}", path.display());
        return Ok(Vec::new());
    }

    let data = std::fs::read_to_string(path)?;
    Ok(parse_ignore_list(&data))
}
