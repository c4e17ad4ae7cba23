// src/error.rs

use thiserror::Error;

/// Core error types for Depwarden
#[derive(Error, Debug)]
pub enum Error {
    /// Command type not in the closed command set
    #[error("No such command: {0}")]
    UnknownCommand(String),

    /// Protected command attempted by a non-maintainer identity
    #[error("Command '{command}' is restricted to the package maintainer")]
    RestrictedAccess { command: String },

    /// Mutation targeting a dependency name absent from the store
    #[error("Dependency '{0}' not found")]
    NotFound(String),

    /// Requested version outside the allowed-version window
    #[error("Version {version} of '{name}' is outside the allowed window: {allowed:?}")]
    VersionNotAllowed {
        name: String,
        version: String,
        allowed: Vec<String>,
    },

    /// Manifest missing or unparsable
    #[error("Invalid or missing manifest: {0}")]
    InvalidManifest(String),

    /// Configuration file present but unparsable
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A dependency record violates a store invariant
    #[error("Invalid dependency record: {0}")]
    InvalidRecord(String),

    /// Conflict resolver found no satisfying version even after relaxation
    #[error("Conflicting declarations, cannot resolve: {0:?}")]
    UnresolvableConflict(Vec<String>),

    /// Operation refused by policy
    #[error("Operation blocked: {0}")]
    OperationBlocked(String),

    /// Registry fetch failure (transient)
    #[error("Registry error: {0}")]
    Registry(String),

    /// Subprocess exceeded its configured timeout
    #[error("Subprocess '{command}' timed out after {secs}s")]
    ProcessTimeout { command: String, secs: u64 },

    /// Subprocess spawn or exit failure
    #[error("Subprocess error: {0}")]
    Process(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias using Depwarden's Error type
pub type Result<T> = std::result::Result<T, Error>;
