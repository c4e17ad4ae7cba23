// src/identity.rs

//! Acting-user identity and maintainer status
//!
//! Maintainer status is derived once, at construction, by comparing the
//! identity name against the manifest's declared author. The value is
//! immutable for the identity's lifetime; a new session builds a new one.

use crate::project::manifest::Manifest;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct Identity {
    name: String,
    is_maintainer: bool,
}

impl Identity {
    /// Build an identity with an externally supplied maintainer flag
    pub fn new(name: impl Into<String>, is_maintainer: bool) -> Self {
        Self {
            name: name.into(),
            is_maintainer,
        }
    }

    /// Derive maintainer status from the manifest's author field
    ///
    /// A manifest without an author never grants maintainer status.
    pub fn resolve(name: impl Into<String>, manifest: &Manifest) -> Self {
        let name = name.into();

        let is_maintainer = match manifest.author.as_deref() {
            Some(author) => author == name,
            None => {
                warn!("Manifest has no author field; '{}' is not the maintainer", name);
                false
            }
        };

        Self {
            name,
            is_maintainer,
        }
    }

    /// Resolve the current user name from the environment
    ///
    /// `DEPWARDEN_USER` wins over `USER`; a bare fallback keeps the CLI
    /// usable in stripped-down environments.
    pub fn current_user_name() -> String {
        std::env::var("DEPWARDEN_USER")
            .or_else(|_| std::env::var("USER"))
            .unwrap_or_else(|_| "maintainer".to_string())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_maintainer(&self) -> bool {
        self.is_maintainer
    }
}
