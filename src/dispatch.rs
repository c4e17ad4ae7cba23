// src/dispatch.rs

//! Command dispatch
//!
//! The single entry point for every operation. The command set is a closed
//! enum partitioned into common and protected halves; the handler mapping
//! is an exhaustive match, so an unknown-but-well-typed command cannot
//! exist. `Command::from_name` is the runtime guard for string-typed
//! callers, and it keeps the unknown-command message distinct from the
//! restricted-access one.

use crate::error::{Error, Result};
use crate::lifecycle::{CheckReport, Warden};
use crate::resolver::Resolution;
use tracing::debug;

/// Permission class of a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Executable by any identity
    Common,
    /// Requires the maintainer identity
    Protected,
}

/// The closed command set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Init,
    Check,
    Resolve,
    Install { args: Vec<String> },
    CleanInstall,
    Build,
    Start,
    AllowedVersions { name: String },
    ChangeVersion { name: String, version: String },
    Add { name: String, version: String },
    Remove { name: String },
    Replace { name: String, version: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Init => "init",
            Command::Check => "check",
            Command::Resolve => "resolve",
            Command::Install { .. } => "install",
            Command::CleanInstall => "clean-install",
            Command::Build => "build",
            Command::Start => "start",
            Command::AllowedVersions { .. } => "allowed-versions",
            Command::ChangeVersion { .. } => "change-version",
            Command::Add { .. } => "add",
            Command::Remove { .. } => "remove",
            Command::Replace { .. } => "replace",
        }
    }

    pub fn kind(&self) -> CommandKind {
        match self {
            Command::Add { .. } | Command::Remove { .. } | Command::Replace { .. } => {
                CommandKind::Protected
            }
            _ => CommandKind::Common,
        }
    }

    /// Build a command from its string name and positional arguments
    ///
    /// This is the runtime unknown-type guard for embedding callers that
    /// carry command names as strings; typed callers construct variants
    /// directly.
    pub fn from_name(name: &str, args: &[String]) -> Result<Self> {
        let arg = |index: usize| -> Result<String> {
            args.get(index).cloned().ok_or_else(|| {
                Error::OperationBlocked(format!("command '{}' is missing argument {}", name, index + 1))
            })
        };

        match name {
            "init" => Ok(Command::Init),
            "check" => Ok(Command::Check),
            "resolve" => Ok(Command::Resolve),
            "install" => Ok(Command::Install {
                args: args.to_vec(),
            }),
            "clean-install" => Ok(Command::CleanInstall),
            "build" => Ok(Command::Build),
            "start" => Ok(Command::Start),
            "allowed-versions" => Ok(Command::AllowedVersions { name: arg(0)? }),
            "change-version" => Ok(Command::ChangeVersion {
                name: arg(0)?,
                version: arg(1)?,
            }),
            "add" => Ok(Command::Add {
                name: arg(0)?,
                version: arg(1)?,
            }),
            "remove" => Ok(Command::Remove { name: arg(0)? }),
            "replace" => Ok(Command::Replace {
                name: arg(0)?,
                version: arg(1)?,
            }),
            other => Err(Error::UnknownCommand(other.to_string())),
        }
    }
}

/// What a handled command produced
#[derive(Debug)]
pub enum Outcome {
    Done,
    Synced(usize),
    Report(CheckReport),
    Versions(Vec<String>),
    Resolution(Resolution),
    ExitCode(i32),
}

/// Validates, authorizes, and routes commands to the lifecycle layer
pub struct Dispatcher {
    warden: Warden,
}

impl Dispatcher {
    pub fn new(warden: Warden) -> Self {
        Self { warden }
    }

    pub fn warden(&self) -> &Warden {
        &self.warden
    }

    pub fn handle(&mut self, command: Command) -> Result<Outcome> {
        if std::env::var("DEPWARDEN_DEBUG").is_ok() {
            debug!("Dispatching {}: {:?}", command.name(), command);
        }

        if command.kind() == CommandKind::Protected && !self.warden.identity().is_maintainer() {
            return Err(Error::RestrictedAccess {
                command: command.name().to_string(),
            });
        }

        match command {
            Command::Init => self.warden.init().map(Outcome::Synced),
            Command::Check => self.warden.common_check().map(Outcome::Report),
            Command::Resolve => self.warden.resolve_conflicts().map(Outcome::Resolution),
            Command::Install { args } => self.warden.install(&args).map(Outcome::ExitCode),
            Command::CleanInstall => self.warden.clean_install().map(Outcome::ExitCode),
            Command::Build => self.warden.build().map(Outcome::ExitCode),
            Command::Start => self.warden.start().map(Outcome::ExitCode),
            Command::AllowedVersions { name } => {
                self.warden.allowed_versions(&name).map(Outcome::Versions)
            }
            Command::ChangeVersion { name, version } => self
                .warden
                .change_to_allowed_version(&name, &version)
                .map(Outcome::Report),
            Command::Add { name, version } => {
                self.warden.add(&name, &version).map(Outcome::Report)
            }
            Command::Remove { name } => self.warden.remove(&name).map(Outcome::Report),
            Command::Replace { name, version } => {
                self.warden.replace(&name, &version).map(Outcome::Report)
            }
        }
    }
}
