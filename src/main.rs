// src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use depwarden::config::Config;
use depwarden::dispatch::{Command as WardenCommand, Dispatcher, Outcome};
use depwarden::identity::Identity;
use depwarden::lifecycle::Warden;
use depwarden::process::NpmProcess;
use depwarden::project::{read_ignore_file, FsDependencyFile, FsManifest, ManifestSource};
use depwarden::registry::HttpRegistry;
use depwarden::scanner::AuditScanner;
use depwarden::store::DependencyStore;
use std::path::Path;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "depwarden")]
#[command(author, version, about = "Automated dependency hygiene with access-controlled records", long_about = None)]
struct Cli {
    /// Project root directory
    #[arg(short, long, default_value = ".")]
    root: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize dependency records from the manifest
    Init,
    /// Run the check pipeline (prune, CVE scan, conflict resolution, lock)
    Check,
    /// Run a manifest-only install after the check pipeline
    Install {
        /// Additional install arguments (refused by policy)
        #[arg(long, num_args = 0.., value_delimiter = ' ')]
        args: Vec<String>,
    },
    /// Build the project after the check pipeline
    Build,
    /// Clean-install from the lockfile after the check pipeline
    CleanInstall,
    /// Add a new dependency (maintainers only)
    Add {
        /// Package name
        name: String,
        /// Exact version to register
        version: String,
    },
    /// Remove a dependency (maintainers only)
    Remove {
        /// Package name
        name: String,
    },
    /// Show the most recent allowed versions for a dependency
    AllowedVersions {
        /// Package name
        name: String,
    },
    /// Resolve version-range conflicts across declarations
    Resolve,
    /// Start the application
    Start,
}

impl Commands {
    fn into_command(self) -> WardenCommand {
        match self {
            Commands::Init => WardenCommand::Init,
            Commands::Check => WardenCommand::Check,
            Commands::Install { args } => WardenCommand::Install { args },
            Commands::Build => WardenCommand::Build,
            Commands::CleanInstall => WardenCommand::CleanInstall,
            Commands::Add { name, version } => WardenCommand::Add { name, version },
            Commands::Remove { name } => WardenCommand::Remove { name },
            Commands::AllowedVersions { name } => WardenCommand::AllowedVersions { name },
            Commands::Resolve => WardenCommand::Resolve,
            Commands::Start => WardenCommand::Start,
        }
    }
}

/// Wire the collaborator stack for a project root
fn build_dispatcher(root: &Path) -> Result<Dispatcher> {
    let config = Config::load(root)?;

    let manifest_source = FsManifest::new(root);
    let user = Identity::current_user_name();
    let identity = match manifest_source.read() {
        Ok(manifest) => Identity::resolve(user, &manifest),
        Err(e) => {
            warn!("Cannot establish maintainer status: {}", e);
            Identity::new(user, false)
        }
    };

    let ignore = read_ignore_file(&root.join(".dwignore"))?;
    let store = DependencyStore::load(Box::new(FsDependencyFile::new(root)), ignore)?;

    let registry = HttpRegistry::new(&config.registry_url, config.http_timeout_secs)?;
    let scanner = AuditScanner::new(
        Box::new(NpmProcess::new(
            &config.manager_program,
            config.subprocess_timeout_secs,
        )),
        Box::new(HttpRegistry::new(
            &config.registry_url,
            config.http_timeout_secs,
        )?),
    );
    let process = NpmProcess::new(&config.manager_program, config.subprocess_timeout_secs);

    let warden = Warden::new(
        identity,
        config,
        store,
        Box::new(manifest_source),
        Box::new(registry),
        Box::new(scanner),
        Box::new(process),
    );

    Ok(Dispatcher::new(warden))
}

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        println!("Depwarden v{}", env!("CARGO_PKG_VERSION"));
        println!("Run 'depwarden --help' for usage information");
        return Ok(());
    };

    let root = Path::new(&cli.root);
    let mut dispatcher = build_dispatcher(root)?;

    let command = command.into_command();
    info!("Running '{}'", command.name());

    match dispatcher.handle(command) {
        Ok(Outcome::Done) => Ok(()),
        Ok(Outcome::Synced(added)) => {
            println!("Initialized records; {} new dependencies registered", added);
            Ok(())
        }
        Ok(Outcome::Report(report)) => {
            println!("{}", report);
            Ok(())
        }
        Ok(Outcome::Versions(versions)) => {
            if versions.is_empty() {
                println!("No allowed versions found.");
            } else {
                println!("Allowed versions:");
                for version in versions {
                    println!("  {}", version);
                }
            }
            Ok(())
        }
        Ok(Outcome::Resolution(resolution)) => {
            println!("Recommended versions:");
            for (name, version) in &resolution.recommended {
                println!("  {} {}", name, version);
            }
            if !resolution.conflicts.is_empty() {
                println!("Conflicts (manifest left untouched):");
                for (name, conflict) in &resolution.conflicts {
                    println!("  {}: declared {}", name, conflict.current);
                    println!("    {}", conflict.suggestion);
                }
            }
            Ok(())
        }
        Ok(Outcome::ExitCode(code)) => {
            if code != 0 {
                std::process::exit(code);
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
