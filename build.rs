// build.rs

use clap::{Arg, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn build_cli() -> Command {
    Command::new("depwarden")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Depwarden Contributors")
        .about("Automated dependency hygiene with access-controlled records")
        .subcommand_required(false)
        .arg(
            Arg::new("root")
                .short('r')
                .long("root")
                .default_value(".")
                .help("Project root directory"),
        )
        .subcommand(Command::new("init").about("Initialize dependency records from the manifest"))
        .subcommand(
            Command::new("check")
                .about("Run the check pipeline (prune, CVE scan, conflict resolution, lock)"),
        )
        .subcommand(
            Command::new("install")
                .about("Run a manifest-only install after the check pipeline")
                .arg(
                    Arg::new("args")
                        .long("args")
                        .num_args(0..)
                        .help("Additional install arguments (refused by policy)"),
                ),
        )
        .subcommand(Command::new("build").about("Build the project after the check pipeline"))
        .subcommand(
            Command::new("clean-install")
                .about("Clean-install from the lockfile after the check pipeline"),
        )
        .subcommand(
            Command::new("add")
                .about("Add a new dependency (maintainers only)")
                .arg(Arg::new("name").required(true).help("Package name"))
                .arg(Arg::new("version").required(true).help("Exact version to register")),
        )
        .subcommand(
            Command::new("remove")
                .about("Remove a dependency (maintainers only)")
                .arg(Arg::new("name").required(true).help("Package name")),
        )
        .subcommand(
            Command::new("allowed-versions")
                .about("Show the most recent allowed versions for a dependency")
                .arg(Arg::new("name").required(true).help("Package name")),
        )
        .subcommand(
            Command::new("resolve").about("Resolve version-range conflicts across declarations"),
        )
        .subcommand(Command::new("start").about("Start the application"))
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory
    let out_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = out_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    // Generate main man page
    let cmd = build_cli();
    let man = Man::new(cmd);
    let mut buffer = Vec::new();
    man.render(&mut buffer)
        .expect("Failed to render man page");

    let man_path = man_dir.join("depwarden.1");
    fs::write(&man_path, buffer).expect("Failed to write man page");

    println!("cargo:warning=Man page generated at {}", man_path.display());
}
