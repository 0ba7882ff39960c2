//! Argument parsing: one subcommand per planner operation, plus the
//! read-only `info`/`search`/`list-installed` queries.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "coralpkg", version, about = "A binary package manager", long_about = None)]
pub struct Cli {
    /// Install root (defaults to `/`).
    #[arg(long, global = true, env = "CORALPKG_ROOT", default_value = "/")]
    pub root: PathBuf,

    /// Path to `coralpkg.conf`.
    #[arg(long, global = true, default_value = "/etc/coralpkg/coralpkg.conf")]
    pub config: PathBuf,

    /// Assume "yes" to any confirmation prompt.
    #[arg(short = 'y', long, global = true)]
    pub yes: bool,

    /// Show the plan without applying it.
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Emit machine-readable JSON instead of human-readable text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress progress output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Force ANSI color on or off regardless of TTY detection.
    #[arg(long, global = true)]
    pub color: Option<bool>,

    /// Increase log verbosity (`-v`, `-vv`, `-vvv`).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Downgrade distribution/safety-check failures to warnings.
    #[arg(long, global = true)]
    pub ignore_check: bool,

    /// Downgrade file-ownership conflicts to warnings.
    #[arg(long, global = true)]
    pub ignore_file_conflicts: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Install one or more packages.
    Install {
        names: Vec<String>,
        /// Reinstall even if already at the requested revision.
        #[arg(long)]
        reinstall: bool,
    },
    /// Install from local package archive files.
    InstallFiles { paths: Vec<PathBuf> },
    /// Upgrade all packages, or only the ones named.
    Upgrade { names: Vec<String> },
    /// Remove one or more packages.
    Remove {
        names: Vec<String>,
        /// Also remove now-orphaned automatic dependencies.
        #[arg(long)]
        autoremove: bool,
        /// Remove even if it would break a reverse dependency.
        #[arg(long)]
        force: bool,
    },
    /// Remove every orphaned automatic package.
    RemoveOrphans,
    /// Download packages without installing them.
    Fetch {
        names: Vec<String>,
        #[arg(long, default_value = ".")]
        dir: PathBuf,
    },
    /// Run pending post-install configuration for packages that need it.
    ConfigurePending { names: Vec<String> },
    /// Rebuild the files database from the install database.
    RebuildDb,
    /// Repository management.
    Repo {
        #[command(subcommand)]
        action: RepoAction,
    },
    /// Show metadata for one package.
    Info { name: String },
    /// Search package names and provides for a substring.
    Search { query: String },
    /// List installed packages.
    ListInstalled {
        /// Only automatically installed (non-explicit) packages.
        #[arg(long)]
        automatic: bool,
    },
    /// Show the operation history log.
    History {
        /// Show only this entry number.
        number: Option<u32>,
    },
}

#[derive(Debug, Clone, Subcommand)]
pub enum RepoAction {
    /// Add a repository.
    Add {
        name: String,
        uri: String,
        #[arg(long)]
        at: Option<usize>,
    },
    /// Remove a repository.
    Remove { name: String },
    /// Enable a disabled repository.
    Enable { name: String },
    /// Disable a repository without removing it.
    Disable { name: String },
    /// Change a repository's priority position.
    SetPriority { name: String, position: usize },
    /// Re-fetch one repository's index, or all active repositories.
    Update { name: Option<String> },
    /// List configured repositories.
    List,
}
