//! `coralpkg`: one verb per planner operation, plus read-only `info`,
//! `search`, `list-installed`, and `history`.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

mod cli;
mod commands;
mod context;
mod output;

use clap::Parser;
use cli::{Cli, Commands};
use coralpkg_planner::Planner;
use std::process::ExitCode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 if cli.quiet => Level::ERROR,
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::builder().with_default_directive(log_level.into()).from_env_lossy();
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).without_time().init();

    output::init(cli.color, cli.quiet);
    if cli.json {
        output::json::enable();
    }

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::json::print_error(&e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = context::load_config(cli)?;
    let ctx = context::build_context(cli, &config)?;
    let plan_config = context::planner_config(cli, &config);

    // Read-only queries never open a `Planner` and never take the lock.
    match &cli.command {
        Commands::Info { name } => return commands::query::info(&ctx, name),
        Commands::Search { query } => return commands::query::search(&ctx, query),
        Commands::ListInstalled { automatic } => return commands::query::list_installed(&ctx, *automatic),
        Commands::History { number } => return commands::query::history(&ctx, *number),
        Commands::Repo { action: cli::RepoAction::List } => {
            let mut planner = Planner::open(&ctx, plan_config)?;
            return commands::repo::run(&mut planner, &ctx, cli::RepoAction::List);
        }
        _ => {}
    }

    let _lock = ctx.acquire_lock();
    let mut planner = Planner::open(&ctx, plan_config)?;

    match cli.command.clone() {
        Commands::Install { names, reinstall } => {
            commands::install(&mut planner, &names, reinstall, cli.dry_run, cli.yes)
        }
        Commands::InstallFiles { paths } => commands::install_files(&mut planner, &paths, cli.dry_run, cli.yes),
        Commands::Upgrade { names } => commands::upgrade(&mut planner, &names, cli.dry_run, cli.yes),
        Commands::Remove { names, autoremove, force } => {
            commands::remove(&mut planner, &names, autoremove, force, cli.dry_run, cli.yes)
        }
        Commands::RemoveOrphans => commands::remove_orphans(&mut planner, cli.yes),
        Commands::Fetch { names, dir } => commands::fetch(&mut planner, &names, &dir),
        Commands::ConfigurePending { names } => commands::configure_pending(&mut planner, &names),
        Commands::RebuildDb => commands::rebuild_db(&mut planner),
        Commands::Repo { action } => commands::repo::run(&mut planner, &ctx, action),
        Commands::Info { .. } | Commands::Search { .. } | Commands::ListInstalled { .. } | Commands::History { .. } => {
            unreachable!("handled above")
        }
    }
}
