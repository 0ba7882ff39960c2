//! Per-verb command handlers. Each mutating command previews its plan
//! with a `dry_run` call, prompts for confirmation when the plan has
//! conflicts or pulls in packages beyond what was requested, then
//! re-runs the same call for real.

pub mod query;
pub mod repo;

use crate::output;
use crate::output::prompt::Confirm;
use anyhow::{Context as _, Result};
use coralpkg_apply::ApplyOperation;
use coralpkg_planner::{Planner, PlannerError, TransactionResult};
use serde::Serialize;
use std::path::{Path, PathBuf};

fn core_err(e: PlannerError) -> anyhow::Error {
    anyhow::Error::new(coralpkg_core::Error::from(e))
}

fn operation_verb(op: ApplyOperation) -> &'static str {
    match op {
        ApplyOperation::Install => "installed",
        ApplyOperation::Upgrade => "upgraded",
        ApplyOperation::Reinstall => "reinstalled",
        ApplyOperation::Downgrade => "downgraded",
        ApplyOperation::Remove => "removed",
    }
}

#[derive(Serialize)]
struct JsonOutcome {
    package: String,
    operation: String,
    before: Option<String>,
    after: Option<String>,
    needs_reconfigure: bool,
}

#[derive(Serialize)]
struct JsonTransaction {
    order: Vec<String>,
    conflicts_internal: Vec<(String, String)>,
    conflicts_external: Vec<String>,
    outcomes: Vec<JsonOutcome>,
}

fn report(result: &TransactionResult) {
    if output::json::is_enabled() {
        let json = JsonTransaction {
            order: result.order.clone(),
            conflicts_internal: result.conflicts.internal.clone(),
            conflicts_external: result.conflicts.external.clone(),
            outcomes: result
                .outcomes
                .iter()
                .map(|o| JsonOutcome {
                    package: o.package.clone(),
                    operation: format!("{:?}", o.operation).to_lowercase(),
                    before: o.before.as_ref().map(ToString::to_string),
                    after: o.after.as_ref().map(ToString::to_string),
                    needs_reconfigure: o.needs_reconfigure,
                })
                .collect(),
        };
        output::json::JsonResult::success(json).print();
        return;
    }

    if result.outcomes.is_empty() {
        if result.order.is_empty() {
            output::info("Nothing to do.");
        } else {
            output::header("plan (dry run)");
            for name in &result.order {
                output::package(name, None);
            }
        }
        return;
    }

    for outcome in &result.outcomes {
        let verb = operation_verb(outcome.operation);
        let msg = match (&outcome.before, &outcome.after) {
            (Some(b), Some(a)) => format!("{} {verb}: {b} -> {a}", outcome.package),
            (None, Some(a)) => format!("{} {verb}: {a}", outcome.package),
            (Some(b), None) => format!("{} {verb} ({b})", outcome.package),
            (None, None) => format!("{} {verb}", outcome.package),
        };
        output::success(&msg);
        if outcome.needs_reconfigure {
            output::warning(&format!("{} needs post-install configuration", outcome.package));
        }
    }
}

/// `true` if the transaction should proceed without asking: either `-y`
/// was given, or the plan is clean and introduces nothing beyond what
/// was explicitly requested.
fn should_apply(preview: &TransactionResult, requested: &[String], yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    let extra: Vec<&String> = preview
        .order
        .iter()
        .filter(|n| !requested.iter().any(|r| r == *n))
        .collect();

    if preview.conflicts.is_clean() && extra.is_empty() {
        return Ok(true);
    }
    if !preview.conflicts.external.is_empty() {
        output::warning(&format!(
            "this will remove conflicting package(s): {:?}",
            preview.conflicts.external
        ));
    }
    if !extra.is_empty() {
        output::info("additional packages are required:");
        for name in &extra {
            output::package(name, None);
        }
    }
    Confirm::new("Proceed?")
        .default(false)
        .prompt()
        .context("reading confirmation")
}

pub fn install(planner: &mut Planner<'_>, names: &[String], reinstall: bool, dry_run: bool, yes: bool) -> Result<()> {
    let preview = planner.install(names, reinstall, true).map_err(core_err)?;
    if dry_run {
        report(&preview);
        return Ok(());
    }
    if !should_apply(&preview, names, yes)? {
        output::info("aborted");
        return Ok(());
    }
    let result = planner.install(names, reinstall, false).map_err(core_err)?;
    report(&result);
    Ok(())
}

pub fn install_files(planner: &mut Planner<'_>, paths: &[PathBuf], dry_run: bool, yes: bool) -> Result<()> {
    let preview = planner.install_files(paths, false, true).map_err(core_err)?;
    if dry_run {
        report(&preview);
        return Ok(());
    }
    if !should_apply(&preview, &[], yes)? {
        output::info("aborted");
        return Ok(());
    }
    let result = planner.install_files(paths, false, false).map_err(core_err)?;
    report(&result);
    Ok(())
}

pub fn upgrade(planner: &mut Planner<'_>, names: &[String], dry_run: bool, yes: bool) -> Result<()> {
    let seeds = if names.is_empty() { None } else { Some(names) };
    let preview = planner.upgrade(seeds, true).map_err(core_err)?;
    if dry_run {
        report(&preview);
        return Ok(());
    }
    if !should_apply(&preview, names, yes)? {
        output::info("aborted");
        return Ok(());
    }
    let result = planner.upgrade(seeds, false).map_err(core_err)?;
    report(&result);
    Ok(())
}

pub fn remove(
    planner: &mut Planner<'_>,
    names: &[String],
    autoremove: bool,
    force: bool,
    dry_run: bool,
    yes: bool,
) -> Result<()> {
    let preview = planner.remove(names, autoremove, force, true).map_err(core_err)?;
    if dry_run {
        report(&preview);
        return Ok(());
    }
    if !yes {
        output::warning("about to remove:");
        for name in &preview.order {
            output::package(name, None);
        }
        if !Confirm::new("Proceed?").default(false).prompt().context("reading confirmation")? {
            output::info("aborted");
            return Ok(());
        }
    }
    let result = planner.remove(names, autoremove, force, false).map_err(core_err)?;
    report(&result);
    Ok(())
}

pub fn remove_orphans(planner: &mut Planner<'_>, yes: bool) -> Result<()> {
    if !yes
        && !Confirm::new("Remove all orphaned automatic packages?")
            .default(false)
            .prompt()
            .context("reading confirmation")?
    {
        output::info("aborted");
        return Ok(());
    }
    let result = planner.remove_orphans().map_err(core_err)?;
    report(&result);
    Ok(())
}

pub fn fetch(planner: &mut Planner<'_>, names: &[String], dir: &Path) -> Result<()> {
    let paths = planner.fetch(names, dir).map_err(core_err)?;
    if output::json::is_enabled() {
        output::json::JsonResult::success(paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>()).print();
    } else {
        for path in &paths {
            output::success(&format!("fetched {}", path.display()));
        }
    }
    Ok(())
}

pub fn configure_pending(planner: &mut Planner<'_>, names: &[String]) -> Result<()> {
    let filter = if names.is_empty() { None } else { Some(names) };
    let configured = planner.configure_pending(filter).map_err(core_err)?;
    if output::json::is_enabled() {
        output::json::JsonResult::success(configured).print();
    } else if configured.is_empty() {
        output::info("nothing pending configuration");
    } else {
        for name in &configured {
            output::success(&format!("configured {name}"));
        }
    }
    Ok(())
}

pub fn rebuild_db(planner: &mut Planner<'_>) -> Result<()> {
    planner.rebuild_db(None).map_err(core_err)?;
    output::success("files database rebuilt");
    Ok(())
}
