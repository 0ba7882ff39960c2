//! Repository management: `repo add|remove|enable|disable|set-priority|update|list`.

use crate::cli::RepoAction;
use crate::output;
use crate::output::table::Table;
use anyhow::Result;
use coralpkg_planner::{Planner, PlannerError};
use coralpkg_repository::RepositoryDb;

fn core_err(e: PlannerError) -> anyhow::Error {
    anyhow::Error::new(coralpkg_core::Error::from(e))
}

pub fn run(planner: &mut Planner<'_>, ctx: &coralpkg_core::Context, action: RepoAction) -> Result<()> {
    match action {
        RepoAction::Add { name, uri, at } => {
            planner.add_repo(&name, &uri, at).map_err(core_err)?;
            output::success(&format!("added repository '{name}'"));
        }
        RepoAction::Remove { name } => {
            planner.remove_repo(&name).map_err(core_err)?;
            output::success(&format!("removed repository '{name}'"));
        }
        RepoAction::Enable { name } => {
            planner.enable_repo(&name).map_err(core_err)?;
            output::success(&format!("enabled repository '{name}'"));
        }
        RepoAction::Disable { name } => {
            planner.disable_repo(&name).map_err(core_err)?;
            output::success(&format!("disabled repository '{name}'"));
        }
        RepoAction::SetPriority { name, position } => {
            planner.set_repo_priority(&name, position).map_err(core_err)?;
            output::success(&format!("set '{name}' priority to {position}"));
        }
        RepoAction::Update { name } => {
            planner.update_repo(name.as_deref(), false).map_err(core_err)?;
            match &name {
                Some(name) => output::success(&format!("updated index for '{name}'")),
                None => output::success("updated all active repository indices"),
            }
        }
        RepoAction::List => {
            list(ctx)?;
        }
    }
    Ok(())
}

fn list(ctx: &coralpkg_core::Context) -> Result<()> {
    let repos = RepositoryDb::load(&ctx.root)?;
    let all = repos.list(false);

    if output::json::is_enabled() {
        #[derive(serde::Serialize)]
        struct RepoJson {
            name: String,
            uri: String,
            active: bool,
            priority: u32,
        }
        let json: Vec<RepoJson> = all
            .iter()
            .map(|r| RepoJson {
                name: r.name.clone(),
                uri: r.index_uri.clone(),
                active: matches!(r.status, coralpkg_core::RepoStatus::Active),
                priority: r.priority,
            })
            .collect();
        output::json::JsonResult::success(json).print();
        return Ok(());
    }

    let mut table = Table::new();
    table.headers(["name", "uri", "status", "priority"]);
    for repo in all {
        let status = if matches!(repo.status, coralpkg_core::RepoStatus::Active) {
            "active"
        } else {
            "inactive"
        };
        table.row([repo.name.as_str(), repo.index_uri.as_str(), status, &repo.priority.to_string()]);
    }
    table.print();
    Ok(())
}
