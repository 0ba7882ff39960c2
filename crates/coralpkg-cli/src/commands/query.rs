//! Read-only queries: `info`, `search`, `list-installed`, `history`.
//! Each opens its own database handles directly rather than through a
//! [`Planner`](coralpkg_planner::Planner), and none of them take the
//! process-wide lock.

use crate::output;
use crate::output::table::{kv_table, Table};
use anyhow::{Context as _, Result};
use coralpkg_core::Context;
use coralpkg_history::HistoryLog;
use coralpkg_installdb::InstallDb;
use coralpkg_repository::{RepoIndex, RepositoryDb};
use serde::Serialize;
use std::collections::HashMap;

fn load_indices(ctx: &Context, repos: &RepositoryDb) -> HashMap<String, RepoIndex> {
    let index_dir = ctx.cache_dir.join("index");
    let mut map = HashMap::new();
    for repo in repos.list(true) {
        let path = index_dir.join(&repo.name).join("coralpkg-index.xml");
        let Ok(xml) = std::fs::read_to_string(&path) else {
            continue;
        };
        if let Ok(index) = quick_xml::de::from_str::<RepoIndex>(&xml) {
            map.insert(repo.name.clone(), index);
        }
    }
    map
}

#[derive(Serialize)]
struct InfoJson {
    name: String,
    installed: bool,
    version: Option<String>,
    release: Option<u32>,
    repository: Option<String>,
    deps: Vec<String>,
}

pub fn info(ctx: &Context, name: &str) -> Result<()> {
    let installdb = InstallDb::open(ctx.root.join("var/lib/coralpkg"));
    let repos = RepositoryDb::load(&ctx.root).context("loading repository list")?;
    let indices = load_indices(ctx, &repos);

    let installed = installdb.has(name);
    let installed_record = installdb.get(name).ok();

    let repo_hit = indices
        .iter()
        .find_map(|(repo_name, idx)| idx.find(name).map(|record| (repo_name.clone(), record)));

    if installed_record.is_none() && repo_hit.is_none() {
        return Err(anyhow::Error::from(coralpkg_core::Error::unknown_package(name)));
    }

    let (version, release, deps) = if let Some(record) = &installed_record {
        (
            Some(record.record.version.to_string()),
            Some(record.record.release),
            record.record.deps.iter().map(|d| d.package.clone()).collect(),
        )
    } else if let Some((_, record)) = &repo_hit {
        (
            Some(record.version.to_string()),
            Some(record.release),
            record.deps.iter().map(|d| d.package.clone()).collect(),
        )
    } else {
        (None, None, Vec::new())
    };

    if output::json::is_enabled() {
        output::json::JsonResult::success(InfoJson {
            name: name.to_string(),
            installed,
            version,
            release,
            repository: repo_hit.map(|(r, _)| r),
            deps,
        })
        .print();
        return Ok(());
    }

    let table = kv_table([
        ("name".to_string(), name.to_string()),
        ("installed".to_string(), installed.to_string()),
        ("version".to_string(), version.unwrap_or_else(|| "-".to_string())),
        ("release".to_string(), release.map_or("-".to_string(), |r| r.to_string())),
        ("dependencies".to_string(), if deps.is_empty() { "-".to_string() } else { deps.join(", ") }),
    ]);
    table.print();
    Ok(())
}

pub fn search(ctx: &Context, query: &str) -> Result<()> {
    let installdb = InstallDb::open(ctx.root.join("var/lib/coralpkg"));
    let repos = RepositoryDb::load(&ctx.root).context("loading repository list")?;
    let indices = load_indices(ctx, &repos);

    let mut matches: Vec<(String, String, bool)> = Vec::new();
    for (_, idx) in &indices {
        for record in &idx.packages {
            let name = record.name.as_str();
            if name.contains(query) || record.provides.iter().any(|p| p.contains(query)) {
                matches.push((name.to_string(), record.version.to_string(), installdb.has(name)));
            }
        }
    }
    matches.sort();
    matches.dedup();

    if output::json::is_enabled() {
        output::json::JsonResult::success(&matches).print();
        return Ok(());
    }

    if matches.is_empty() {
        output::info(&format!("no package matches '{query}'"));
        return Ok(());
    }
    let mut table = Table::new();
    table.headers(["name", "version", "installed"]);
    for (name, version, installed) in &matches {
        table.row([name.as_str(), version.as_str(), if *installed { "yes" } else { "no" }]);
    }
    table.print();
    Ok(())
}

pub fn list_installed(ctx: &Context, automatic_only: bool) -> Result<()> {
    let installdb = InstallDb::open(ctx.root.join("var/lib/coralpkg"));
    let names = if automatic_only {
        installdb.list_automatic()
    } else {
        installdb.list_installed()
    };
    let mut rows: Vec<(String, String)> = names
        .iter()
        .map(|n| (n.clone(), installdb.get_version(n).map_or("?".to_string(), |r| r.to_string())))
        .collect();
    rows.sort();

    if output::json::is_enabled() {
        output::json::JsonResult::success(&rows).print();
        return Ok(());
    }
    for (name, revision) in &rows {
        output::package(name, Some(revision));
    }
    Ok(())
}

pub fn history(ctx: &Context, number: Option<u32>) -> Result<()> {
    let log = HistoryLog::open(ctx.root.join("var/log/coralpkg"));
    if let Some(number) = number {
        let entry = log.get(number).context("reading history entry")?;
        if output::json::is_enabled() {
            output::json::JsonResult::success(&entry).print();
        } else {
            print_entry(&entry);
        }
        return Ok(());
    }

    let entries = log.list().context("reading history log")?;
    if output::json::is_enabled() {
        output::json::JsonResult::success(&entries).print();
        return Ok(());
    }
    if entries.is_empty() {
        output::info("history is empty");
        return Ok(());
    }
    for entry in &entries {
        print_entry(entry);
    }
    Ok(())
}

fn print_entry(entry: &coralpkg_history::HistoryEntry) {
    output::header(&format!("#{} {} {} {}", entry.number, entry.operation_type, entry.date, entry.time));
    for package in &entry.packages {
        output::package(&package.name, None);
    }
}
