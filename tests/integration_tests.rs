//! End-to-end tests driving `Planner` against a temp-dir install root,
//! the same way the CLI does: real `InstallDb`/`FilesDb`/`HistoryLog` on
//! disk, real `.coral` archives, a stub `Fetcher` that just copies a
//! local file instead of going over the network.

use anyhow::Result;
use coralpkg_archive::ArchiveWriter;
use coralpkg_core::context::Fetcher;
use coralpkg_core::{
    Context, FileEntry, FileKind, InstallReason, NullProgressSink, NullSignatureVerifier, NullSystemConfigTrigger,
    PackageRecord,
};
use coralpkg_history::HistoryLog;
use coralpkg_installdb::InstallDb;
use coralpkg_planner::{Planner, PlannerConfig};
use coralpkg_repository::{RepoIndex, RepositoryDb};
use coralpkg_test_utils::prelude::*;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const DISTRO: &str = "coral-2024";
const ARCH: &str = "x86_64";

/// Copies whatever local path `uri` names to `dest`; the index/archive
/// fixtures below use absolute filesystem paths as their "URIs".
#[derive(Debug)]
struct LocalFetcher;

impl Fetcher for LocalFetcher {
    fn fetch(&self, uri: &str, dest: &Path) -> coralpkg_core::Result<()> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(uri, dest)?;
        Ok(())
    }
}

fn plan_config() -> PlannerConfig {
    PlannerConfig {
        distro_id: DISTRO.to_string(),
        arch: ARCH.to_string(),
        bootstrap_package: "coralpkg-base".to_string(),
        max_fetch_attempts: 1,
        ignore_check: true,
        ignore_file_conflicts: false,
        ignore_delta: false,
    }
}

fn files_for(record: &PackageRecord) -> Vec<FileEntry> {
    vec![FileEntry {
        path: format!("usr/bin/{}", record.name.as_str()),
        hash: Some("0".repeat(40)),
        kind: FileKind::Executable,
        mode: 0o755,
        owner: ("root".to_string(), "root".to_string()),
        permanent: false,
    }]
}

/// Writes a real `.coral` archive for `record`/`files` into `out_dir`,
/// with a payload tree matching `files`'s paths, and returns its path.
fn write_archive(out_dir: &Path, record: &PackageRecord, files: &[FileEntry]) -> Result<PathBuf> {
    let payload_root = out_dir.join(format!("{}-payload", record.name.as_str()));
    for file in files {
        if matches!(file.kind, FileKind::Dir) {
            std::fs::create_dir_all(payload_root.join(&file.path))?;
            continue;
        }
        let full = payload_root.join(&file.path);
        std::fs::create_dir_all(full.parent().unwrap())?;
        std::fs::write(&full, b"#!/bin/sh\necho hi\n")?;
    }

    let archive_path = out_dir.join(format!("{}-{}-{}.coral", record.name.as_str(), record.version, record.release));
    let sink = std::fs::File::create(&archive_path)?;
    ArchiveWriter::new(sink).write_package(record, files, &[], &payload_root)?;
    Ok(archive_path)
}

/// Builds a small `coral-2024` distribution of `a`, `b` (depends on `a`),
/// and `c` (independent), writes their archives and a cached repo index
/// under `root`, and registers the repo in `repos.xml`. Returns the
/// records keyed by name for convenience.
fn seed_repo(root: &TempRoot) -> Result<Vec<PackageRecord>> {
    let archive_dir = root.path().join("archives");
    std::fs::create_dir_all(&archive_dir)?;

    let mut a = Fixtures::package("a");
    let mut b = Fixtures::package_with_deps("b", &["a"]);
    let mut c = Fixtures::package("c");

    for record in [&mut a, &mut b, &mut c] {
        let files = files_for(record);
        let archive_path = write_archive(&archive_dir, record, &files)?;
        record.package_uri = archive_path.to_string_lossy().into_owned();
    }

    let index = RepoIndex {
        distribution: coralpkg_repository::DistributionInfo {
            source_name: DISTRO.to_string(),
            version: "2024".to_string(),
            architecture: ARCH.to_string(),
            obsoletes: Vec::new(),
        },
        sources: Vec::new(),
        packages: vec![a.clone(), b.clone(), c.clone()],
        components: Vec::new(),
        groups: Vec::new(),
        obsoletes: Vec::new(),
        replaces: Vec::new(),
    };
    let index_xml = quick_xml::se::to_string(&index)?;
    root.write_index("main", &index_xml)?;

    let mut repos = RepositoryDb::load(root.path())?;
    repos.add("main", "https://packages.example/main", None)?;
    repos.save()?;

    Ok(vec![a, b, c])
}

fn build_context(root: &TempRoot) -> Context {
    Context::new(
        root.path().to_path_buf(),
        root.cache_dir(),
        Arc::new(LocalFetcher),
        Arc::new(NullSignatureVerifier),
        Arc::new(NullSystemConfigTrigger),
        Arc::new(NullProgressSink),
    )
}

#[test]
fn install_pulls_in_dependency_as_automatic() -> Result<()> {
    let root = TempRoot::new()?;
    seed_repo(&root)?;
    let ctx = build_context(&root);

    let mut planner = Planner::open(&ctx, plan_config())?;
    let result = planner.install(&["b".to_string()], false, false)?;

    assert_eq!(result.order, vec!["a".to_string(), "b".to_string()]);

    let installdb = InstallDb::open(root.path().join("var/lib/coralpkg"));
    assert_installed(&installdb, "a");
    assert_installed(&installdb, "b");
    assert_not_installed(&installdb, "c");

    assert_eq!(installdb.get("a")?.reason, InstallReason::Automatic);
    assert_eq!(installdb.get("b")?.reason, InstallReason::Explicit);

    assert_file_exists(root.path(), "usr/bin/a");
    assert_file_exists(root.path(), "usr/bin/b");
    assert_file_absent(root.path(), "usr/bin/c");

    Ok(())
}

#[test]
fn removing_explicit_package_leaves_automatic_dependency_as_orphan_candidate() -> Result<()> {
    let root = TempRoot::new()?;
    seed_repo(&root)?;
    let ctx = build_context(&root);

    {
        let mut planner = Planner::open(&ctx, plan_config())?;
        planner.install(&["b".to_string()], false, false)?;
    }

    {
        let mut planner = Planner::open(&ctx, plan_config())?;
        planner.remove(&["b".to_string()], false, false, false)?;
    }

    let installdb = InstallDb::open(root.path().join("var/lib/coralpkg"));
    assert_not_installed(&installdb, "b");
    assert_installed(&installdb, "a");
    assert_file_absent(root.path(), "usr/bin/b");
    assert_file_exists(root.path(), "usr/bin/a");

    {
        let mut planner = Planner::open(&ctx, plan_config())?;
        planner.remove_orphans()?;
    }

    let installdb = InstallDb::open(root.path().join("var/lib/coralpkg"));
    assert_not_installed(&installdb, "a");
    assert_file_absent(root.path(), "usr/bin/a");

    Ok(())
}

#[test]
fn independent_package_installs_without_pulling_in_unrelated_packages() -> Result<()> {
    let root = TempRoot::new()?;
    seed_repo(&root)?;
    let ctx = build_context(&root);

    let mut planner = Planner::open(&ctx, plan_config())?;
    let result = planner.install(&["c".to_string()], false, false)?;

    assert_eq!(result.order, vec!["c".to_string()]);

    let installdb = InstallDb::open(root.path().join("var/lib/coralpkg"));
    assert_installed(&installdb, "c");
    assert_not_installed(&installdb, "a");
    assert_not_installed(&installdb, "b");

    Ok(())
}

/// Records written directly to the install DB, bypassing the planner
/// entirely, simulate state left over from a crash between "apply wrote
/// the install record" and "apply committed the history entry": the
/// package reads as installed, but no history entry exists for it.
#[test]
fn install_db_state_survives_independent_of_history_log() -> Result<()> {
    let root = TempRoot::new()?;
    let lib_dir = root.path().join("var/lib/coralpkg");
    let log_dir = root.path().join("var/log/coralpkg");

    let mut installdb = InstallDb::open(&lib_dir);
    let record = Fixtures::package("orphaned");
    let installed = Fixtures::installed(record, InstallReason::Explicit);
    installdb.add(installed)?;

    let reopened = InstallDb::open(&lib_dir);
    assert_installed(&reopened, "orphaned");

    let history = HistoryLog::open(&log_dir);
    let entries = history.list()?;
    assert!(
        entries.is_empty(),
        "expected no history entry for a package recorded outside any committed transaction"
    );

    Ok(())
}
