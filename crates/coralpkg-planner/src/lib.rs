//! The transaction planner: the one place the public
//! install/upgrade/remove/repo-management operations live, each
//! following the same normalize -> filter -> resolve -> fetch -> apply ->
//! log-history skeleton.

pub mod error;
mod view;

pub use error::PlannerError;
pub use view::DbView;

use ahash::{AHashMap, AHashSet};
use coralpkg_apply::{ApplyEngine, ApplyOperation, ApplyOutcome};
use coralpkg_archive::{ArchiveReader, DeltaPackage};
use coralpkg_core::{Context, InstallReason, PackageRecord};
use coralpkg_filesdb::FilesDb;
use coralpkg_history::{HistoryLog, OperationKind};
use coralpkg_installdb::InstallDb;
use coralpkg_repository::{IndexCache, RepoIndex, RepositoryDb};
use coralpkg_resolver::{
    check_conflicts, plan_autoremove, plan_autoremove_all, plan_install, plan_remove, plan_upgrade,
    upgrade_base, ConflictReport, Plan,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, instrument, warn};

/// Host identity and planner-wide knobs that would otherwise come from
/// configuration (left as plain fields here rather than a dependency on
/// `coralpkg-config`, which has not yet been adapted to this spec).
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    pub distro_id: String,
    pub arch: String,
    pub bootstrap_package: String,
    pub max_fetch_attempts: u32,
    pub ignore_check: bool,
    pub ignore_file_conflicts: bool,
    pub ignore_delta: bool,
}

/// The outcome of one transaction: the plan that was computed, its
/// conflict report, and (unless the call was a dry run) what apply
/// actually did to each package.
#[derive(Debug, Default)]
pub struct TransactionResult {
    pub order: Vec<String>,
    pub conflicts: ConflictReport,
    pub outcomes: Vec<ApplyOutcome>,
}

/// Names of packages whose apply outcome is still waiting on the
/// system-configuration trigger.
fn reconfigure_pending(outcomes: &[ApplyOutcome]) -> Vec<String> {
    outcomes
        .iter()
        .filter(|o| o.needs_reconfigure)
        .map(|o| o.package.clone())
        .collect()
}

/// Invokes the system-configuration trigger exactly once, when dropped,
/// regardless of whether the transaction it spans succeeded, failed, or
/// was cut short by an early return. Constructed at the start of every
/// mutating entry point so `?` can propagate freely without losing the
/// "always invoked on exit" guarantee.
struct SystemConfigGuard<'a> {
    ctx: &'a Context,
    pending: Vec<String>,
}

impl<'a> SystemConfigGuard<'a> {
    fn new(ctx: &'a Context) -> Self {
        Self { ctx, pending: Vec::new() }
    }

    fn set_pending(&mut self, pending: Vec<String>) {
        self.pending = pending;
    }
}

impl Drop for SystemConfigGuard<'_> {
    fn drop(&mut self) {
        self.ctx.system_config.apply(&self.pending);
    }
}

/// Owns every database this session touches and drives them through one
/// transaction at a time. Constructed once per invocation, much like the
/// teacher's top-level command handlers own their collaborators for the
/// duration of a single command.
pub struct Planner<'a> {
    ctx: &'a Context,
    installdb: InstallDb,
    filesdb: FilesDb,
    repos: RepositoryDb,
    indices: AHashMap<String, RepoIndex>,
    history: HistoryLog,
    index_cache: IndexCache,
    config: PlannerConfig,
}

impl<'a> Planner<'a> {
    #[must_use]
    pub fn open(ctx: &'a Context, config: PlannerConfig) -> Result<Self, PlannerError> {
        let installdb = InstallDb::open(ctx.root.join("var/lib/coralpkg"));
        let filesdb_root = ctx.root.join("var/lib/coralpkg");
        let filesdb = match FilesDb::open(&filesdb_root) {
            Ok(db) => db,
            Err(coralpkg_filesdb::FilesDbError::NeedsRebuild(_)) => {
                let mut fresh = FilesDb::empty(&filesdb_root);
                fresh.rebuild(&installdb)?;
                fresh
            }
            Err(e) => return Err(e.into()),
        };
        let repos = RepositoryDb::load(&ctx.root)?;
        let history = HistoryLog::open(ctx.root.join("var/log/coralpkg"));
        let index_dir = ctx.cache_dir.join("index");
        let index_cache = IndexCache::new(index_dir.clone());
        let indices = load_cached_indices(&index_dir, &repos);

        Ok(Self {
            ctx,
            installdb,
            filesdb,
            repos,
            indices,
            history,
            index_cache,
            config,
        })
    }

    fn view(&self) -> DbView<'_> {
        DbView {
            installdb: &self.installdb,
            indices: &self.indices,
            bootstrap_package: &self.config.bootstrap_package,
        }
    }

    /// Expands any name in `names` that matches a known component to its
    /// member packages, then dedupes while preserving first-seen order.
    fn normalize(&self, names: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for name in names {
            let members = self
                .indices
                .values()
                .flat_map(|idx| &idx.components)
                .find(|c| &c.name == name)
                .map(|c| c.packages.clone())
                .unwrap_or_else(|| vec![name.clone()]);
            for member in members {
                if seen.insert(member.clone()) {
                    out.push(member);
                }
            }
        }
        out
    }

    // ---- install / upgrade -------------------------------------------------

    #[instrument(skip(self))]
    pub fn install(&mut self, names: &[String], reinstall: bool, dry_run: bool) -> Result<TransactionResult, PlannerError> {
        let normalized = self.normalize(names);
        let requested: HashSet<String> = normalized.iter().cloned().collect();
        let wanted: Vec<String> = if reinstall {
            normalized
        } else {
            normalized
                .into_iter()
                .filter(|n| !self.installdb.has(n))
                .collect()
        };

        let plan = plan_install(&wanted, &self.view())?;
        let conflicts = check_conflicts(&plan.order, &self.view());
        if !conflicts.internal.is_empty() {
            return Err(PlannerError::InternalConflict(conflicts.internal));
        }
        if dry_run {
            return Ok(TransactionResult {
                order: plan.order,
                conflicts,
                outcomes: Vec::new(),
            });
        }

        let mut config_guard = SystemConfigGuard::new(self.ctx);

        let reasons: AHashMap<String, InstallReason> = plan
            .order
            .iter()
            .map(|n| {
                let reason = if requested.contains(n) {
                    InstallReason::Explicit
                } else {
                    InstallReason::Automatic
                };
                (n.clone(), reason)
            })
            .collect();

        let outcomes = self.apply_install_plan(&plan, &conflicts, &reasons)?;
        config_guard.set_pending(reconfigure_pending(&outcomes));
        self.log_history(OperationKind::Install, &outcomes)?;
        Ok(TransactionResult {
            order: plan.order,
            conflicts,
            outcomes,
        })
    }

    /// Install from local archive files directly, bypassing repository
    /// resolution for the named packages themselves (their dependencies
    /// still resolve normally against the repository indices).
    #[instrument(skip(self))]
    pub fn install_files(&mut self, paths: &[PathBuf], reinstall: bool, dry_run: bool) -> Result<TransactionResult, PlannerError> {
        let mut names = Vec::with_capacity(paths.len());
        for path in paths {
            let mut reader = ArchiveReader::open(path)?;
            names.push(reader.extract_metadata()?.name.as_str().to_string());
        }
        self.install(&names, reinstall, dry_run)
    }

    #[instrument(skip(self))]
    pub fn upgrade(&mut self, names: Option<&[String]>, dry_run: bool) -> Result<TransactionResult, PlannerError> {
        let seeds = names
            .map(|n| self.normalize(n))
            .unwrap_or_else(|| self.view().installed_names());

        let replaces: Vec<coralpkg_repository::ReplaceSpec> = self
            .indices
            .values()
            .flat_map(|idx| idx.replaces.clone())
            .collect();

        let plan = plan_upgrade(&seeds, &replaces, &self.view())?;
        let excludes = HashSet::new();
        let plan = upgrade_base(plan, &self.view(), &excludes);

        let conflicts = check_conflicts(&plan.order, &self.view());
        if !conflicts.internal.is_empty() {
            return Err(PlannerError::InternalConflict(conflicts.internal));
        }
        if dry_run {
            return Ok(TransactionResult {
                order: plan.order,
                conflicts,
                outcomes: Vec::new(),
            });
        }

        let mut config_guard = SystemConfigGuard::new(self.ctx);

        let reasons: AHashMap<String, InstallReason> = plan
            .order
            .iter()
            .filter_map(|n| self.installdb.get(n).ok().map(|r| (n.clone(), r.reason)))
            .collect();

        let outcomes = self.apply_install_plan(&plan, &conflicts, &reasons)?;
        config_guard.set_pending(reconfigure_pending(&outcomes));
        self.log_history(OperationKind::Upgrade, &outcomes)?;
        Ok(TransactionResult {
            order: plan.order,
            conflicts,
            outcomes,
        })
    }

    /// Shared install/upgrade apply path: removes external conflicts,
    /// fetches every package's archive to the cache, pre-scans each
    /// archive's new file list against the previously installed one to
    /// compute the set of paths released mid-transaction, then applies
    /// packages in order.
    fn apply_install_plan(
        &mut self,
        plan: &Plan,
        conflicts: &ConflictReport,
        reasons: &AHashMap<String, InstallReason>,
    ) -> Result<Vec<ApplyOutcome>, PlannerError> {
        for victim in &conflicts.external {
            self.remove_one(victim, false)?;
        }

        let mut archive_paths = Vec::with_capacity(plan.order.len());
        for name in &plan.order {
            let record = self
                .view()
                .repo_record(name)
                .ok_or_else(|| PlannerError::UnknownPackage(name.clone()))?;
            let dest = self
                .ctx
                .cache_dir
                .join(format!("{}-{}-{}.coral", name, record.version, record.release));
            let uri = self.resolve_fetch_uri(name, &record);
            self.fetch_one(&uri, &dest)?;
            archive_paths.push(dest);
        }

        let mut released: AHashSet<String> = AHashSet::default();
        for (name, path) in plan.order.iter().zip(&archive_paths) {
            let mut reader = ArchiveReader::open(path)?;
            let new_files = reader.extract_files()?;
            if let Ok(old) = self.installdb.get(name) {
                for f in &old.files {
                    if !new_files.iter().any(|nf| nf.path == f.path) {
                        released.insert(f.path.clone());
                    }
                }
            }
        }

        let stage_root = tempfile::tempdir().map_err(PlannerError::Io)?;
        let host = (self.config.distro_id.clone(), self.config.arch.clone());
        let ignore_check = self.config.ignore_check;
        let ignore_file_conflicts = self.config.ignore_file_conflicts;

        let mut outcomes = Vec::with_capacity(plan.order.len());
        for (name, path) in plan.order.iter().zip(&archive_paths) {
            let mut reader = ArchiveReader::open(path)?;
            let reason = reasons.get(name).copied().unwrap_or(InstallReason::Explicit);
            let mut engine = ApplyEngine::new(&mut self.installdb, &mut self.filesdb);
            let outcome = engine.install_or_upgrade(
                &mut reader,
                reason,
                &self.ctx.root,
                stage_root.path(),
                (host.0.as_str(), host.1.as_str()),
                ignore_check,
                ignore_file_conflicts,
                &released,
            )?;
            info!(package = %outcome.package, operation = ?outcome.operation, "applied");
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Picks the delta archive over the full package archive when one is
    /// applicable to the currently installed revision, the host's
    /// distro/arch matches, and delta fetches haven't been disabled.
    fn resolve_fetch_uri(&self, name: &str, record: &PackageRecord) -> String {
        if self.config.ignore_delta {
            return record.package_uri.clone();
        }
        let Ok(installed) = self.installdb.get(name) else {
            return record.package_uri.clone();
        };
        let from = installed.record.revision();
        record
            .deltas
            .iter()
            .find(|(&source_release, _)| {
                let delta = DeltaPackage {
                    source_release,
                    base: record.clone(),
                };
                delta.applicable(&from, &self.config.distro_id, &self.config.arch)
            })
            .map(|(_, (uri, _hash))| uri.clone())
            .unwrap_or_else(|| record.package_uri.clone())
    }

    fn fetch_one(&self, uri: &str, dest: &Path) -> Result<(), PlannerError> {
        let mut last_err = None;
        for attempt in 0..self.config.max_fetch_attempts.max(1) {
            match self.ctx.fetcher.fetch(uri, dest) {
                Ok(()) => return Ok(()),
                Err(e) => {
                    warn!(uri, attempt, "fetch attempt failed");
                    last_err = Some(e);
                }
            }
        }
        Err(PlannerError::Fetch {
            uri: uri.to_string(),
            message: last_err.map(|e| e.to_string()).unwrap_or_default(),
        })
    }

    /// Fetch every named package's archive to `dir` without applying it.
    #[instrument(skip(self))]
    pub fn fetch(&mut self, names: &[String], dir: &Path) -> Result<Vec<PathBuf>, PlannerError> {
        std::fs::create_dir_all(dir).map_err(PlannerError::Io)?;
        let mut out = Vec::with_capacity(names.len());
        for name in names {
            let record = self
                .view()
                .repo_record(name)
                .ok_or_else(|| PlannerError::UnknownPackage(name.clone()))?;
            let dest = dir.join(format!("{}-{}-{}.coral", name, record.version, record.release));
            self.fetch_one(&record.package_uri, &dest)?;
            out.push(dest);
        }
        Ok(out)
    }

    // ---- remove -------------------------------------------------------

    #[instrument(skip(self))]
    pub fn remove(&mut self, names: &[String], autoremove: bool, force: bool, dry_run: bool) -> Result<TransactionResult, PlannerError> {
        let normalized = self.normalize(names);
        let filtered: Vec<String> = normalized.into_iter().filter(|n| self.installdb.has(n)).collect();

        let plan = plan_remove(&filtered, force, &self.view())?;
        let conflicts = ConflictReport::default();
        if dry_run {
            return Ok(TransactionResult {
                order: plan.order,
                conflicts,
                outcomes: Vec::new(),
            });
        }

        let mut config_guard = SystemConfigGuard::new(self.ctx);

        let mut outcomes = Vec::with_capacity(plan.order.len());
        for name in &plan.order {
            outcomes.push(self.remove_one(name, false)?);
        }
        self.log_history(OperationKind::Remove, &outcomes)?;

        if autoremove {
            let orphan_result = self.remove_orphans_inner()?;
            outcomes.extend(orphan_result.outcomes);
        }

        config_guard.set_pending(reconfigure_pending(&outcomes));
        Ok(TransactionResult {
            order: plan.order,
            conflicts,
            outcomes,
        })
    }

    /// Shared by [`Planner::remove_orphans`] and the `autoremove` branch
    /// of [`Planner::remove`]; the latter folds orphan removal into its
    /// own transaction rather than firing the system-configuration
    /// trigger a second time.
    fn remove_orphans_inner(&mut self) -> Result<TransactionResult, PlannerError> {
        let plan = plan_autoremove_all(&self.view())?;
        let mut outcomes = Vec::with_capacity(plan.order.len());
        for name in &plan.order {
            outcomes.push(self.remove_one(name, false)?);
        }
        self.log_history(OperationKind::Remove, &outcomes)?;
        Ok(TransactionResult {
            order: plan.order,
            conflicts: ConflictReport::default(),
            outcomes,
        })
    }

    #[instrument(skip(self))]
    pub fn remove_orphans(&mut self) -> Result<TransactionResult, PlannerError> {
        let mut config_guard = SystemConfigGuard::new(self.ctx);
        let result = self.remove_orphans_inner()?;
        config_guard.set_pending(reconfigure_pending(&result.outcomes));
        Ok(result)
    }

    /// `plan_autoremove` seeded by an explicit removal set, used when a
    /// remove should also fold in any orphan it creates.
    #[instrument(skip(self))]
    pub fn remove_with_autoremove(&mut self, names: &[String]) -> Result<TransactionResult, PlannerError> {
        let mut config_guard = SystemConfigGuard::new(self.ctx);
        let normalized = self.normalize(names);
        let plan = plan_autoremove(&normalized, &self.view())?;
        let mut outcomes = Vec::with_capacity(plan.order.len());
        for name in &plan.order {
            outcomes.push(self.remove_one(name, false)?);
        }
        config_guard.set_pending(reconfigure_pending(&outcomes));
        self.log_history(OperationKind::Remove, &outcomes)?;
        Ok(TransactionResult {
            order: plan.order,
            conflicts: ConflictReport::default(),
            outcomes,
        })
    }

    fn remove_one(&mut self, name: &str, purge: bool) -> Result<ApplyOutcome, PlannerError> {
        let mut engine = ApplyEngine::new(&mut self.installdb, &mut self.filesdb);
        Ok(engine.remove(name, &self.ctx.root, purge)?)
    }

    // ---- configuration / reconfigure -----------------------------------

    /// Runs the system-configuration trigger for packages the apply
    /// engine flagged as pending, or for every pending package if
    /// `names` is `None`.
    #[instrument(skip(self))]
    pub fn configure_pending(&mut self, names: Option<&[String]>) -> Result<Vec<String>, PlannerError> {
        let candidates = names
            .map(<[String]>::to_vec)
            .unwrap_or_else(|| self.installdb.list_installed());
        let mut pending = Vec::new();
        for name in candidates {
            if let Ok(record) = self.installdb.get(&name) {
                if record.needs_reconfigure {
                    pending.push(name.clone());
                    self.installdb.clear_pending(&name)?;
                }
            }
        }
        self.ctx.system_config.apply(&pending);
        Ok(pending)
    }

    // ---- repository management -----------------------------------------

    #[instrument(skip(self))]
    pub fn add_repo(&mut self, name: &str, uri: &str, at: Option<usize>) -> Result<(), PlannerError> {
        self.repos.add(name, uri, at)?;
        self.repos.save()?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn remove_repo(&mut self, name: &str) -> Result<(), PlannerError> {
        self.repos.remove(name)?;
        self.repos.save()?;
        self.indices.remove(name);
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn enable_repo(&mut self, name: &str) -> Result<(), PlannerError> {
        self.repos.set_status(name, coralpkg_core::RepoStatus::Active)?;
        self.repos.save()?;
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn disable_repo(&mut self, name: &str) -> Result<(), PlannerError> {
        self.repos.set_status(name, coralpkg_core::RepoStatus::Inactive)?;
        self.repos.save()?;
        self.indices.remove(name);
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn set_repo_priority(&mut self, name: &str, pos: usize) -> Result<(), PlannerError> {
        self.repos.set_priority(name, pos)?;
        self.repos.save()?;
        Ok(())
    }

    /// Refreshes the cached index for `name`, or every active repository
    /// if `name` is `None`. The current `Fetcher` abstraction has no
    /// conditional-GET primitive, so every call here re-downloads rather
    /// than trusting a previously cached change token; `force` is
    /// accordingly always true in practice (documented simplification).
    #[instrument(skip(self))]
    pub fn update_repo(&mut self, name: Option<&str>, _force: bool) -> Result<(), PlannerError> {
        let targets: Vec<coralpkg_core::Repo> = match name {
            Some(n) => vec![self.repos.get(n)?.clone()],
            None => self.repos.list(true).into_iter().cloned().collect(),
        };

        for repo in targets {
            let fetcher = self.ctx.fetcher.clone();
            let fetch_closure = |uri: &str| -> Result<Vec<u8>, coralpkg_repository::RepoError> {
                let tmp = tempfile::NamedTempFile::new().map_err(|e| coralpkg_repository::RepoError::Io {
                    path: PathBuf::new(),
                    source: e,
                })?;
                fetcher
                    .fetch(uri, tmp.path())
                    .map_err(|e| coralpkg_repository::RepoError::Unreachable {
                        repo: String::new(),
                        message: e.to_string(),
                    })?;
                std::fs::read(tmp.path()).map_err(|e| coralpkg_repository::RepoError::Io {
                    path: tmp.path().to_path_buf(),
                    source: e,
                })
            };

            let token = format!("refresh-{}", chrono::Utc::now().timestamp_nanos_opt().unwrap_or(0));
            match self.index_cache.load_or_refresh(
                &repo,
                &token,
                &fetch_closure,
                (self.config.distro_id.as_str(), self.config.arch.as_str()),
            ) {
                Ok(index) => {
                    self.indices.insert(repo.name.clone(), index);
                }
                Err(coralpkg_repository::RepoError::IncompatibleDistribution { .. }) => {
                    self.repos.set_status(&repo.name, coralpkg_core::RepoStatus::Inactive)?;
                    warn!(repo = %repo.name, "deactivated: distribution mismatch");
                }
                Err(e) => return Err(e.into()),
            }
        }
        self.repos.save()?;
        Ok(())
    }

    /// Rebuilds the files database from the install DB, optionally after
    /// verifying `files` still exist on disk (unused for now: full file
    /// presence verification belongs to a `check`/`fsck`-style operation
    /// this spec scopes separately).
    #[instrument(skip(self))]
    pub fn rebuild_db(&mut self, _files: Option<&[String]>) -> Result<(), PlannerError> {
        self.filesdb.rebuild(&self.installdb)?;
        Ok(())
    }

    fn log_history(&self, kind: OperationKind, outcomes: &[ApplyOutcome]) -> Result<(), PlannerError> {
        if outcomes.is_empty() {
            return Ok(());
        }
        let mut pending = self.history.start(kind, chrono::Utc::now())?;
        for outcome in outcomes {
            let op = match outcome.operation {
                ApplyOperation::Install => "install",
                ApplyOperation::Upgrade => "upgrade",
                ApplyOperation::Reinstall => "reinstall",
                ApplyOperation::Downgrade => "downgrade",
                ApplyOperation::Remove => "remove",
            };
            pending.add_package(
                &outcome.package,
                op,
                outcome.before.as_ref().map(|r| (r.version.to_string(), r.release)),
                outcome.after.as_ref().map(|r| (r.version.to_string(), r.release)),
                false,
            );
        }
        self.history.commit(pending)?;
        Ok(())
    }
}


/// Loads whatever indices are already on disk in the cache, without
/// fetching anything. A repo with no cached index yet simply stays
/// absent from the map until the next `update_repo`.
fn load_cached_indices(cache_dir: &Path, repos: &RepositoryDb) -> AHashMap<String, RepoIndex> {
    let mut map = AHashMap::default();
    for repo in repos.list(true) {
        let path = cache_dir.join(&repo.name).join("coralpkg-index.xml");
        let Ok(xml) = std::fs::read_to_string(&path) else {
            continue;
        };
        match quick_xml::de::from_str::<RepoIndex>(&xml) {
            Ok(index) => {
                map.insert(repo.name.clone(), index);
            }
            Err(e) => warn!(repo = %repo.name, error = %e, "discarding unparsable cached index"),
        }
    }
    map
}
