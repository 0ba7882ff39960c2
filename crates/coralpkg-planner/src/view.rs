//! The planner's [`PackageView`] implementation, over a live install DB
//! and the set of cached repository indices for currently active repos.

use ahash::AHashMap;
use coralpkg_core::{Dependency, PackageRecord};
use coralpkg_installdb::InstallDb;
use coralpkg_repository::RepoIndex;
use coralpkg_resolver::PackageView;
use coralpkg_version::Revision;

pub struct DbView<'a> {
    pub installdb: &'a InstallDb,
    pub indices: &'a AHashMap<String, RepoIndex>,
    pub bootstrap_package: &'a str,
}

impl DbView<'_> {
    fn all_repo_revisions(&self, name: &str) -> Vec<&PackageRecord> {
        self.indices
            .values()
            .filter_map(|idx| idx.find(name))
            .collect()
    }
}

impl PackageView for DbView<'_> {
    fn is_installed(&self, name: &str) -> bool {
        self.installdb.has(name)
    }

    fn installed_revision(&self, name: &str) -> Option<Revision> {
        self.installdb.get_version(name).ok()
    }

    fn installed_record(&self, name: &str) -> Option<PackageRecord> {
        self.installdb.get(name).ok().map(|r| r.record)
    }

    fn installed_names(&self) -> Vec<String> {
        self.installdb.list_installed()
    }

    fn automatic_names(&self) -> Vec<String> {
        self.installdb.list_automatic()
    }

    fn installed_rev_deps(&self, name: &str) -> Vec<(String, Dependency)> {
        self.installdb.get_rev_deps(name)
    }

    fn repo_record(&self, name: &str) -> Option<PackageRecord> {
        self.all_repo_revisions(name)
            .into_iter()
            .max_by_key(|r| r.revision())
            .cloned()
    }

    fn repo_revisions(&self, name: &str) -> Vec<PackageRecord> {
        self.all_repo_revisions(name).into_iter().cloned().collect()
    }

    fn base_component(&self) -> Vec<String> {
        self.indices
            .values()
            .flat_map(|idx| &idx.components)
            .find(|c| c.name == "system.base")
            .map(|c| c.packages.clone())
            .unwrap_or_default()
    }

    fn bootstrap_package(&self) -> &str {
        self.bootstrap_package
    }
}
