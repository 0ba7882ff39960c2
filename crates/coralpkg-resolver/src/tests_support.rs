//! Shared fake [`PackageView`] used across this crate's unit tests.

#![cfg(test)]

use crate::types::PackageView;
use coralpkg_core::{Dependency, PackageId, PackageRecord, Relation};
use coralpkg_version::{parse, Revision};
use std::collections::{HashMap, HashSet};

fn record(name: &str, deps: &[&str]) -> PackageRecord {
    PackageRecord {
        name: PackageId::new(name).unwrap(),
        version: parse("1.0").unwrap(),
        release: 1,
        distro_id: "coral-2024".into(),
        arch: "x86_64".into(),
        deps: deps.iter().map(|d| Dependency::exact(*d)).collect(),
        conflicts: vec![],
        replaces: vec![],
        provides: vec![],
        file_list_uri: String::new(),
        package_uri: String::new(),
        package_hash: String::new(),
        installed_size: 0,
        deltas: Default::default(),
        update_history: vec![],
    }
}

#[derive(Default)]
pub struct FakeView {
    repo: HashMap<String, PackageRecord>,
    installed: HashSet<String>,
    automatic: HashSet<String>,
    rev_deps: HashMap<String, Vec<(String, Dependency)>>,
    base: Vec<String>,
    bootstrap: String,
}

impl FakeView {
    pub fn new() -> Self {
        Self {
            bootstrap: "baselayout".to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn repo(mut self, name: &str, deps: &[&str]) -> Self {
        self.repo.insert(name.to_string(), record(name, deps));
        self
    }

    #[must_use]
    pub fn installed(mut self, name: &str) -> Self {
        self.installed.insert(name.to_string());
        self.repo.entry(name.to_string()).or_insert_with(|| record(name, &[]));
        self
    }

    #[must_use]
    pub fn automatic(mut self, name: &str) -> Self {
        self.installed.insert(name.to_string());
        self.automatic.insert(name.to_string());
        self
    }

    #[must_use]
    pub fn rev_dep(mut self, target: &str, dependent: &str) -> Self {
        self.rev_deps
            .entry(target.to_string())
            .or_default()
            .push((dependent.to_string(), Dependency::exact(target)));
        self
    }

    #[must_use]
    pub fn conflicts(mut self, a: &str, b: &str) -> Self {
        self.repo
            .entry(a.to_string())
            .or_insert_with(|| record(a, &[]))
            .conflicts
            .push(Relation::exact(b));
        self.repo
            .entry(b.to_string())
            .or_insert_with(|| record(b, &[]))
            .conflicts
            .push(Relation::exact(a));
        self
    }

    #[must_use]
    pub fn base(mut self, names: &[&str]) -> Self {
        self.base = names.iter().map(|s| s.to_string()).collect();
        self
    }

    #[must_use]
    pub fn bootstrap(mut self, name: &str) -> Self {
        self.bootstrap = name.to_string();
        self
    }
}

impl PackageView for FakeView {
    fn is_installed(&self, name: &str) -> bool {
        self.installed.contains(name)
    }

    fn installed_revision(&self, name: &str) -> Option<Revision> {
        if !self.installed.contains(name) {
            return None;
        }
        self.repo.get(name).map(PackageRecord::revision)
    }

    fn installed_record(&self, name: &str) -> Option<PackageRecord> {
        if !self.installed.contains(name) {
            return None;
        }
        self.repo.get(name).cloned()
    }

    fn installed_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.installed.iter().cloned().collect();
        names.sort();
        names
    }

    fn automatic_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.automatic.iter().cloned().collect();
        names.sort();
        names
    }

    fn installed_rev_deps(&self, name: &str) -> Vec<(String, Dependency)> {
        self.rev_deps.get(name).cloned().unwrap_or_default()
    }

    fn repo_record(&self, name: &str) -> Option<PackageRecord> {
        self.repo.get(name).cloned()
    }

    fn repo_revisions(&self, name: &str) -> Vec<PackageRecord> {
        self.repo.get(name).cloned().into_iter().collect()
    }

    fn base_component(&self) -> Vec<String> {
        self.base.clone()
    }

    fn bootstrap_package(&self) -> &str {
        &self.bootstrap
    }
}
