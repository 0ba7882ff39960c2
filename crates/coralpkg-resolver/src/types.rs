//! The resolver's read-only view of package state and its plan/error
//! vocabulary.

use coralpkg_core::{Dependency, PackageRecord};
use coralpkg_graph::Digraph;
use coralpkg_version::Revision;
use thiserror::Error;

/// A dependency-ordered set of package names to act on, plus the graph
/// it was derived from (kept so callers can inspect edges for
/// diagnostics without recomputing them).
#[derive(Debug, Clone)]
pub struct Plan {
    pub graph: Digraph<String>,
    pub order: Vec<String>,
}

impl Plan {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            graph: Digraph::new(),
            order: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    #[error("unsatisfied dependency of '{0}': {1:?}")]
    UnsatisfiedDependency(String, Dependency),
    #[error("dependency cycle: {0:?}")]
    Cycle(Vec<String>),
    #[error("internal conflict among planned packages: {0:?}")]
    InternalConflict(Vec<String>),
    #[error("refusing to remove protected base packages: {0:?}")]
    ProtectedRemoval(Vec<String>),
}

/// Internal vs. external conflicts found by [`crate::check_conflicts`].
#[derive(Debug, Clone, Default)]
pub struct ConflictReport {
    /// Pairs within the plan's own order that mutually conflict.
    pub internal: Vec<(String, String)>,
    /// Installed packages outside the plan that conflict with something
    /// in it.
    pub external: Vec<String>,
}

impl ConflictReport {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.internal.is_empty() && self.external.is_empty()
    }
}

/// Read-only access to installed and repository package state, enough
/// for planning without the resolver crate depending on the storage
/// crates' internals directly.
pub trait PackageView {
    fn is_installed(&self, name: &str) -> bool;
    fn installed_revision(&self, name: &str) -> Option<Revision>;
    fn installed_record(&self, name: &str) -> Option<PackageRecord>;
    fn installed_names(&self) -> Vec<String>;
    fn automatic_names(&self) -> Vec<String>;

    /// `(name, relation)` pairs of installed packages that depend on
    /// `name`, as recorded at install time.
    fn installed_rev_deps(&self, name: &str) -> Vec<(String, Dependency)>;

    /// The best (highest version/release) revision of `name` available
    /// across active repositories, if any.
    fn repo_record(&self, name: &str) -> Option<PackageRecord>;

    /// Every revision of `name` available across active repositories,
    /// used where more than the single best revision matters (e.g.
    /// resolvable-conflict upgrade checks).
    fn repo_revisions(&self, name: &str) -> Vec<PackageRecord>;

    /// The `system.base` component's package names.
    fn base_component(&self) -> Vec<String>;

    /// The package that must sort last in a fresh install plan (normally
    /// the filesystem-skeleton package), read from configuration rather
    /// than hardcoded.
    fn bootstrap_package(&self) -> &str;
}
