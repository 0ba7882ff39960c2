//! Shared domain primitives used across every coralpkg crate: package
//! identity, relations (dependency/conflict constraints), repository
//! metadata, and the installed-package record.

use crate::{Error, Result};
use coralpkg_version::{Revision, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A package name. ASCII, no whitespace; validated by [`PackageId::new`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    /// Validate and wrap a package name.
    ///
    /// # Errors
    /// Returns [`Error::InvalidPackageName`] if `name` is empty, contains
    /// whitespace, or non-ASCII bytes.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() || !name.is_ascii() || name.chars().any(char::is_whitespace) {
            return Err(Error::InvalidPackageName {
                code: crate::ErrorCode::E0104,
                raw: name,
            });
        }
        Ok(Self(name))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully identified revision: `(name, version, release, distro_id, arch)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionId {
    pub name: PackageId,
    pub revision: Revision,
    pub distro_id: String,
    pub arch: String,
}

/// The indirection a [`Relation`] uses to match something other than a
/// package name directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationType {
    /// Resolve through the 32-bit pkg-config provides map.
    Pkgconfig32,
    /// Resolve through the pkg-config provides map.
    Pkgconfig,
}

/// A dependency or conflict constraint against a package name or a
/// pkg-config capability name.
///
/// Satisfaction short-circuits: an exact `version` bound, if present, must
/// match exactly regardless of `version_from`/`version_to`; likewise an
/// exact `release` bound overrides `release_from`/`release_to`. This
/// mirrors the reference implementation's relation-satisfaction order
/// rather than merging all bounds into one range check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub package: String,
    pub version: Option<Version>,
    pub version_from: Option<Version>,
    pub version_to: Option<Version>,
    pub release: Option<u32>,
    pub release_from: Option<u32>,
    pub release_to: Option<u32>,
    pub rel_type: Option<RelationType>,
}

impl Relation {
    #[must_use]
    pub fn exact(package: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            version: None,
            version_from: None,
            version_to: None,
            release: None,
            release_from: None,
            release_to: None,
            rel_type: None,
        }
    }

    /// `true` iff `candidate` (for the resolved package name `resolved_name`,
    /// post pkg-config indirection) satisfies this relation's bounds.
    #[must_use]
    pub fn satisfies(&self, resolved_name: &str, candidate: &Revision) -> bool {
        if resolved_name != self.target_name() {
            return false;
        }
        if !Self::satisfies_version(self, candidate) {
            return false;
        }
        Self::satisfies_release(self, candidate)
    }

    fn satisfies_version(&self, candidate: &Revision) -> bool {
        if let Some(exact) = &self.version {
            return &candidate.version == exact;
        }
        if let Some(from) = &self.version_from {
            if &candidate.version < from {
                return false;
            }
        }
        if let Some(to) = &self.version_to {
            if &candidate.version > to {
                return false;
            }
        }
        true
    }

    fn satisfies_release(&self, candidate: &Revision) -> bool {
        if let Some(exact) = self.release {
            return candidate.release == exact;
        }
        if let Some(from) = self.release_from {
            if candidate.release < from {
                return false;
            }
        }
        if let Some(to) = self.release_to {
            if candidate.release > to {
                return false;
            }
        }
        true
    }

    /// The name this relation resolves against directly; for pkg-config
    /// relations this is the pkg-config capability name, not a package
    /// name, and must be resolved through a provides map first.
    #[must_use]
    pub fn target_name(&self) -> &str {
        &self.package
    }
}

/// A dependency relation, distinguished from a bare [`Relation`] only by
/// carrying the pkg-config indirection type inline (the reference
/// implementation models `Dependency` as `Relation` plus a `type` field).
pub type Dependency = Relation;

/// The media class a repository is attached through; repositories sort
/// primarily by this class (cd, then usb, then remote, then local) and
/// secondarily by user-assigned position within the class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Media {
    Cd,
    Usb,
    Remote,
    Local,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RepoStatus {
    Active,
    Inactive,
}

/// Repository metadata as tracked by the repository manager.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Repo {
    pub name: String,
    pub index_uri: String,
    pub status: RepoStatus,
    pub media: Media,
    pub priority: u32,
}

/// A single file entry recorded for a package, realized the same way in
/// both the package archive's `files.xml` and the install DB's file list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub hash: Option<String>,
    pub kind: FileKind,
    pub mode: u32,
    pub owner: (String, String),
    pub permanent: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileKind {
    Regular,
    Config,
    Dir,
    Symlink(String),
    Doc,
    Executable,
}

/// A `source_release -> (delta_uri, delta_hash)` table for binary deltas
/// against older releases of the same package.
pub type DeltaTable = BTreeMap<u32, (String, String)>;

/// An action declared by an [`UpdateHistoryEntry`], consulted during
/// upgrade planning to pull in packages that would otherwise miss a
/// semantically relevant rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateAction {
    /// Reverse dependencies of each named package should be upgraded
    /// alongside this release, since this release changed something
    /// they depend on in a way the version/release bump alone doesn't
    /// capture (e.g. an ABI-affecting rebuild).
    ReverseDependencyUpdate(Vec<String>),
}

/// A single entry in a package's bounded update history, as carried by the
/// repository index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateHistoryEntry {
    pub release: u32,
    pub version: Version,
    pub date: String,
    pub action: Option<UpdateAction>,
}

/// The metadata for one package revision as published by a repository
/// (`metadata.xml` inside the archive, and the repository index's
/// per-package record).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: PackageId,
    pub version: Version,
    pub release: u32,
    pub distro_id: String,
    pub arch: String,
    pub deps: Vec<Dependency>,
    pub conflicts: Vec<Relation>,
    pub replaces: Vec<Relation>,
    pub provides: Vec<String>,
    pub file_list_uri: String,
    pub package_uri: String,
    pub package_hash: String,
    pub installed_size: u64,
    pub deltas: DeltaTable,
    pub update_history: Vec<UpdateHistoryEntry>,
}

impl PackageRecord {
    #[must_use]
    pub fn revision(&self) -> Revision {
        Revision::new(self.version.clone(), self.release)
    }
}

/// The install reason recorded for an installed package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstallReason {
    Explicit,
    Automatic,
}

/// An installed-package record: a [`PackageRecord`] plus the bookkeeping
/// the install DB needs (timestamp, reason, recorded files, pending
/// reconfiguration flag).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstalledRecord {
    pub record: PackageRecord,
    pub installed_at: chrono::DateTime<chrono::Utc>,
    pub reason: InstallReason,
    pub files: Vec<FileEntry>,
    pub needs_reconfigure: bool,
}

impl InstalledRecord {
    #[must_use]
    pub fn config_files(&self) -> Vec<&FileEntry> {
        self.files
            .iter()
            .filter(|f| matches!(f.kind, FileKind::Config))
            .collect()
    }
}
