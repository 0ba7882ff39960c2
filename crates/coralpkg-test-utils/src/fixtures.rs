//! Pre-built domain fixtures shared across crate test suites: package
//! records, installed records, and repository indices for a small
//! synthetic distribution.

use coralpkg_core::domain::{
    Dependency, FileEntry, FileKind, InstallReason, InstalledRecord, PackageId, PackageRecord, Relation,
};
use coralpkg_version::Version;
use std::str::FromStr;

/// Collection of pre-built fixtures for a synthetic `coral-2024` distribution.
#[derive(Debug)]
pub struct Fixtures;

impl Fixtures {
    /// A bare package record with no dependencies, at version 1.0-1.
    #[must_use]
    pub fn package(name: &str) -> PackageRecord {
        Self::package_at(name, "1.0", 1)
    }

    /// A package record at an explicit version/release.
    #[must_use]
    pub fn package_at(name: &str, version: &str, release: u32) -> PackageRecord {
        PackageRecord {
            name: PackageId::new(name).expect("valid fixture package name"),
            version: Version::from_str(version).expect("valid fixture version"),
            release,
            distro_id: "coral-2024".to_string(),
            arch: "x86_64".to_string(),
            deps: Vec::new(),
            conflicts: Vec::new(),
            replaces: Vec::new(),
            provides: Vec::new(),
            file_list_uri: format!("{name}/files.xml"),
            package_uri: format!("{name}/{name}-{version}-{release}.coral"),
            package_hash: "0".repeat(64),
            installed_size: 1024,
            deltas: Default::default(),
            update_history: Vec::new(),
        }
    }

    /// A package record depending on every name in `deps`.
    #[must_use]
    pub fn package_with_deps(name: &str, deps: &[&str]) -> PackageRecord {
        let mut record = Self::package(name);
        record.deps = deps.iter().map(|d| Self::unversioned_relation(d)).collect();
        record
    }

    /// A dependency relation with no version constraint.
    #[must_use]
    pub fn unversioned_relation(package: &str) -> Relation {
        Relation {
            package: package.to_string(),
            version: None,
            version_from: None,
            version_to: None,
            release: None,
            release_from: None,
            release_to: None,
            rel_type: None,
        }
    }

    /// The record plus enough bookkeeping to be a plausible install-db entry.
    #[must_use]
    pub fn installed(record: PackageRecord, reason: InstallReason) -> InstalledRecord {
        let files = vec![FileEntry {
            path: format!("usr/bin/{}", record.name.as_str()),
            hash: Some("0".repeat(64)),
            kind: FileKind::Executable,
            mode: 0o755,
            owner: ("root".to_string(), "root".to_string()),
            permanent: false,
        }];
        InstalledRecord {
            record,
            installed_at: chrono::Utc::now(),
            reason,
            files,
            needs_reconfigure: false,
        }
    }

    /// Three unrelated packages, `a`, `b`, `c`, each at `1.0-1`.
    #[must_use]
    pub fn independent_packages() -> Vec<PackageRecord> {
        vec![Self::package("a"), Self::package("b"), Self::package("c")]
    }

    /// A linear dependency chain `leaf <- mid <- top`.
    #[must_use]
    pub fn chain_packages() -> Vec<PackageRecord> {
        vec![
            Self::package("leaf"),
            Self::package_with_deps("mid", &["leaf"]),
            Self::package_with_deps("top", &["mid"]),
        ]
    }
}

/// Type alias kept for symmetry with [`Dependency`] elsewhere; relations and
/// dependencies are the same shape.
pub type FixtureDependency = Dependency;
