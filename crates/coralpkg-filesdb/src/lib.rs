//! The files database: a content-addressed index from installed file path
//! to owning package, used to answer "who owns this file" and "where did
//! this package's pkg-config file land" without scanning every installed
//! package's file list.

pub mod error;
mod store;

pub use error::FilesDbError;

use coralpkg_core::FileEntry;
use coralpkg_installdb::InstallDb;
use std::path::{Path, PathBuf};
use store::Store;
use tracing::debug;

const PKGCONFIG_CANDIDATES: &[&str] = &[
    "usr/lib64/pkgconfig",
    "usr/share/pkgconfig",
    "usr/lib32/pkgconfig",
];

fn digest(path: &str) -> [u8; 16] {
    coralpkg_core::ContentHash::of_str(path).into_bytes()
}

/// Path-to-owner index backed by a single versioned file under `root`.
pub struct FilesDb {
    store_path: PathBuf,
    version: u32,
    store: Store,
}

impl FilesDb {
    /// Opens the index at `root/files.db`. If the on-disk version doesn't
    /// match or the file is missing/corrupt and `root` isn't writable, this
    /// returns [`FilesDbError::NeedsRebuild`] and the caller should fall
    /// back to scanning the install database directly.
    pub fn open(root: &Path) -> Result<Self, FilesDbError> {
        let store_path = root.join("files.db");
        match Store::load(&store_path) {
            Ok(Some(store)) => Ok(Self {
                store_path,
                version: store::FORMAT_VERSION,
                store,
            }),
            Ok(None) => {
                let store = Store::empty();
                store.persist(&store_path)?;
                Ok(Self {
                    store_path,
                    version: store::FORMAT_VERSION,
                    store,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Starts from an empty index without touching the on-disk file,
    /// meant to be followed by [`FilesDb::rebuild`] after an
    /// [`FilesDbError::NeedsRebuild`] from [`FilesDb::open`].
    #[must_use]
    pub fn empty(root: &Path) -> Self {
        Self {
            store_path: root.join("files.db"),
            version: store::FORMAT_VERSION,
            store: Store::empty(),
        }
    }

    #[must_use]
    pub fn has(&self, path: &str) -> bool {
        self.store.entries.contains_key(&digest(path))
    }

    #[must_use]
    pub fn get(&self, path: &str) -> Option<String> {
        self.store.entries.get(&digest(path)).cloned()
    }

    pub fn add(&mut self, package: &str, files: &[FileEntry]) -> Result<(), FilesDbError> {
        for file in files {
            self.store
                .entries
                .insert(digest(&file.path), package.to_string());
        }
        self.store.persist(&self.store_path)?;
        debug!(package, count = files.len(), "recorded file ownership");
        Ok(())
    }

    pub fn remove(&mut self, files: &[FileEntry]) -> Result<(), FilesDbError> {
        for file in files {
            self.store.entries.remove(&digest(&file.path));
        }
        self.store.persist(&self.store_path)?;
        Ok(())
    }

    /// Every installed package with at least one file path containing
    /// `substring`, with the matching paths. The index itself only stores
    /// digests, so the actual path strings come from `installdb`.
    #[must_use]
    pub fn search(&self, substring: &str, installdb: &InstallDb) -> Vec<(String, Vec<String>)> {
        let mut results = Vec::new();
        for name in installdb.list_installed() {
            let Ok(files) = installdb.get_files(&name) else {
                continue;
            };
            let matches: Vec<String> = files
                .into_iter()
                .map(|f| f.path)
                .filter(|p| p.contains(substring))
                .collect();
            if !matches.is_empty() {
                results.push((name, matches));
            }
        }
        results
    }

    /// Rebuilds the index from scratch by iterating every installed
    /// package in `installdb`, writing to a fresh store and atomically
    /// swapping it in for the old one.
    pub fn rebuild(&mut self, installdb: &InstallDb) -> Result<(), FilesDbError> {
        let mut fresh = Store::empty();
        for name in installdb.list_installed() {
            let Ok(files) = installdb.get_files(&name) else {
                continue;
            };
            for file in files {
                fresh.entries.insert(digest(&file.path), name.clone());
            }
        }
        fresh.persist(&self.store_path)?;
        self.store = fresh;
        debug!(entries = self.store.entries.len(), "rebuilt files database");
        Ok(())
    }

    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn close(self) {}

    /// Finds the package providing `<name>.pc` by checking the fixed
    /// candidate directories, 64-bit first, matching the donor's
    /// `get_pkgconfig_provider`/`get_pkgconfig32_provider` pair generalized
    /// into one lookup.
    #[must_use]
    pub fn get_pkgconfig_provider(&self, name: &str) -> Option<String> {
        for dir in PKGCONFIG_CANDIDATES {
            let path = format!("/{dir}/{name}.pc");
            if let Some(owner) = self.get(&path) {
                return Some(owner);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coralpkg_core::FileKind;
    use coralpkg_installdb::InstallDb;

    fn file(path: &str) -> FileEntry {
        FileEntry {
            path: path.to_string(),
            hash: None,
            kind: FileKind::Regular,
            mode: 0o644,
            owner: ("root".into(), "root".into()),
            permanent: false,
        }
    }

    #[test]
    fn add_then_get_and_has() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = FilesDb::open(dir.path()).unwrap();
        db.add("base", &[file("/usr/bin/base")]).unwrap();
        assert!(db.has("/usr/bin/base"));
        assert_eq!(db.get("/usr/bin/base").unwrap(), "base");
    }

    #[test]
    fn remove_drops_ownership() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = FilesDb::open(dir.path()).unwrap();
        let f = file("/usr/bin/base");
        db.add("base", &[f.clone()]).unwrap();
        db.remove(&[f]).unwrap();
        assert!(!db.has("/usr/bin/base"));
    }

    #[test]
    fn pkgconfig_provider_checks_fixed_candidates() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = FilesDb::open(dir.path()).unwrap();
        db.add("zlib", &[file("/usr/lib64/pkgconfig/zlib.pc")])
            .unwrap();
        assert_eq!(db.get_pkgconfig_provider("zlib").unwrap(), "zlib");
        assert!(db.get_pkgconfig_provider("nope").is_none());
    }

    #[test]
    fn rebuild_reflects_installdb_state() {
        let dir = tempfile::tempdir().unwrap();
        let installdb_dir = tempfile::tempdir().unwrap();
        let mut installdb = InstallDb::open(installdb_dir.path());
        installdb
            .add(coralpkg_core::InstalledRecord {
                record: coralpkg_core::PackageRecord {
                    name: coralpkg_core::PackageId::new("base").unwrap(),
                    version: coralpkg_version::parse("1.0").unwrap(),
                    release: 1,
                    distro_id: "coral-2024".into(),
                    arch: "x86_64".into(),
                    deps: vec![],
                    conflicts: vec![],
                    replaces: vec![],
                    provides: vec![],
                    file_list_uri: String::new(),
                    package_uri: String::new(),
                    package_hash: String::new(),
                    installed_size: 0,
                    deltas: Default::default(),
                    update_history: vec![],
                },
                installed_at: chrono::Utc::now(),
                reason: coralpkg_core::InstallReason::Explicit,
                files: vec![file("/usr/bin/base")],
                needs_reconfigure: false,
            })
            .unwrap();

        let mut db = FilesDb::open(dir.path()).unwrap();
        db.rebuild(&installdb).unwrap();
        assert_eq!(db.get("/usr/bin/base").unwrap(), "base");
    }
}
