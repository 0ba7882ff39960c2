//! Domain-specific assertion helpers for install-db and filesystem state.

use coralpkg_installdb::InstallDb;
use std::path::Path;

/// Panics unless `name` is recorded installed in `db`.
pub fn assert_installed(db: &InstallDb, name: &str) {
    assert!(db.has(name), "expected '{name}' to be installed, but it is not");
}

/// Panics unless `name` is absent from `db`.
pub fn assert_not_installed(db: &InstallDb, name: &str) {
    assert!(!db.has(name), "expected '{name}' not to be installed, but it is");
}

/// Panics unless `name` is installed at exactly `version-release`.
pub fn assert_installed_at(db: &InstallDb, name: &str, revision: &str) {
    let got = db.get_version(name).ok().map(|r| r.to_string());
    assert_eq!(
        got.as_deref(),
        Some(revision),
        "expected '{name}' to be at revision '{revision}'"
    );
}

/// Panics unless `path`, relative to `root`, exists on disk.
pub fn assert_file_exists(root: &Path, path: &str) {
    let full = root.join(path);
    assert!(full.exists(), "expected '{}' to exist", full.display());
}

/// Panics unless `path`, relative to `root`, is absent from disk.
pub fn assert_file_absent(root: &Path, path: &str) {
    let full = root.join(path);
    assert!(!full.exists(), "expected '{}' to be absent", full.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_assertions_match_disk_state() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("present"), b"x").unwrap();
        assert_file_exists(dir.path(), "present");
        assert_file_absent(dir.path(), "missing");
    }
}
