//! The apply engine: the single-package state machine that actually
//! touches the filesystem. `idle -> fetched -> staged -> installed` for
//! install/upgrade; a separate `idle -> marked -> cleared` path for
//! remove. Everything above this crate (the planner) only ever decides
//! *what* to apply; this crate decides *how*.

pub mod error;

pub use error::ApplyError;

use ahash::AHashSet;
use coralpkg_archive::ArchiveReader;
use coralpkg_core::{FileEntry, FileKind, InstallReason, InstalledRecord};
use coralpkg_installdb::InstallDb;
use coralpkg_filesdb::FilesDb;
use coralpkg_version::Revision;
use sha1::{Digest, Sha1};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{instrument, warn};

/// What kind of transition [`ApplyEngine::install_or_upgrade`] actually
/// performed, for the history entry the planner appends afterward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOperation {
    Install,
    Upgrade,
    Reinstall,
    Downgrade,
    Remove,
}

#[derive(Debug, Clone)]
pub struct ApplyOutcome {
    pub package: String,
    pub operation: ApplyOperation,
    pub before: Option<Revision>,
    pub after: Option<Revision>,
    pub needs_reconfigure: bool,
}

pub fn hash_file(path: &Path) -> Result<String, ApplyError> {
    let mut file = File::open(path).map_err(|e| ApplyError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let mut hasher = Sha1::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf).map_err(|e| ApplyError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}

/// Atomic-rename when possible, copy+fsync+unlink when the stage and
/// destination trees live on different filesystems.
fn move_file(from: &Path, to: &Path) -> Result<(), ApplyError> {
    if let Some(parent) = to.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ApplyError::Io {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) => {
            let mut src = File::open(from).map_err(|e| ApplyError::Io {
                path: from.to_path_buf(),
                source: e,
            })?;
            let mut dst = File::create(to).map_err(|e| ApplyError::Io {
                path: to.to_path_buf(),
                source: e,
            })?;
            std::io::copy(&mut src, &mut dst).map_err(|e| ApplyError::Io {
                path: to.to_path_buf(),
                source: e,
            })?;
            dst.sync_all().map_err(|e| ApplyError::Io {
                path: to.to_path_buf(),
                source: e,
            })?;
            drop(dst);
            std::fs::remove_file(from).map_err(|e| ApplyError::Io {
                path: from.to_path_buf(),
                source: e,
            })?;
            Ok(())
        }
    }
}

fn dest_path(root: &Path, file_path: &str) -> PathBuf {
    root.join(file_path.trim_start_matches('/'))
}

/// Applies one package's install/upgrade/remove/reconcile against a
/// destination root, mutating the install DB and files DB as it goes.
pub struct ApplyEngine<'a> {
    installdb: &'a mut InstallDb,
    filesdb: &'a mut FilesDb,
}

impl<'a> ApplyEngine<'a> {
    pub fn new(installdb: &'a mut InstallDb, filesdb: &'a mut FilesDb) -> Self {
        Self { installdb, filesdb }
    }

    /// Install a package for the first time, or transition it to a
    /// different revision. `stage_root` is a scratch directory this call
    /// owns exclusively (the caller creates and discards it); `dest_root`
    /// is the live install tree. `released` holds the target paths other
    /// packages in this same transaction are dropping (computed by the
    /// planner by diffing each co-upgrading package's old and new file
    /// lists), so a path claimed by `p` that a co-upgrading `q` is giving
    /// up is not flagged as a conflict.
    #[instrument(skip(self, archive, released), fields(dest = %dest_root.display()))]
    pub fn install_or_upgrade(
        &mut self,
        archive: &mut ArchiveReader,
        reason: InstallReason,
        dest_root: &Path,
        stage_root: &Path,
        host: (&str, &str),
        ignore_check: bool,
        ignore_file_conflicts: bool,
        released: &AHashSet<String>,
    ) -> Result<ApplyOutcome, ApplyError> {
        let metadata = archive.extract_metadata()?;
        let new_files = archive.extract_files()?;
        let name = metadata.name.as_str().to_string();

        if !ignore_check {
            archive.verify(&metadata.package_hash)?;
            let (expected_distro, expected_arch) = host;
            if metadata.distro_id != expected_distro || metadata.arch != expected_arch {
                return Err(ApplyError::DistributionMismatch {
                    expected_distro: expected_distro.to_string(),
                    expected_arch: expected_arch.to_string(),
                    found_distro: metadata.distro_id.clone(),
                    found_arch: metadata.arch.clone(),
                });
            }
        }

        let existing = self.installdb.get(&name).ok();
        let before = existing.as_ref().map(|r| r.record.revision());
        let after = metadata.revision();

        let operation = match &before {
            None => ApplyOperation::Install,
            Some(prev) if *prev == after => ApplyOperation::Reinstall,
            Some(prev) if *prev < after => ApplyOperation::Upgrade,
            Some(_) => ApplyOperation::Downgrade,
        };

        archive.extract_full(stage_root)?;

        for file in &new_files {
            if matches!(file.kind, FileKind::Dir) {
                continue;
            }
            if let Some(owner) = self.filesdb.get(&file.path) {
                if owner == name || released.contains(&file.path) {
                    continue;
                }
                if ignore_file_conflicts {
                    warn!(path = %file.path, owner, claimant = %name, "ignoring file conflict");
                } else {
                    return Err(ApplyError::FileConflict {
                        path: file.path.clone(),
                        claimant: name,
                        owner,
                    });
                }
            }
        }

        let mut final_files = Vec::with_capacity(new_files.len());
        for file in new_files {
            let target = dest_path(dest_root, &file.path);
            let stage_path = stage_root.join(file.path.trim_start_matches('/'));

            if matches!(file.kind, FileKind::Dir) {
                std::fs::create_dir_all(&target).map_err(|e| ApplyError::Io {
                    path: target.clone(),
                    source: e,
                })?;
                final_files.push(file);
                continue;
            }

            let recorded_hash = existing
                .as_ref()
                .and_then(|old| old.files.iter().find(|f| f.path == file.path))
                .and_then(|f| f.hash.as_deref());
            let preserve_existing_config = matches!(file.kind, FileKind::Config)
                && target.exists()
                && hash_file(&target).ok().as_deref() != recorded_hash;

            if preserve_existing_config {
                let newconfig = append_suffix(&target, ".newconfig");
                move_file(&stage_path, &newconfig).ok();
                let newconfig_entry = FileEntry {
                    path: format!("{}.newconfig", file.path),
                    ..file.clone()
                };
                final_files.push(file);
                final_files.push(newconfig_entry);
                continue;
            }

            if stage_path.exists() {
                move_file(&stage_path, &target)?;
                set_mode(&target, file.mode);
            }
            final_files.push(file);
        }

        if let Some(old) = &existing {
            let dropped: Vec<FileEntry> = old
                .files
                .iter()
                .filter(|f| !final_files.iter().any(|nf| nf.path == f.path))
                .cloned()
                .collect();
            self.filesdb.remove(&dropped)?;
        }
        self.filesdb.add(&name, &final_files)?;

        let reason = match (&existing, reason) {
            (Some(old), _) if operation == ApplyOperation::Reinstall => old.reason,
            (_, r) => r,
        };
        let needs_reconfigure = archive
            .list_entries()
            .iter()
            .any(|e| e.starts_with(coralpkg_archive::COMAR_PREFIX));

        let installed = InstalledRecord {
            record: metadata,
            installed_at: chrono::Utc::now(),
            reason,
            files: final_files,
            needs_reconfigure,
        };
        self.installdb.add(installed)?;

        Ok(ApplyOutcome {
            package: name,
            operation,
            before,
            after: Some(after),
            needs_reconfigure,
        })
    }

    /// Removes an installed package. `purge` additionally drops
    /// unmodified config files instead of preserving them.
    #[instrument(skip(self), fields(dest = %dest_root.display()))]
    pub fn remove(&mut self, name: &str, dest_root: &Path, purge: bool) -> Result<ApplyOutcome, ApplyError> {
        let installed = self
            .installdb
            .get(name)
            .map_err(|_| ApplyError::NotInstalled(name.to_string()))?;

        for file in &installed.files {
            if matches!(file.kind, FileKind::Dir) {
                continue;
            }
            let target = dest_path(dest_root, &file.path);
            if !target.exists() {
                continue;
            }
            let unmodified = hash_file(&target).ok().as_deref() == file.hash.as_deref();
            let should_unlink = unmodified || (matches!(file.kind, FileKind::Config) && purge);
            if should_unlink {
                std::fs::remove_file(&target).map_err(|e| ApplyError::Io {
                    path: target,
                    source: e,
                })?;
            }
        }

        let before = Some(installed.record.revision());
        self.filesdb.remove(&installed.files)?;
        self.installdb.remove(name)?;

        Ok(ApplyOutcome {
            package: name.to_string(),
            operation: ApplyOperation::Remove,
            before,
            after: None,
            needs_reconfigure: false,
        })
    }

    /// Crash-repair pass: reconciles the files DB against the installed
    /// record set, for the window between a files-DB update and the
    /// installed-record write that a crash could otherwise leave stale.
    #[instrument(skip(self))]
    pub fn reconcile(&mut self) -> Result<(), ApplyError> {
        self.filesdb.rebuild(self.installdb)?;
        Ok(())
    }
}

fn append_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut s = path.as_os_str().to_os_string();
    s.push(suffix);
    PathBuf::from(s)
}

#[cfg(unix)]
fn set_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Ok(meta) = std::fs::metadata(path) {
        let mut perms = meta.permissions();
        perms.set_mode(mode);
        let _ = std::fs::set_permissions(path, perms);
    }
}

#[cfg(not(unix))]
fn set_mode(_path: &Path, _mode: u32) {}

#[cfg(test)]
mod tests {
    use super::*;
    use coralpkg_archive::ArchiveWriter;
    use coralpkg_core::{InstallReason, PackageId, PackageRecord};
    use coralpkg_version::parse as parse_version;

    fn record(name: &str, version: &str, release: u32) -> PackageRecord {
        PackageRecord {
            name: PackageId::new(name).unwrap(),
            version: parse_version(version).unwrap(),
            release,
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
        }
    }

    fn write_archive(path: &Path, rec: &PackageRecord, files: &[FileEntry], payload: &Path) {
        let sink = File::create(path).unwrap();
        let writer = ArchiveWriter::new(sink);
        writer.write_package(rec, files, &[], payload).unwrap();
    }

    #[test]
    fn fresh_install_populates_installdb_and_filesdb() {
        let installdb_dir = tempfile::tempdir().unwrap();
        let filesdb_dir = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let stage = tempfile::tempdir().unwrap();
        let payload = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(payload.path().join("usr/bin")).unwrap();
        std::fs::write(payload.path().join("usr/bin/coral"), b"binary").unwrap();

        let rec = record("coral-base", "1.0", 1);
        let files = vec![FileEntry {
            path: "/usr/bin/coral".into(),
            hash: Some(hash_file(&payload.path().join("usr/bin/coral")).unwrap()),
            kind: FileKind::Executable,
            mode: 0o755,
            owner: ("root".into(), "root".into()),
            permanent: false,
        }];

        let archive_path = tempfile::NamedTempFile::new().unwrap();
        write_archive(archive_path.path(), &rec, &files, payload.path());

        let mut installdb = InstallDb::open(installdb_dir.path());
        let mut filesdb = FilesDb::open(filesdb_dir.path()).unwrap();
        let mut engine = ApplyEngine::new(&mut installdb, &mut filesdb);

        let mut reader = ArchiveReader::open(archive_path.path()).unwrap();
        let outcome = engine
            .install_or_upgrade(
                &mut reader,
                InstallReason::Explicit,
                dest.path(),
                stage.path(),
                ("coral-2024", "x86_64"),
                true,
                false,
                &AHashSet::default(),
            )
            .unwrap();

        assert_eq!(outcome.operation, ApplyOperation::Install);
        assert!(installdb.has("coral-base"));
        assert!(filesdb.has("/usr/bin/coral"));
        assert!(dest.path().join("usr/bin/coral").exists());
    }

    #[test]
    fn remove_of_unknown_package_errors() {
        let installdb_dir = tempfile::tempdir().unwrap();
        let filesdb_dir = tempfile::tempdir().unwrap();
        let dest = tempfile::tempdir().unwrap();
        let mut installdb = InstallDb::open(installdb_dir.path());
        let mut filesdb = FilesDb::open(filesdb_dir.path()).unwrap();
        let mut engine = ApplyEngine::new(&mut installdb, &mut filesdb);
        let result = engine.remove("nope", dest.path(), false);
        assert!(matches!(result, Err(ApplyError::NotInstalled(_))));
    }
}
