//! The install database: one directory per installed package under
//! `package/<name>/{metadata.xml, files.xml, install-info}`, plus a
//! lazily-built, invalidate-on-write reverse-dependency index.

mod atomic;
pub mod error;

pub use error::InstallDbError;

use coralpkg_core::{Dependency, FileEntry, InstallReason, InstalledRecord, PackageRecord};
use coralpkg_version::Revision;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FilesXml {
    #[serde(rename = "File", default)]
    file: Vec<FileEntry>,
}

/// `install-info`: reason, timestamps, and the pending-reconfigure flag,
/// as one small record per package rather than the original's separate
/// flag files (a deliberate simplification, see the project's design
/// notes).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct InstallInfo {
    reason: InstallReason,
    installed_at: chrono::DateTime<chrono::Utc>,
    needs_reconfigure: bool,
}

/// The installed-package record store.
pub struct InstallDb {
    root: PathBuf,
    revdep_cache: RwLock<Option<HashMap<String, Vec<(String, Dependency)>>>>,
}

impl InstallDb {
    #[must_use]
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            revdep_cache: RwLock::new(None),
        }
    }

    fn package_dir(&self, name: &str) -> PathBuf {
        self.root.join("package").join(name)
    }

    fn invalidate_revdep_cache(&self) {
        *self.revdep_cache.write() = None;
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.package_dir(name).join("metadata.xml").exists()
    }

    pub fn get(&self, name: &str) -> Result<InstalledRecord, InstallDbError> {
        let dir = self.package_dir(name);
        if !dir.join("metadata.xml").exists() {
            return Err(InstallDbError::NotInstalled(name.to_string()));
        }
        let metadata_xml = std::fs::read_to_string(dir.join("metadata.xml")).map_err(|e| {
            InstallDbError::Io {
                path: dir.join("metadata.xml"),
                source: e,
            }
        })?;
        let record: PackageRecord = quick_xml::de::from_str(&metadata_xml)?;

        let files = if dir.join("files.xml").exists() {
            let files_xml =
                std::fs::read_to_string(dir.join("files.xml")).map_err(|e| InstallDbError::Io {
                    path: dir.join("files.xml"),
                    source: e,
                })?;
            let wrapper: FilesXml = quick_xml::de::from_str(&files_xml)?;
            wrapper.file
        } else {
            Vec::new()
        };

        let info_path = dir.join("install-info");
        let info: InstallInfo = if info_path.exists() {
            let text = std::fs::read_to_string(&info_path).map_err(|e| InstallDbError::Io {
                path: info_path.clone(),
                source: e,
            })?;
            sonic_rs::from_str(&text)
                .map_err(|_| InstallDbError::Corrupt(name.to_string()))?
        } else {
            return Err(InstallDbError::Corrupt(name.to_string()));
        };

        Ok(InstalledRecord {
            record,
            installed_at: info.installed_at,
            reason: info.reason,
            files,
            needs_reconfigure: info.needs_reconfigure,
        })
    }

    #[must_use]
    pub fn list_installed(&self) -> Vec<String> {
        let dir = self.root.join("package");
        let Ok(entries) = std::fs::read_dir(&dir) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        names.sort();
        names
    }

    #[must_use]
    pub fn list_automatic(&self) -> Vec<String> {
        self.list_installed()
            .into_iter()
            .filter(|name| {
                self.get(name)
                    .map(|r| matches!(r.reason, InstallReason::Automatic))
                    .unwrap_or(false)
            })
            .collect()
    }

    pub fn get_files(&self, name: &str) -> Result<Vec<FileEntry>, InstallDbError> {
        Ok(self.get(name)?.files)
    }

    pub fn get_config_files(&self, name: &str) -> Result<Vec<FileEntry>, InstallDbError> {
        Ok(self
            .get(name)?
            .config_files()
            .into_iter()
            .cloned()
            .collect())
    }

    pub fn get_version(&self, name: &str) -> Result<Revision, InstallDbError> {
        Ok(self.get(name)?.record.revision())
    }

    fn build_revdep_map(&self) -> HashMap<String, Vec<(String, Dependency)>> {
        let mut map: HashMap<String, Vec<(String, Dependency)>> = HashMap::new();
        for name in self.list_installed() {
            let Ok(record) = self.get(&name) else { continue };
            for dep in &record.record.deps {
                map.entry(dep.target_name().to_string())
                    .or_default()
                    .push((name.clone(), dep.clone()));
            }
        }
        map
    }

    /// Packages that depend on `name`, built lazily on first call and
    /// cached until the next mutation.
    #[must_use]
    pub fn get_rev_deps(&self, name: &str) -> Vec<(String, Dependency)> {
        {
            let cache = self.revdep_cache.read();
            if let Some(map) = cache.as_ref() {
                return map.get(name).cloned().unwrap_or_default();
            }
        }
        let map = self.build_revdep_map();
        let result = map.get(name).cloned().unwrap_or_default();
        *self.revdep_cache.write() = Some(map);
        result
    }

    fn rewrite_info(&self, name: &str, f: impl FnOnce(&mut InstallInfo)) -> Result<(), InstallDbError> {
        let dir = self.package_dir(name);
        let info_path = dir.join("install-info");
        let text = std::fs::read_to_string(&info_path).map_err(|e| InstallDbError::Io {
            path: info_path.clone(),
            source: e,
        })?;
        let mut info: InstallInfo =
            sonic_rs::from_str(&text).map_err(|_| InstallDbError::Corrupt(name.to_string()))?;
        f(&mut info);
        let serialized =
            sonic_rs::to_string(&info).map_err(|_| InstallDbError::Corrupt(name.to_string()))?;
        atomic::write_atomic(&info_path, serialized.as_bytes())?;
        self.invalidate_revdep_cache();
        Ok(())
    }

    pub fn mark_pending(&mut self, name: &str) -> Result<(), InstallDbError> {
        self.rewrite_info(name, |info| info.needs_reconfigure = true)
    }

    pub fn clear_pending(&mut self, name: &str) -> Result<(), InstallDbError> {
        self.rewrite_info(name, |info| info.needs_reconfigure = false)
    }

    pub fn add(&mut self, installed: InstalledRecord) -> Result<(), InstallDbError> {
        let name = installed.record.name.as_str().to_string();
        let dir = self.package_dir(&name);

        let metadata_xml =
            quick_xml::se::to_string(&installed.record).map_err(InstallDbError::Xml)?;
        atomic::write_atomic(&dir.join("metadata.xml"), metadata_xml.as_bytes())?;

        let files_xml = quick_xml::se::to_string(&FilesXml {
            file: installed.files.clone(),
        })
        .map_err(InstallDbError::Xml)?;
        atomic::write_atomic(&dir.join("files.xml"), files_xml.as_bytes())?;

        let info = InstallInfo {
            reason: installed.reason,
            installed_at: installed.installed_at,
            needs_reconfigure: installed.needs_reconfigure,
        };
        let info_text = sonic_rs::to_string(&info).map_err(|e| InstallDbError::Corrupt(e.to_string()))?;
        atomic::write_atomic(&dir.join("install-info"), info_text.as_bytes())?;

        debug!(package = %name, "recorded installed package");
        self.invalidate_revdep_cache();
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<(), InstallDbError> {
        let dir = self.package_dir(name);
        if !dir.exists() {
            return Err(InstallDbError::NotInstalled(name.to_string()));
        }
        std::fs::remove_dir_all(&dir).map_err(|e| InstallDbError::Io {
            path: dir,
            source: e,
        })?;
        self.invalidate_revdep_cache();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coralpkg_core::{FileKind, PackageId};
    use coralpkg_version::parse as parse_version;

    fn sample(name: &str, reason: InstallReason, deps: Vec<Dependency>) -> InstalledRecord {
        InstalledRecord {
            record: PackageRecord {
                name: PackageId::new(name).unwrap(),
                version: parse_version("1.0").unwrap(),
                release: 1,
                distro_id: "coral-2024".into(),
                arch: "x86_64".into(),
                deps,
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
            reason,
            files: vec![FileEntry {
                path: format!("/usr/share/{name}/data"),
                hash: None,
                kind: FileKind::Regular,
                mode: 0o644,
                owner: ("root".into(), "root".into()),
                permanent: false,
            }],
            needs_reconfigure: false,
        }
    }

    #[test]
    fn add_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = InstallDb::open(dir.path());
        db.add(sample("base", InstallReason::Explicit, vec![])).unwrap();
        assert!(db.has("base"));
        let got = db.get("base").unwrap();
        assert_eq!(got.record.name.as_str(), "base");
        assert_eq!(got.files.len(), 1);
    }

    #[test]
    fn remove_then_get_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = InstallDb::open(dir.path());
        db.add(sample("base", InstallReason::Explicit, vec![])).unwrap();
        db.remove("base").unwrap();
        assert!(!db.has("base"));
        assert!(matches!(db.get("base"), Err(InstallDbError::NotInstalled(_))));
    }

    #[test]
    fn reverse_deps_invert_dependency_lists() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = InstallDb::open(dir.path());
        db.add(sample("base", InstallReason::Explicit, vec![])).unwrap();
        db.add(sample(
            "app",
            InstallReason::Explicit,
            vec![Dependency::exact("base")],
        ))
        .unwrap();
        let revdeps = db.get_rev_deps("base");
        assert_eq!(revdeps.len(), 1);
        assert_eq!(revdeps[0].0, "app");
    }

    #[test]
    fn mark_and_clear_pending_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = InstallDb::open(dir.path());
        db.add(sample("base", InstallReason::Explicit, vec![])).unwrap();
        db.mark_pending("base").unwrap();
        assert!(db.get("base").unwrap().needs_reconfigure);
        db.clear_pending("base").unwrap();
        assert!(!db.get("base").unwrap().needs_reconfigure);
    }

    #[test]
    fn list_automatic_filters_by_reason() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = InstallDb::open(dir.path());
        db.add(sample("base", InstallReason::Explicit, vec![])).unwrap();
        db.add(sample("libfoo", InstallReason::Automatic, vec![])).unwrap();
        assert_eq!(db.list_automatic(), vec!["libfoo".to_string()]);
    }
}
