//! The operation history log: one XML file per transaction under the
//! history directory, named `NNN_<type>.xml` with a monotonically
//! increasing `NNN`, listed newest first on query.
//!
//! Grounded on the reference tooling's `History` class: the same
//! `_get_latest`-then-zero-padded-number-prefix file naming, and the
//! same operation/package/repo record shape.

pub mod error;
mod takeback;

pub use error::HistoryError;
pub use takeback::{diff_for_takeback, RequiredAction};

use coralpkg_installdb::InstallDb;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperationKind {
    Install,
    Upgrade,
    Reinstall,
    Downgrade,
    Remove,
    Snapshot,
    Takeback,
    RepoUpdate,
}

impl OperationKind {
    pub(crate) fn as_file_tag(self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Upgrade => "upgrade",
            Self::Reinstall => "reinstall",
            Self::Downgrade => "downgrade",
            Self::Remove => "remove",
            Self::Snapshot => "snapshot",
            Self::Takeback => "takeback",
            Self::RepoUpdate => "repoupdate",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageVersionInfo {
    pub version: String,
    pub release: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageEntry {
    #[serde(rename = "@operation")]
    pub operation: String,
    #[serde(rename = "@type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Before", skip_serializing_if = "Option::is_none")]
    pub before: Option<PackageVersionInfo>,
    #[serde(rename = "After", skip_serializing_if = "Option::is_none")]
    pub after: Option<PackageVersionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoEntry {
    #[serde(rename = "@operation")]
    pub operation: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Uri")]
    pub uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub number: u32,
    #[serde(rename = "@type")]
    pub operation_type: String,
    #[serde(rename = "@date")]
    pub date: String,
    #[serde(rename = "@time")]
    pub time: String,
    #[serde(rename = "Package", default)]
    pub packages: Vec<PackageEntry>,
    #[serde(rename = "Repository", default)]
    pub repos: Vec<RepoEntry>,
}

/// One in-progress entry being assembled before [`HistoryLog::commit`].
pub struct PendingEntry {
    number: u32,
    kind: OperationKind,
    entry: HistoryEntry,
}

impl PendingEntry {
    pub fn add_package(
        &mut self,
        name: impl Into<String>,
        operation: &str,
        before: Option<(String, u32)>,
        after: Option<(String, u32)>,
        delta: bool,
    ) {
        self.entry.packages.push(PackageEntry {
            operation: operation.to_string(),
            kind: delta.then(|| "delta".to_string()),
            name: name.into(),
            before: before.map(|(version, release)| PackageVersionInfo { version, release }),
            after: after.map(|(version, release)| PackageVersionInfo { version, release }),
        });
    }

    pub fn add_repo(&mut self, name: impl Into<String>, uri: impl Into<String>, operation: &str) {
        self.entry.repos.push(RepoEntry {
            operation: operation.to_string(),
            name: name.into(),
            uri: uri.into(),
        });
    }
}

pub struct HistoryLog {
    dir: PathBuf,
}

impl HistoryLog {
    #[must_use]
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn latest_number(&self) -> Result<u32, HistoryError> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Ok(0);
        };
        let mut max = 0u32;
        for entry in entries.filter_map(Result::ok) {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !name.ends_with(".xml") {
                continue;
            }
            if let Some((prefix, _)) = name.split_once('_') {
                if let Ok(n) = prefix.parse::<u32>() {
                    max = max.max(n);
                }
            }
        }
        Ok(max)
    }

    /// Starts a new entry with the next monotonic number. Build it up
    /// with [`PendingEntry::add_package`]/[`PendingEntry::add_repo`],
    /// then [`HistoryLog::commit`] to write it to disk, always last in
    /// the per-package transaction so a crash mid-apply never fabricates
    /// a history record for work that didn't finish.
    pub fn start(&self, kind: OperationKind, now: chrono::DateTime<chrono::Utc>) -> Result<PendingEntry, HistoryError> {
        let number = self.latest_number()? + 1;
        Ok(PendingEntry {
            number,
            kind,
            entry: HistoryEntry {
                number,
                operation_type: kind.as_file_tag().to_string(),
                date: now.format("%Y-%m-%d").to_string(),
                time: now.format("%H:%M").to_string(),
                packages: Vec::new(),
                repos: Vec::new(),
            },
        })
    }

    fn path_for(&self, number: u32, kind: OperationKind) -> PathBuf {
        self.dir.join(format!("{number:03}_{}.xml", kind.as_file_tag()))
    }

    pub fn commit(&self, pending: PendingEntry) -> Result<u32, HistoryError> {
        std::fs::create_dir_all(&self.dir).map_err(|e| HistoryError::Io {
            path: self.dir.clone(),
            source: e,
        })?;
        let path = self.path_for(pending.number, pending.kind);
        let xml = quick_xml::se::to_string(&pending.entry).map_err(HistoryError::Xml)?;
        std::fs::write(&path, xml).map_err(|e| HistoryError::Io { path, source: e })?;
        debug!(number = pending.number, "committed history entry");
        Ok(pending.number)
    }

    /// Captures the current installed set (names and revisions) as a
    /// `snapshot` entry.
    pub fn snapshot(&self, installdb: &InstallDb) -> Result<u32, HistoryError> {
        let mut pending = self.start(OperationKind::Snapshot, now())?;
        for name in installdb.list_installed() {
            if let Ok(record) = installdb.get(&name) {
                pending.add_package(
                    &name,
                    "snapshot",
                    None,
                    Some((record.record.version.to_string(), record.record.release)),
                    false,
                );
            }
        }
        self.commit(pending)
    }

    /// Every entry, newest first.
    pub fn list(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let Ok(entries) = std::fs::read_dir(&self.dir) else {
            return Ok(Vec::new());
        };
        let mut files: Vec<(u32, PathBuf)> = Vec::new();
        for entry in entries.filter_map(Result::ok) {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if let Some((prefix, _)) = name.split_once('_') {
                if let Ok(n) = prefix.parse::<u32>() {
                    files.push((n, path));
                }
            }
        }
        files.sort_by(|a, b| b.0.cmp(&a.0));

        let mut out = Vec::with_capacity(files.len());
        for (_, path) in files {
            let text = std::fs::read_to_string(&path).map_err(|e| HistoryError::Io {
                path: path.clone(),
                source: e,
            })?;
            let entry: HistoryEntry = quick_xml::de::from_str(&text)?;
            out.push(entry);
        }
        Ok(out)
    }

    pub fn get(&self, number: u32) -> Result<HistoryEntry, HistoryError> {
        self.list()?
            .into_iter()
            .find(|e| e.number == number)
            .ok_or(HistoryError::NotFound(number))
    }
}

fn now() -> chrono::DateTime<chrono::Utc> {
    chrono::Utc::now()
}
