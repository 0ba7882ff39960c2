//! Write-to-temp-then-rename helper shared by every per-package record
//! write, so a crash mid-write never leaves a half-written record.

use crate::error::InstallDbError;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// Write `content` to `target` atomically: write to `target.tmp` in the
/// same directory, `fsync`, then rename over `target`. A crash before the
/// rename leaves `target` untouched; a crash after leaves it fully
/// written, never partial.
pub fn write_atomic(target: &Path, content: &[u8]) -> Result<(), InstallDbError> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| InstallDbError::Io {
        path: parent.to_path_buf(),
        source: e,
    })?;
    let tmp_path = target.with_extension("tmp");
    {
        let mut tmp = File::create(&tmp_path).map_err(|e| InstallDbError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        tmp.write_all(content).map_err(|e| InstallDbError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
        tmp.sync_all().map_err(|e| InstallDbError::Io {
            path: tmp_path.clone(),
            source: e,
        })?;
    }
    fs::rename(&tmp_path, target).map_err(|e| InstallDbError::Io {
        path: target.to_path_buf(),
        source: e,
    })?;
    debug!(target = %target.display(), "atomic write committed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_atomic_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("a/b/record.xml");
        write_atomic(&target, b"hello").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"hello");
        assert!(!target.with_extension("tmp").exists());
    }

    #[test]
    fn write_atomic_overwrites_existing_content() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("record.xml");
        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"second");
    }
}
