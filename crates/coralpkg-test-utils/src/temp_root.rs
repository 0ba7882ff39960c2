//! A temporary, on-disk coralpkg install root for integration tests:
//! `var/lib/coralpkg`, `var/cache/coralpkg`, `var/log/coralpkg`, and an
//! optional `repos.xml`, laid out the same way `Planner::open` expects.

use anyhow::Result;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

/// An isolated install root, cleaned up on drop.
#[derive(Debug)]
pub struct TempRoot {
    dir: TempDir,
}

impl TempRoot {
    /// Create a new, empty root with the directories `InstallDb`,
    /// `RepositoryDb`, and `HistoryLog` expect to find.
    pub fn new() -> Result<Self> {
        let dir = tempdir()?;
        std::fs::create_dir_all(dir.path().join("var/lib/coralpkg"))?;
        std::fs::create_dir_all(dir.path().join("var/cache/coralpkg/index"))?;
        std::fs::create_dir_all(dir.path().join("var/log/coralpkg"))?;
        Ok(Self { dir })
    }

    /// The root directory itself (what `Context::root` should point at).
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// `var/cache/coralpkg`, the conventional cache directory.
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.path().join("var/cache/coralpkg")
    }

    /// Write `repos.xml` at the root, as `RepositoryDb::load` expects.
    pub fn write_repos_xml(&self, xml: &str) -> Result<()> {
        std::fs::write(self.path().join("repos.xml"), xml)?;
        Ok(())
    }

    /// Write a repository's cached index XML under
    /// `var/cache/coralpkg/index/<repo>/coralpkg-index.xml`.
    pub fn write_index(&self, repo: &str, xml: &str) -> Result<()> {
        let dir = self.cache_dir().join("index").join(repo);
        std::fs::create_dir_all(&dir)?;
        std::fs::write(dir.join("coralpkg-index.xml"), xml)?;
        Ok(())
    }
}
