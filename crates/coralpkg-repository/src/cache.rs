//! On-disk cache of parsed repository indices, invalidated by a remote
//! change token (an `ETag`-like opaque string) rather than a fixed TTL.

use crate::error::RepoError;
use crate::types::RepoIndex;
use coralpkg_core::{Repo, RepoStatus};
use std::path::PathBuf;

/// Caches one [`RepoIndex`] per repository under `index_dir`, keyed by
/// repository name, alongside the remote token that produced it.
pub struct IndexCache {
    index_dir: PathBuf,
}

impl IndexCache {
    #[must_use]
    pub fn new(index_dir: PathBuf) -> Self {
        Self { index_dir }
    }

    fn index_path(&self, repo: &str) -> PathBuf {
        self.index_dir.join(repo).join("coralpkg-index.xml")
    }

    fn token_path(&self, repo: &str) -> PathBuf {
        self.index_dir.join(repo).join("token")
    }

    fn token_for(&self, repo: &str) -> Option<String> {
        std::fs::read_to_string(self.token_path(repo)).ok()
    }

    /// Load the cached index for `repo` if its cached token still matches
    /// `remote_token`; otherwise fetch a fresh copy via `fetch`, parse it,
    /// persist it, and update the cached token. `fetch` returns the raw
    /// index bytes and the remote token (e.g. an ETag or content hash).
    pub fn load_or_refresh(
        &self,
        repo: &Repo,
        remote_token: &str,
        fetch: &dyn Fn(&str) -> Result<Vec<u8>, RepoError>,
        expected_distro: (&str, &str),
    ) -> Result<RepoIndex, RepoError> {
        if self.token_for(&repo.name).as_deref() == Some(remote_token) {
            if let Ok(xml) = std::fs::read_to_string(self.index_path(&repo.name)) {
                if let Ok(index) = quick_xml::de::from_str::<RepoIndex>(&xml) {
                    return Ok(index);
                }
            }
        }

        let bytes = fetch(&repo.index_uri)?;
        let xml = String::from_utf8(bytes).map_err(|_| RepoError::IndexCorrupt(repo.name.clone()))?;
        let index: RepoIndex =
            quick_xml::de::from_str(&xml).map_err(|_| RepoError::IndexCorrupt(repo.name.clone()))?;

        let (expected_name, expected_arch) = expected_distro;
        if index.distribution.source_name != expected_name
            || index.distribution.architecture != expected_arch
        {
            return Err(RepoError::IncompatibleDistribution {
                repo: repo.name.clone(),
                expected: format!("{expected_name}/{expected_arch}"),
                found: format!(
                    "{}/{}",
                    index.distribution.source_name, index.distribution.architecture
                ),
            });
        }

        let dir = self.index_dir.join(&repo.name);
        std::fs::create_dir_all(&dir).map_err(|e| RepoError::Io {
            path: dir.clone(),
            source: e,
        })?;
        std::fs::write(self.index_path(&repo.name), &xml).map_err(|e| RepoError::Io {
            path: self.index_path(&repo.name),
            source: e,
        })?;
        std::fs::write(self.token_path(&repo.name), remote_token).map_err(|e| RepoError::Io {
            path: self.token_path(&repo.name),
            source: e,
        })?;
        Ok(index)
    }
}

/// Marks `repo` `Inactive` when an [`RepoError::IncompatibleDistribution`]
/// was just raised for it, per spec: distro mismatch deactivates rather
/// than aborts unless the caller explicitly ignores the check.
pub fn deactivate_on_incompatible(repo: &mut Repo, ignore_check: bool) -> bool {
    if ignore_check {
        return false;
    }
    repo.status = RepoStatus::Inactive;
    true
}
