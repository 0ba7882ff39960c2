//! `repos.xml`: the ordered, persisted list of known repositories.

use crate::error::RepoError;
use coralpkg_core::{Media, Repo, RepoStatus};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Fixed host-alias rewrite table applied once on [`RepositoryDb::load`];
/// repositories published under a retired hostname are transparently
/// repointed at the current one and the rewrite is persisted so it only
/// runs once.
const LEGACY_HOST_ALIASES: &[(&str, &str)] = &[
    ("https://paketler.pardus.org.tr", "https://packages.coralpkg.example"),
    ("http://paketler.pardus.org.tr", "https://packages.coralpkg.example"),
];

fn rewrite_legacy_uri(uri: &str) -> Option<String> {
    LEGACY_HOST_ALIASES
        .iter()
        .find(|(old, _)| uri.starts_with(old))
        .map(|(old, new)| uri.replacen(old, new, 1))
}

fn media_rank(media: Media) -> u8 {
    match media {
        Media::Cd => 0,
        Media::Usb => 1,
        Media::Remote => 2,
        Media::Local => 3,
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename = "Repositories")]
struct ReposXml {
    #[serde(rename = "Repo", default)]
    repo: Vec<Repo>,
}

/// The ordered repository list, persisted as `repos.xml` under the
/// install root.
pub struct RepositoryDb {
    order_path: PathBuf,
    repos: Vec<Repo>,
}

impl RepositoryDb {
    /// Load `repos.xml` from `root`, applying the legacy URI rewrite and
    /// persisting it if anything changed.
    pub fn load(root: &Path) -> Result<Self, RepoError> {
        let order_path = root.join("repos.xml");
        let mut repos = if order_path.exists() {
            let xml = std::fs::read_to_string(&order_path).map_err(|e| RepoError::Io {
                path: order_path.clone(),
                source: e,
            })?;
            let parsed: ReposXml = quick_xml::de::from_str(&xml)?;
            parsed.repo
        } else {
            Vec::new()
        };

        let mut rewritten = false;
        for repo in &mut repos {
            if let Some(new_uri) = rewrite_legacy_uri(&repo.index_uri) {
                warn!(repo = %repo.name, old = %repo.index_uri, new = %new_uri, "rewriting legacy repository URI");
                repo.index_uri = new_uri;
                rewritten = true;
            }
        }

        let db = Self { order_path, repos };
        if rewritten {
            db.save()?;
        }
        Ok(db)
    }

    pub fn add(&mut self, name: &str, uri: &str, at: Option<usize>) -> Result<(), RepoError> {
        if self.repos.iter().any(|r| r.name == name) {
            return Err(RepoError::AlreadyExists(name.to_string()));
        }
        let position = at.unwrap_or(self.repos.len()) as u32;
        let uri = rewrite_legacy_uri(uri).unwrap_or_else(|| uri.to_string());
        self.repos.push(Repo {
            name: name.to_string(),
            index_uri: uri,
            status: RepoStatus::Active,
            media: Media::Remote,
            priority: position,
        });
        info!(repo = name, "added repository");
        Ok(())
    }

    pub fn remove(&mut self, name: &str) -> Result<(), RepoError> {
        let before = self.repos.len();
        self.repos.retain(|r| r.name != name);
        if self.repos.len() == before {
            return Err(RepoError::UnknownRepo(name.to_string()));
        }
        Ok(())
    }

    fn find_mut(&mut self, name: &str) -> Result<&mut Repo, RepoError> {
        self.repos
            .iter_mut()
            .find(|r| r.name == name)
            .ok_or_else(|| RepoError::UnknownRepo(name.to_string()))
    }

    pub fn set_status(&mut self, name: &str, status: RepoStatus) -> Result<(), RepoError> {
        self.find_mut(name)?.status = status;
        Ok(())
    }

    pub fn set_priority(&mut self, name: &str, pos: usize) -> Result<(), RepoError> {
        self.find_mut(name)?.priority = pos as u32;
        Ok(())
    }

    /// Repositories ordered by `(media_rank, priority)`; `only_active`
    /// filters out `Inactive` repositories first.
    #[must_use]
    pub fn list(&self, only_active: bool) -> Vec<&Repo> {
        let mut out: Vec<&Repo> = self
            .repos
            .iter()
            .filter(|r| !only_active || matches!(r.status, RepoStatus::Active))
            .collect();
        out.sort_by_key(|r| (media_rank(r.media), r.priority));
        out
    }

    pub fn get(&self, name: &str) -> Result<&Repo, RepoError> {
        self.repos
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| RepoError::UnknownRepo(name.to_string()))
    }

    pub fn get_uri(&self, name: &str) -> Result<&str, RepoError> {
        self.get(name).map(|r| r.index_uri.as_str())
    }

    pub fn save(&self) -> Result<(), RepoError> {
        let xml = quick_xml::se::to_string(&ReposXml {
            repo: self.repos.clone(),
        })?;
        if let Some(parent) = self.order_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RepoError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        std::fs::write(&self.order_path, xml).map_err(|e| RepoError::Io {
            path: self.order_path.clone(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_orders_by_media_then_priority() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = RepositoryDb::load(dir.path()).unwrap();
        db.add("remote-b", "https://b.example/index", None).unwrap();
        db.add("remote-a", "https://a.example/index", None).unwrap();
        db.find_mut("remote-a").unwrap().media = Media::Cd;
        let names: Vec<&str> = db.list(false).iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["remote-a", "remote-b"]);
    }

    #[test]
    fn only_active_filters_inactive_repos() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = RepositoryDb::load(dir.path()).unwrap();
        db.add("r1", "https://r1.example/index", None).unwrap();
        db.set_status("r1", RepoStatus::Inactive).unwrap();
        assert!(db.list(true).is_empty());
        assert_eq!(db.list(false).len(), 1);
    }

    #[test]
    fn add_duplicate_name_errors() {
        let dir = tempfile::tempdir().unwrap();
        let mut db = RepositoryDb::load(dir.path()).unwrap();
        db.add("r1", "https://r1.example/index", None).unwrap();
        assert!(matches!(
            db.add("r1", "https://other.example/index", None),
            Err(RepoError::AlreadyExists(_))
        ));
    }

    #[test]
    fn legacy_uri_is_rewritten_on_load() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut db = RepositoryDb::load(dir.path()).unwrap();
            db.add("legacy", "http://paketler.pardus.org.tr/index", None)
                .unwrap();
            db.save().unwrap();
        }
        let db2 = RepositoryDb::load(dir.path()).unwrap();
        assert_eq!(
            db2.get_uri("legacy").unwrap(),
            "https://packages.coralpkg.example/index"
        );
    }
}
