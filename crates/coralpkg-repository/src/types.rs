//! Repository index data model: the parsed form of a repository's
//! `coralpkg-index.xml`.

use coralpkg_core::PackageRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DistributionInfo {
    pub source_name: String,
    pub version: String,
    pub architecture: String,
    pub obsoletes: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSpec {
    pub name: String,
    pub source_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    pub packages: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub components: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceSpec {
    pub from: String,
    pub to: String,
}

/// The cached, parsed form of one repository's index file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoIndex {
    pub distribution: DistributionInfo,
    pub sources: Vec<SourceSpec>,
    pub packages: Vec<PackageRecord>,
    pub components: Vec<Component>,
    pub groups: Vec<Group>,
    pub obsoletes: Vec<String>,
    pub replaces: Vec<ReplaceSpec>,
}

impl RepoIndex {
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&PackageRecord> {
        self.packages.iter().find(|p| p.name.as_str() == name)
    }
}
