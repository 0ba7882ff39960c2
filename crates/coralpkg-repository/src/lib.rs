//! Repository list (`repos.xml`) and per-repository index cache.

pub mod cache;
pub mod db;
pub mod error;
pub mod types;

pub use cache::{deactivate_on_incompatible, IndexCache};
pub use db::RepositoryDb;
pub use error::RepoError;
pub use types::{Component, DistributionInfo, Group, ReplaceSpec, RepoIndex, SourceSpec};
