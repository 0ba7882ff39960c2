//! Error type for the transaction planner.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PlannerError {
    #[error("resolution failed: {0}")]
    Resolve(#[from] coralpkg_resolver::ResolveError),

    #[error("repository error: {0}")]
    Repo(#[from] coralpkg_repository::RepoError),

    #[error("apply error: {0}")]
    Apply(#[from] coralpkg_apply::ApplyError),

    #[error("install-db error: {0}")]
    InstallDb(#[from] coralpkg_installdb::InstallDbError),

    #[error("files-db error: {0}")]
    FilesDb(#[from] coralpkg_filesdb::FilesDbError),

    #[error("history error: {0}")]
    History(#[from] coralpkg_history::HistoryError),

    #[error("archive error: {0}")]
    Archive(#[from] coralpkg_archive::ArchiveError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("fetch failed for {uri}: {message}")]
    Fetch { uri: String, message: String },

    #[error("unresolved internal conflicts: {0:?}")]
    InternalConflict(Vec<(String, String)>),

    #[error("unresolved external conflicts, remove first: {0:?}")]
    UnresolvedExternalConflicts(Vec<String>),

    #[error("package '{0}' is not known to any repository")]
    UnknownPackage(String),
}

impl From<PlannerError> for coralpkg_core::Error {
    fn from(e: PlannerError) -> Self {
        match e {
            PlannerError::Resolve(e) => match e {
                coralpkg_resolver::ResolveError::UnsatisfiedDependency(pkg, _) => {
                    coralpkg_core::Error::UnsatisfiedDependency {
                        code: coralpkg_core::ErrorCode::E0201,
                        package: pkg,
                    }
                }
                coralpkg_resolver::ResolveError::Cycle(path) => coralpkg_core::Error::cycle(path),
                coralpkg_resolver::ResolveError::InternalConflict(packages) => {
                    coralpkg_core::Error::InternalConflict {
                        code: coralpkg_core::ErrorCode::E0203,
                        packages,
                    }
                }
                coralpkg_resolver::ResolveError::ProtectedRemoval(names) => {
                    coralpkg_core::Error::protected_removal(names)
                }
            },
            PlannerError::Repo(e) => e.into(),
            PlannerError::Apply(e) => e.into(),
            PlannerError::InstallDb(e) => e.into(),
            PlannerError::FilesDb(e) => e.into(),
            PlannerError::History(e) => e.into(),
            PlannerError::Archive(e) => coralpkg_core::Error::Serialization {
                code: coralpkg_core::ErrorCode::E0802,
                message: e.to_string(),
            },
            PlannerError::Io(e) => coralpkg_core::Error::io(PathBuf::new(), e),
            PlannerError::Fetch { uri, message } => coralpkg_core::Error::Fetch {
                code: coralpkg_core::ErrorCode::E0701,
                uri,
                message,
            },
            PlannerError::InternalConflict(packages) => coralpkg_core::Error::InternalConflict {
                code: coralpkg_core::ErrorCode::E0203,
                packages: packages.into_iter().flat_map(|(a, b)| [a, b]).collect(),
            },
            PlannerError::UnresolvedExternalConflicts(names) => {
                coralpkg_core::Error::InternalConflict {
                    code: coralpkg_core::ErrorCode::E0203,
                    packages: names,
                }
            }
            PlannerError::UnknownPackage(name) => coralpkg_core::Error::unknown_package(name),
        }
    }
}
