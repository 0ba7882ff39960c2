//! Error type for the apply engine.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("archive error: {0}")]
    Archive(#[from] coralpkg_archive::ArchiveError),

    #[error("install-db error: {0}")]
    InstallDb(#[from] coralpkg_installdb::InstallDbError),

    #[error("files-db error: {0}")]
    FilesDb(#[from] coralpkg_filesdb::FilesDbError),

    #[error("'{path}' is owned by '{owner}', cannot be claimed by '{claimant}'")]
    FileConflict {
        path: String,
        claimant: String,
        owner: String,
    },

    #[error("package is for {found_distro}/{found_arch}, host is {expected_distro}/{expected_arch}")]
    DistributionMismatch {
        expected_distro: String,
        expected_arch: String,
        found_distro: String,
        found_arch: String,
    },

    #[error("package '{0}' is not installed")]
    NotInstalled(String),
}

impl From<ApplyError> for coralpkg_core::Error {
    fn from(e: ApplyError) -> Self {
        match e {
            ApplyError::Io { path, source } => coralpkg_core::Error::io(path, source),
            ApplyError::Archive(e) => coralpkg_core::Error::Serialization {
                code: coralpkg_core::ErrorCode::E0802,
                message: e.to_string(),
            },
            ApplyError::InstallDb(e) => e.into(),
            ApplyError::FilesDb(e) => e.into(),
            ApplyError::FileConflict { path, claimant, owner } => coralpkg_core::Error::FileConflict {
                code: coralpkg_core::ErrorCode::E0501,
                path: PathBuf::from(path),
                new_owner: claimant,
                old_owner: owner,
            },
            ApplyError::DistributionMismatch {
                expected_distro,
                expected_arch,
                found_distro,
                found_arch,
            } => coralpkg_core::Error::IncompatibleDistribution {
                code: coralpkg_core::ErrorCode::E0301,
                repo: String::new(),
                expected: format!("{expected_distro}/{expected_arch}"),
                found: format!("{found_distro}/{found_arch}"),
            },
            ApplyError::NotInstalled(name) => coralpkg_core::Error::unknown_package(name),
        }
    }
}
