//! Error types for install-DB operations.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InstallDbError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("package '{0}' is not installed")]
    NotInstalled(String),

    #[error("failed to acquire install-db lock on {path} within {timeout:?}")]
    LockTimeout { path: PathBuf, timeout: Duration },

    #[error("install-db record for '{0}' is corrupt")]
    Corrupt(String),
}

impl From<InstallDbError> for coralpkg_core::Error {
    fn from(e: InstallDbError) -> Self {
        match e {
            InstallDbError::NotInstalled(name) => coralpkg_core::Error::unknown_package(name),
            InstallDbError::Io { path, source } => coralpkg_core::Error::io(path, source),
            InstallDbError::Xml(e) => coralpkg_core::Error::Serialization {
                code: coralpkg_core::ErrorCode::E0802,
                message: e.to_string(),
            },
            InstallDbError::LockTimeout { .. } => coralpkg_core::Error::DatabaseBusy {
                code: coralpkg_core::ErrorCode::E0601,
            },
            InstallDbError::Corrupt(what) => coralpkg_core::Error::database_corrupt(what),
        }
    }
}
