//! Error type for the files database.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilesDbError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("files database at {0} is stale and the store directory is not writable")]
    NeedsRebuild(PathBuf),

    #[error("files database at {0} is corrupt")]
    Corrupt(PathBuf),
}

impl From<FilesDbError> for coralpkg_core::Error {
    fn from(e: FilesDbError) -> Self {
        match e {
            FilesDbError::Io { path, source } => coralpkg_core::Error::io(path, source),
            FilesDbError::NeedsRebuild(path) => coralpkg_core::Error::database_corrupt(format!(
                "files database at {} needs a rebuild",
                path.display()
            )),
            FilesDbError::Corrupt(path) => {
                coralpkg_core::Error::database_corrupt(format!("{}", path.display()))
            }
        }
    }
}
