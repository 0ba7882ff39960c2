//! Error type for history-log operations.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::DeError),

    #[error("no history entry numbered {0}")]
    NotFound(u32),
}

impl From<HistoryError> for coralpkg_core::Error {
    fn from(e: HistoryError) -> Self {
        match e {
            HistoryError::Io { path, source } => coralpkg_core::Error::io(path, source),
            HistoryError::Xml(e) => coralpkg_core::Error::Serialization {
                code: coralpkg_core::ErrorCode::E0802,
                message: e.to_string(),
            },
            HistoryError::NotFound(n) => coralpkg_core::Error::database_corrupt(format!(
                "history entry {n} not found"
            )),
        }
    }
}
