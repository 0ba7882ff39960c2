use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("unknown repository '{0}'")]
    UnknownRepo(String),
    #[error("repository '{0}' already exists")]
    AlreadyExists(String),
    #[error("repository '{repo}' targets distribution '{expected}', found '{found}'")]
    IncompatibleDistribution {
        repo: String,
        expected: String,
        found: String,
    },
    #[error("index for '{0}' is corrupt")]
    IndexCorrupt(String),
    #[error("repository '{repo}' unreachable: {message}")]
    Unreachable { repo: String, message: String },
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::DeError),
}

impl From<RepoError> for coralpkg_core::Error {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::UnknownRepo(name) | RepoError::AlreadyExists(name) => {
                coralpkg_core::Error::unknown_repo(name)
            }
            RepoError::IncompatibleDistribution {
                repo,
                expected,
                found,
            } => coralpkg_core::Error::IncompatibleDistribution {
                code: coralpkg_core::ErrorCode::E0301,
                repo,
                expected,
                found,
            },
            RepoError::IndexCorrupt(repo) => coralpkg_core::Error::IndexCorrupt {
                code: coralpkg_core::ErrorCode::E0302,
                repo,
            },
            RepoError::Unreachable { repo, message } => coralpkg_core::Error::RepoUnreachable {
                code: coralpkg_core::ErrorCode::E0303,
                repo,
                message,
            },
            RepoError::Io { path, source } => coralpkg_core::Error::io(path, source),
            RepoError::Xml(e) => coralpkg_core::Error::Serialization {
                code: coralpkg_core::ErrorCode::E0802,
                message: e.to_string(),
            },
        }
    }
}
