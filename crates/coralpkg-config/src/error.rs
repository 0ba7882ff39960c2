//! Error type for configuration loading.

use miette::Diagnostic;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug, Diagnostic)]
pub enum ConfigError {
    #[error("configuration file not found: {path}")]
    #[diagnostic(code(config::not_found), help("create the file or pass an explicit path"))]
    NotFound { path: PathBuf },

    #[error("malformed line {line} in {path}: {text}")]
    #[diagnostic(code(config::parse), help("expected 'key = value' or '[section]'"))]
    Parse {
        path: PathBuf,
        line: usize,
        text: String,
    },

    #[error("unknown section '{section}' in {path}")]
    #[diagnostic(code(config::unknown_section))]
    UnknownSection { path: PathBuf, section: String },

    #[error("invalid value for '{key}': {value}")]
    #[diagnostic(code(config::invalid_value), help("{reason}"))]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl From<ConfigError> for coralpkg_core::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::NotFound { path } => coralpkg_core::Error::io(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "configuration file not found"),
            ),
            ConfigError::Io { path, source } => coralpkg_core::Error::io(path, source),
            ConfigError::Parse { path, line, text } => coralpkg_core::Error::Serialization {
                code: coralpkg_core::ErrorCode::E0802,
                message: format!("{}:{line}: {text}", path.display()),
            },
            ConfigError::UnknownSection { path, section } => coralpkg_core::Error::Serialization {
                code: coralpkg_core::ErrorCode::E0802,
                message: format!("{}: unknown section '{section}'", path.display()),
            },
            ConfigError::InvalidValue { key, value, reason } => coralpkg_core::Error::Serialization {
                code: coralpkg_core::ErrorCode::E0802,
                message: format!("invalid value '{value}' for '{key}': {reason}"),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
