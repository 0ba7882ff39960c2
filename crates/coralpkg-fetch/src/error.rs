//! Error type for the fetch contract.

use std::path::PathBuf;
use thiserror::Error;

/// Errors `fetch(uri, dest)` can fail with. Mirrors the five kinds the
/// fetch contract distinguishes: the retryable ones carry how many
/// attempts were made before giving up.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("not found: {uri}")]
    NotFound { uri: String },

    #[error("server does not support resume for {uri}, restart required")]
    RangeUnsupported { uri: String },

    #[error("fetch of {uri} failed after {retries} attempt(s): {message}")]
    Transient { uri: String, retries: u32, message: String },

    #[error("fetch of {uri} timed out after {retries} attempt(s)")]
    Timeout { uri: String, retries: u32 },

    #[error("authentication refused for {uri}")]
    AuthRefused { uri: String },

    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transient { .. } | Self::Timeout { .. })
    }

    #[must_use]
    pub fn uri(&self) -> &str {
        match self {
            Self::NotFound { uri }
            | Self::RangeUnsupported { uri }
            | Self::Transient { uri, .. }
            | Self::Timeout { uri, .. }
            | Self::AuthRefused { uri } => uri,
            Self::Io { .. } => "",
        }
    }

    /// Classifies a `reqwest` response/transport failure into one of the
    /// fetch contract's kinds.
    #[must_use]
    pub fn from_reqwest(uri: &str, retries: u32, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::Timeout {
                uri: uri.to_string(),
                retries,
            };
        }
        if let Some(status) = err.status() {
            return Self::from_status(uri, retries, status.as_u16());
        }
        Self::Transient {
            uri: uri.to_string(),
            retries,
            message: err.to_string(),
        }
    }

    #[must_use]
    pub fn from_status(uri: &str, retries: u32, status: u16) -> Self {
        match status {
            404 => Self::NotFound { uri: uri.to_string() },
            401 | 403 => Self::AuthRefused { uri: uri.to_string() },
            416 => Self::RangeUnsupported { uri: uri.to_string() },
            408 | 429 | 500..=599 => Self::Transient {
                uri: uri.to_string(),
                retries,
                message: format!("HTTP {status}"),
            },
            other => Self::Transient {
                uri: uri.to_string(),
                retries,
                message: format!("HTTP {other}"),
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

impl From<FetchError> for coralpkg_core::Error {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Io { path, source } => coralpkg_core::Error::io(path, source),
            other => coralpkg_core::Error::Fetch {
                code: coralpkg_core::ErrorCode::E0701,
                uri: other.uri().to_string(),
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            FetchError::from_status("u", 0, 404),
            FetchError::NotFound { .. }
        ));
        assert!(matches!(
            FetchError::from_status("u", 0, 401),
            FetchError::AuthRefused { .. }
        ));
        assert!(matches!(
            FetchError::from_status("u", 0, 503),
            FetchError::Transient { .. }
        ));
        assert!(FetchError::from_status("u", 1, 503).is_retryable());
        assert!(!FetchError::from_status("u", 1, 404).is_retryable());
    }
}
