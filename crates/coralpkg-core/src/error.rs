//! Error types for coralpkg operations.
//!
//! Each error carries a stable code (e.g. `E0101`) for cross-referencing in
//! logs and bug reports, grouped by the kind taxonomy: Input, Resolution,
//! Repository, Archive, File system, State, External.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Stable error codes, grouped by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Input errors (E01xx)
    /// Package name not known to any repository or the install DB.
    E0101,
    /// Repository name not known to the configuration.
    E0102,
    /// Version string does not conform to the version grammar.
    E0103,
    /// Package name does not conform to the naming grammar.
    E0104,

    // Resolution errors (E02xx)
    /// A relation could not be satisfied by any candidate revision.
    E0201,
    /// A dependency cycle was found in the expanded package set.
    E0202,
    /// Two packages selected for install mutually conflict.
    E0203,
    /// A plan would remove a package protected by the base set.
    E0204,

    // Repository errors (E03xx)
    /// Repository index declares a distribution the system does not run.
    E0301,
    /// Repository index failed to parse or deserialize.
    E0302,
    /// Repository could not be reached to fetch its index.
    E0303,

    // Archive errors (E04xx)
    /// Archive SHA-1 does not match the expected digest.
    E0401,
    /// Archive container is malformed or missing required entries.
    E0402,
    /// Archive uses a container format this build does not support.
    E0403,

    // File system errors (E05xx)
    /// Two packages claim ownership of the same path.
    E0501,
    /// Operation denied by filesystem permissions.
    E0502,
    /// Staging a package payload to a temporary location failed.
    E0503,

    // State errors (E06xx)
    /// Global lock already held by another process.
    E0601,
    /// A persisted database is corrupt or unreadable.
    E0602,
    /// The files database's on-disk format is stale and needs a rebuild.
    E0603,

    // External errors (E07xx)
    /// Fetching a resource (package, delta, index) failed.
    E0701,
    /// Signature verification rejected an index or package.
    E0702,

    // IO errors (E08xx)
    /// Generic filesystem IO failure.
    E0801,
    /// Serialization/deserialization failure (JSON/XML).
    E0802,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::E0101 => "E0101",
            Self::E0102 => "E0102",
            Self::E0103 => "E0103",
            Self::E0104 => "E0104",
            Self::E0201 => "E0201",
            Self::E0202 => "E0202",
            Self::E0203 => "E0203",
            Self::E0204 => "E0204",
            Self::E0301 => "E0301",
            Self::E0302 => "E0302",
            Self::E0303 => "E0303",
            Self::E0401 => "E0401",
            Self::E0402 => "E0402",
            Self::E0403 => "E0403",
            Self::E0501 => "E0501",
            Self::E0502 => "E0502",
            Self::E0503 => "E0503",
            Self::E0601 => "E0601",
            Self::E0602 => "E0602",
            Self::E0603 => "E0603",
            Self::E0701 => "E0701",
            Self::E0702 => "E0702",
            Self::E0801 => "E0801",
            Self::E0802 => "E0802",
        }
    }

    #[must_use]
    pub const fn title(&self) -> &'static str {
        match self {
            Self::E0101 => "Unknown package",
            Self::E0102 => "Unknown repository",
            Self::E0103 => "Invalid version",
            Self::E0104 => "Invalid package name",
            Self::E0201 => "Unsatisfied dependency",
            Self::E0202 => "Dependency cycle",
            Self::E0203 => "Internal conflict",
            Self::E0204 => "Protected removal",
            Self::E0301 => "Incompatible distribution",
            Self::E0302 => "Index corrupt",
            Self::E0303 => "Repository unreachable",
            Self::E0401 => "Hash mismatch",
            Self::E0402 => "Archive corrupt",
            Self::E0403 => "Unsupported archive type",
            Self::E0501 => "File conflict",
            Self::E0502 => "Permission denied",
            Self::E0503 => "Staging failed",
            Self::E0601 => "Database busy",
            Self::E0602 => "Database corrupt",
            Self::E0603 => "Files DB needs rebuild",
            Self::E0701 => "Fetch failed",
            Self::E0702 => "Signature invalid",
            Self::E0801 => "IO error",
            Self::E0802 => "Serialization error",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type composed from every crate's error via `#[from]`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("[{code}] unknown package '{name}'")]
    UnknownPackage { code: ErrorCode, name: String },

    #[error("[{code}] unknown repository '{name}'")]
    UnknownRepo { code: ErrorCode, name: String },

    #[error("[{code}] invalid version {raw:?}")]
    InvalidVersion { code: ErrorCode, raw: String },

    #[error("[{code}] invalid package name {raw:?}")]
    InvalidPackageName { code: ErrorCode, raw: String },

    #[error("[{code}] no revision of '{package}' satisfies the required relation")]
    UnsatisfiedDependency { code: ErrorCode, package: String },

    #[error("[{code}] dependency cycle: {path:?}")]
    Cycle { code: ErrorCode, path: Vec<String> },

    #[error("[{code}] internal conflict between: {packages:?}")]
    InternalConflict { code: ErrorCode, packages: Vec<String> },

    #[error("[{code}] plan would remove protected package(s): {names:?}")]
    ProtectedRemoval { code: ErrorCode, names: Vec<String> },

    #[error("[{code}] repository '{repo}' targets distribution '{expected}', found '{found}'")]
    IncompatibleDistribution {
        code: ErrorCode,
        repo: String,
        expected: String,
        found: String,
    },

    #[error("[{code}] repository '{repo}' index is corrupt")]
    IndexCorrupt { code: ErrorCode, repo: String },

    #[error("[{code}] repository '{repo}' unreachable: {message}")]
    RepoUnreachable {
        code: ErrorCode,
        repo: String,
        message: String,
    },

    #[error("[{code}] hash mismatch for {path}: expected {expected}, got {got}")]
    HashMismatch {
        code: ErrorCode,
        path: PathBuf,
        expected: String,
        got: String,
    },

    #[error("[{code}] archive corrupt: {path}")]
    ArchiveCorrupt { code: ErrorCode, path: PathBuf },

    #[error("[{code}] unsupported archive type: {found}")]
    UnsupportedArchiveType { code: ErrorCode, found: String },

    #[error("[{code}] '{path}' already owned by '{old_owner}', conflicts with '{new_owner}'")]
    FileConflict {
        code: ErrorCode,
        path: PathBuf,
        new_owner: String,
        old_owner: String,
    },

    #[error("[{code}] permission denied: {path}")]
    PermissionDenied { code: ErrorCode, path: PathBuf },

    #[error("[{code}] staging failed for {path}: {message}")]
    StagingFailed {
        code: ErrorCode,
        path: PathBuf,
        message: String,
    },

    #[error("[{code}] database busy")]
    DatabaseBusy { code: ErrorCode },

    #[error("[{code}] database corrupt: {what}")]
    DatabaseCorrupt { code: ErrorCode, what: String },

    #[error("[{code}] files database needs rebuild")]
    FilesDbNeedsRebuild { code: ErrorCode },

    #[error("[{code}] fetch failed for {uri}: {message}")]
    Fetch {
        code: ErrorCode,
        uri: String,
        message: String,
    },

    #[error("[{code}] signature verification failed for {path}")]
    SignatureInvalid { code: ErrorCode, path: PathBuf },

    #[error("[{code}] IO error at {path}: {source}")]
    Io {
        code: ErrorCode,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[{code}] serialization error: {message}")]
    Serialization { code: ErrorCode, message: String },
}

impl Error {
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownPackage { code, .. }
            | Self::UnknownRepo { code, .. }
            | Self::InvalidVersion { code, .. }
            | Self::InvalidPackageName { code, .. }
            | Self::UnsatisfiedDependency { code, .. }
            | Self::Cycle { code, .. }
            | Self::InternalConflict { code, .. }
            | Self::ProtectedRemoval { code, .. }
            | Self::IncompatibleDistribution { code, .. }
            | Self::IndexCorrupt { code, .. }
            | Self::RepoUnreachable { code, .. }
            | Self::HashMismatch { code, .. }
            | Self::ArchiveCorrupt { code, .. }
            | Self::UnsupportedArchiveType { code, .. }
            | Self::FileConflict { code, .. }
            | Self::PermissionDenied { code, .. }
            | Self::StagingFailed { code, .. }
            | Self::DatabaseBusy { code }
            | Self::DatabaseCorrupt { code, .. }
            | Self::FilesDbNeedsRebuild { code }
            | Self::Fetch { code, .. }
            | Self::SignatureInvalid { code, .. }
            | Self::Io { code, .. }
            | Self::Serialization { code, .. } => *code,
        }
    }

    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            code: ErrorCode::E0801,
            path: path.into(),
            source,
        }
    }

    #[must_use]
    pub fn unknown_package(name: impl Into<String>) -> Self {
        Self::UnknownPackage {
            code: ErrorCode::E0101,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn unknown_repo(name: impl Into<String>) -> Self {
        Self::UnknownRepo {
            code: ErrorCode::E0102,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn invalid_version(raw: impl Into<String>) -> Self {
        Self::InvalidVersion {
            code: ErrorCode::E0103,
            raw: raw.into(),
        }
    }

    #[must_use]
    pub fn cycle(path: Vec<String>) -> Self {
        Self::Cycle {
            code: ErrorCode::E0202,
            path,
        }
    }

    #[must_use]
    pub fn protected_removal(names: Vec<String>) -> Self {
        Self::ProtectedRemoval {
            code: ErrorCode::E0204,
            names,
        }
    }

    #[must_use]
    pub fn database_corrupt(what: impl Into<String>) -> Self {
        Self::DatabaseCorrupt {
            code: ErrorCode::E0602,
            what: what.into(),
        }
    }

    /// `true` for conditions callers may retry (transient network/IO
    /// faults), `false` for conditions retrying cannot fix.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::RepoUnreachable { .. } | Self::DatabaseBusy { .. })
    }
}

impl From<sonic_rs::Error> for Error {
    fn from(e: sonic_rs::Error) -> Self {
        Self::Serialization {
            code: ErrorCode::E0802,
            message: e.to_string(),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Self::Serialization {
            code: ErrorCode::E0802,
            message: e.to_string(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_code_display_matches_as_str() {
        assert_eq!(ErrorCode::E0101.to_string(), "E0101");
    }

    #[test]
    fn fetch_and_repo_unreachable_are_transient() {
        let e = Error::Fetch {
            code: ErrorCode::E0701,
            uri: "https://example.test/x".into(),
            message: "timeout".into(),
        };
        assert!(e.is_transient());
        let e = Error::unknown_package("foo");
        assert!(!e.is_transient());
    }
}
