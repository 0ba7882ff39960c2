//! Core types shared across coralpkg crates.
//!
//! This crate is glue, not a domain engine: package/relation/repository
//! data model, the composed error type, the `Context` value (install root,
//! database handles, external collaborator trait objects), content
//! hashing, and JSON helpers.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod context;
pub mod domain;
pub mod error;
mod hash;
mod json;
pub mod progress;

pub use context::{Context, Fetcher, GlobalLockGuard, NullSignatureVerifier, NullSystemConfigTrigger, SignatureVerifier, SystemConfigTrigger};
pub use domain::{
    Dependency, DeltaTable, FileEntry, FileKind, InstallReason, InstalledRecord, Media,
    PackageId, PackageRecord, Relation, RelationType, Repo, RepoStatus, RevisionId, UpdateAction,
    UpdateHistoryEntry,
};
pub use error::{Error, ErrorCode, Result};
pub use hash::{ContentHash, ContentHasher};
pub use json::{from_json, from_json_slice, to_json, to_json_pretty};
pub use progress::{NullProgressSink, ProgressEvent, ProgressSink};

// Re-exported for downstream crates so they need not depend on these
// directly; keeps hashing/map choices consistent workspace-wide.
pub use ahash::{AHashMap, AHashSet};
pub use dashmap::DashMap;
pub use parking_lot::{Mutex, RwLock};

/// Global allocator using mimalloc for high performance.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;
